pub use anyhow::anyhow;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    BadRequest(anyhow::Error),
    ServerError(anyhow::Error),
    Unauthorized(anyhow::Error),
    UnsupportedMedia(anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::BadRequest(e) => format!("Invalid request: {}", e),
            Self::ServerError(e) => {
                tracing::error!(error = %e, "request failed");
                format!("Something went wrong: {}", e)
            }
            Self::Unauthorized(e) => format!("Authorization error: {}", e),
            Self::UnsupportedMedia(e) => format!("Unsupported media type: {}", e),
        };

        let body = Json(json!({
            "message": message,
            "statusCode": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::ServerError(err.into())
    }
}
