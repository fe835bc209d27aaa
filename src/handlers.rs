use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRef, FromRequest, FromRequestParts, Query, Request, State,
    },
    http::{header::CONTENT_TYPE, request::Parts, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, RequestExt, RequestPartsExt, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tonlib::address::TonAddress;

use crate::{
    chain::ChainClient,
    clock::unix_now,
    config::Config,
    dto::{
        AccountInfo, AccountInfoQuery, AddressForms, CheckProofPayload, CheckTonProof,
        GenerateTonProofPayload,
    },
    error::{anyhow, AppError},
    payload::PayloadIssuer,
    proof::raw_address,
    resolver::PublicKeyResolver,
    session::{Claims, SessionError, SessionIssuer},
    verifier::ProofVerifier,
    wallet::WalletRegistry,
};

pub struct AppState {
    payloads: PayloadIssuer,
    verifier: ProofVerifier,
    sessions: SessionIssuer,
    chain: Arc<dyn ChainClient>,
    payload_ttl: u64,
    session_ttl: u64,
}

impl AppState {
    pub fn new(config: &Config, chain: Arc<dyn ChainClient>) -> anyhow::Result<Self> {
        let payloads = PayloadIssuer::new(config.secret.as_bytes())
            .map_err(|e| anyhow!("invalid payload secret: {}", e))?;
        let resolver = PublicKeyResolver::new(chain.clone(), WalletRegistry::known()?);
        let verifier = ProofVerifier::new(
            payloads.clone(),
            resolver,
            config.domain.clone(),
            config.proof_ttl,
        );

        Ok(Self {
            payloads,
            verifier,
            sessions: SessionIssuer::new(config.session_secret.as_bytes())?,
            chain,
            payload_ttl: config.payload_ttl,
            session_ttl: config.session_ttl,
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/ton-proof/generatePayload",
            post(generate_ton_proof_payload),
        )
        .route("/ton-proof/checkProof", post(check_ton_proof))
        .route("/dapp/getAccountInfo", get(get_account_info))
        .with_state(state)
}

/// Generate ton_proof payload
async fn generate_ton_proof_payload(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GenerateTonProofPayload>, AppError> {
    let payload = state.payloads.issue(state.payload_ttl)?;
    Ok(Json(GenerateTonProofPayload { payload }))
}

/// Check ton_proof
async fn check_ton_proof(
    State(state): State<Arc<AppState>>,
    JsonOrPlain(body): JsonOrPlain<CheckProofPayload>,
) -> Result<Json<CheckTonProof>, AppError> {
    let now = unix_now()?;
    let verified = state
        .verifier
        .verify_at(&body, now)
        .await
        .map_err(|e| AppError::BadRequest(e.into()))?;

    let token = state.sessions.issue(&verified.address, state.session_ttl)?;

    Ok(Json(CheckTonProof { token }))
}

async fn get_account_info(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    query: Result<Query<AccountInfoQuery>, QueryRejection>,
) -> Result<Json<AccountInfo>, AppError> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(anyhow!(e.body_text())))?;
    let address = TonAddress::from_hex_str(&claims.address)
        .map_err(|e| AppError::Unauthorized(e.into()))?;
    let account = state
        .chain
        .get_account_state(&address, query.network)
        .await
        .map_err(|e| AppError::BadRequest(anyhow!("get account info error: {}", e)))?;

    let testnet = query.network.is_testnet();
    Ok(Json(AccountInfo {
        address: AddressForms {
            bounceable: address.to_base64_url_flags(false, testnet),
            non_bounceable: address.to_base64_url_flags(true, testnet),
            raw: raw_address(&address),
        },
        balance: account.balance,
        status: account.status,
    }))
}

#[async_trait]
impl<S> FromRequestParts<S> for Claims
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Extract the token from the authorization header
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|e| AppError::Unauthorized(e.into()))?;

        let state = Arc::<AppState>::from_ref(state);
        state
            .sessions
            .validate(bearer.token())
            .map_err(|e| match e {
                SessionError::Clock(_) => AppError::ServerError(e.into()),
                _ => AppError::Unauthorized(e.into()),
            })
    }
}

// to make accept json with content-type: text/plain
struct JsonOrPlain<T>(T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonOrPlain<T>
where
    S: Send + Sync,
    Json<T>: FromRequest<(), Rejection = JsonRejection>,
    T: 'static,
{
    type Rejection = Response;

    async fn from_request(mut req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let content_type_header = req.headers().get(CONTENT_TYPE);
        let content_type = content_type_header.and_then(|value| value.to_str().ok());

        if let Some(content_type) = content_type {
            if content_type.starts_with("application/json")
                || content_type.starts_with("text/plain")
            {
                if content_type.starts_with("text/plain") {
                    req.headers_mut().insert(
                        CONTENT_TYPE,
                        HeaderValue::from_static("application/json"),
                    );
                }

                let Json(payload) = req.extract::<Json<T>, _>().await.map_err(|err| {
                    AppError::BadRequest(anyhow!(err.body_text())).into_response()
                })?;
                return Ok(Self(payload));
            }
        }

        Err(
            AppError::UnsupportedMedia(anyhow!("expected application/json content type"))
                .into_response(),
        )
    }
}
