use std::sync::Arc;

use anyhow::Context;
use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    chain::TonlibChain,
    config::Config,
    handlers::{router, AppState},
};

mod chain;
mod clock;
mod config;
mod dto;
mod error;
mod handlers;
mod payload;
mod proof;
mod resolver;
mod session;
mod state_init;
mod verifier;
mod wallet;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;
    info!(?config, "starting ton_proof server");

    let chain = TonlibChain::connect(config.chain_timeout)
        .await
        .context("failed to connect to liteservers")?;
    let state = Arc::new(AppState::new(&config, Arc::new(chain))?);

    let cors_origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .context("invalid CORS_ORIGIN")?;

    let app = router(state).layer(
        // see https://docs.rs/tower-http/latest/tower_http/cors/index.html
        // for more details
        //
        // pay attention that for some request types like posting content-type: application/json
        // it is required to add ".allow_headers([http::header::CONTENT_TYPE])"
        // or see this issue https://github.com/tokio-rs/axum/issues/849
        CorsLayer::new()
            .allow_origin(cors_origin)
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .allow_methods([Method::GET, Method::POST]),
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
