//! HTTP server setup and configuration.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::aggregate::Aggregator;
use crate::config::Config;

/// Shared application state. Everything in here is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn from_config(config: Config) -> reqwest::Result<Self> {
        let aggregator = Aggregator::from_config(&config)?;
        Ok(Self {
            aggregator: Arc::new(aggregator),
            config: Arc::new(config),
        })
    }
}

/// Create the axum router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // OpenAI-compatible endpoints
        .route("/v1/chat/completions", post(handlers::chat_completions))
        .route("/v1/models", get(handlers::list_models))
        // omnibus extensions
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/providers", get(handlers::list_providers))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let listen_addr = config.server.listen.clone();

    let state = AppState::from_config(config)?;

    for provider in state.aggregator.providers() {
        tracing::info!(
            provider = %provider.name,
            vendor = %provider.vendor,
            model = %provider.model,
            credential = provider.api_key.is_some(),
            "Provider configured"
        );
    }

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "Starting omnibus proxy server");

    axum::serve(listener, app).await?;

    Ok(())
}
