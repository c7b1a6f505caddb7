//! Master-key bearer authentication.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

use super::server::AppState;
use crate::config::ApiKey;
use crate::error::Error;

/// Extractor that enforces the configured master key.
///
/// With no master key configured every request passes.
#[derive(Debug, Clone, Copy)]
pub struct RequireMasterKey;

#[async_trait]
impl FromRequestParts<AppState> for RequireMasterKey {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        check_bearer(state.config.server.master_key.as_ref(), &parts.headers)?;
        Ok(RequireMasterKey)
    }
}

/// Validate the `Authorization` header against `master_key`.
///
/// A header that is missing or does not mention "bearer" is `Unauthorized`;
/// a bearer token (the last word of the header) that differs from the key
/// is `Forbidden`.
pub fn check_bearer(master_key: Option<&ApiKey>, headers: &HeaderMap) -> Result<(), Error> {
    let Some(master_key) = master_key else {
        return Ok(());
    };

    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| v.to_ascii_lowercase().contains("bearer"))
        .ok_or(Error::Unauthorized)?;

    let token = value.split_whitespace().last().unwrap_or_default();
    if token != master_key.expose_secret() {
        tracing::warn!("Rejected request with invalid API key");
        return Err(Error::Forbidden);
    }

    Ok(())
}
