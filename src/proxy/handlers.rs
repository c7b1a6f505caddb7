//! HTTP request handlers.

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use std::convert::Infallible;

use super::auth::RequireMasterKey;
use super::server::AppState;
use super::sse::{completion, new_completion_id};
use super::stream::synthetic_stream;
use super::types::ChatCompletionRequest;
use crate::error::Error;

/// Response header: completion id, also found in the body.
pub const OMNIBUS_REQUEST_ID_HEADER: &str = "x-omnibus-request-id";

/// Attach the completion id header to a response.
fn attach_request_id(response: &mut Response, id: &str) {
    if let Ok(value) = HeaderValue::from_str(id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(OMNIBUS_REQUEST_ID_HEADER), value);
    }
}

/// Handle POST /v1/chat/completions
pub async fn chat_completions(
    State(state): State<AppState>,
    _auth: RequireMasterKey,
    payload: Result<Json<ChatCompletionRequest>, JsonRejection>,
) -> Result<Response, Error> {
    let Json(request) = payload.map_err(|e| Error::BadRequest(e.body_text()))?;
    let is_streaming = request.is_streaming();

    tracing::info!(
        requested_model = ?request.model,
        messages = request.messages.len(),
        stream = is_streaming,
        "Received chat completion request"
    );

    let prompt = match request.user_prompt() {
        Some(prompt) => prompt,
        None => {
            tracing::warn!("Rejecting request without a user message");
            return Err(Error::MissingPrompt);
        }
    };

    let id = new_completion_id();
    let model = state.config.server.virtual_model.clone();

    let mut response = if is_streaming {
        stream_response(&state, id.clone(), model, prompt)?
    } else {
        non_stream_response(&state, &id, &model, &prompt).await?
    };

    attach_request_id(&mut response, &id);
    Ok(response)
}

/// Aggregate, then answer with one completion object.
async fn non_stream_response(
    state: &AppState,
    id: &str,
    model: &str,
    prompt: &str,
) -> Result<Response, Error> {
    tracing::info!(id = %id, "Serving non-streaming response");

    let content = state.aggregator.aggregate(prompt).await?;
    let body = completion(id, model, content);

    tracing::debug!(id = %id, body = ?body, "Sending non-streaming response");

    Ok(Json(body).into_response())
}

/// Answer immediately with an SSE body that aggregates on first poll.
fn stream_response(
    state: &AppState,
    id: String,
    model: String,
    prompt: String,
) -> Result<Response, Error> {
    tracing::info!(id = %id, "Serving synthetic stream");

    let aggregator = state.aggregator.clone();
    let body = async move { aggregator.aggregate(&prompt).await };
    let frames = synthetic_stream(id, model, state.config.server.char_delay(), body)
        .map(Ok::<_, Infallible>);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(frames))
        .map_err(|e| Error::Internal(format!("failed to build stream response: {}", e)))
}

/// Handle GET /v1/models - static list of known model ids
pub async fn list_models(
    State(state): State<AppState>,
    _auth: RequireMasterKey,
) -> impl IntoResponse {
    let created = chrono::Utc::now().timestamp();
    let models: Vec<serde_json::Value> = state
        .config
        .server
        .known_models
        .iter()
        .map(|id| {
            serde_json::json!({
                "id": id,
                "object": "model",
                "created": created,
                "owned_by": "omnibus",
            })
        })
        .collect();

    Json(serde_json::json!({
        "object": "list",
        "data": models
    }))
}

/// Handle GET /
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": format!(
            "Welcome to omnibus v{}. Service is running.",
            env!("CARGO_PKG_VERSION")
        )
    }))
}

/// Handle GET /health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "omnibus"
    }))
}

/// Handle GET /providers - omnibus extension to list upstreams
pub async fn list_providers(State(state): State<AppState>) -> impl IntoResponse {
    let providers: Vec<serde_json::Value> = state
        .aggregator
        .providers()
        .iter()
        .map(|p| {
            serde_json::json!({
                "name": p.name,
                "vendor": p.vendor,
                "model": p.model,
                "url": p.url,
                "has_api_key": p.api_key.is_some(),
            })
        })
        .collect();

    Json(serde_json::json!({
        "providers": providers
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_request_id() {
        let mut response = Response::builder()
            .status(StatusCode::OK)
            .body(Body::empty())
            .unwrap();
        attach_request_id(&mut response, "chatcmpl-123");
        assert_eq!(
            response.headers().get(OMNIBUS_REQUEST_ID_HEADER).unwrap(),
            "chatcmpl-123"
        );
    }

    #[test]
    fn test_attach_request_id_skips_invalid_value() {
        let mut response = Response::builder()
            .status(StatusCode::OK)
            .body(Body::empty())
            .unwrap();
        attach_request_id(&mut response, "bad\nid");
        assert!(response.headers().get(OMNIBUS_REQUEST_ID_HEADER).is_none());
    }
}
