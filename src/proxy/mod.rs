//! HTTP proxy server module.
//!
//! This module provides the OpenAI-compatible HTTP API that accepts a chat
//! request, fans the prompt out through the aggregator, and answers with one
//! completion or a synthetic stream.

pub mod auth;
mod handlers;
mod server;
pub mod sse;
pub mod stream;
pub mod types;

pub use handlers::OMNIBUS_REQUEST_ID_HEADER;
pub use server::{create_router, run_server, AppState};
pub use stream::synthetic_stream;
pub use types::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, ContentPart, Message,
    MessageContent,
};
