//! Envelope and chunk codec for the OpenAI wire format.
//!
//! Pure shaping functions: nothing here keeps state between calls.

use bytes::Bytes;

use super::types::{
    ChatCompletionChunk, ChatCompletionResponse, Choice, ChunkChoice, Delta, Message, Usage,
};
use crate::error::{Error, Result};

/// End-of-stream sentinel, emitted exactly once as the last frame.
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Finish reason carried by the terminal chunk.
pub const FINISH_STOP: &str = "stop";

/// Fresh completion identifier (`chatcmpl-<uuid>`).
pub fn new_completion_id() -> String {
    format!("chatcmpl-{}", uuid::Uuid::new_v4())
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Wrap a finished text body in a non-streaming completion object.
pub fn completion(id: &str, model: &str, content: String) -> ChatCompletionResponse {
    ChatCompletionResponse {
        id: id.to_string(),
        object: "chat.completion".to_string(),
        created: unix_now(),
        model: model.to_string(),
        choices: vec![Choice {
            index: 0,
            message: Message::assistant(content),
            finish_reason: Some(FINISH_STOP.to_string()),
        }],
        usage: Usage::default(),
    }
}

/// Build one streaming chunk. Empty `content` produces an empty delta.
pub fn chunk(
    id: &str,
    model: &str,
    content: &str,
    finish_reason: Option<&str>,
) -> ChatCompletionChunk {
    ChatCompletionChunk {
        id: id.to_string(),
        object: "chat.completion.chunk".to_string(),
        created: unix_now(),
        model: model.to_string(),
        choices: vec![ChunkChoice {
            index: 0,
            delta: Delta {
                role: None,
                content: (!content.is_empty()).then(|| content.to_string()),
            },
            finish_reason: finish_reason.map(str::to_string),
        }],
    }
}

/// Frame a chunk as one server-sent event: `data: <json>\n\n`.
pub fn sse_frame(chunk: &ChatCompletionChunk) -> Result<Bytes> {
    let json = serde_json::to_string(chunk)
        .map_err(|e| Error::Internal(format!("failed to encode chunk: {}", e)))?;
    Ok(Bytes::from(format!("data: {}\n\n", json)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_id_has_prefix() {
        let id = new_completion_id();
        assert!(id.starts_with("chatcmpl-"));
        assert_ne!(id, new_completion_id());
    }

    #[test]
    fn completion_shape() {
        let response = completion("chatcmpl-1", "omnibus", "body".to_string());
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["object"], "chat.completion");
        assert_eq!(json["model"], "omnibus");
        assert_eq!(json["choices"][0]["index"], 0);
        assert_eq!(json["choices"][0]["message"]["role"], "assistant");
        assert_eq!(json["choices"][0]["message"]["content"], "body");
        assert_eq!(json["choices"][0]["finish_reason"], "stop");
        assert_eq!(json["usage"]["prompt_tokens"], 0);
        assert_eq!(json["usage"]["completion_tokens"], 0);
        assert_eq!(json["usage"]["total_tokens"], 0);
        assert!(json["created"].as_i64().unwrap() > 0);
    }

    #[test]
    fn content_chunk_shape() {
        let c = chunk("chatcmpl-1", "omnibus", "h", None);
        let json = serde_json::to_value(&c).unwrap();

        assert_eq!(json["id"], "chatcmpl-1");
        assert_eq!(json["object"], "chat.completion.chunk");
        assert_eq!(json["choices"].as_array().unwrap().len(), 1);
        assert_eq!(json["choices"][0]["delta"]["content"], "h");
        assert!(json["choices"][0]["finish_reason"].is_null());
    }

    #[test]
    fn terminal_chunk_has_empty_delta() {
        let c = chunk("chatcmpl-1", "omnibus", "", Some(FINISH_STOP));
        let json = serde_json::to_value(&c).unwrap();

        assert_eq!(json["choices"][0]["delta"], serde_json::json!({}));
        assert_eq!(json["choices"][0]["finish_reason"], "stop");
    }

    #[test]
    fn frame_is_data_line_with_blank_line() {
        let frame = sse_frame(&chunk("id", "m", "x", None)).unwrap();
        let text = std::str::from_utf8(&frame).unwrap();

        assert!(text.starts_with("data: {"));
        assert!(text.ends_with("}\n\n"));
        let parsed: ChatCompletionChunk =
            serde_json::from_str(text.trim_start_matches("data: ").trim_end()).unwrap();
        assert_eq!(parsed.choices[0].delta.content.as_deref(), Some("x"));
    }

    #[test]
    fn done_frame_literal() {
        assert_eq!(DONE_FRAME, "data: [DONE]\n\n");
    }
}
