//! Vendor request/response dialects.

use serde::{Deserialize, Serialize};

/// Sampling temperature sent to every vendor.
const TEMPERATURE: f32 = 0.5;

/// Completion length cap sent to every vendor.
const MAX_TOKENS: u32 = 200;

/// The request/response shape an upstream speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    /// Cohere chat: `message` in, `text` out.
    Cohere,
    /// AI21 Studio chat completions (OpenAI-style).
    Ai21,
    /// Mistral chat completions (OpenAI-style).
    Mistral,
}

impl Vendor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Cohere => "cohere",
            Vendor::Ai21 => "ai21",
            Vendor::Mistral => "mistral",
        }
    }

    /// Build the JSON request body for a single-turn prompt.
    pub fn request_body(&self, model: &str, prompt: &str) -> serde_json::Value {
        match self {
            Vendor::Cohere => serde_json::json!({
                "model": model,
                "message": prompt,
                "temperature": TEMPERATURE,
                "max_tokens": MAX_TOKENS,
            }),
            Vendor::Ai21 | Vendor::Mistral => serde_json::json!({
                "model": model,
                "messages": [{"role": "user", "content": prompt}],
                "temperature": TEMPERATURE,
                "max_tokens": MAX_TOKENS,
            }),
        }
    }

    /// Pull the answer text out of a successful reply.
    ///
    /// Cohere replies without a `text` field count as an empty answer;
    /// OpenAI-style replies must carry `choices[0].message.content`.
    pub fn extract_text(&self, body: &serde_json::Value) -> Option<String> {
        match self {
            Vendor::Cohere => match body.get("text") {
                None | Some(serde_json::Value::Null) => Some(String::new()),
                Some(text) => text.as_str().map(str::to_string),
            },
            Vendor::Ai21 | Vendor::Mistral => body
                .get("choices")?
                .get(0)?
                .get("message")?
                .get("content")?
                .as_str()
                .map(str::to_string),
        }
    }
}

impl std::fmt::Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cohere_body_uses_message_field() {
        let body = Vendor::Cohere.request_body("command-r-08-2024", "hi");
        assert_eq!(body["model"], "command-r-08-2024");
        assert_eq!(body["message"], "hi");
        assert_eq!(body["max_tokens"], 200);
        assert!(body.get("messages").is_none());
    }

    #[test]
    fn test_chat_body_uses_messages_array() {
        for vendor in [Vendor::Ai21, Vendor::Mistral] {
            let body = vendor.request_body("m", "hello");
            assert_eq!(body["messages"][0]["role"], "user");
            assert_eq!(body["messages"][0]["content"], "hello");
            assert_eq!(body["temperature"], 0.5);
            assert!(body.get("message").is_none());
        }
    }

    #[test]
    fn test_cohere_extract_text() {
        let body = serde_json::json!({"text": "Bonjour", "generation_id": "g1"});
        assert_eq!(Vendor::Cohere.extract_text(&body), Some("Bonjour".to_string()));
    }

    #[test]
    fn test_cohere_missing_text_is_empty_answer() {
        let body = serde_json::json!({"generation_id": "g1"});
        assert_eq!(Vendor::Cohere.extract_text(&body), Some(String::new()));
    }

    #[test]
    fn test_cohere_non_string_text_is_malformed() {
        let body = serde_json::json!({"text": 42});
        assert_eq!(Vendor::Cohere.extract_text(&body), None);
    }

    #[test]
    fn test_chat_extract_content() {
        let body = serde_json::json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hola"}}]
        });
        assert_eq!(Vendor::Mistral.extract_text(&body), Some("Hola".to_string()));
        assert_eq!(Vendor::Ai21.extract_text(&body), Some("Hola".to_string()));
    }

    #[test]
    fn test_chat_missing_choices_is_malformed() {
        let body = serde_json::json!({"choices": []});
        assert_eq!(Vendor::Ai21.extract_text(&body), None);
        assert_eq!(Vendor::Mistral.extract_text(&serde_json::json!({})), None);
    }

    #[test]
    fn test_vendor_deserializes_lowercase() {
        let v: Vendor = serde_json::from_str("\"ai21\"").unwrap();
        assert_eq!(v, Vendor::Ai21);
        assert_eq!(Vendor::Cohere.to_string(), "cohere");
    }
}
