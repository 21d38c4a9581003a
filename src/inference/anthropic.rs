use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{http_client, InferenceProvider, Vendor, REQUEST_TIMEOUT};
use crate::error::InferenceError;
use crate::types::{InferenceRequest, InferenceResponse, StopReason, Usage};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Claude API client via Anthropic's messages endpoint.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_client(http_client(REQUEST_TIMEOUT), api_key)
    }

    pub fn with_client(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(timeout);
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// The system instruction travels as its own top-level parameter,
    /// never as a message.
    fn build_body(request: &InferenceRequest) -> Value {
        let mut body = json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "messages": request.messages,
        });

        if let Some(ref system) = request.system {
            body["system"] = Value::String(system.clone());
        }

        body
    }
}

#[async_trait]
impl InferenceProvider for AnthropicProvider {
    fn vendor(&self) -> Vendor {
        Vendor::Anthropic
    }

    async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        let body = Self::build_body(&request);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "anthropic inference request"
        );

        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::Request(e.to_string()))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| InferenceError::Request(e.to_string()))?;

        if status != 200 {
            return Err(InferenceError::ApiError { status, body: text });
        }

        let parsed: Value =
            serde_json::from_str(&text).map_err(|e| InferenceError::Parse(e.to_string()))?;

        // First content block only; anything other than text there is a malformed reply.
        let first = &parsed["content"][0];
        let text = match first["type"].as_str() {
            Some("text") => first["text"]
                .as_str()
                .ok_or_else(|| InferenceError::Parse("text block has no text".into()))?
                .to_string(),
            Some(other) => {
                return Err(InferenceError::Parse(format!(
                    "first content block is {other}, not text"
                )))
            }
            None => return Err(InferenceError::Parse("response has no content".into())),
        };

        let stop_reason = match parsed["stop_reason"].as_str().unwrap_or("unknown") {
            "end_turn" | "stop_sequence" => StopReason::EndTurn,
            "max_tokens" => StopReason::MaxTokens,
            other => StopReason::Other(other.to_string()),
        };

        let usage = Usage {
            input_tokens: parsed["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: parsed["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32,
        };

        Ok(InferenceResponse {
            text,
            stop_reason,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;
    use mockito::Matcher;

    fn request() -> InferenceRequest {
        InferenceRequest {
            model: "claude-test".into(),
            max_tokens: 2000,
            system: Some("be an expert".into()),
            messages: vec![Message::user("make a todo app")],
        }
    }

    #[test]
    fn system_instruction_is_a_top_level_parameter() {
        let body = AnthropicProvider::build_body(&request());
        assert_eq!(body["system"], "be an expert");
        assert_eq!(body["max_tokens"], 2000);
        assert_eq!(
            body["messages"],
            json!([{ "role": "user", "content": "make a todo app" }])
        );
        assert!(body.get("temperature").is_none());
    }

    #[tokio::test]
    async fn extracts_first_text_block() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "test-key")
            .match_header("anthropic-version", "2023-06-01")
            .match_body(Matcher::PartialJson(json!({
                "model": "claude-test",
                "system": "be an expert",
                "max_tokens": 2000,
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "content": [
                        { "type": "text", "text": "  Build a todo app in Rust.\n" },
                        { "type": "text", "text": "ignored" }
                    ],
                    "stop_reason": "end_turn",
                    "usage": { "input_tokens": 42, "output_tokens": 7 }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let provider = AnthropicProvider::new("test-key").with_base_url(server.url());
        let resp = provider.infer(request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(resp.text, "  Build a todo app in Rust.\n");
        assert_eq!(resp.stop_reason, StopReason::EndTurn);
        assert_eq!(resp.usage.input_tokens, 42);
        assert_eq!(resp.usage.output_tokens, 7);
    }

    #[tokio::test]
    async fn non_200_becomes_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(401)
            .with_body("invalid x-api-key")
            .create_async()
            .await;

        let provider = AnthropicProvider::new("bad-key").with_base_url(server.url());
        let err = provider.infer(request()).await.unwrap_err();

        match err {
            InferenceError::ApiError { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid x-api-key");
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stalled_vendor_times_out() {
        // Accepts connections and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let provider = AnthropicProvider::new("test-key")
            .with_timeout(Duration::from_millis(200))
            .with_base_url(format!("http://{addr}"));
        let err = provider.infer(request()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Request(_)));
    }

    #[tokio::test]
    async fn empty_content_is_a_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_body(json!({ "content": [], "stop_reason": "end_turn" }).to_string())
            .create_async()
            .await;

        let provider = AnthropicProvider::new("test-key").with_base_url(server.url());
        let err = provider.infer(request()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Parse(_)));
    }
}
