use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{http_client, InferenceProvider, Vendor, REQUEST_TIMEOUT};
use crate::error::InferenceError;
use crate::types::{InferenceRequest, InferenceResponse, Message, StopReason, Usage};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible provider. Works with any server that implements
/// `/chat/completions` under the configured base URL (which includes `/v1`).
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: http_client(REQUEST_TIMEOUT),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
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

    /// Flat message list with the system instruction prepended as its own message.
    fn convert_messages(system: Option<&str>, messages: &[Message]) -> Vec<Message> {
        let mut out = Vec::with_capacity(messages.len() + 1);
        if let Some(sys) = system {
            out.push(Message::system(sys));
        }
        out.extend(messages.iter().cloned());
        out
    }

    fn build_body(request: &InferenceRequest) -> Value {
        let messages = Self::convert_messages(request.system.as_deref(), &request.messages);
        json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "messages": messages,
        })
    }
}

#[async_trait]
impl InferenceProvider for OpenAiProvider {
    fn vendor(&self) -> Vendor {
        Vendor::OpenAi
    }

    async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        let body = Self::build_body(&request);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "openai inference request"
        );

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {}", self.api_key))
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

        let choice = &parsed["choices"][0];
        if choice.is_null() {
            return Err(InferenceError::Parse("response has no choices".into()));
        }

        let text = choice["message"]["content"]
            .as_str()
            .ok_or_else(|| InferenceError::Parse("first choice has no message content".into()))?
            .to_string();

        let stop_reason = match choice["finish_reason"].as_str().unwrap_or("stop") {
            "stop" => StopReason::EndTurn,
            "length" => StopReason::MaxTokens,
            other => StopReason::Other(other.to_string()),
        };

        let usage = Usage {
            input_tokens: parsed["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: parsed["usage"]["completion_tokens"]
                .as_u64()
                .unwrap_or(0) as u32,
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
    use mockito::Matcher;

    fn request() -> InferenceRequest {
        InferenceRequest {
            model: "gpt-test".into(),
            max_tokens: 2000,
            system: Some("be an expert".into()),
            messages: vec![Message::user("make a todo app")],
        }
    }

    #[test]
    fn system_instruction_leads_the_message_list() {
        let body = OpenAiProvider::build_body(&request());
        assert_eq!(
            body["messages"],
            json!([
                { "role": "system", "content": "be an expert" },
                { "role": "user", "content": "make a todo app" }
            ])
        );
        assert_eq!(body["max_tokens"], 2000);
        assert!(body.get("system").is_none());
    }

    #[tokio::test]
    async fn extracts_first_choice_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({ "model": "gpt-test" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "choices": [{
                        "message": { "role": "assistant", "content": "\nWrite a CLI todo app.  " },
                        "finish_reason": "length"
                    }],
                    "usage": { "prompt_tokens": 30, "completion_tokens": 2000 }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let provider =
            OpenAiProvider::new("sk-test").with_base_url(format!("{}/v1/", server.url()));
        let resp = provider.infer(request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(resp.text, "\nWrite a CLI todo app.  ");
        assert_eq!(resp.stop_reason, StopReason::MaxTokens);
        assert_eq!(resp.usage.output_tokens, 2000);
    }

    #[tokio::test]
    async fn null_content_is_a_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(
                json!({ "choices": [{ "message": { "content": null }, "finish_reason": "stop" }] })
                    .to_string(),
            )
            .create_async()
            .await;

        let provider = OpenAiProvider::new("sk-test").with_base_url(server.url());
        let err = provider.infer(request()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Parse(_)));
    }

    #[tokio::test]
    async fn stalled_vendor_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let provider = OpenAiProvider::new("sk-test")
            .with_timeout(Duration::from_millis(200))
            .with_base_url(format!("http://{addr}/v1"));
        let err = provider.infer(request()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Request(_)));
    }

    #[tokio::test]
    async fn rate_limit_becomes_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let provider = OpenAiProvider::new("sk-test").with_base_url(server.url());
        let err = provider.infer(request()).await.unwrap_err();
        assert_eq!(err.to_string(), "API returned 429: rate limited");
    }
}
