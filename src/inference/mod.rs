pub mod anthropic;
pub mod openai;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{ConfigError, InferenceError};
use crate::types::{InferenceRequest, InferenceResponse};

/// Per-call ceiling on a vendor round trip, matching the vendor SDK default.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// HTTP client whose requests give up after `timeout`.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(?e, "failed to build http client with timeout, using defaults");
            reqwest::Client::new()
        })
}

/// Which vendor a provider talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    Anthropic,
    OpenAi,
}

impl Vendor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Anthropic => "anthropic",
            Vendor::OpenAi => "openai",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive. Unknown names are reported lower-cased.
impl FromStr for Vendor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        match name.as_str() {
            "anthropic" => Ok(Vendor::Anthropic),
            "openai" => Ok(Vendor::OpenAi),
            _ => Err(ConfigError::UnsupportedProvider(name)),
        }
    }
}

/// Pure LLM API call. No state, no history, no retries.
/// Request in, response out.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    fn vendor(&self) -> Vendor;

    async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse, InferenceError>;
}

/// Blanket impl so `Box<dyn InferenceProvider>` can be passed directly to `Refiner::new()`.
#[async_trait]
impl InferenceProvider for Box<dyn InferenceProvider> {
    fn vendor(&self) -> Vendor {
        (**self).vendor()
    }

    async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        (**self).infer(request).await
    }
}

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;
