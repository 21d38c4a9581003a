use crate::inference::Vendor;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("API returned {status}: {body}")]
    ApiError { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
}

/// Startup configuration problems. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unsupported LLM_PROVIDER: {0}. Use 'anthropic' or 'openai'")]
    UnsupportedProvider(String),
    #[error("{var} required when LLM_PROVIDER={vendor}")]
    MissingApiKey { var: &'static str, vendor: Vendor },
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to refine prompt using {vendor}: {source}")]
pub struct RefineError {
    pub vendor: Vendor,
    #[source]
    pub source: InferenceError,
}
