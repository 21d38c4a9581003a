use std::net::SocketAddr;

use clap::Parser;
use tracing::info;

use crate::error::ConfigError;
use crate::inference::{
    anthropic::AnthropicProvider, openai, openai::OpenAiProvider, InferenceProvider, Vendor,
};
use crate::refine::{Refiner, REFINEMENT_SYSTEM_PROMPT};

pub const DEFAULT_CLAUDE_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4-turbo-preview";

/// Listener options.
#[derive(Debug, Parser)]
#[command(
    name = "refaine",
    version,
    about = "Turn casual prompts into expert-level AI engineering prompts"
)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,
}

/// Vendor settings resolved once at startup. Read-only afterwards.
#[derive(Clone)]
pub struct Settings {
    pub vendor: Vendor,
    pub api_key: String,
    pub model: String,
    /// Endpoint override, honoured for openai only.
    pub base_url: Option<String>,
    pub system_prompt: String,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("vendor", &self.vendor)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary key lookup. Empty values count as unset,
    /// except for `LLM_PROVIDER`, where an empty name is not a vendor.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let vendor: Vendor = lookup("LLM_PROVIDER")
            .as_deref()
            .unwrap_or("anthropic")
            .parse()?;

        let (key_var, model_var, default_model) = match vendor {
            Vendor::Anthropic => ("ANTHROPIC_API_KEY", "CLAUDE_MODEL", DEFAULT_CLAUDE_MODEL),
            Vendor::OpenAi => ("OPENAI_API_KEY", "OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
        };

        let api_key = get(key_var).ok_or(ConfigError::MissingApiKey {
            var: key_var,
            vendor,
        })?;

        let model = get(model_var).unwrap_or_else(|| default_model.to_string());

        let base_url = match vendor {
            Vendor::OpenAi => {
                Some(get("OPENAI_BASE_URL").unwrap_or_else(|| openai::DEFAULT_BASE_URL.into()))
            }
            Vendor::Anthropic => None,
        };

        let system_prompt =
            get("REFINE_SYSTEM_PROMPT").unwrap_or_else(|| REFINEMENT_SYSTEM_PROMPT.to_string());

        Ok(Self {
            vendor,
            api_key,
            model,
            base_url,
            system_prompt,
        })
    }

    pub fn build_provider(&self) -> Box<dyn InferenceProvider> {
        match self.vendor {
            Vendor::Anthropic => Box::new(AnthropicProvider::new(&self.api_key)),
            Vendor::OpenAi => {
                let mut p = OpenAiProvider::new(&self.api_key);
                if let Some(ref url) = self.base_url {
                    p = p.with_base_url(url);
                }
                Box::new(p)
            }
        }
    }

    /// The single refiner every request shares.
    pub fn build_refiner(&self) -> Refiner {
        let refiner = Refiner::new(self.build_provider(), &self.model)
            .with_system(&self.system_prompt);
        info!(vendor = %self.vendor, model = %self.model, "initialized provider");
        refiner
    }
}
