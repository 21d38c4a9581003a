//! Prompt refinement service: forwards a casual prompt plus a fixed system
//! instruction to Anthropic or OpenAI and returns the rewritten prompt.

pub mod config;
pub mod error;
pub mod inference;
pub mod refine;
pub mod server;
pub mod types;

pub use config::{ServeArgs, Settings};
pub use error::{ConfigError, InferenceError, RefineError};
pub use inference::{AnthropicProvider, InferenceProvider, OpenAiProvider, Vendor};
pub use refine::{Refiner, MAX_OUTPUT_TOKENS, REFINEMENT_SYSTEM_PROMPT};
pub use server::{router, serve, AppState};
pub use types::{InferenceRequest, InferenceResponse, Message, Role, StopReason, Usage};
