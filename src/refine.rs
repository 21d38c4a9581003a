use tracing::{info, warn};

use crate::error::RefineError;
use crate::inference::{InferenceProvider, Vendor};
use crate::types::{InferenceRequest, Message, StopReason};

/// Output ceiling for every refinement call.
pub const MAX_OUTPUT_TOKENS: u32 = 2000;

/// Instruction sent with every prompt unless `REFINE_SYSTEM_PROMPT` overrides it.
pub const REFINEMENT_SYSTEM_PROMPT: &str = r#"You are an expert prompt engineer specializing in software development tasks.

Your role is to transform casual, ambiguous user prompts into clear, comprehensive, expert-level prompts that will produce better AI-generated code and solutions.

When refining prompts, you should:

1. **Add Context**: Assume software development context and specify relevant details
2. **Add Specificity**: Include programming language, framework, libraries, and versions when relevant
3. **Define Requirements**: Make implicit requirements explicit (error handling, validation, edge cases)
4. **Include Best Practices**: Add expectations for code quality, testing, documentation, security
5. **Clarify Constraints**: Specify performance considerations, compatibility, or architectural patterns
6. **Maintain Intent**: Keep the core request intact while enhancing clarity
7. **Be Concise**: Comprehensive but not verbose - stay focused and actionable

Output ONLY the refined prompt. Do not include explanations, meta-commentary, or preamble."#;

/// Rewrites one prompt per call through the configured provider.
pub struct Refiner {
    provider: Box<dyn InferenceProvider>,
    model: String,
    system: String,
    max_tokens: u32,
}

impl Refiner {
    pub fn new(provider: impl InferenceProvider + 'static, model: impl Into<String>) -> Self {
        Self {
            provider: Box::new(provider),
            model: model.into(),
            system: REFINEMENT_SYSTEM_PROMPT.into(),
            max_tokens: MAX_OUTPUT_TOKENS,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    pub fn vendor(&self) -> Vendor {
        self.provider.vendor()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the vendor's rewrite with surrounding whitespace trimmed.
    pub async fn refine(&self, prompt: &str) -> Result<String, RefineError> {
        info!(prompt = %preview(prompt, 100), "refining prompt");

        let request = InferenceRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: Some(self.system.clone()),
            messages: vec![Message::user(prompt)],
        };

        let response = self
            .provider
            .infer(request)
            .await
            .map_err(|source| RefineError {
                vendor: self.vendor(),
                source,
            })?;

        if response.stop_reason == StopReason::MaxTokens {
            warn!(
                max_tokens = self.max_tokens,
                "refined prompt hit the output ceiling and may be truncated"
            );
        }

        info!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "successfully refined prompt"
        );

        Ok(response.text.trim().to_string())
    }
}

/// First `max_chars` characters of `s`, with an ellipsis appended.
fn preview(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
