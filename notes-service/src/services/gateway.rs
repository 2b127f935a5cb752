//! Generation gateway: validates a draft request, forwards it to the chat
//! provider once, and classifies the outcome.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use super::auth::AuthUser;
use super::metrics::{GENERATION_DURATION, GENERATION_REQUESTS_TOTAL, GENERATION_TOKENS_TOTAL};
use super::prompts::system_prompt;
use super::providers::{ChatProvider, ChatRequest, ProviderError};
use crate::models::{GenerationRequest, GenerationResult, UsageCounts};

/// Cap on generated output tokens.
pub const MAX_OUTPUT_TOKENS: u32 = 1000;

/// Sampling temperature sent with every request.
pub const TEMPERATURE: f32 = 0.7;

/// Credentials shorter than this are treated as unset.
const MIN_API_KEY_LEN: usize = 20;

const PLACEHOLDER_MARKERS: [&str; 4] = ["your", "placeholder", "changeme", "xxxx"];

/// Why a generation request failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Prompt is required")]
    InvalidInput,

    #[error("OpenAI API key is not configured")]
    Configuration,

    #[error("Invalid OpenAI API key")]
    ProviderAuth,

    #[error("Rate limit exceeded. Please try again later.")]
    ProviderRateLimit,

    #[error("OpenAI service error. Please try again later.")]
    ProviderService,

    /// Provider-reported failure; the message is surfaced verbatim.
    #[error("{0}")]
    ProviderOther(String),

    /// Network failure or an undecodable provider response.
    #[error("Failed to generate text")]
    Transport(String),
}

impl GenerationError {
    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::Unauthorized => "unauthorized",
            GenerationError::InvalidInput => "invalid_input",
            GenerationError::Configuration => "configuration",
            GenerationError::ProviderAuth => "provider_auth",
            GenerationError::ProviderRateLimit => "rate_limited",
            GenerationError::ProviderService => "provider_service",
            GenerationError::ProviderOther(_) => "provider_other",
            GenerationError::Transport(_) => "transport",
        }
    }
}

impl From<ProviderError> for GenerationError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Unauthorized => GenerationError::ProviderAuth,
            ProviderError::RateLimited => GenerationError::ProviderRateLimit,
            ProviderError::ServiceError => GenerationError::ProviderService,
            ProviderError::Api { message, .. } => GenerationError::ProviderOther(message),
            ProviderError::Network(msg) | ProviderError::InvalidResponse(msg) => {
                GenerationError::Transport(msg)
            }
        }
    }
}

/// A successful draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Empty when the provider returned no choices or no content.
    pub text: String,
    pub usage: Option<UsageCounts>,
}

impl From<Result<Generation, GenerationError>> for GenerationResult {
    fn from(outcome: Result<Generation, GenerationError>) -> Self {
        match outcome {
            Ok(generation) => GenerationResult::success(generation.text, generation.usage),
            Err(err) => GenerationResult::failure(err.to_string()),
        }
    }
}

/// Check that a credential is present and is not a template placeholder.
pub fn validate_api_key(api_key: Option<&str>) -> Result<&str, GenerationError> {
    let key = api_key.map(str::trim).unwrap_or_default();
    let lowered = key.to_ascii_lowercase();

    if key.len() < MIN_API_KEY_LEN || PLACEHOLDER_MARKERS.iter().any(|m| lowered.contains(m)) {
        return Err(GenerationError::Configuration);
    }

    Ok(key)
}

#[derive(Clone)]
pub struct GenerationGateway {
    provider: Arc<dyn ChatProvider>,
    api_key: Option<String>,
}

impl GenerationGateway {
    pub fn new(provider: Arc<dyn ChatProvider>, api_key: Option<String>) -> Self {
        Self { provider, api_key }
    }

    /// Draft a note for `user`.
    ///
    /// Checks run in order (caller, prompt, credential) and each failure
    /// returns before the provider is contacted. At most one provider call is
    /// made and it is never retried.
    #[tracing::instrument(
        skip(self, user, request),
        fields(note_type = %request.note_type, prompt_len = request.prompt.len())
    )]
    pub async fn generate(
        &self,
        user: Option<&AuthUser>,
        request: &GenerationRequest,
    ) -> Result<Generation, GenerationError> {
        let outcome = self.run(user, request).await;

        let note_type = request.note_type.as_str();
        match &outcome {
            Ok(generation) => {
                GENERATION_REQUESTS_TOTAL
                    .with_label_values(&[note_type, "success"])
                    .inc();
                if let Some(usage) = generation.usage {
                    GENERATION_TOKENS_TOTAL
                        .with_label_values(&["prompt"])
                        .inc_by(f64::from(usage.prompt_tokens));
                    GENERATION_TOKENS_TOTAL
                        .with_label_values(&["completion"])
                        .inc_by(f64::from(usage.completion_tokens));
                }
                tracing::info!(
                    text_len = generation.text.len(),
                    total_tokens = generation.usage.map(|u| u.total_tokens),
                    "Note draft generated"
                );
            }
            Err(err) => {
                GENERATION_REQUESTS_TOTAL
                    .with_label_values(&[note_type, err.kind()])
                    .inc();
                match err {
                    GenerationError::Unauthorized | GenerationError::InvalidInput => {
                        tracing::debug!(kind = err.kind(), "Generation request rejected")
                    }
                    GenerationError::Transport(detail) => {
                        tracing::error!(kind = err.kind(), detail = %detail, "Generation failed")
                    }
                    _ => tracing::warn!(kind = err.kind(), error = %err, "Generation failed"),
                }
            }
        }

        outcome
    }

    async fn run(
        &self,
        user: Option<&AuthUser>,
        request: &GenerationRequest,
    ) -> Result<Generation, GenerationError> {
        if user.is_none() {
            return Err(GenerationError::Unauthorized);
        }

        if request.prompt.trim().is_empty() {
            return Err(GenerationError::InvalidInput);
        }

        let api_key = validate_api_key(self.api_key.as_deref())?;

        let chat_request = ChatRequest {
            system_prompt: system_prompt(request.note_type).to_string(),
            user_prompt: request.prompt.clone(),
            max_tokens: MAX_OUTPUT_TOKENS,
            temperature: TEMPERATURE,
        };

        let started = Instant::now();
        let completion = self.provider.complete(api_key, &chat_request).await;
        GENERATION_DURATION
            .with_label_values(&[request.note_type.as_str()])
            .observe(started.elapsed().as_secs_f64());

        let completion = completion?;

        Ok(Generation {
            text: completion.content.unwrap_or_default(),
            usage: completion.usage,
        })
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }
}
