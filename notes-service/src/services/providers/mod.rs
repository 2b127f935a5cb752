//! Chat-completion provider abstraction.
//!
//! The gateway talks to a [`ChatProvider`]; the OpenAI implementation is the
//! production backend and the mock stands in for it in tests.

pub mod mock;
pub mod openai;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::UsageCounts;

/// Error type for provider operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider rejected the credential (HTTP 401).
    #[error("Provider rejected the API key")]
    Unauthorized,

    /// HTTP 429.
    #[error("Rate limited")]
    RateLimited,

    /// HTTP 500 from the provider.
    #[error("Provider internal error")]
    ServiceError,

    /// Any other non-success response; `message` is the provider's own text.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// One chat-completion request: a system instruction plus the user prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Provider answer, reduced to what the gateway needs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatCompletion {
    /// Content of the first choice; `None` when the provider returned no
    /// choices or a choice without content.
    pub content: Option<String>,
    pub usage: Option<UsageCounts>,
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Model identifier sent with each request.
    fn model(&self) -> &str;

    /// Issue a single chat-completion request. Implementations must not retry.
    async fn complete(
        &self,
        api_key: &str,
        request: &ChatRequest,
    ) -> Result<ChatCompletion, ProviderError>;
}
