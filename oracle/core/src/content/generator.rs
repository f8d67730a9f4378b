//! Text Generator Traits
//!
//! Abstraction over remote chat-completion services. The
//! [`ContentProvider`](super::ContentProvider) only ever sees a
//! [`TextGenerator`]; the wire format lives in the implementation.
//!
//! # Design Philosophy
//!
//! A generator makes exactly one attempt per call and reports a typed
//! [`GenerationError`]. Retrying, falling back, and deciding that a service is
//! permanently unusable are the caller's business.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Failures from a single generation attempt
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Connection, DNS, TLS, or timeout failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The service rejected the credential (401/403)
    #[error("credential rejected with status {0}")]
    Unauthorized(u16),

    /// Any other non-success status
    #[error("service returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// The response body did not have the expected shape
    #[error("malformed response: {0}")]
    MalformedBody(String),

    /// The service answered with no text
    #[error("empty completion")]
    Empty,
}

impl GenerationError {
    /// Whether the credential itself was refused
    ///
    /// Such a failure will repeat on every later call.
    #[must_use]
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// Chat message author
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model
    System,
    /// The end user's turn
    User,
}

/// One chat message
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatMessage {
    /// Author
    pub role: Role,
    /// Message text
    pub content: String,
}

/// A completion request
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,
    /// Conversation, system message first
    pub messages: Vec<ChatMessage>,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    /// Sampling temperature (0.0-2.0)
    pub temperature: f32,
}

impl CompletionRequest {
    /// Create an empty request for a model
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            max_tokens: 150,
            temperature: 0.8,
        }
    }

    /// Append a system message
    #[must_use]
    pub fn with_system(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage {
            role: Role::System,
            content: content.into(),
        });
        self
    }

    /// Append a user message
    #[must_use]
    pub fn with_user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage {
            role: Role::User,
            content: content.into(),
        });
        self
    }

    /// Set max tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }
}

/// Remote text generator
///
/// Implement this trait to plug in a different completion service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generator name for logs
    fn name(&self) -> &str;

    /// Make one attempt and return the trimmed, non-empty text
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError>;
}
