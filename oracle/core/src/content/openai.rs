//! OpenAI-compatible Chat Backend
//!
//! `POST {api_base}/chat/completions` with a bearer credential. Works with
//! any service that speaks the same chat-completion format.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::generator::{CompletionRequest, GenerationError, TextGenerator};

/// Longest error body kept in a [`GenerationError::Status`]
const MAX_ERROR_BODY: usize = 512;

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completion client
#[derive(Clone)]
pub struct OpenAiChatBackend {
    api_base: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiChatBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChatBackend")
            .field("api_base", &self.api_base)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl OpenAiChatBackend {
    /// Create a client with a request timeout
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Transport`] if the HTTP client cannot be
    /// built.
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        Ok(Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http_client,
        })
    }

    /// Chat completions endpoint URL
    #[must_use]
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

/// Pull the first choice's text out of a response body
fn extract_text(body: &str) -> Result<String, GenerationError> {
    let completion: ChatCompletion =
        serde_json::from_str(body).map_err(|e| GenerationError::MalformedBody(e.to_string()))?;
    let text = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::MalformedBody("no choices".to_string()))?
        .message
        .content
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(GenerationError::Empty);
    }
    Ok(text.to_string())
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}

#[async_trait]
impl TextGenerator for OpenAiChatBackend {
    fn name(&self) -> &str {
        "OpenAI"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        let response = self
            .http_client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Transport(format!("request timed out: {e}"))
                } else {
                    GenerationError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(GenerationError::Unauthorized(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: truncate(body),
            });
        }

        extract_text(&body)
    }
}
