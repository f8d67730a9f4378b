//! Fortune Content
//!
//! Produces the fortune text for one consultation. The remote generator is
//! tried first; anything that goes wrong ends in a draw from the weighted
//! [`FallbackPool`], so [`ContentProvider::get_fortune`] always yields text.
//!
//! # Design Philosophy
//!
//! - One remote attempt per fortune, never retried. The user is standing in
//!   front of the robot; a fallback fortune now beats a better one later.
//! - A rejected credential will not start working mid-session, so after a
//!   401/403 the provider stops calling the remote for the rest of its life.
//! - In gesture-aware mode the model is asked to embed gesture tags, and any
//!   reply that breaks the tag grammar is discarded like a failed request.

mod fallback;
mod generator;
mod openai;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

pub use fallback::{builtin_fortunes, FallbackError, FallbackPool, WeightedFortune};
pub use generator::{ChatMessage, CompletionRequest, GenerationError, Role, TextGenerator};
pub use openai::OpenAiChatBackend;

use crate::error::ContentError;
use crate::gesture::GestureLibrary;
use crate::markup;

/// Settings for fortune generation
///
/// Loaded once before a session and never changed afterwards.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Service credential; `None` selects fallback content
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Base URL of the chat-completion API
    pub api_base: String,
    /// Model identifier
    pub model: String,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Ask the model to embed gesture tags
    pub gesture_aware: bool,
    /// Name the model speaks as
    #[serde(skip)]
    pub persona: String,
    /// Custom fallback fortunes (empty = built-in pool)
    pub fallback: Vec<WeightedFortune>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 150,
            temperature: 0.8,
            timeout_secs: 30,
            gesture_aware: false,
            persona: "Pepper".to_string(),
            fallback: Vec::new(),
        }
    }
}

impl fmt::Debug for ContentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("gesture_aware", &self.gesture_aware)
            .field("persona", &self.persona)
            .field("fallback", &self.fallback.len())
            .finish()
    }
}

impl ContentConfig {
    /// Usable credential, if any (blank strings do not count)
    #[must_use]
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Request timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build the fallback pool described by this config
    ///
    /// # Errors
    ///
    /// Fails when a custom fortune is blank or every custom weight is zero.
    pub fn fallback_pool(&self) -> Result<FallbackPool, FallbackError> {
        if self.fallback.is_empty() {
            Ok(FallbackPool::default())
        } else {
            FallbackPool::new(self.fallback.clone())
        }
    }
}

/// What the user asked about
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FortuneRequest {
    topic: String,
    detail: Option<String>,
}

impl FortuneRequest {
    /// Create a request; a blank topic becomes "general"
    pub fn new(topic: impl AsRef<str>) -> Self {
        let topic = topic.as_ref().trim();
        Self {
            topic: if topic.is_empty() {
                "general".to_string()
            } else {
                topic.to_string()
            },
            detail: None,
        }
    }

    /// Attach detail; blank detail is ignored
    #[must_use]
    pub fn with_detail(mut self, detail: impl AsRef<str>) -> Self {
        let detail = detail.as_ref().trim();
        self.detail = (!detail.is_empty()).then(|| detail.to_string());
        self
    }

    /// Normalized topic
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Detail, if given
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// "<topic> - <detail>", or just the topic
    #[must_use]
    pub fn prompt_subject(&self) -> String {
        match &self.detail {
            Some(detail) => format!("{} - {detail}", self.topic),
            None => self.topic.clone(),
        }
    }
}

/// Where a fortune came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FortuneSource {
    /// Generated by the remote service
    Remote,
    /// Drawn from the fallback pool
    Fallback,
}

/// A fortune ready to be spoken
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FortuneResult {
    /// Text, possibly carrying gesture tags in gesture-aware mode
    pub text: String,
    /// Origin
    pub source: FortuneSource,
}

/// Fortune text source with remote generation and local fallback
pub struct ContentProvider {
    config: ContentConfig,
    generator: Option<Arc<dyn TextGenerator>>,
    fallback: FallbackPool,
    remote_usable: AtomicBool,
    rng: Mutex<StdRng>,
}

impl ContentProvider {
    /// Create a provider; the remote generator exists only with a credential
    ///
    /// # Errors
    ///
    /// Returns [`FallbackError`] when the configured fallback fortunes cannot
    /// form a pool.
    pub fn new(config: ContentConfig) -> Result<Self, FallbackError> {
        let fallback = config.fallback_pool()?;
        let generator = config.credential().and_then(|key| {
            match OpenAiChatBackend::new(config.api_base.clone(), key, config.timeout()) {
                Ok(backend) => Some(Arc::new(backend) as Arc<dyn TextGenerator>),
                Err(e) => {
                    tracing::warn!(error = %e, "Remote generator unavailable, using fallback fortunes");
                    None
                }
            }
        });
        if generator.is_none() {
            tracing::info!("No credential configured, fortunes come from the fallback pool");
        }

        Ok(Self {
            config,
            generator,
            fallback,
            remote_usable: AtomicBool::new(true),
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    /// Replace the remote generator
    #[must_use]
    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Use a deterministic random source for fallback draws
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        *self.rng.lock() = StdRng::seed_from_u64(seed);
        self
    }

    /// Settings in use
    #[must_use]
    pub fn config(&self) -> &ContentConfig {
        &self.config
    }

    /// Fallback pool in use
    #[must_use]
    pub fn fallback(&self) -> &FallbackPool {
        &self.fallback
    }

    /// Whether the next fortune will try the remote generator
    #[must_use]
    pub fn remote_enabled(&self) -> bool {
        self.generator.is_some() && self.remote_usable.load(Ordering::Relaxed)
    }

    /// Produce a fortune; never fails and never returns empty text
    pub async fn get_fortune(&self, request: &FortuneRequest) -> FortuneResult {
        let Some(generator) = self.generator.as_ref().filter(|_| self.remote_enabled()) else {
            return self.draw_fallback();
        };

        let start = Instant::now();
        match self.attempt(generator.as_ref(), request).await {
            Ok(text) => {
                tracing::info!(
                    generator = generator.name(),
                    topic = %request.topic(),
                    duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "Remote fortune generated"
                );
                FortuneResult {
                    text,
                    source: FortuneSource::Remote,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, topic = %request.topic(), "Using fallback fortune");
                self.draw_fallback()
            }
        }
    }

    async fn attempt(
        &self,
        generator: &dyn TextGenerator,
        request: &FortuneRequest,
    ) -> Result<String, ContentError> {
        let completion = self.build_request(request);
        let text = generator.complete(&completion).await.map_err(|e| {
            if e.is_auth_rejection() {
                self.remote_usable.store(false, Ordering::Relaxed);
                tracing::warn!("Credential rejected, remote generation disabled for this session");
            }
            e
        })?;
        if text.trim().is_empty() {
            return Err(GenerationError::Empty.into());
        }

        if self.config.gesture_aware {
            markup::validate(&text, &GestureLibrary::vocabulary())?;
        }
        Ok(text)
    }

    fn draw_fallback(&self) -> FortuneResult {
        let text = self.fallback.draw(&mut *self.rng.lock()).to_string();
        FortuneResult {
            text,
            source: FortuneSource::Fallback,
        }
    }

    /// Build the chat request for a fortune
    #[must_use]
    pub fn build_request(&self, request: &FortuneRequest) -> CompletionRequest {
        CompletionRequest::new(&self.config.model)
            .with_system(self.system_prompt())
            .with_user(user_prompt(&request.prompt_subject(), &self.config.persona))
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature)
    }

    fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "You are a mystical fortune teller robot named {}. Provide mysterious, \
             positive, and somewhat vague fortunes that give hope and guidance.",
            self.config.persona
        );
        if self.config.gesture_aware {
            prompt.push_str(&gesture_instructions());
        }
        prompt
    }
}

fn user_prompt(subject: &str, persona: &str) -> String {
    format!(
        "Generate a mystical fortune for someone asking about their {subject}.\n\n\
         The fortune should:\n\
         - Be 2-3 sentences long\n\
         - Have a mystical, fortune-teller style\n\
         - Be positive and inspiring\n\
         - Include some vague but hopeful prediction\n\
         - Not be too specific\n\
         - Relate to their {subject} question\n\n\
         The fortune should sound like it's coming from a fortune teller robot named {persona}."
    )
}

fn gesture_instructions() -> String {
    let vocabulary = GestureLibrary::vocabulary();
    let example = vocabulary.first().copied().unwrap_or_default();
    format!(
        "\n\nYou can move while you speak. To play an animation during a phrase, \
         write ^start(ANIMATION) before the phrase and ^wait(ANIMATION) after it, \
         for example: ^start({example}) I see a bright path ^wait({example}). \
         Every ^start must be closed by a ^wait with the same animation before any \
         other tag. Use at most two animations. The only animations that exist are:\n{}",
        vocabulary
            .iter()
            .map(|name| format!("- {name}"))
            .collect::<Vec<_>>()
            .join("\n")
    )
}
