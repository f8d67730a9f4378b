//! Fortune Telling Session
//!
//! Drives one visitor through greeting, a few consultations, and farewell.
//!
//! # Design Philosophy
//!
//! The session is a small state machine over [`Phase`]. Each phase is a
//! straight sequence of awaited robot actions, so the order the visitor sees
//! is exactly the order written here: the thinking gesture always finishes
//! before the mystic one starts, and a fortune is spoken only after it has
//! been produced.
//!
//! [`SessionController::run`] races the dialogue against a cancellation
//! future. Whichever way the dialogue ends (completed, declined, cancelled,
//! or failed), the backend is shut down exactly once before `run` returns.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Timelike;
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::actuator::ActuatorBackend;
use crate::content::{ContentProvider, FortuneRequest};
use crate::gesture::Gesture;

const THINK_PROMPT: &str = "Please think of a question you seek an answer to, then press Enter.";
const TOPIC_PROMPT: &str =
    "Tell me, what realm does your question concern? Love? Career? Health? Wealth? Or something else?";
const DETAIL_PROMPT: &str =
    "Would you like to share more details about your question? This may help me see more clearly.";
const DETAIL_ACK: &str = "I see. This adds clarity to my vision.";
const CONSULT_LINE: &str = "I am now consulting with the mystic forces of the universe...";
const TOUCH_INVITATION: &str =
    "You may touch my sensors to enhance our connection with the cosmic energies...";
const CONTINUE_PROMPT: &str =
    "Would you like me to consult the mystic forces for another question? (yes/no)";
const CONTINUE_ACK: &str = "Very well! Let me prepare to channel the cosmic energies once more.";
const FAREWELL: &str = "I hope these glimpses into your future serve you well. Remember, you \
                        shape your destiny with every choice you make. Until our paths cross \
                        again, farewell!";

/// Source of the visitor's answers
///
/// Errors end the session with [`ExitReason::Failed`].
#[async_trait]
pub trait Interlocutor: Send {
    /// Wait until the visitor has a question in mind
    async fn ready(&mut self) -> anyhow::Result<()>;

    /// Topic of the question (may be empty)
    async fn topic(&mut self) -> anyhow::Result<String>;

    /// Optional extra detail
    async fn detail(&mut self) -> anyhow::Result<Option<String>>;

    /// Whether the visitor wants another fortune
    async fn wants_another(&mut self) -> anyhow::Result<bool>;
}

/// Session settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Fortunes per session
    pub max_turns: u32,
    /// Ask for detail after the topic
    pub ask_detail: bool,
    /// Dramatic pause between actions, in milliseconds
    pub pause_ms: u64,
    /// Name the robot introduces itself with
    #[serde(skip)]
    pub robot_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: 3,
            ask_detail: true,
            pause_ms: 1000,
            robot_name: "Pepper".to_string(),
        }
    }
}

impl SessionConfig {
    fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

/// Where the dialogue is
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Introduction
    Greet,
    /// Asking what the question concerns
    AskTopic,
    /// Asking for optional detail
    AskDetail,
    /// Gestures and camera glance
    Consult,
    /// Inviting touch
    Touch,
    /// Producing and speaking the fortune
    Deliver,
    /// Asking whether to go again
    ContinueDecision,
    /// Closing line and shutdown
    Farewell,
}

/// Progress through one session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionState {
    /// Fortunes delivered so far
    pub turn: u32,
    /// Fortune limit
    pub max_turns: u32,
    /// Current phase
    pub phase: Phase,
}

impl SessionState {
    /// Fresh state; at least one turn is always allowed
    #[must_use]
    pub fn new(max_turns: u32) -> Self {
        Self {
            turn: 0,
            max_turns: max_turns.max(1),
            phase: Phase::Greet,
        }
    }

    /// Whether another fortune is allowed
    #[must_use]
    pub fn can_continue(&self) -> bool {
        self.turn < self.max_turns
    }
}

/// Why a session ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExitReason {
    /// Every allowed fortune was delivered
    Completed,
    /// The visitor declined another fortune
    Declined,
    /// The cancellation future fired
    Cancelled,
    /// The interlocutor failed
    Failed(String),
}

/// Result of [`SessionController::run`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionOutcome {
    /// Session id used in logs
    pub id: Uuid,
    /// Fortunes delivered
    pub turns: u32,
    /// Why the session ended
    pub exit: ExitReason,
}

/// Time-of-day greeting for a local hour (0-23)
#[must_use]
pub fn greeting(hour: u32, robot_name: &str) -> String {
    let salutation = match hour {
        5..=11 => "Good morning",
        12..=17 => "Good afternoon",
        _ => "Good evening",
    };
    format!("{salutation}, seeker of wisdom! I am {robot_name}, the mystical fortune teller.")
}

/// Sequences one visitor's session
pub struct SessionController {
    backend: Box<dyn ActuatorBackend>,
    content: ContentProvider,
    interlocutor: Box<dyn Interlocutor>,
    config: SessionConfig,
    state: SessionState,
}

impl SessionController {
    /// Create a controller owning the backend it drives
    #[must_use]
    pub fn new(
        backend: Box<dyn ActuatorBackend>,
        content: ContentProvider,
        interlocutor: Box<dyn Interlocutor>,
        config: SessionConfig,
    ) -> Self {
        let state = SessionState::new(config.max_turns);
        Self {
            backend,
            content,
            interlocutor,
            config,
            state,
        }
    }

    /// Run the session until it ends or `cancel` completes
    ///
    /// The backend is shut down before this returns, on every path.
    pub async fn run<F>(&mut self, cancel: F) -> SessionOutcome
    where
        F: Future<Output = ()> + Send,
    {
        let id = Uuid::new_v4();
        let span = tracing::info_span!("session", id = %id, backend = self.backend.name());

        async {
            tracing::info!(capabilities = ?self.backend.capabilities(), "Session started");

            let exit = tokio::select! {
                result = self.dialogue() => match result {
                    Ok(exit) => exit,
                    Err(e) => {
                        tracing::error!(error = %format!("{e:#}"), phase = ?self.state.phase, "Session failed");
                        ExitReason::Failed(format!("{e:#}"))
                    }
                },
                () = cancel => {
                    tracing::info!(phase = ?self.state.phase, "Session cancelled");
                    ExitReason::Cancelled
                }
            };

            self.state.phase = Phase::Farewell;
            if exit != ExitReason::Cancelled {
                self.backend.speak(FAREWELL).await;
            }
            self.backend.shutdown().await;

            tracing::info!(turns = self.state.turn, exit = ?exit, "Session ended");
            SessionOutcome {
                id,
                turns: self.state.turn,
                exit,
            }
        }
        .instrument(span)
        .await
    }

    async fn dialogue(&mut self) -> anyhow::Result<ExitReason> {
        self.greet().await;

        loop {
            let request = self.collect_request().await?;
            self.consult().await;
            self.invite_touch().await;
            self.deliver(&request).await;

            self.state.phase = Phase::ContinueDecision;
            if !self.state.can_continue() {
                return Ok(ExitReason::Completed);
            }
            self.backend.speak(CONTINUE_PROMPT).await;
            if !self.interlocutor.wants_another().await? {
                return Ok(ExitReason::Declined);
            }
            self.backend.speak(CONTINUE_ACK).await;
            self.backend.perform_gesture(Gesture::Wave.name()).await;
        }
    }

    async fn greet(&mut self) {
        self.state.phase = Phase::Greet;
        let hour = chrono::Local::now().hour();
        self.backend.move_head(0.0, 0.0).await;
        self.backend
            .speak(&greeting(hour, &self.config.robot_name))
            .await;
        self.pause().await;
    }

    async fn collect_request(&mut self) -> anyhow::Result<FortuneRequest> {
        self.state.phase = Phase::AskTopic;
        self.backend.speak(THINK_PROMPT).await;
        self.interlocutor.ready().await?;
        self.backend.speak(TOPIC_PROMPT).await;
        let request = FortuneRequest::new(self.interlocutor.topic().await?);
        self.backend
            .speak(&format!(
                "Ah, a question about {}. The mystic forces are already whispering to me.",
                request.topic()
            ))
            .await;

        if !self.config.ask_detail {
            return Ok(request);
        }

        self.state.phase = Phase::AskDetail;
        self.backend.speak(DETAIL_PROMPT).await;
        let request = match self.interlocutor.detail().await? {
            Some(detail) if !detail.trim().is_empty() => {
                self.backend.speak(DETAIL_ACK).await;
                request.with_detail(detail)
            }
            _ => request,
        };
        tracing::debug!(subject = %request.prompt_subject(), "Question collected");
        Ok(request)
    }

    async fn consult(&mut self) {
        self.state.phase = Phase::Consult;
        self.backend.perform_gesture(Gesture::Think.name()).await;
        self.pause().await;

        if let Some(image) = self.backend.capture_image().await {
            let (height, width, channels) = image.shape();
            tracing::info!(width, height, channels, "Captured an image of the seeker");
        }

        self.backend.speak(CONSULT_LINE).await;
        self.backend.perform_gesture(Gesture::Mystic.name()).await;
        self.pause().await;
    }

    async fn invite_touch(&mut self) {
        self.state.phase = Phase::Touch;
        self.backend.speak(TOUCH_INVITATION).await;
        let touch = self.backend.poll_touch().await;
        tracing::debug!(touch = %touch, "Touch polled");
        if touch.is_touch() {
            self.backend
                .speak(&format!(
                    "I feel your energy flowing through my {}. The cosmic connection strengthens!",
                    touch.zone()
                ))
                .await;
        }
    }

    async fn deliver(&mut self, request: &FortuneRequest) {
        self.state.phase = Phase::Deliver;
        let fortune = self.content.get_fortune(request).await;
        tracing::info!(source = ?fortune.source, turn = self.state.turn + 1, "Delivering fortune");
        self.backend.speak(&fortune.text).await;
        self.backend.perform_gesture(Gesture::Explain.name()).await;
        self.pause().await;
        self.state.turn += 1;
    }

    async fn pause(&self) {
        let pause = self.config.pause();
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }
}
