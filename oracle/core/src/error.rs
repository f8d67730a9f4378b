//! Error Types
//!
//! Failure taxonomy for the robot and content layers.
//!
//! Only [`ActuatorError::BackendUnavailable`] is allowed to stop a session
//! from starting. Every other kind is absorbed where it is detected and turned
//! into degraded behavior: a skipped gesture, a missing image, `none` for
//! touch, or a fortune from the fallback pool.

use std::fmt;

use thiserror::Error;

use crate::content::GenerationError;
use crate::markup::MarkupError;

/// Optional robot capabilities that can fail independently
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Canned animation playback
    AnimationPlayer,
    /// Speech with embedded gesture tags
    AnimatedSpeech,
    /// Camera frames
    Camera,
    /// Touch sensors
    Touch,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AnimationPlayer => write!(f, "animation player"),
            Self::AnimatedSpeech => write!(f, "animated speech"),
            Self::Camera => write!(f, "camera"),
            Self::Touch => write!(f, "touch"),
        }
    }
}

/// Errors raised by actuator backends
#[derive(Debug, Error)]
pub enum ActuatorError {
    /// A required backend dependency could not be loaded or connected
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// An optional sub-capability failed to initialize
    #[error("{capability} unavailable: {reason}")]
    CapabilityUnavailable {
        /// Which capability
        capability: Capability,
        /// Why it could not be obtained
        reason: String,
    },

    /// A single actuation call failed at runtime
    #[error("Actuator failure during {action}: {reason}")]
    ActuatorFailure {
        /// What was being attempted (e.g. "say", "setAngles HeadYaw")
        action: String,
        /// Underlying failure
        reason: String,
    },

    /// The requested gesture has no library entry
    #[error("Unknown gesture: {0}")]
    UnknownGesture(String),
}

impl ActuatorError {
    /// Build an [`ActuatorError::ActuatorFailure`] from any displayable error
    pub fn failure(action: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::ActuatorFailure {
            action: action.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised while producing fortune text
///
/// Both kinds are recovered by drawing from the fallback pool.
#[derive(Debug, Error)]
pub enum ContentError {
    /// Network error, timeout, or non-success response
    #[error("Remote service failure: {0}")]
    RemoteServiceFailure(#[from] GenerationError),

    /// Generated text failed gesture-tag validation
    #[error("Malformed generated content: {0}")]
    MalformedGeneratedContent(#[from] MarkupError),
}
