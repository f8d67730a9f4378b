//! Oracle Core - Fortune Telling Robot Logic
//!
//! This crate holds everything the fortune teller does, independent of how
//! it is launched. The same session script drives a text console, a
//! simulated humanoid, or a physical robot.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     SessionController                         │
//! │   Greet → AskTopic → AskDetail → Consult → Touch → Deliver    │
//! │            ▲                                        │         │
//! │            └──────────── ContinueDecision ◄─────────┘         │
//! │                                │                              │
//! │                             Farewell                          │
//! └───────┬──────────────────────┬───────────────────────┬────────┘
//!         │                      │                       │
//!   Interlocutor          ContentProvider         ActuatorBackend
//!   (console)          ┌─────────┴────────┐    ┌─────────┼─────────┐
//!                      │                  │    │         │         │
//!                TextGenerator    FallbackPool Terminal Simulated Hardware
//!                 (OpenAI API)     (weighted)           (KinematicWorld) (ControlSdk)
//! ```
//!
//! # Key Types
//!
//! - [`SessionController`]: Runs one visitor's dialogue
//! - [`ActuatorBackend`]: Uniform robot contract with declared [`Capabilities`]
//! - [`GestureLibrary`]: Named gestures as timed joint sequences
//! - [`ContentProvider`]: Fortune text with remote generation and fallback
//! - [`FortuneConfig`]: Resolved configuration (file, env, CLI)
//!
//! # Module Overview
//!
//! - [`actuator`]: Backends, simulation handle, and hardware SDK seams
//! - [`config`]: TOML configuration with env and CLI overrides
//! - [`console`]: Shared line-oriented console and the console interlocutor
//! - [`content`]: Fortune generation and the fallback pool
//! - [`error`]: Actuator and content error kinds
//! - [`gesture`]: Joints, gesture steps, and the gesture library
//! - [`markup`]: Gesture-tag grammar validation and stripping
//! - [`session`]: The session state machine

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod actuator;
pub mod config;
pub mod console;
pub mod content;
pub mod error;
pub mod gesture;
pub mod markup;
pub mod session;

// Re-exports for convenience
pub use actuator::sim::{KinematicWorld, Simulation};
pub use actuator::{
    ActuatorBackend, CameraImage, Capabilities, HardwareBackend, RobotEndpoint, SimulatedBackend,
    TerminalBackend, TouchEvent,
};
pub use config::{
    default_config_path, load_config, load_config_from_path, BackendKind, ConfigError,
    ConfigOverrides, ConfigSource, FortuneConfig,
};
pub use console::{Console, ConsoleInterlocutor};
pub use content::{
    ContentConfig, ContentProvider, FallbackPool, FortuneRequest, FortuneResult, FortuneSource,
    TextGenerator,
};
pub use error::{ActuatorError, Capability, ContentError};
pub use gesture::{Gesture, GestureLibrary, GestureStep, Joint};
pub use session::{
    ExitReason, Interlocutor, Phase, SessionConfig, SessionController, SessionOutcome,
    SessionState,
};
