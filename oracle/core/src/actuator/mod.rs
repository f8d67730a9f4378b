//! Actuator Backends
//!
//! One session script drives three very different robots through the
//! [`ActuatorBackend`] trait:
//!
//! - [`TerminalBackend`]: prints everything, reads touch from the console
//! - [`SimulatedBackend`]: drives a physics simulation handle
//! - [`HardwareBackend`]: talks to the robot's control service
//!
//! # Contract
//!
//! Every call is awaited to completion before the next one starts. Gesture
//! holds are real waits (`tokio::time::sleep`), which makes every hold a
//! cancellation point for the session.
//!
//! Nothing here returns an error once a backend is constructed. Runtime
//! failures are logged and become no-ops, `None` images, or
//! [`TouchEvent::None`]. Only construction may fail, with
//! [`ActuatorError::BackendUnavailable`](crate::error::ActuatorError).
//!
//! # Capabilities
//!
//! What a backend can really do is declared up front in [`Capabilities`]
//! rather than discovered by calling methods and seeing what happens.

mod hardware;
mod simulated;
mod terminal;

#[cfg(feature = "hardware")]
pub mod bridge;
pub mod sdk;
pub mod sim;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use hardware::{HardwareBackend, RobotEndpoint};
pub use simulated::SimulatedBackend;
pub use terminal::TerminalBackend;

use crate::gesture::{Gesture, GestureLibrary};

/// Contact location reported by a backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TouchEvent {
    /// Head sensor
    Head,
    /// Right hand sensor
    RightHand,
    /// Left hand sensor
    LeftHand,
    /// Nothing touched
    #[default]
    None,
}

impl TouchEvent {
    /// Every touch value, in menu order
    pub const ALL: [TouchEvent; 4] = [
        TouchEvent::Head,
        TouchEvent::RightHand,
        TouchEvent::LeftHand,
        TouchEvent::None,
    ];

    /// Wire and menu name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::RightHand => "right_hand",
            Self::LeftHand => "left_hand",
            Self::None => "none",
        }
    }

    /// Spoken name of the touched zone
    #[must_use]
    pub fn zone(&self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::RightHand => "right hand",
            Self::LeftHand => "left hand",
            Self::None => "nothing",
        }
    }

    /// Whether something was touched
    #[must_use]
    pub fn is_touch(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for TouchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TouchEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown touch zone '{}'", s.trim()))
    }
}

/// A single camera frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CameraImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Channels per pixel (3 = RGB)
    pub channels: u8,
    /// Row-major pixel bytes
    pub data: Vec<u8>,
}

impl CameraImage {
    /// Build an image, rejecting buffers whose length does not match the shape
    #[must_use]
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize * channels as usize;
        if expected == 0 || data.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// (height, width, channels), matching the usual array layout
    #[must_use]
    pub fn shape(&self) -> (u32, u32, u8) {
        (self.height, self.width, self.channels)
    }
}

/// What a backend can actually do
///
/// A `false` flag means the matching call is a no-op (or returns the
/// absence value), not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Audible speech (false = printed only)
    pub speech: bool,
    /// Head joints can move
    pub head: bool,
    /// Gestures move real or simulated joints
    pub gestures: bool,
    /// Camera frames can be captured
    pub camera: bool,
    /// Touch can be sensed or prompted
    pub touch: bool,
    /// Gesture tags in text are played rather than stripped
    pub markup_playback: bool,
}

/// Uniform robot contract
#[async_trait]
pub trait ActuatorBackend: Send {
    /// Backend name for logs (e.g. "terminal", "simulated")
    fn name(&self) -> &'static str;

    /// Declared capabilities
    fn capabilities(&self) -> Capabilities;

    /// Say something
    ///
    /// Gesture tags are either played or stripped; they are never read out.
    async fn speak(&mut self, text: &str);

    /// Turn the head to (yaw, pitch) radians, clamped to joint limits
    async fn move_head(&mut self, yaw: f32, pitch: f32);

    /// Perform a named gesture and wait for it to finish
    ///
    /// Unknown names are logged and ignored.
    async fn perform_gesture(&mut self, name: &str);

    /// Capture one camera frame, or `None` if there is no usable camera
    async fn capture_image(&mut self) -> Option<CameraImage>;

    /// Read the touch sensors
    async fn poll_touch(&mut self) -> TouchEvent;

    /// Release exclusively owned resources; safe to call more than once
    async fn shutdown(&mut self);
}

/// Resolve a gesture name, logging unknown names
pub(crate) fn resolve_gesture(backend: &str, name: &str) -> Option<Gesture> {
    let gesture = GestureLibrary::lookup(name).map(|(g, _)| g);
    if gesture.is_none() {
        tracing::warn!(backend = backend, gesture = %name, "Unknown gesture, skipping");
    }
    gesture
}

/// Wait out a step's hold
pub(crate) async fn hold(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

/// Head-bob pattern used while speaking: (yaw, dwell) per beat
pub(crate) fn speech_bob(text: &str) -> Vec<(f32, Duration)> {
    let beats = (text.chars().count() / 10 + 1).min(4);
    (0..beats)
        .map(|i| {
            let yaw = if i % 2 == 0 { 0.1 } else { -0.1 };
            (yaw, Duration::from_millis(300))
        })
        .collect()
}
