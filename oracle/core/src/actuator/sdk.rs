//! Robot Control SDK Seams
//!
//! The hardware backend never talks to the network directly. It asks a
//! [`ControlSdk`] for one proxy per robot service and keeps each proxy it
//! gets. Required services (speech, motion) fail construction; optional ones
//! are simply absent.
//!
//! [`BridgeSdk`](super::bridge::BridgeSdk) implements these traits over HTTP.

use std::sync::Arc;

use async_trait::async_trait;

/// Error type shared by every proxy call
pub type SdkResult<T> = anyhow::Result<T>;

/// Plain text-to-speech
#[async_trait]
pub trait SpeechProxy: Send + Sync {
    /// Say text and wait until speech ends
    async fn say(&self, text: &str) -> SdkResult<()>;
}

/// Speech with embedded `^start`/`^wait` gesture tags
#[async_trait]
pub trait AnimatedSpeechProxy: Send + Sync {
    /// Say tagged text, playing tagged animations in sync
    async fn say(&self, text: &str) -> SdkResult<()>;
}

/// Joint-level motion control
#[async_trait]
pub trait MotionProxy: Send + Sync {
    /// Stiffen joints and stand up
    async fn wake_up(&self) -> SdkResult<()>;

    /// Go to a safe resting posture and release stiffness
    async fn rest(&self) -> SdkResult<()>;

    /// Command one joint by SDK name
    async fn set_angles(&self, joint: &str, angle: f32, speed: f32) -> SdkResult<()>;
}

/// Canned animation playback
#[async_trait]
pub trait AnimationProxy: Send + Sync {
    /// Play an animation asset and wait for it to finish
    async fn run(&self, asset: &str) -> SdkResult<()>;
}

/// Raw camera frame as delivered by the video service
#[derive(Clone, Debug)]
pub struct RawFrame {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Channels per pixel
    pub channels: u8,
    /// Pixel bytes
    pub data: Vec<u8>,
}

/// Camera access via subscribe / read / unsubscribe
#[async_trait]
pub trait VideoProxy: Send + Sync {
    /// Subscribe a named client to a camera; returns the client handle
    async fn subscribe(
        &self,
        name: &str,
        camera: u8,
        resolution: u8,
        color_space: u8,
        fps: u8,
    ) -> SdkResult<String>;

    /// Read one frame for a subscribed client (`None` when no frame is ready)
    async fn frame(&self, client: &str) -> SdkResult<Option<RawFrame>>;

    /// Release a client handle
    async fn unsubscribe(&self, client: &str) -> SdkResult<()>;
}

/// One touch sensor reading
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SensorState {
    /// Sensor name (e.g. "Head/Touch/Front", "RHand/Touch/Back")
    pub name: String,
    /// Whether the sensor is currently pressed
    pub active: bool,
}

/// Touch sensor status
#[async_trait]
pub trait TouchProxy: Send + Sync {
    /// Current status of every touch sensor
    async fn status(&self) -> SdkResult<Vec<SensorState>>;
}

/// Factory for robot service proxies
///
/// Each method is independent: failing to obtain one proxy says nothing
/// about the others.
#[async_trait]
pub trait ControlSdk: Send + Sync {
    /// Text-to-speech service
    async fn speech(&self) -> SdkResult<Arc<dyn SpeechProxy>>;

    /// Motion service
    async fn motion(&self) -> SdkResult<Arc<dyn MotionProxy>>;

    /// Animation player service
    async fn animation_player(&self) -> SdkResult<Arc<dyn AnimationProxy>>;

    /// Animated speech service
    async fn animated_speech(&self) -> SdkResult<Arc<dyn AnimatedSpeechProxy>>;

    /// Video device service
    async fn video(&self) -> SdkResult<Arc<dyn VideoProxy>>;

    /// Touch service
    async fn touch(&self) -> SdkResult<Arc<dyn TouchProxy>>;
}
