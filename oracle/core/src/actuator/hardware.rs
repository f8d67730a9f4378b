//! Hardware Backend
//!
//! Controls the physical robot through its control service. Speech and
//! motion are required; the animation player, animated speech, camera, and
//! touch services are each optional and obtained independently, so a robot
//! with a broken camera can still tell fortunes.
//!
//! # Gestures
//!
//! A gesture first tries the pre-authored animation asset. If the player is
//! missing or the call fails for any reason, the manual joint sequence from
//! the [`GestureLibrary`](crate::gesture::GestureLibrary) runs instead. There
//! is no retry of the canned animation: the joint sequence is always
//! available and the user is waiting.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::sdk::{
    AnimatedSpeechProxy, AnimationProxy, ControlSdk, MotionProxy, SdkResult, SensorState,
    SpeechProxy, TouchProxy, VideoProxy,
};
use super::{hold, resolve_gesture, ActuatorBackend, Capabilities, CameraImage, TouchEvent};
use crate::error::{ActuatorError, Capability};
use crate::gesture::{Gesture, GestureLibrary, Joint};
use crate::markup;

/// Speed used for direct head moves
const HEAD_SPEED: f32 = 0.2;

/// Camera subscription parameters: top camera, VGA, RGB, 10 fps
const CAMERA_CLIENT: &str = "fortune_teller";
const CAMERA_TOP: u8 = 0;
const RESOLUTION_VGA: u8 = 2;
const COLOR_SPACE_RGB: u8 = 11;
const CAMERA_FPS: u8 = 10;

/// Network address of the robot's control service
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotEndpoint {
    /// Robot host name or IP
    pub host: String,
    /// Control service port
    pub port: u16,
}

impl Default for RobotEndpoint {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9559,
        }
    }
}

impl RobotEndpoint {
    /// Create an endpoint
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for RobotEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Physical robot
pub struct HardwareBackend {
    speech: Arc<dyn SpeechProxy>,
    motion: Arc<dyn MotionProxy>,
    animation: Option<Arc<dyn AnimationProxy>>,
    animated_speech: Option<Arc<dyn AnimatedSpeechProxy>>,
    video: Option<Arc<dyn VideoProxy>>,
    touch: Option<Arc<dyn TouchProxy>>,
    resting: bool,
}

/// Keep an optional proxy, logging why it is missing
fn optional<T>(capability: Capability, result: SdkResult<T>) -> Option<T> {
    match result {
        Ok(proxy) => Some(proxy),
        Err(e) => {
            let err = ActuatorError::CapabilityUnavailable {
                capability,
                reason: format!("{e:#}"),
            };
            tracing::warn!(error = %err, "Continuing without capability");
            None
        }
    }
}

/// Map sensor readings to a touch zone; head wins over hands
fn touch_from_sensors(sensors: &[SensorState]) -> TouchEvent {
    let pressed = |prefix: &str| {
        sensors
            .iter()
            .any(|s| s.active && s.name.starts_with(prefix))
    };

    if pressed("Head") {
        TouchEvent::Head
    } else if pressed("RHand") {
        TouchEvent::RightHand
    } else if pressed("LHand") {
        TouchEvent::LeftHand
    } else {
        TouchEvent::None
    }
}

impl HardwareBackend {
    /// Connect to the robot's control service
    ///
    /// # Errors
    ///
    /// Returns [`ActuatorError::BackendUnavailable`] when SDK support is not
    /// compiled in, the endpoint is unreachable, or a required service is
    /// missing.
    #[cfg(feature = "hardware")]
    pub async fn connect(endpoint: &RobotEndpoint) -> Result<Self, ActuatorError> {
        let sdk = super::bridge::BridgeSdk::connect(endpoint).await?;
        Self::from_sdk(&sdk).await
    }

    /// Connect to the robot's control service
    ///
    /// # Errors
    ///
    /// Always fails: this build has no robot control SDK support.
    #[cfg(not(feature = "hardware"))]
    pub async fn connect(endpoint: &RobotEndpoint) -> Result<Self, ActuatorError> {
        Err(ActuatorError::BackendUnavailable(format!(
            "robot control SDK support not compiled in, cannot reach {endpoint} \
             (rebuild with the `hardware` feature)"
        )))
    }

    /// Build from an SDK, obtaining every proxy independently
    ///
    /// # Errors
    ///
    /// Returns [`ActuatorError::BackendUnavailable`] if speech or motion is
    /// missing, or if the robot cannot be woken up.
    pub async fn from_sdk(sdk: &dyn ControlSdk) -> Result<Self, ActuatorError> {
        let speech = sdk
            .speech()
            .await
            .map_err(|e| ActuatorError::BackendUnavailable(format!("text-to-speech: {e:#}")))?;
        let motion = sdk
            .motion()
            .await
            .map_err(|e| ActuatorError::BackendUnavailable(format!("motion: {e:#}")))?;

        let animation = optional(Capability::AnimationPlayer, sdk.animation_player().await);
        let animated_speech = optional(Capability::AnimatedSpeech, sdk.animated_speech().await);
        let video = optional(Capability::Camera, sdk.video().await);
        let touch = optional(Capability::Touch, sdk.touch().await);

        motion
            .wake_up()
            .await
            .map_err(|e| ActuatorError::BackendUnavailable(format!("wake up failed: {e:#}")))?;

        let backend = Self {
            speech,
            motion,
            animation,
            animated_speech,
            video,
            touch,
            resting: false,
        };
        tracing::info!(capabilities = ?backend.capabilities(), "Robot connected");
        Ok(backend)
    }

    async fn set_angle(&self, joint: Joint, angle: f32, speed: f32) {
        if let Err(e) = self
            .motion
            .set_angles(joint.sdk_name(), joint.clamp(angle), speed)
            .await
        {
            let err = ActuatorError::failure(format!("setAngles {joint}"), format!("{e:#}"));
            tracing::warn!(error = %err, "Joint command failed");
        }
    }

    async fn run_sequence(&self, gesture: Gesture) {
        for step in GestureLibrary::sequence(gesture) {
            self.set_angle(step.joint, step.angle, step.speed).await;
            hold(step.hold).await;
        }
    }

    async fn read_frame(&self, video: &dyn VideoProxy) -> Option<CameraImage> {
        let client = match video
            .subscribe(CAMERA_CLIENT, CAMERA_TOP, RESOLUTION_VGA, COLOR_SPACE_RGB, CAMERA_FPS)
            .await
        {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "Camera subscribe failed");
                return None;
            }
        };

        let frame = video.frame(&client).await;

        // Unsubscribe whatever the read did.
        if let Err(e) = video.unsubscribe(&client).await {
            tracing::warn!(client = %client, error = %format!("{e:#}"), "Camera unsubscribe failed");
        }

        match frame {
            Ok(Some(raw)) => {
                let image = CameraImage::new(raw.width, raw.height, raw.channels, raw.data);
                if image.is_none() {
                    tracing::warn!(
                        width = raw.width,
                        height = raw.height,
                        "Camera frame does not match its declared shape"
                    );
                }
                image
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "Camera read failed");
                None
            }
        }
    }
}

#[async_trait]
impl ActuatorBackend for HardwareBackend {
    fn name(&self) -> &'static str {
        "hardware"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            speech: true,
            head: true,
            gestures: true,
            camera: self.video.is_some(),
            touch: self.touch.is_some(),
            markup_playback: self.animated_speech.is_some(),
        }
    }

    async fn speak(&mut self, text: &str) {
        if let Some(animated) = &self.animated_speech {
            if markup::has_markup(text) {
                match markup::validate(text, &GestureLibrary::vocabulary()) {
                    Ok(_) => match animated.say(text).await {
                        Ok(()) => return,
                        Err(e) => tracing::warn!(
                            error = %format!("{e:#}"),
                            "Animated speech failed, using plain speech"
                        ),
                    },
                    Err(e) => tracing::warn!(error = %e, "Invalid gesture tags, stripping"),
                }
            }
        }

        let plain = markup::strip(text);
        if let Err(e) = self.speech.say(&plain).await {
            let err = ActuatorError::failure("say", format!("{e:#}"));
            tracing::warn!(error = %err, "Speech failed");
        }
    }

    async fn move_head(&mut self, yaw: f32, pitch: f32) {
        self.set_angle(Joint::HeadYaw, yaw, HEAD_SPEED).await;
        self.set_angle(Joint::HeadPitch, pitch, HEAD_SPEED).await;
    }

    async fn perform_gesture(&mut self, name: &str) {
        let Some(gesture) = resolve_gesture(self.name(), name) else {
            return;
        };

        if let Some(player) = &self.animation {
            match player.run(gesture.asset()).await {
                Ok(()) => return,
                Err(e) => tracing::warn!(
                    gesture = %gesture,
                    asset = gesture.asset(),
                    error = %format!("{e:#}"),
                    "Canned animation failed, running joint sequence"
                ),
            }
        }

        self.run_sequence(gesture).await;
    }

    async fn capture_image(&mut self) -> Option<CameraImage> {
        let video = Arc::clone(self.video.as_ref()?);
        self.read_frame(video.as_ref()).await
    }

    async fn poll_touch(&mut self) -> TouchEvent {
        let Some(touch) = &self.touch else {
            return TouchEvent::None;
        };
        match touch.status().await {
            Ok(sensors) => touch_from_sensors(&sensors),
            Err(e) => {
                tracing::debug!(error = %format!("{e:#}"), "Touch read failed");
                TouchEvent::None
            }
        }
    }

    async fn shutdown(&mut self) {
        if self.resting {
            return;
        }
        self.resting = true;
        if let Err(e) = self.motion.rest().await {
            tracing::warn!(error = %format!("{e:#}"), "Failed to put robot to rest");
        } else {
            tracing::info!("Robot resting");
        }
    }
}

impl Drop for HardwareBackend {
    fn drop(&mut self) {
        if self.resting {
            return;
        }
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            tracing::warn!("Hardware backend dropped without shutdown, resting robot");
            let motion = Arc::clone(&self.motion);
            runtime.spawn(async move {
                if let Err(e) = motion.rest().await {
                    tracing::warn!(error = %format!("{e:#}"), "Failed to put robot to rest");
                }
            });
        }
    }
}
