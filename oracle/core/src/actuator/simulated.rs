//! Simulated Backend
//!
//! Drives a humanoid spawned inside a [`Simulation`]. Speech is printed with
//! a synchronized head bob, gestures run the library sequence joint by joint,
//! and the camera reads rendered frames.
//!
//! There is no touch sensor in simulation; [`SimulatedBackend::poll_touch`]
//! returns a uniformly random [`TouchEvent`] so the rest of the session can be
//! exercised without hardware.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::sim::{BodyId, SimCamera, Simulation};
use super::{
    hold, resolve_gesture, speech_bob, ActuatorBackend, Capabilities, CameraImage, TouchEvent,
};
use crate::console::Console;
use crate::error::ActuatorError;
use crate::gesture::Joint;
use crate::markup;

/// Speed used for head moves and the speech bob
const HEAD_SPEED: f32 = 0.2;

/// Robot running inside a physics simulation
pub struct SimulatedBackend {
    /// Live simulation; `None` once shut down
    sim: Option<Box<dyn Simulation>>,
    body: BodyId,
    console: Console,
    robot_name: String,
    rng: StdRng,
}

impl SimulatedBackend {
    /// Spawn the humanoid in `sim` and stand it up
    ///
    /// # Errors
    ///
    /// Returns [`ActuatorError::BackendUnavailable`] if the humanoid cannot be
    /// spawned or posed.
    pub fn launch(
        mut sim: Box<dyn Simulation>,
        console: Console,
        robot_name: impl Into<String>,
    ) -> Result<Self, ActuatorError> {
        let body = sim
            .spawn_humanoid()
            .map_err(|e| ActuatorError::BackendUnavailable(format!("spawn failed: {e}")))?;
        if let Err(e) = sim.go_to_posture(body, "Stand", 0.6) {
            sim.stop();
            return Err(ActuatorError::BackendUnavailable(format!(
                "initial posture failed: {e}"
            )));
        }
        tracing::info!(body = body.0, "Simulated humanoid ready");

        Ok(Self {
            sim: Some(sim),
            body,
            console,
            robot_name: robot_name.into(),
            rng: StdRng::from_entropy(),
        })
    }

    /// Use a deterministic random source for simulated touch
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Current angle of a simulated joint, if the simulation is live
    #[must_use]
    pub fn joint_angle(&self, joint: Joint) -> Option<f32> {
        self.sim.as_ref()?.angle(self.body, joint).ok()
    }

    fn set_angle(&mut self, joint: Joint, angle: f32, speed: f32) {
        let Some(sim) = self.sim.as_mut() else {
            return;
        };
        if let Err(e) = sim.set_angle(self.body, joint, joint.clamp(angle), speed) {
            let err = ActuatorError::failure(format!("setAngles {joint}"), e);
            tracing::warn!(error = %err, "Simulated joint command failed");
        }
    }
}

#[async_trait]
impl ActuatorBackend for SimulatedBackend {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn capabilities(&self) -> Capabilities {
        let live = self.sim.is_some();
        Capabilities {
            speech: false,
            head: live,
            gestures: live,
            camera: live,
            touch: true,
            markup_playback: false,
        }
    }

    async fn speak(&mut self, text: &str) {
        let spoken = markup::strip(text);
        self.console
            .println(&format!("{} says: \"{spoken}\"", self.robot_name))
            .await;

        for (yaw, dwell) in speech_bob(&spoken) {
            self.set_angle(Joint::HeadYaw, yaw, HEAD_SPEED);
            hold(dwell).await;
        }
        self.set_angle(Joint::HeadYaw, 0.0, HEAD_SPEED);
    }

    async fn move_head(&mut self, yaw: f32, pitch: f32) {
        self.set_angle(Joint::HeadYaw, yaw, HEAD_SPEED);
        self.set_angle(Joint::HeadPitch, pitch, HEAD_SPEED);
    }

    async fn perform_gesture(&mut self, name: &str) {
        let Some(gesture) = resolve_gesture(self.name(), name) else {
            return;
        };
        self.console
            .println(&format!("Gesture: {} {}", self.robot_name, gesture.description()))
            .await;
        tracing::debug!(gesture = %gesture, "Running simulated gesture");

        for step in gesture.steps() {
            self.set_angle(step.joint, step.angle, step.speed);
            hold(step.hold).await;
        }
    }

    async fn capture_image(&mut self) -> Option<CameraImage> {
        let sim = self.sim.as_mut()?;
        match sim.camera_frame(self.body, SimCamera::Top) {
            Ok(image) => Some(image),
            Err(e) => {
                tracing::warn!(error = %e, "Simulated camera failed");
                None
            }
        }
    }

    async fn poll_touch(&mut self) -> TouchEvent {
        TouchEvent::ALL
            .choose(&mut self.rng)
            .copied()
            .unwrap_or_default()
    }

    async fn shutdown(&mut self) {
        if let Some(mut sim) = self.sim.take() {
            sim.stop();
            tracing::info!("Simulated backend shut down");
        }
    }
}

impl Drop for SimulatedBackend {
    fn drop(&mut self) {
        if let Some(mut sim) = self.sim.take() {
            tracing::warn!("Simulated backend dropped without shutdown, stopping simulation");
            sim.stop();
        }
    }
}
