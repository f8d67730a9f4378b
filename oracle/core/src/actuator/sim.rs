//! Physics Simulation Handle
//!
//! [`Simulation`] is the seam between [`SimulatedBackend`](super::SimulatedBackend)
//! and whatever simulator is running. [`KinematicWorld`] is the built-in
//! in-process implementation: joints snap to their clamped targets and the
//! camera renders a synthetic frame that depends on where the head points.

use std::collections::HashMap;

use thiserror::Error;

use super::CameraImage;
use crate::gesture::Joint;

/// Errors reported by a simulation
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The simulation is not running (never launched or already stopped)
    #[error("simulation is not running")]
    NotRunning,

    /// No robot body with this id exists
    #[error("unknown body {0}")]
    UnknownBody(u32),

    /// Posture name not known to the simulator
    #[error("unknown posture '{0}'")]
    UnknownPosture(String),

    /// Camera could not produce a frame
    #[error("camera error: {0}")]
    Camera(String),
}

/// Simulated robot body handle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyId(pub u32);

/// Cameras mounted on the humanoid
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimCamera {
    /// Forehead camera
    Top,
    /// Mouth camera
    Bottom,
}

/// A running physics simulation
pub trait Simulation: Send {
    /// Spawn the humanoid model on a ground plane
    ///
    /// # Errors
    ///
    /// Fails if the simulation is not running.
    fn spawn_humanoid(&mut self) -> Result<BodyId, SimulationError>;

    /// Move all joints to a named posture
    ///
    /// # Errors
    ///
    /// Fails for unknown bodies or postures.
    fn go_to_posture(&mut self, body: BodyId, posture: &str, speed: f32)
        -> Result<(), SimulationError>;

    /// Command one joint toward an angle
    ///
    /// # Errors
    ///
    /// Fails for unknown bodies or a stopped simulation.
    fn set_angle(
        &mut self,
        body: BodyId,
        joint: Joint,
        angle: f32,
        speed: f32,
    ) -> Result<(), SimulationError>;

    /// Current angle of a joint
    ///
    /// # Errors
    ///
    /// Fails for unknown bodies.
    fn angle(&self, body: BodyId, joint: Joint) -> Result<f32, SimulationError>;

    /// Render one frame from a body camera
    ///
    /// # Errors
    ///
    /// Fails when rendering is impossible.
    fn camera_frame(&mut self, body: BodyId, camera: SimCamera)
        -> Result<CameraImage, SimulationError>;

    /// Stop the simulation and free its resources
    fn stop(&mut self);
}

/// Joint angles of the "Stand" posture
fn stand_posture(joint: Joint) -> f32 {
    match joint {
        Joint::HeadYaw | Joint::HeadPitch | Joint::RElbowYaw | Joint::RWristYaw => 0.0,
        Joint::RShoulderPitch | Joint::LShoulderPitch => 1.5,
        Joint::RShoulderRoll => -0.1,
        Joint::LShoulderRoll => 0.1,
        Joint::RElbowRoll => 0.1,
        Joint::LElbowRoll => -0.1,
    }
}

/// In-process kinematic humanoid simulator
///
/// Angles are clamped to joint limits and applied immediately; `speed` is
/// accepted but not modelled. The caller's holds stand in for travel time.
pub struct KinematicWorld {
    running: bool,
    next_body: u32,
    bodies: HashMap<BodyId, HashMap<Joint, f32>>,
    frame_size: (u32, u32),
}

impl KinematicWorld {
    /// Launch an empty world rendering frames of the given size
    #[must_use]
    pub fn launch(width: u32, height: u32) -> Self {
        tracing::info!(width, height, "Kinematic simulation launched");
        Self {
            running: true,
            next_body: 0,
            bodies: HashMap::new(),
            frame_size: (width.max(1), height.max(1)),
        }
    }

    /// Whether `stop` has not yet been called
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    fn body_mut(&mut self, body: BodyId) -> Result<&mut HashMap<Joint, f32>, SimulationError> {
        if !self.running {
            return Err(SimulationError::NotRunning);
        }
        self.bodies
            .get_mut(&body)
            .ok_or(SimulationError::UnknownBody(body.0))
    }
}

impl Default for KinematicWorld {
    fn default() -> Self {
        Self::launch(320, 240)
    }
}

impl Simulation for KinematicWorld {
    fn spawn_humanoid(&mut self) -> Result<BodyId, SimulationError> {
        if !self.running {
            return Err(SimulationError::NotRunning);
        }
        let id = BodyId(self.next_body);
        self.next_body += 1;
        self.bodies
            .insert(id, Joint::ALL.iter().map(|j| (*j, 0.0)).collect());
        tracing::debug!(body = id.0, "Spawned humanoid");
        Ok(id)
    }

    fn go_to_posture(
        &mut self,
        body: BodyId,
        posture: &str,
        _speed: f32,
    ) -> Result<(), SimulationError> {
        if !posture.eq_ignore_ascii_case("stand") {
            return Err(SimulationError::UnknownPosture(posture.to_string()));
        }
        let joints = self.body_mut(body)?;
        for joint in Joint::ALL {
            joints.insert(joint, stand_posture(joint));
        }
        Ok(())
    }

    fn set_angle(
        &mut self,
        body: BodyId,
        joint: Joint,
        angle: f32,
        _speed: f32,
    ) -> Result<(), SimulationError> {
        let joints = self.body_mut(body)?;
        joints.insert(joint, joint.clamp(angle));
        Ok(())
    }

    fn angle(&self, body: BodyId, joint: Joint) -> Result<f32, SimulationError> {
        self.bodies
            .get(&body)
            .and_then(|j| j.get(&joint).copied())
            .ok_or(SimulationError::UnknownBody(body.0))
    }

    fn camera_frame(
        &mut self,
        body: BodyId,
        camera: SimCamera,
    ) -> Result<CameraImage, SimulationError> {
        let (width, height) = self.frame_size;
        let joints = self.body_mut(body)?;
        let yaw = joints.get(&Joint::HeadYaw).copied().unwrap_or(0.0);
        let pitch = joints.get(&Joint::HeadPitch).copied().unwrap_or(0.0);
        let pitch = match camera {
            SimCamera::Top => pitch,
            SimCamera::Bottom => pitch + 0.7,
        };

        // Horizon gradient shifted by the head pose.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let shift_x = ((yaw + 2.1) * 60.0) as u32;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let shift_y = ((pitch + 1.0) * 60.0) as u32;

        let mut data = Vec::with_capacity(width as usize * height as usize * 3);
        for y in 0..height {
            for x in 0..width {
                let r = ((x + shift_x) * 255 / (width + shift_x).max(1)) as u8;
                let g = ((y + shift_y) * 255 / (height + shift_y).max(1)) as u8;
                data.extend_from_slice(&[r, g, 96]);
            }
        }

        CameraImage::new(width, height, 3, data)
            .ok_or_else(|| SimulationError::Camera("frame size mismatch".to_string()))
    }

    fn stop(&mut self) {
        if self.running {
            self.running = false;
            self.bodies.clear();
            tracing::info!("Kinematic simulation stopped");
        }
    }
}
