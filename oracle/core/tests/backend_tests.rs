//! Actuator backend contract tests
//!
//! Simulated backends run against a scripted [`Simulation`]; the hardware
//! backend runs against an in-memory control SDK.

mod common;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::time::Instant;
use tokio_test::assert_ok;

use common::{MockRobot, MockSdk};
use oracle_core::actuator::sim::{BodyId, SimCamera, SimulationError};
use oracle_core::{
    ActuatorBackend, ActuatorError, CameraImage, Console, Gesture, HardwareBackend, Joint,
    KinematicWorld, Simulation, SimulatedBackend, TouchEvent,
};

// =============================================================================
// Scripted Simulation
// =============================================================================

#[derive(Default)]
struct ScriptedSim {
    spawn_fails: bool,
    camera_fails: bool,
    angles: HashMap<Joint, f32>,
    stops: Arc<AtomicUsize>,
}

impl Simulation for ScriptedSim {
    fn spawn_humanoid(&mut self) -> Result<BodyId, SimulationError> {
        if self.spawn_fails {
            return Err(SimulationError::NotRunning);
        }
        Ok(BodyId(1))
    }

    fn go_to_posture(&mut self, _: BodyId, _: &str, _: f32) -> Result<(), SimulationError> {
        Ok(())
    }

    fn set_angle(
        &mut self,
        _: BodyId,
        joint: Joint,
        angle: f32,
        _: f32,
    ) -> Result<(), SimulationError> {
        self.angles.insert(joint, angle);
        Ok(())
    }

    fn angle(&self, _: BodyId, joint: Joint) -> Result<f32, SimulationError> {
        Ok(self.angles.get(&joint).copied().unwrap_or_default())
    }

    fn camera_frame(&mut self, _: BodyId, _: SimCamera) -> Result<CameraImage, SimulationError> {
        if self.camera_fails {
            return Err(SimulationError::Camera("renderer crashed".to_string()));
        }
        Ok(CameraImage::new(2, 2, 3, vec![7; 12]).unwrap())
    }

    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

fn simulated(sim: ScriptedSim) -> SimulatedBackend {
    let (console, _) = Console::scripted("");
    SimulatedBackend::launch(Box::new(sim), console, "Pepper").unwrap()
}

// =============================================================================
// Simulated Backend
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_simulated_gesture_takes_its_total_duration() {
    let mut backend = simulated(ScriptedSim::default());

    for gesture in Gesture::ALL {
        let start = Instant::now();
        backend.perform_gesture(gesture.name()).await;
        assert_eq!(start.elapsed(), gesture.total_duration(), "{gesture}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_simulated_wave_ends_with_wrist_centered() {
    let mut backend = simulated(ScriptedSim::default());
    backend.perform_gesture("wave").await;
    assert_eq!(backend.joint_angle(Joint::RWristYaw), Some(0.0));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_gesture_is_noop() {
    let mut backend = simulated(ScriptedSim::default());
    let start = Instant::now();
    backend.perform_gesture("moonwalk").await;
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(backend.joint_angle(Joint::RShoulderPitch), Some(0.0));
}

#[tokio::test(start_paused = true)]
async fn test_simulated_camera_failure_is_none() {
    let mut backend = simulated(ScriptedSim {
        camera_fails: true,
        ..ScriptedSim::default()
    });
    assert!(backend.capture_image().await.is_none());
    assert!(backend.capabilities().camera);
}

#[tokio::test(start_paused = true)]
async fn test_simulated_camera_frame() {
    let mut backend = simulated(ScriptedSim::default());
    let image = backend.capture_image().await.unwrap();
    assert_eq!(image.shape(), (2, 2, 3));
}

#[test]
fn test_spawn_failure_is_backend_unavailable() {
    let (console, _) = Console::scripted("");
    let result = SimulatedBackend::launch(
        Box::new(ScriptedSim {
            spawn_fails: true,
            ..ScriptedSim::default()
        }),
        console,
        "Pepper",
    );
    assert!(matches!(result, Err(ActuatorError::BackendUnavailable(_))));
}

#[tokio::test(start_paused = true)]
async fn test_simulation_stopped_once_on_shutdown_then_drop() {
    let stops = Arc::new(AtomicUsize::new(0));
    let mut backend = simulated(ScriptedSim {
        stops: Arc::clone(&stops),
        ..ScriptedSim::default()
    });

    backend.shutdown().await;
    backend.shutdown().await;
    drop(backend);

    assert_eq!(stops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_simulation_stopped_on_drop() {
    let stops = Arc::new(AtomicUsize::new(0));
    let backend = simulated(ScriptedSim {
        stops: Arc::clone(&stops),
        ..ScriptedSim::default()
    });
    drop(backend);
    assert_eq!(stops.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_simulated_after_shutdown_is_inert() {
    let mut backend = simulated(ScriptedSim::default());
    backend.shutdown().await;

    backend.move_head(0.3, 0.1).await;
    assert!(backend.capture_image().await.is_none());
    assert!(!backend.capabilities().gestures);
    assert_eq!(backend.joint_angle(Joint::HeadYaw), None);
}

#[tokio::test(start_paused = true)]
async fn test_simulated_touch_is_a_valid_zone() {
    let (console, _) = Console::scripted("");
    let mut backend =
        SimulatedBackend::launch(Box::new(KinematicWorld::default()), console, "Pepper")
            .unwrap()
            .with_seed(3);
    for _ in 0..20 {
        let touch = backend.poll_touch().await;
        assert!(TouchEvent::ALL.contains(&touch));
    }
}

// =============================================================================
// Hardware Backend
// =============================================================================

async fn hardware(robot: MockRobot) -> (HardwareBackend, Arc<parking_lot::Mutex<Vec<String>>>) {
    let sdk = MockSdk::new(robot);
    let log = sdk.log();
    let backend = assert_ok!(HardwareBackend::from_sdk(&sdk).await);
    log.lock().clear();
    (backend, log)
}

/// Let tasks spawned by a drop run to completion
async fn settle() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

fn entries(log: &parking_lot::Mutex<Vec<String>>, prefix: &str) -> Vec<String> {
    log.lock()
        .iter()
        .filter(|e| e.starts_with(prefix))
        .cloned()
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_hardware_wakes_robot_on_connect() {
    let sdk = MockSdk::new(MockRobot::default());
    let log = sdk.log();
    let backend = HardwareBackend::from_sdk(&sdk).await.unwrap();

    assert_eq!(log.lock().as_slice(), ["wakeUp".to_string()]);
    let caps = backend.capabilities();
    assert!(caps.camera && caps.touch && caps.markup_playback);
}

#[tokio::test(start_paused = true)]
async fn test_hardware_requires_speech() {
    let sdk = MockSdk::new(MockRobot {
        speech: false,
        ..MockRobot::default()
    });
    let result = HardwareBackend::from_sdk(&sdk).await;
    assert!(matches!(result, Err(ActuatorError::BackendUnavailable(ref m)) if m.contains("ALTextToSpeech")));
}

#[tokio::test(start_paused = true)]
async fn test_hardware_requires_motion() {
    let sdk = MockSdk::new(MockRobot {
        motion: false,
        ..MockRobot::default()
    });
    assert!(matches!(
        HardwareBackend::from_sdk(&sdk).await,
        Err(ActuatorError::BackendUnavailable(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_hardware_runs_canned_animation() {
    let (mut backend, log) = hardware(MockRobot::default()).await;
    backend.perform_gesture("think").await;

    assert_eq!(
        log.lock().as_slice(),
        ["run:animations/Stand/Gestures/Thinking_1".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_hardware_without_player_runs_joint_sequence() {
    let (mut backend, log) = hardware(MockRobot {
        animation_player: false,
        ..MockRobot::default()
    })
    .await;

    let start = Instant::now();
    backend.perform_gesture("think").await;

    assert_eq!(start.elapsed(), Gesture::Think.total_duration());
    assert!(entries(&log, "run:").is_empty());
    let angles = entries(&log, "setAngles:");
    assert_eq!(angles.len(), Gesture::Think.steps().len());
    assert_eq!(angles[0], "setAngles:HeadPitch:-0.20");
}

#[tokio::test(start_paused = true)]
async fn test_hardware_failed_animation_falls_back_without_retry() {
    let (mut backend, log) = hardware(MockRobot {
        animation_fails: true,
        ..MockRobot::default()
    })
    .await;

    backend.perform_gesture("mystic").await;

    assert_eq!(entries(&log, "run:").len(), 1);
    assert_eq!(
        entries(&log, "setAngles:").len(),
        Gesture::Mystic.steps().len()
    );
    // The canned attempt comes before any joint command.
    assert!(log.lock()[0].starts_with("run:"));
}

#[tokio::test(start_paused = true)]
async fn test_hardware_unknown_gesture_sends_nothing() {
    let (mut backend, log) = hardware(MockRobot::default()).await;
    backend.perform_gesture("moonwalk").await;
    assert!(log.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_hardware_capture_subscribes_and_unsubscribes() {
    let (mut backend, log) = hardware(MockRobot::default()).await;
    let image = backend.capture_image().await.unwrap();

    assert_eq!(image.shape(), (3, 4, 3));
    assert_eq!(
        log.lock().as_slice(),
        [
            "subscribe:fortune_teller:0:2:11:10".to_string(),
            "frame:fortune_teller_0".to_string(),
            "unsubscribe:fortune_teller_0".to_string(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_hardware_failed_frame_still_unsubscribes() {
    let (mut backend, log) = hardware(MockRobot {
        frame_fails: true,
        ..MockRobot::default()
    })
    .await;

    assert!(backend.capture_image().await.is_none());
    assert_eq!(entries(&log, "unsubscribe:").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hardware_without_video_has_no_camera() {
    let (mut backend, log) = hardware(MockRobot {
        video: false,
        ..MockRobot::default()
    })
    .await;

    assert!(!backend.capabilities().camera);
    assert!(backend.capture_image().await.is_none());
    assert!(log.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_hardware_touch_precedence() {
    let cases: [(&[&'static str], TouchEvent); 4] = [
        (&[], TouchEvent::None),
        (&["LHand"], TouchEvent::LeftHand),
        (&["LHand", "RHand"], TouchEvent::RightHand),
        (&["LHand", "RHand", "Head"], TouchEvent::Head),
    ];

    for (pressed, expected) in cases {
        let (mut backend, _) = hardware(MockRobot {
            pressed: pressed.to_vec(),
            ..MockRobot::default()
        })
        .await;
        assert_eq!(backend.poll_touch().await, expected, "{pressed:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_hardware_without_touch_service() {
    let (mut backend, _) = hardware(MockRobot {
        touch: false,
        pressed: vec!["Head"],
        ..MockRobot::default()
    })
    .await;
    assert!(!backend.capabilities().touch);
    assert_eq!(backend.poll_touch().await, TouchEvent::None);
}

#[tokio::test(start_paused = true)]
async fn test_hardware_speaks_valid_markup_animated() {
    let (mut backend, log) = hardware(MockRobot::default()).await;
    let text = "^start(animations/Stand/Gestures/Hey_1)Greetings^wait(animations/Stand/Gestures/Hey_1) seeker.";
    backend.speak(text).await;

    assert_eq!(log.lock().as_slice(), [format!("animated:{text}")]);
}

#[tokio::test(start_paused = true)]
async fn test_hardware_strips_invalid_markup() {
    let (mut backend, log) = hardware(MockRobot::default()).await;
    backend
        .speak("Greetings ^start(animations/Stand/Gestures/Hey_1)seeker.")
        .await;

    let said = entries(&log, "say:");
    assert_eq!(said.len(), 1);
    assert!(!said[0].contains('^'));
    assert!(entries(&log, "animated:").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_hardware_unterminated_marker_never_spoken() {
    let (mut backend, log) = hardware(MockRobot::default()).await;
    backend
        .speak("Fate ^wait(animations/Stand/Gestures/Hey_1 turns")
        .await;

    assert_eq!(log.lock().as_slice(), ["say:Fate turns".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_hardware_plain_text_uses_tts() {
    let (mut backend, log) = hardware(MockRobot::default()).await;
    backend.speak("The stars align.").await;
    assert_eq!(log.lock().as_slice(), ["say:The stars align.".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_hardware_markup_without_animated_speech_is_stripped() {
    let (mut backend, log) = hardware(MockRobot {
        animated_speech: false,
        ..MockRobot::default()
    })
    .await;
    assert!(!backend.capabilities().markup_playback);

    backend
        .speak("^start(animations/Stand/Gestures/Hey_1)Hello^wait(animations/Stand/Gestures/Hey_1)")
        .await;
    assert_eq!(log.lock().as_slice(), ["say:Hello".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_hardware_head_move_clamps() {
    let (mut backend, log) = hardware(MockRobot::default()).await;
    backend.move_head(0.0, 5.0).await;

    let angles = entries(&log, "setAngles:");
    assert_eq!(angles[0], "setAngles:HeadYaw:0.00");
    let pitch = Joint::HeadPitch.clamp(5.0);
    assert_eq!(angles[1], format!("setAngles:HeadPitch:{pitch:.2}"));
}

#[tokio::test(start_paused = true)]
async fn test_hardware_shutdown_rests_once() {
    let (mut backend, log) = hardware(MockRobot::default()).await;
    backend.shutdown().await;
    backend.shutdown().await;
    drop(backend);
    settle().await;

    assert_eq!(entries(&log, "rest").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hardware_drop_without_shutdown_rests() {
    let (backend, log) = hardware(MockRobot::default()).await;
    drop(backend);
    settle().await;

    assert_eq!(entries(&log, "rest").len(), 1);
}

#[cfg(not(feature = "hardware"))]
#[tokio::test]
async fn test_connect_without_sdk_support() {
    let result = HardwareBackend::connect(&oracle_core::RobotEndpoint::default()).await;
    assert!(matches!(result, Err(ActuatorError::BackendUnavailable(_))));
}
