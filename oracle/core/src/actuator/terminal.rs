//! Terminal Backend
//!
//! Text-only stand-in for the robot. Speech and gestures are printed, touch
//! is a console menu, and there is no camera.

use async_trait::async_trait;

use super::{resolve_gesture, ActuatorBackend, Capabilities, CameraImage, TouchEvent};
use crate::console::Console;
use crate::markup;

/// Console-driven robot
pub struct TerminalBackend {
    console: Console,
    robot_name: String,
    shut_down: bool,
}

impl TerminalBackend {
    /// Create a terminal backend on a shared console and print its banner
    pub async fn new(console: Console, robot_name: impl Into<String>) -> Self {
        let backend = Self {
            console,
            robot_name: robot_name.into(),
            shut_down: false,
        };
        backend
            .console
            .println("Terminal-based Fortune Teller initialized.")
            .await;
        backend
            .console
            .println("This version simulates the robot through text-based interaction.\n")
            .await;
        backend
    }

    fn menu(&self) -> String {
        let names: Vec<&str> = TouchEvent::ALL.iter().map(TouchEvent::as_str).collect();
        format!(
            "\nWhere would you like to touch {}? ({}): ",
            self.robot_name,
            names.join(", ")
        )
    }
}

/// Describe a head pose in words
fn head_direction(yaw: f32, pitch: f32) -> String {
    let horizontal = if yaw > 0.0 {
        Some("right")
    } else if yaw < 0.0 {
        Some("left")
    } else {
        None
    };
    let vertical = if pitch > 0.0 {
        Some("down")
    } else if pitch < 0.0 {
        Some("up")
    } else {
        None
    };

    match (horizontal, vertical) {
        (Some(h), Some(v)) => format!("{h} and {v}"),
        (Some(h), None) => h.to_string(),
        (None, Some(v)) => v.to_string(),
        (None, None) => "to center position".to_string(),
    }
}

#[async_trait]
impl ActuatorBackend for TerminalBackend {
    fn name(&self) -> &'static str {
        "terminal"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            touch: true,
            ..Capabilities::default()
        }
    }

    async fn speak(&mut self, text: &str) {
        let spoken = markup::strip(text);
        self.console
            .println(&format!("\n{} says: \"{spoken}\"\n", self.robot_name))
            .await;
    }

    async fn move_head(&mut self, yaw: f32, pitch: f32) {
        self.console.println(&format!(
            "({} moves head {})",
            self.robot_name,
            head_direction(yaw, pitch)
        ))
        .await;
    }

    async fn perform_gesture(&mut self, name: &str) {
        let Some(gesture) = resolve_gesture(self.name(), name) else {
            self.console
                .println(&format!("(Unknown gesture: {name})"))
                .await;
            return;
        };
        self.console.println(&format!(
            "\n({} performs a {} gesture - {})\n",
            self.robot_name,
            gesture.name(),
            gesture.description()
        ))
        .await;
    }

    async fn capture_image(&mut self) -> Option<CameraImage> {
        self.console
            .println(&format!("({} appears to be looking at you)", self.robot_name))
            .await;
        None
    }

    async fn poll_touch(&mut self) -> TouchEvent {
        self.console.println(&self.menu()).await;
        loop {
            match self.console.ask("> ").await {
                Ok(Some(answer)) => match answer.parse::<TouchEvent>() {
                    Ok(touch) => return touch,
                    Err(_) => {
                        self.console
                            .println("Please enter 'head', 'right_hand', 'left_hand', or 'none'")
                            .await;
                    }
                },
                Ok(None) => return TouchEvent::None,
                Err(e) => {
                    tracing::warn!(error = %e, "Touch prompt failed, assuming no touch");
                    return TouchEvent::None;
                }
            }
        }
    }

    async fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.console.println("Shutting down terminal interface...").await;
        tracing::info!("Terminal backend shut down");
    }
}
