//! Gesture Library
//!
//! Static table of the robot's social gestures. Each [`Gesture`] resolves to
//! an ordered sequence of [`GestureStep`]s (joint, angle, speed, hold) that the
//! simulated backend and the hardware fallback path execute step by step.
//!
//! # Design Philosophy
//!
//! Gestures are a closed set. Names coming from outside (config, generated
//! text, tests) are parsed into [`Gesture`] once; an unknown name is a
//! `None`, never a lookup failure deep inside a backend.
//!
//! Sequences are backend-agnostic: a backend maps [`Joint`] to its own
//! actuation call, but must run every step in order and honor every hold.
//! Gestures are paired with spoken lines, so a truncated or reordered
//! sequence is a bug.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use self::Joint::{
    HeadPitch, LElbowRoll, LShoulderPitch, LShoulderRoll, RElbowRoll, RElbowYaw, RShoulderPitch,
    RShoulderRoll, RWristYaw,
};

/// Default joint speed as a fraction of maximum speed
const SPEED: f32 = 0.2;

/// Faster speed used for wrist flicks
const FLICK: f32 = 0.3;

/// Actuated joints of the humanoid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Joint {
    /// Head left/right
    HeadYaw,
    /// Head up/down
    HeadPitch,
    /// Right shoulder forward/back
    RShoulderPitch,
    /// Right shoulder out/in
    RShoulderRoll,
    /// Right elbow bend
    RElbowRoll,
    /// Right forearm twist
    RElbowYaw,
    /// Right wrist twist
    RWristYaw,
    /// Left shoulder forward/back
    LShoulderPitch,
    /// Left shoulder out/in
    LShoulderRoll,
    /// Left elbow bend
    LElbowRoll,
}

impl Joint {
    /// Every joint, in a stable order
    pub const ALL: [Joint; 10] = [
        Joint::HeadYaw,
        Joint::HeadPitch,
        Joint::RShoulderPitch,
        Joint::RShoulderRoll,
        Joint::RElbowRoll,
        Joint::RElbowYaw,
        Joint::RWristYaw,
        Joint::LShoulderPitch,
        Joint::LShoulderRoll,
        Joint::LElbowRoll,
    ];

    /// Joint name as understood by the robot's motion service
    #[must_use]
    pub fn sdk_name(&self) -> &'static str {
        match self {
            Self::HeadYaw => "HeadYaw",
            Self::HeadPitch => "HeadPitch",
            Self::RShoulderPitch => "RShoulderPitch",
            Self::RShoulderRoll => "RShoulderRoll",
            Self::RElbowRoll => "RElbowRoll",
            Self::RElbowYaw => "RElbowYaw",
            Self::RWristYaw => "RWristYaw",
            Self::LShoulderPitch => "LShoulderPitch",
            Self::LShoulderRoll => "LShoulderRoll",
            Self::LElbowRoll => "LElbowRoll",
        }
    }

    /// Mechanical limits in radians (min, max)
    #[must_use]
    pub fn limits(&self) -> (f32, f32) {
        match self {
            Self::HeadYaw => (-2.0857, 2.0857),
            Self::HeadPitch => (-0.7068, 0.6371),
            Self::RShoulderPitch | Self::LShoulderPitch => (-2.0857, 2.0857),
            Self::RShoulderRoll => (-1.5620, -0.0087),
            Self::LShoulderRoll => (0.0087, 1.5620),
            Self::RElbowRoll => (0.0087, 1.5620),
            Self::LElbowRoll => (-1.5620, -0.0087),
            Self::RElbowYaw => (-2.0857, 2.0857),
            Self::RWristYaw => (-1.8239, 1.8239),
        }
    }

    /// Clamp an angle into this joint's limits
    #[must_use]
    pub fn clamp(&self, angle: f32) -> f32 {
        let (min, max) = self.limits();
        angle.clamp(min, max)
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sdk_name())
    }
}

/// One actuation step of a gesture
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureStep {
    /// Joint to move
    pub joint: Joint,
    /// Target angle in radians
    pub angle: f32,
    /// Speed as a fraction of the joint's maximum (0.0-1.0)
    pub speed: f32,
    /// How long to wait after issuing this step before the next one
    pub hold: Duration,
}

impl GestureStep {
    const fn new(joint: Joint, angle: f32, speed: f32, hold_ms: u64) -> Self {
        Self {
            joint,
            angle,
            speed,
            hold: Duration::from_millis(hold_ms),
        }
    }
}

/// Named social gestures
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gesture {
    /// Head tilt with a hand raised to the chin
    Think,
    /// Both arms open, gaze lifted
    Mystic,
    /// Presenting motion with both hands
    Explain,
    /// Right-hand wave
    Wave,
}

impl Gesture {
    /// Every gesture, in a stable order
    pub const ALL: [Gesture; 4] = [
        Gesture::Think,
        Gesture::Mystic,
        Gesture::Explain,
        Gesture::Wave,
    ];

    /// Symbolic name used in code, config, and logs
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Think => "think",
            Self::Mystic => "mystic",
            Self::Explain => "explain",
            Self::Wave => "wave",
        }
    }

    /// Parse a symbolic gesture name, returning `None` for unknown names
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "think" | "thinking" => Some(Self::Think),
            "mystic" | "mystical" => Some(Self::Mystic),
            "explain" | "explaining" => Some(Self::Explain),
            "wave" | "waving" => Some(Self::Wave),
            _ => None,
        }
    }

    /// Pre-authored animation asset played by the hardware animation player
    ///
    /// These names are also the vocabulary of the gesture-tag grammar.
    #[must_use]
    pub fn asset(&self) -> &'static str {
        match self {
            Self::Think => "animations/Stand/Gestures/Thinking_1",
            Self::Mystic => "animations/Stand/Gestures/ShowSky_1",
            Self::Explain => "animations/Stand/Gestures/Explain_1",
            Self::Wave => "animations/Stand/Gestures/Hey_1",
        }
    }

    /// Human-readable description for text-only backends
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Think => "tilts its head slightly and raises its right hand to its chin",
            Self::Mystic => "extends both arms with open hands and looks upward",
            Self::Explain => "moves both hands in a presenting motion",
            Self::Wave => "waves its right hand from side to side",
        }
    }

    /// Ordered actuation sequence for this gesture
    #[must_use]
    pub fn steps(&self) -> &'static [GestureStep] {
        GestureLibrary::sequence(*self)
    }

    /// Sum of every step's hold
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.steps().iter().map(|s| s.hold).sum()
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Gesture {
    type Err = crate::error::ActuatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| crate::error::ActuatorError::UnknownGesture(s.to_string()))
    }
}

static THINK: [GestureStep; 5] = [
    GestureStep::new(HeadPitch, -0.2, SPEED, 0),
    GestureStep::new(RShoulderPitch, 0.5, SPEED, 0),
    GestureStep::new(RShoulderRoll, -0.2, SPEED, 0),
    GestureStep::new(RElbowRoll, 1.0, SPEED, 0),
    GestureStep::new(RElbowYaw, 1.0, SPEED, 1000),
];

static MYSTIC: [GestureStep; 7] = [
    GestureStep::new(HeadPitch, -0.3, SPEED, 0),
    GestureStep::new(RShoulderPitch, 0.2, SPEED, 0),
    GestureStep::new(RShoulderRoll, -0.3, SPEED, 0),
    GestureStep::new(RElbowRoll, 0.7, SPEED, 0),
    GestureStep::new(LShoulderPitch, 0.2, SPEED, 0),
    GestureStep::new(LShoulderRoll, 0.3, SPEED, 0),
    GestureStep::new(LElbowRoll, -0.7, SPEED, 1500),
];

// Two presenting beats: open both hands, then lift both shoulders.
static EXPLAIN: [GestureStep; 17] = [
    GestureStep::new(HeadPitch, 0.0, SPEED, 0),
    GestureStep::new(RShoulderPitch, 0.5, SPEED, 0),
    GestureStep::new(RShoulderRoll, -0.2, SPEED, 0),
    GestureStep::new(RElbowRoll, 0.5, SPEED, 0),
    GestureStep::new(LShoulderPitch, 0.5, SPEED, 0),
    GestureStep::new(LShoulderRoll, 0.2, SPEED, 0),
    GestureStep::new(LElbowRoll, -0.5, SPEED, 800),
    GestureStep::new(RShoulderPitch, 0.7, SPEED, 0),
    GestureStep::new(LShoulderPitch, 0.7, SPEED, 800),
    GestureStep::new(RShoulderPitch, 0.5, SPEED, 0),
    GestureStep::new(RShoulderRoll, -0.2, SPEED, 0),
    GestureStep::new(RElbowRoll, 0.5, SPEED, 0),
    GestureStep::new(LShoulderPitch, 0.5, SPEED, 0),
    GestureStep::new(LShoulderRoll, 0.2, SPEED, 0),
    GestureStep::new(LElbowRoll, -0.5, SPEED, 800),
    GestureStep::new(RShoulderPitch, 0.7, SPEED, 0),
    GestureStep::new(LShoulderPitch, 0.7, SPEED, 800),
];

static WAVE: [GestureStep; 9] = [
    GestureStep::new(RShoulderPitch, 0.5, SPEED, 0),
    GestureStep::new(RShoulderRoll, -0.3, SPEED, 0),
    GestureStep::new(RElbowRoll, 1.0, SPEED, 0),
    GestureStep::new(RElbowYaw, 1.0, SPEED, 500),
    GestureStep::new(RWristYaw, 0.5, FLICK, 300),
    GestureStep::new(RWristYaw, -0.5, FLICK, 300),
    GestureStep::new(RWristYaw, 0.5, FLICK, 300),
    GestureStep::new(RWristYaw, -0.5, FLICK, 300),
    GestureStep::new(RWristYaw, 0.0, FLICK, 0),
];

/// Lookup table from gesture to step sequence
///
/// Pure data; there is nothing to construct.
pub struct GestureLibrary;

impl GestureLibrary {
    /// Step sequence for a gesture
    #[must_use]
    pub fn sequence(gesture: Gesture) -> &'static [GestureStep] {
        match gesture {
            Gesture::Think => &THINK,
            Gesture::Mystic => &MYSTIC,
            Gesture::Explain => &EXPLAIN,
            Gesture::Wave => &WAVE,
        }
    }

    /// Resolve a symbolic name to its sequence
    #[must_use]
    pub fn lookup(name: &str) -> Option<(Gesture, &'static [GestureStep])> {
        Gesture::from_name(name).map(|g| (g, Self::sequence(g)))
    }

    /// Asset names accepted inside gesture tags
    #[must_use]
    pub fn vocabulary() -> Vec<&'static str> {
        Gesture::ALL.iter().map(Gesture::asset).collect()
    }
}
