//! Shared test doubles for oracle-core integration tests
//!
//! - [`RecordingBackend`]: logs every actuator call, counts shutdowns
//! - [`ScriptedVisitor`]: answers the session from a script
//! - [`MockGenerator`]: canned remote replies with a call counter
//! - [`MockSdk`]: in-memory robot control service with switchable services

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use oracle_core::actuator::sdk::{
    AnimatedSpeechProxy, AnimationProxy, ControlSdk, MotionProxy, RawFrame, SdkResult,
    SensorState, SpeechProxy, TouchProxy, VideoProxy,
};
use oracle_core::content::{CompletionRequest, GenerationError};
use oracle_core::{
    ActuatorBackend, CameraImage, Capabilities, Gesture, Interlocutor, TextGenerator, TouchEvent,
};

// ============================================================================
// Recording Backend
// ============================================================================

/// One recorded actuator call
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Speak(String),
    MoveHead(f32, f32),
    Gesture(String),
    Capture,
    Touch,
    Shutdown,
}

/// Backend that records calls and waits out gesture durations
#[derive(Clone)]
pub struct RecordingBackend {
    log: Arc<Mutex<Vec<Action>>>,
    shutdowns: Arc<AtomicUsize>,
    touch: TouchEvent,
    image: Option<CameraImage>,
    think_started: Arc<Notify>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            shutdowns: Arc::new(AtomicUsize::new(0)),
            touch: TouchEvent::None,
            image: None,
            think_started: Arc::new(Notify::new()),
        }
    }

    pub fn with_touch(mut self, touch: TouchEvent) -> Self {
        self.touch = touch;
        self
    }

    pub fn with_image(mut self, image: CameraImage) -> Self {
        self.image = Some(image);
        self
    }

    pub fn actions(&self) -> Vec<Action> {
        self.log.lock().clone()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                Action::Speak(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn gestures(&self) -> Vec<String> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                Action::Gesture(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    /// Resolves once the thinking gesture has started
    pub fn think_started(&self) -> Arc<Notify> {
        Arc::clone(&self.think_started)
    }
}

#[async_trait]
impl ActuatorBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            speech: true,
            head: true,
            gestures: true,
            camera: self.image.is_some(),
            touch: true,
            markup_playback: false,
        }
    }

    async fn speak(&mut self, text: &str) {
        self.log.lock().push(Action::Speak(text.to_string()));
    }

    async fn move_head(&mut self, yaw: f32, pitch: f32) {
        self.log.lock().push(Action::MoveHead(yaw, pitch));
    }

    async fn perform_gesture(&mut self, name: &str) {
        self.log.lock().push(Action::Gesture(name.to_string()));
        if let Some(gesture) = Gesture::from_name(name) {
            if gesture == Gesture::Think {
                self.think_started.notify_one();
            }
            tokio::time::sleep(gesture.total_duration()).await;
        }
    }

    async fn capture_image(&mut self) -> Option<CameraImage> {
        self.log.lock().push(Action::Capture);
        self.image.clone()
    }

    async fn poll_touch(&mut self) -> TouchEvent {
        self.log.lock().push(Action::Touch);
        self.touch
    }

    async fn shutdown(&mut self) {
        self.log.lock().push(Action::Shutdown);
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Scripted Visitor
// ============================================================================

/// Interlocutor driven by a script
pub struct ScriptedVisitor {
    topics: VecDeque<String>,
    details: VecDeque<Option<String>>,
    continues: VecDeque<bool>,
    fail_topic_at: Option<usize>,
    topic_calls: usize,
}

impl ScriptedVisitor {
    /// Answers "love" forever and always wants another fortune
    pub fn always_continue() -> Self {
        Self {
            topics: VecDeque::new(),
            details: VecDeque::new(),
            continues: VecDeque::new(),
            fail_topic_at: None,
            topic_calls: 0,
        }
    }

    /// Wants `k` fortunes, then declines
    pub fn decline_after(k: usize) -> Self {
        let mut visitor = Self::always_continue();
        visitor.continues = std::iter::repeat(true)
            .take(k.saturating_sub(1))
            .chain(std::iter::once(false))
            .collect();
        visitor
    }

    /// Fails when asked for the topic of the `n`th question (0-based)
    pub fn failing_topic_at(n: usize) -> Self {
        let mut visitor = Self::always_continue();
        visitor.fail_topic_at = Some(n);
        visitor
    }

    pub fn with_topics(mut self, topics: &[&str]) -> Self {
        self.topics = topics.iter().map(|t| (*t).to_string()).collect();
        self
    }

    pub fn with_details(mut self, details: &[Option<&str>]) -> Self {
        self.details = details.iter().map(|d| d.map(str::to_string)).collect();
        self
    }
}

#[async_trait]
impl Interlocutor for ScriptedVisitor {
    async fn ready(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn topic(&mut self) -> anyhow::Result<String> {
        let call = self.topic_calls;
        self.topic_calls += 1;
        if self.fail_topic_at == Some(call) {
            return Err(anyhow!("input stream closed"));
        }
        Ok(self.topics.pop_front().unwrap_or_else(|| "love".to_string()))
    }

    async fn detail(&mut self) -> anyhow::Result<Option<String>> {
        Ok(self.details.pop_front().flatten())
    }

    async fn wants_another(&mut self) -> anyhow::Result<bool> {
        Ok(self.continues.pop_front().unwrap_or(true))
    }
}

// ============================================================================
// Mock Generator
// ============================================================================

/// Reply the mock generator gives
#[derive(Clone, Debug)]
pub enum Reply {
    Text(String),
    Status(u16),
    Unauthorized,
    Empty,
}

/// Remote generator double
pub struct MockGenerator {
    reply: Reply,
    calls: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockGenerator {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn text(text: &str) -> Arc<Self> {
        Self::new(Reply::Text(text.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Status(status) => Err(GenerationError::Status {
                status: *status,
                body: "upstream exploded".to_string(),
            }),
            Reply::Unauthorized => Err(GenerationError::Unauthorized(401)),
            Reply::Empty => Err(GenerationError::Empty),
        }
    }
}

// ============================================================================
// Mock Control SDK
// ============================================================================

/// Which services the mock robot offers, and how they behave
#[derive(Clone, Debug)]
pub struct MockRobot {
    pub speech: bool,
    pub motion: bool,
    pub animation_player: bool,
    pub animation_fails: bool,
    pub animated_speech: bool,
    pub video: bool,
    pub frame_fails: bool,
    pub touch: bool,
    pub pressed: Vec<&'static str>,
}

impl Default for MockRobot {
    fn default() -> Self {
        Self {
            speech: true,
            motion: true,
            animation_player: true,
            animation_fails: false,
            animated_speech: true,
            video: true,
            frame_fails: false,
            touch: true,
            pressed: Vec::new(),
        }
    }
}

/// In-memory control service; every call is appended to a shared log
pub struct MockSdk {
    robot: MockRobot,
    log: Arc<Mutex<Vec<String>>>,
}

impl MockSdk {
    pub fn new(robot: MockRobot) -> Self {
        Self {
            robot,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.log)
    }

    fn proxy(&self) -> Arc<MockProxy> {
        Arc::new(MockProxy {
            robot: self.robot.clone(),
            log: Arc::clone(&self.log),
        })
    }
}

struct MockProxy {
    robot: MockRobot,
    log: Arc<Mutex<Vec<String>>>,
}

impl MockProxy {
    fn record(&self, entry: String) {
        self.log.lock().push(entry);
    }
}

#[async_trait]
impl SpeechProxy for MockProxy {
    async fn say(&self, text: &str) -> SdkResult<()> {
        self.record(format!("say:{text}"));
        Ok(())
    }
}

#[async_trait]
impl AnimatedSpeechProxy for MockProxy {
    async fn say(&self, text: &str) -> SdkResult<()> {
        self.record(format!("animated:{text}"));
        Ok(())
    }
}

#[async_trait]
impl MotionProxy for MockProxy {
    async fn wake_up(&self) -> SdkResult<()> {
        self.record("wakeUp".to_string());
        Ok(())
    }

    async fn rest(&self) -> SdkResult<()> {
        self.record("rest".to_string());
        Ok(())
    }

    async fn set_angles(&self, joint: &str, angle: f32, _speed: f32) -> SdkResult<()> {
        self.record(format!("setAngles:{joint}:{angle:.2}"));
        Ok(())
    }
}

#[async_trait]
impl AnimationProxy for MockProxy {
    async fn run(&self, asset: &str) -> SdkResult<()> {
        self.record(format!("run:{asset}"));
        if self.robot.animation_fails {
            return Err(anyhow!("behavior not installed"));
        }
        Ok(())
    }
}

#[async_trait]
impl VideoProxy for MockProxy {
    async fn subscribe(
        &self,
        name: &str,
        camera: u8,
        resolution: u8,
        color_space: u8,
        fps: u8,
    ) -> SdkResult<String> {
        self.record(format!(
            "subscribe:{name}:{camera}:{resolution}:{color_space}:{fps}"
        ));
        Ok(format!("{name}_0"))
    }

    async fn frame(&self, client: &str) -> SdkResult<Option<RawFrame>> {
        self.record(format!("frame:{client}"));
        if self.robot.frame_fails {
            return Err(anyhow!("camera busy"));
        }
        Ok(Some(RawFrame {
            width: 4,
            height: 3,
            channels: 3,
            data: vec![128; 36],
        }))
    }

    async fn unsubscribe(&self, client: &str) -> SdkResult<()> {
        self.record(format!("unsubscribe:{client}"));
        Ok(())
    }
}

#[async_trait]
impl TouchProxy for MockProxy {
    async fn status(&self) -> SdkResult<Vec<SensorState>> {
        let sensors = ["Head/Touch/Front", "RHand/Touch/Back", "LHand/Touch/Back"];
        Ok(sensors
            .iter()
            .map(|name| SensorState {
                name: (*name).to_string(),
                active: self.robot.pressed.iter().any(|p| name.starts_with(p)),
            })
            .collect())
    }
}

fn missing(service: &str) -> anyhow::Error {
    anyhow!("service {service} not found")
}

#[async_trait]
impl ControlSdk for MockSdk {
    async fn speech(&self) -> SdkResult<Arc<dyn SpeechProxy>> {
        if !self.robot.speech {
            return Err(missing("ALTextToSpeech"));
        }
        Ok(self.proxy())
    }

    async fn motion(&self) -> SdkResult<Arc<dyn MotionProxy>> {
        if !self.robot.motion {
            return Err(missing("ALMotion"));
        }
        Ok(self.proxy())
    }

    async fn animation_player(&self) -> SdkResult<Arc<dyn AnimationProxy>> {
        if !self.robot.animation_player {
            return Err(missing("ALAnimationPlayer"));
        }
        Ok(self.proxy())
    }

    async fn animated_speech(&self) -> SdkResult<Arc<dyn AnimatedSpeechProxy>> {
        if !self.robot.animated_speech {
            return Err(missing("ALAnimatedSpeech"));
        }
        Ok(self.proxy())
    }

    async fn video(&self) -> SdkResult<Arc<dyn VideoProxy>> {
        if !self.robot.video {
            return Err(missing("ALVideoDevice"));
        }
        Ok(self.proxy())
    }

    async fn touch(&self) -> SdkResult<Arc<dyn TouchProxy>> {
        if !self.robot.touch {
            return Err(missing("ALTouch"));
        }
        Ok(self.proxy())
    }
}
