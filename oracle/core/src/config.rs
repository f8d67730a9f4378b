//! TOML Configuration File Support
//!
//! Configuration for the fortune teller, loaded from
//! `$XDG_CONFIG_HOME/fortune-teller/config.toml` (typically
//! `~/.config/fortune-teller/config.toml`).
//!
//! # Configuration Priority
//!
//! Values are resolved with the following priority (highest first):
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! A missing file is not an error. A missing credential is not an error
//! either: fortunes then come from the fallback pool.
//!
//! # Example Configuration
//!
//! ```toml
//! [content]
//! api_base = "https://api.openai.com/v1"
//! model = "gpt-4o-mini"
//! timeout_secs = 30
//! gesture_aware = true
//!
//! [[content.fallback]]
//! text = "The stars align in your favor."
//! weight = 3
//!
//! [robot]
//! backend = "hardware"
//! host = "192.168.1.20"
//! port = 9559
//! name = "Pepper"
//!
//! [session]
//! max_turns = 3
//! ask_detail = true
//! pause_ms = 1000
//! ```
//!
//! The credential is only read from `OPENAI_API_KEY` or the CLI, never from
//! the file.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actuator::RobotEndpoint;
use crate::content::{ContentConfig, WeightedFortune};
use crate::session::SessionConfig;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where the highest-priority configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// Backend Selection
// =============================================================================

/// Which actuator backend to drive
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Text-only console robot
    #[default]
    Terminal,
    /// Robot in the kinematic simulation
    Simulated,
    /// Physical robot over the network
    Hardware,
}

impl BackendKind {
    /// Config and CLI name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Terminal => "terminal",
            Self::Simulated => "simulated",
            Self::Hardware => "hardware",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "terminal" | "text" => Ok(Self::Terminal),
            "simulated" | "simulation" | "sim" => Ok(Self::Simulated),
            "hardware" | "robot" => Ok(Self::Hardware),
            other => Err(ConfigError::ValidationError(format!(
                "unknown backend '{other}' (expected terminal, simulated, or hardware)"
            ))),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Content section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentToml {
    /// Chat-completion API base URL
    pub api_base: Option<String>,

    /// Model identifier
    pub model: Option<String>,

    /// Upper bound on generated tokens
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Ask the model for gesture tags
    pub gesture_aware: Option<bool>,

    /// Custom fallback fortunes
    pub fallback: Option<Vec<WeightedFortune>>,
}

/// Robot section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotToml {
    /// Backend name
    pub backend: Option<BackendKind>,

    /// Robot host for the hardware backend
    pub host: Option<String>,

    /// Robot port for the hardware backend
    pub port: Option<u16>,

    /// Name the robot introduces itself with
    pub name: Option<String>,
}

/// Session section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionToml {
    /// Fortunes per session
    pub max_turns: Option<u32>,

    /// Ask for detail after the topic
    pub ask_detail: Option<bool>,

    /// Pause between actions in milliseconds
    pub pause_ms: Option<u64>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FortuneToml {
    /// Content section
    pub content: ContentToml,

    /// Robot section
    pub robot: RobotToml,

    /// Session section
    pub session: SessionToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Robot selection and identity
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RobotConfig {
    /// Backend to drive
    pub backend: BackendKind,
    /// Hardware endpoint
    pub endpoint: RobotEndpoint,
    /// Name the robot introduces itself with
    pub name: String,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Terminal,
            endpoint: RobotEndpoint::default(),
            name: "Pepper".to_string(),
        }
    }
}

/// Resolved configuration for one run
#[derive(Clone, Debug)]
pub struct FortuneConfig {
    /// Fortune generation
    pub content: ContentConfig,

    /// Robot selection
    pub robot: RobotConfig,

    /// Dialogue settings
    pub session: SessionConfig,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    source: ConfigSource,
}

impl Default for FortuneConfig {
    fn default() -> Self {
        Self {
            content: ContentConfig::default(),
            robot: RobotConfig::default(),
            session: SessionConfig::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl FortuneConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest-priority source that contributed a value
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Rename the robot everywhere the name is used
    pub fn set_robot_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.content.persona.clone_from(&name);
        self.session.robot_name.clone_from(&name);
        self.robot.name = name;
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

        if self.content.api_base.trim().is_empty() {
            return invalid("content.api_base must not be empty".to_string());
        }
        if self.content.model.trim().is_empty() {
            return invalid("content.model must not be empty".to_string());
        }
        if self.content.max_tokens == 0 {
            return invalid("content.max_tokens must be at least 1".to_string());
        }
        if !(0.0..=2.0).contains(&self.content.temperature) {
            return invalid(format!(
                "content.temperature must be between 0 and 2, got {}",
                self.content.temperature
            ));
        }
        if self.content.timeout_secs == 0 {
            return invalid("content.timeout_secs must be at least 1".to_string());
        }
        if let Err(e) = self.content.fallback_pool() {
            return invalid(format!("content.fallback: {e}"));
        }
        if self.robot.endpoint.host.trim().is_empty() {
            return invalid("robot.host must not be empty".to_string());
        }
        if self.robot.endpoint.port == 0 {
            return invalid("robot.port must not be 0".to_string());
        }
        if self.robot.name.trim().is_empty() {
            return invalid("robot.name must not be empty".to_string());
        }
        if self.session.max_turns == 0 {
            return invalid("session.max_turns must be at least 1".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/fortune-teller/config.toml` or
/// `~/.config/fortune-teller/config.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("fortune-teller").join("config.toml"))
}

/// Load configuration from the default path and the process environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if a
/// resolved value is out of range.
pub fn load_config() -> Result<FortuneConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path and the process environment
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed,
/// or if a resolved value is out of range.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<FortuneConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with an explicit environment lookup
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<FortuneConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = FortuneConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: FortuneToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);
    config.validate()?;
    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut FortuneConfig, toml: &FortuneToml) {
    // Content
    if let Some(ref base) = toml.content.api_base {
        config.content.api_base.clone_from(base);
    }
    if let Some(ref model) = toml.content.model {
        config.content.model.clone_from(model);
    }
    if let Some(tokens) = toml.content.max_tokens {
        config.content.max_tokens = tokens;
    }
    if let Some(temperature) = toml.content.temperature {
        config.content.temperature = temperature;
    }
    if let Some(timeout) = toml.content.timeout_secs {
        config.content.timeout_secs = timeout;
    }
    if let Some(aware) = toml.content.gesture_aware {
        config.content.gesture_aware = aware;
    }
    if let Some(ref fallback) = toml.content.fallback {
        config.content.fallback.clone_from(fallback);
    }

    // Robot
    if let Some(backend) = toml.robot.backend {
        config.robot.backend = backend;
    }
    if let Some(ref host) = toml.robot.host {
        config.robot.endpoint.host.clone_from(host);
    }
    if let Some(port) = toml.robot.port {
        config.robot.endpoint.port = port;
    }
    if let Some(ref name) = toml.robot.name {
        config.set_robot_name(name.clone());
    }

    // Session
    if let Some(turns) = toml.session.max_turns {
        config.session.max_turns = turns;
    }
    if let Some(ask) = toml.session.ask_detail {
        config.session.ask_detail = ask;
    }
    if let Some(pause) = toml.session.pause_ms {
        config.session.pause_ms = pause;
    }
}

fn parse_flag(value: &str) -> bool {
    value != "0" && !value.eq_ignore_ascii_case("false") && !value.eq_ignore_ascii_case("no")
}

/// Apply environment variable overrides to the config
fn apply_env_config<F>(config: &mut FortuneConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = env("OPENAI_API_KEY") {
        if !key.trim().is_empty() {
            config.content.api_key = Some(key);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(base) = env("FORTUNE_API_BASE") {
        config.content.api_base = base;
        config.source = ConfigSource::Env;
    }
    if let Some(model) = env("FORTUNE_MODEL") {
        config.content.model = model;
        config.source = ConfigSource::Env;
    }
    if let Some(aware) = env("FORTUNE_GESTURE_AWARE") {
        config.content.gesture_aware = parse_flag(&aware);
        config.source = ConfigSource::Env;
    }
    if let Some(backend) = env("FORTUNE_BACKEND") {
        match backend.parse::<BackendKind>() {
            Ok(kind) => {
                config.robot.backend = kind;
                config.source = ConfigSource::Env;
            }
            Err(e) => tracing::warn!(error = %e, "Ignoring FORTUNE_BACKEND"),
        }
    }
    if let Some(host) = env("PEPPER_IP") {
        config.robot.endpoint.host = host;
        config.source = ConfigSource::Env;
    }
    if let Some(port) = env("PEPPER_PORT") {
        if let Ok(port) = port.parse::<u16>() {
            config.robot.endpoint.port = port;
            config.source = ConfigSource::Env;
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Default)]
pub struct ConfigOverrides {
    /// Backend override
    pub backend: Option<BackendKind>,

    /// Robot host override
    pub host: Option<String>,

    /// Robot port override
    pub port: Option<u16>,

    /// Model override
    pub model: Option<String>,

    /// Credential override
    pub api_key: Option<String>,

    /// Gesture-aware mode override
    pub gesture_aware: Option<bool>,

    /// Turn limit override
    pub max_turns: Option<u32>,
}

impl fmt::Debug for ConfigOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigOverrides")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("gesture_aware", &self.gesture_aware)
            .field("max_turns", &self.max_turns)
            .finish()
    }
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set backend override
    #[must_use]
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set robot host override
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set robot port override
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set model override
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set credential override
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set gesture-aware override
    #[must_use]
    pub fn with_gesture_aware(mut self, aware: bool) -> Self {
        self.gesture_aware = Some(aware);
        self
    }

    /// Set turn limit override
    #[must_use]
    pub fn with_max_turns(mut self, turns: u32) -> Self {
        self.max_turns = Some(turns);
        self
    }

    fn is_empty(&self) -> bool {
        self.backend.is_none()
            && self.host.is_none()
            && self.port.is_none()
            && self.model.is_none()
            && self.api_key.is_none()
            && self.gesture_aware.is_none()
            && self.max_turns.is_none()
    }

    /// Apply overrides and re-validate
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if an override is out of range.
    pub fn apply(&self, config: &mut FortuneConfig) -> Result<(), ConfigError> {
        if !self.is_empty() {
            config.source = ConfigSource::Cli;
        }

        if let Some(backend) = self.backend {
            config.robot.backend = backend;
        }
        if let Some(ref host) = self.host {
            config.robot.endpoint.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.robot.endpoint.port = port;
        }
        if let Some(ref model) = self.model {
            config.content.model.clone_from(model);
        }
        if let Some(ref key) = self.api_key {
            config.content.api_key = Some(key.clone());
        }
        if let Some(aware) = self.gesture_aware {
            config.content.gesture_aware = aware;
        }
        if let Some(turns) = self.max_turns {
            config.session.max_turns = turns;
        }

        config.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
