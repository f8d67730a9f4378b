//! Fortune Teller - Interactive Fortune Telling Session
//!
//! Runs one fortune telling session against a text console, the built-in
//! kinematic simulation, or a physical robot.
//!
//! # Usage
//!
//! ```bash
//! # Text-only session
//! fortune-teller
//!
//! # Simulated robot
//! fortune-teller --backend simulated
//!
//! # Physical robot
//! fortune-teller --backend hardware --host 192.168.1.20 --port 9559
//!
//! # Remote fortunes with gesture tags
//! OPENAI_API_KEY=sk-... fortune-teller --gesture-aware
//!
//! # Verbose logging (written to stderr)
//! RUST_LOG=debug fortune-teller
//! ```
//!
//! # Signals
//!
//! - `SIGINT` (Ctrl-C): ends the session and puts the robot to rest

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use oracle_core::{
    load_config, load_config_from_path, ActuatorBackend, ActuatorError, BackendKind,
    ConfigOverrides, Console, ConsoleInterlocutor, ContentProvider, ExitReason, FortuneConfig,
    HardwareBackend, KinematicWorld, SessionController, SimulatedBackend, TerminalBackend,
};

/// Fortune Teller - a mystical robot session
#[derive(Parser, Debug)]
#[command(name = "fortune-teller")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Backend to drive (terminal, simulated, hardware)
    #[arg(short = 'b', long, value_parser = parse_backend, value_name = "BACKEND")]
    backend: Option<BackendKind>,

    /// Robot host for the hardware backend
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// Robot port for the hardware backend
    #[arg(short = 'p', long, value_name = "PORT")]
    port: Option<u16>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "FORTUNE_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Chat model for remote fortunes
    #[arg(short = 'm', long, value_name = "MODEL")]
    model: Option<String>,

    /// Ask the model to embed gesture tags in fortunes
    #[arg(short = 'g', long)]
    gesture_aware: bool,

    /// Fortunes per session
    #[arg(long, value_name = "N")]
    max_turns: Option<u32>,

    /// Do not ask for a credential when none is configured
    #[arg(long)]
    no_key_prompt: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "FORTUNE_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

fn parse_backend(value: &str) -> Result<BackendKind, String> {
    value.parse::<BackendKind>().map_err(|e| e.to_string())
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        overrides.backend = self.backend;
        overrides.host.clone_from(&self.host);
        overrides.port = self.port;
        overrides.model.clone_from(&self.model);
        overrides.max_turns = self.max_turns;
        if self.gesture_aware {
            overrides.gesture_aware = Some(true);
        }
        overrides
    }
}

/// Initialize logging on stderr so the dialogue on stdout stays readable
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("fortune_teller={level},oracle_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Offer to read a credential from the console when none is configured
async fn prompt_for_key(console: &Console) -> Result<Option<String>> {
    console
        .println("\nNo OpenAI API key found in environment variables.")
        .await;
    let answer = console
        .ask("Would you like to enter an OpenAI API key? (yes/no): ")
        .await?;
    let wants_key = answer
        .map(|a| a.trim().to_ascii_lowercase().starts_with('y'))
        .unwrap_or(false);

    if !wants_key {
        console
            .println("Will use fallback fortune generation without LLM.")
            .await;
        return Ok(None);
    }

    let key = console.ask("Enter your OpenAI API key: ").await?;
    Ok(key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()))
}

/// Construct the configured backend
async fn build_backend(
    config: &FortuneConfig,
    console: &Console,
) -> Result<Box<dyn ActuatorBackend>, ActuatorError> {
    let name = config.robot.name.clone();
    match config.robot.backend {
        BackendKind::Terminal => Ok(Box::new(TerminalBackend::new(console.clone(), name).await)),
        BackendKind::Simulated => {
            let world = Box::new(KinematicWorld::default());
            Ok(Box::new(SimulatedBackend::launch(
                world,
                console.clone(),
                name,
            )?))
        }
        BackendKind::Hardware => {
            info!(endpoint = %config.robot.endpoint, "Connecting to robot");
            Ok(Box::new(
                HardwareBackend::connect(&config.robot.endpoint).await?,
            ))
        }
    }
}

/// Resolves when Ctrl-C is pressed; never resolves if the handler fails
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "Fortune teller starting");

    let mut config = match args.config.clone() {
        Some(path) => load_config_from_path(Some(path)),
        None => load_config(),
    }
    .context("Failed to load configuration")?;

    let mut overrides = args.overrides();
    let console = Console::stdio();

    if config.content.credential().is_none() && !args.no_key_prompt {
        if let Some(key) = prompt_for_key(&console).await? {
            overrides.api_key = Some(key);
        }
    }
    overrides
        .apply(&mut config)
        .context("Invalid command-line option")?;

    info!(
        backend = %config.robot.backend,
        source = %config.source(),
        remote = config.content.credential().is_some(),
        "Configuration resolved"
    );

    let content =
        ContentProvider::new(config.content.clone()).context("Invalid fallback fortunes")?;

    let backend = match build_backend(&config, &console).await {
        Ok(backend) => backend,
        Err(e) => {
            error!(error = %e, backend = %config.robot.backend, "Backend unavailable");
            return Err(e).context(format!(
                "Cannot start the {} backend",
                config.robot.backend
            ));
        }
    };

    let interlocutor = Box::new(ConsoleInterlocutor::new(console.clone()));
    let mut session =
        SessionController::new(backend, content, interlocutor, config.session.clone());
    let outcome = session.run(interrupted()).await;

    info!(session = %outcome.id, turns = outcome.turns, "Fortune teller finished");
    match outcome.exit {
        ExitReason::Failed(reason) => anyhow::bail!("Session failed: {reason}"),
        ExitReason::Completed | ExitReason::Declined | ExitReason::Cancelled => Ok(()),
    }
}
