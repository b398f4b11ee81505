//! # Shelfscan Scanner Library
//!
//! Terminal front end and session controller for Shelfscan.
//!
//! ## Module Organization
//! ```text
//! shelfscan_scanner/
//! ├── lib.rs          ◄─── You are here (startup, tracing, command loop)
//! ├── config.rs       ◄─── scanner.toml + SHELFSCAN_* overrides
//! ├── controller.rs   ◄─── ScanSessionController
//! ├── commands.rs     ◄─── Line → Command parsing
//! ├── view.rs         ◄─── Snapshot rendering
//! ├── opener.rs       ◄─── External link opener
//! └── error.rs        ◄─── AppError for controller commands
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Scanner Startup                                   │
//! │                                                                         │
//! │  1. Initialize Logging ───────────────────────────────────────────────► │
//! │     • tracing-subscriber with env filter, written to stderr             │
//! │     • Default: info,shelfscan=debug, override with RUST_LOG             │
//! │                                                                         │
//! │  2. Load Configuration ───────────────────────────────────────────────► │
//! │     • defaults → scanner.toml → SHELFSCAN_* → --device                  │
//! │                                                                         │
//! │  3. Build Controller ─────────────────────────────────────────────────► │
//! │     • open_camera(&config.camera)                                       │
//! │     • pipeline_from_settings(&config.lookup_settings())                 │
//! │                                                                         │
//! │  4. Command Loop ─────────────────────────────────────────────────────► │
//! │     • stdin lines → Command → controller                                │
//! │     • snapshot changes → stdout                                         │
//! │                                                                         │
//! │  5. Teardown ─────────────────────────────────────────────────────────► │
//! │     • quit / EOF → controller.shutdown()                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod opener;
pub mod view;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use commands::{Command, CommandError, HELP};
use config::ScannerConfig;
use controller::ScanSessionController;
use error::AppError;
use opener::{ConsoleOpener, ExternalOpener};

/// Command-line arguments for the scanner.
#[derive(Parser, Debug, Default)]
#[command(name = "shelfscan")]
#[command(about = "Scan or type a barcode, get the product")]
#[command(version)]
pub struct Cli {
    /// Config file (default: platform config dir / scanner.toml)
    #[arg(short, long, env = "SHELFSCAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Camera device URI, e.g. stub://4006381333931
    #[arg(short, long)]
    pub device: Option<String>,

    /// Start the camera immediately
    #[arg(long)]
    pub scan: bool,

    /// Print snapshots as JSON lines
    #[arg(long)]
    pub json: bool,
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=shelfscan_lookup=trace` - Trace the provider chain only
/// - Default: `info,shelfscan=debug`
///
/// Logs go to stderr; stdout is the user-facing view.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,shelfscan=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads configuration, applying the command-line device last.
pub fn load_config(cli: &Cli) -> anyhow::Result<ScannerConfig> {
    let mut config = ScannerConfig::load(cli.config.clone()).context("Failed to load scanner config")?;

    if let Some(device) = &cli.device {
        config.camera.device = Some(device.clone());
        config.validate().context("Invalid --device")?;
    }

    Ok(config)
}

/// Builds a controller over the configured camera and catalog providers.
pub fn build_controller(
    config: &ScannerConfig,
    opener: Arc<dyn ExternalOpener>,
) -> Result<ScanSessionController, AppError> {
    let pipeline = shelfscan_lookup::pipeline_from_settings(&config.lookup_settings())?;
    let camera = shelfscan_camera::open_camera(&config.camera);
    Ok(ScanSessionController::new(camera, pipeline, opener))
}

/// Whether the command loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Runs one command against the controller.
pub async fn execute(controller: &ScanSessionController, command: Command) -> Result<Flow, AppError> {
    match command {
        Command::Scan => controller.start_scan().await?,
        Command::Stop => controller.stop_scan().await,
        Command::Submit { code, force } => {
            if !controller.submit_code(&code, force)? {
                println!("{} already shown, use 'submit --force {}' to look it up again", code.trim(), code.trim());
            }
        }
        Command::Reset => controller.reset().await,
        Command::Open(Some(url)) => controller.open_external(&url)?,
        Command::Open(None) => controller.open_details()?,
        Command::Search => controller.search_current()?,
        Command::Status => print!("{}", view::render(&controller.snapshot())),
        Command::Help => println!("{}", HELP),
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

/// Runs the scanner until `quit` or end of input.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let controller = build_controller(&config, Arc::new(ConsoleOpener))
        .context("Failed to build scan session")?;

    info!(
        providers = ?controller.pipeline().provider_names(),
        device = config.camera.device.as_deref().unwrap_or("none"),
        "Starting Shelfscan"
    );

    let printer = spawn_printer(&controller, cli.json);

    if cli.scan {
        if let Err(e) = controller.start_scan().await {
            warn!(error = %e, "Camera unavailable, manual entry still works");
        }
    }

    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(CommandError::Empty) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match execute(&controller, command).await {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(e) => println!("{}", e),
        }
    }

    controller.shutdown().await;
    printer.abort();
    info!("Shelfscan stopped");
    Ok(())
}

/// Prints the snapshot whenever its rendered form changes.
fn spawn_printer(controller: &ScanSessionController, json: bool) -> tokio::task::JoinHandle<()> {
    let mut snapshots = controller.subscribe();
    tokio::spawn(async move {
        let mut last = String::new();
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            let rendered = view::render(&snapshot);
            if rendered == last {
                continue;
            }
            if json {
                match serde_json::to_string(&snapshot) {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!(error = %e, "Failed to serialize snapshot"),
                }
            } else {
                print!("{}", rendered);
            }
            last = rendered;
        }
    })
}
