//! # Twitch Whitelist Server - Main Entry Point
//!
//! Host process for the Twitch whitelist: parses the CLI, loads the TOML
//! configuration, sets up logging, and runs the whitelist with an operator
//! console until shutdown.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration (writes config.toml if missing)
//! whitelist_server
//!
//! # Specify custom configuration
//! whitelist_server --config production.toml
//!
//! # Override the service ids and log level
//! whitelist_server --id my-channel --id partner-channel --log-level debug
//!
//! # JSON logging for production
//! whitelist_server --json-logs
//! ```
//!
//! ## Signal Handling
//!
//! The server shuts down gracefully on SIGINT (Ctrl+C) and SIGTERM (Unix).
//! A second signal exits immediately.

use tracing::error;

pub mod app;
pub mod cli;
pub mod config;
pub mod console;
pub mod logging;
pub mod signals;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

/// Runs the whitelist server to completion.
///
/// # Exit Codes
///
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
///
/// Called from the async `main`, so it does not start a runtime itself.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Load configuration to get logging settings
    let config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();

    let mut log_settings = config.logging;
    if let Some(level) = &args.log_level {
        log_settings.level = level.clone();
    }
    if let Err(e) = logging::setup_logging(&log_settings, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

pub use config::LoggingSettings;
