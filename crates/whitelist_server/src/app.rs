//! Main application logic and lifecycle management.
//!
//! The `Application` struct loads configuration, assembles the whitelist, runs
//! the operator console, and coordinates shutdown.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    console::{run_console, ConsoleExit},
    logging::display_banner,
    signals::{wait_for_shutdown_signal, wait_for_shutdown_signal_silent},
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use twitch_whitelist::{TwitchWhitelist, REFRESH_COMMAND};

/// Main application struct.
///
/// # Architecture
///
/// * **Configuration Management**: Loads and validates configuration from files and CLI
/// * **Whitelist**: One shared cache behind the login gate and the refresh scheduler
/// * **Console**: Operator commands read from stdin
/// * **Graceful Shutdown**: Handles termination signals and cancels background refreshes
pub struct Application {
    config: AppConfig,
    config_path: PathBuf,
    whitelist: Arc<TwitchWhitelist>,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// # Process
    ///
    /// 1. Load configuration from file (creating default if missing)
    /// 2. Apply command-line argument overrides
    /// 3. Validate merged configuration
    /// 4. Display startup banner
    /// 5. Assemble the whitelist with its HTTP fetcher
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        apply_overrides(&mut config, &args);

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        } else {
            info!("✅ Configuration loaded and validated successfully");
        }

        display_banner();

        let whitelist = TwitchWhitelist::from_settings(&config.whitelist)?;

        Ok(Self {
            config,
            config_path: args.config_path,
            whitelist: Arc::new(whitelist),
        })
    }

    /// Runs until a shutdown signal arrives or the console asks to stop.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting Twitch Whitelist Server");
        self.log_configuration_summary();

        if !self.whitelist.start() {
            warn!(
                "⚠️ Periodic refresh disabled; '{}' still works from the console",
                REFRESH_COMMAND
            );
        }

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let console_handle = {
            let whitelist = self.whitelist.clone();
            tokio::spawn(async move {
                match run_console(whitelist).await {
                    ConsoleExit::Stop => {
                        let _ = stop_tx.send(());
                    }
                    ConsoleExit::EndOfInput => {
                        info!("⌨️ Console input closed; waiting for a shutdown signal");
                    }
                }
            })
        };

        info!("✅ Whitelist server is now running!");
        info!("⌨️ Type 'help' for console commands");
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        // A dropped sender disables the console branch, leaving only signals
        tokio::select! {
            result = wait_for_shutdown_signal() => result?,
            Ok(()) = stop_rx => {}
        }
        console_handle.abort();

        // merciless shutdown
        tokio::spawn(async move {
            if let Err(e) = wait_for_shutdown_signal_silent().await {
                error!("Failed to set up merciless shutdown signal handler: {e}");
                return;
            }

            warn!("Shutdown handler received again! I'll make this quick.");
            std::process::exit(1);
        });

        info!("🛑 Shutting down...");
        self.whitelist.shutdown();

        info!("📊 Final Statistics:");
        info!("  - Cached whitelist entries: {}", self.whitelist.cache().len());
        info!("✅ Whitelist server shutdown complete");

        Ok(())
    }

    fn log_configuration_summary(&self) {
        let settings = &self.config.whitelist;
        info!("📋 Configuration Summary:");
        info!("  📂 Config file: {}", self.config_path.display());
        info!("  🌐 Endpoint: {}", settings.endpoint);
        info!("  🆔 Service ids: {:?}", settings.ids);
        info!("  ⏱️ Refresh interval: {}s", settings.refresh_interval_secs);
        info!("  ⌛ Request timeout: {}s", settings.request_timeout_secs);
    }
}

/// Applies command-line overrides on top of the file configuration.
fn apply_overrides(config: &mut AppConfig, args: &CliArgs) {
    if let Some(log_level) = &args.log_level {
        config.logging.level = log_level.clone();
    }

    if args.json_logs {
        config.logging.json_format = true;
    }

    if !args.service_ids.is_empty() {
        config.whitelist.ids = args.service_ids.clone();
    }
}
