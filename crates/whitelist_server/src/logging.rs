//! Logging system setup and configuration.
//!
//! Initializes the tracing-based logging system with either human-readable or
//! JSON output.

use crate::config::LoggingSettings;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// HTTP client crates that log every list request at debug level.
const QUIET_TARGETS: &[&str] = &["hyper_util", "reqwest", "rustls"];

/// Builds the default filter: the configured level for our own output,
/// capped at `warn` for the HTTP stack behind the whitelist fetcher.
fn default_filter(level: &str) -> EnvFilter {
    let directives = QUIET_TARGETS
        .iter()
        .fold(level.to_string(), |acc, target| format!("{acc},{target}=warn"));
    EnvFilter::new(directives)
}

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over the configured level when set. Output is JSON when
/// either the config or `json_format` asks for it; thread names stay on so
/// refresh tasks can be told apart from the console.
pub fn setup_logging(
    config: &LoggingSettings,
    json_format: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(&config.level));

    let layer = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_names(true);
    let registry = tracing_subscriber::registry().with(filter);

    if json_format || config.json_format {
        registry.with(layer.json()).try_init()?;
    } else {
        registry.with(layer.with_ansi(true)).try_init()?;
    }

    info!("🔧 Logging initialized with level: {}", config.level);
    Ok(())
}

/// Displays the startup banner through the logging system.
pub fn display_banner() {
    let version = option_env!("CARGO_PKG_VERSION").unwrap_or("UNK");
    info!("╔══════════════════════════════════════════╗");
    info!("║        🎮 TWITCH WHITELIST SERVER 🎮      ║");
    info!("║                  v{}                  ║", version);
    info!("║                                          ║");
    info!("║  Subscriber-only logins, refreshed from  ║");
    info!("║  the remote whitelist every few minutes  ║");
    info!("╚══════════════════════════════════════════╝");
}
