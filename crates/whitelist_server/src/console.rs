//! Operator console.
//!
//! Reads commands from stdin and forwards them to the whitelist hooks. The
//! console acts with every permission, like a server console would.

use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use twitch_whitelist::{
    CommandSource, LoginDecision, Subject, TwitchWhitelist, BYPASS_PERMISSION, REFRESH_COMMAND,
};

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Refresh the whitelist now
    Refresh,
    /// Simulate a login attempt
    Login { username: String, bypass: bool },
    /// Report whether a username is whitelisted
    Check { username: String },
    Stats,
    Help,
    Stop,
}

/// Parses one console line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };

    let parsed = match command {
        REFRESH_COMMAND => ConsoleCommand::Refresh,
        "login" => {
            let username = words.next().ok_or("usage: login <username> [--bypass]")?;
            let bypass = match words.next() {
                None => false,
                Some("--bypass") => true,
                Some(other) => return Err(format!("unknown login flag: {other}")),
            };
            ConsoleCommand::Login {
                username: username.to_string(),
                bypass,
            }
        }
        "check" => {
            let username = words.next().ok_or("usage: check <username>")?;
            ConsoleCommand::Check {
                username: username.to_string(),
            }
        }
        "stats" => ConsoleCommand::Stats,
        "help" => ConsoleCommand::Help,
        "stop" | "exit" | "quit" => ConsoleCommand::Stop,
        other => return Err(format!("unknown command: {other} (try 'help')")),
    };

    Ok(Some(parsed))
}

/// Why the console loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleExit {
    /// The operator entered `stop`
    Stop,
    /// Input closed, e.g. stdin is not attached
    EndOfInput,
}

/// The console as a command source.
pub struct ConsoleSource;

impl Subject for ConsoleSource {
    fn name(&self) -> &str {
        "Console"
    }

    fn has_permission(&self, _permission: &str) -> bool {
        true
    }
}

impl CommandSource for ConsoleSource {
    fn send_message(&self, message: &str) {
        info!("💬 {}", message);
    }
}

/// A player connecting through the console's `login` command.
struct ConsolePlayer {
    username: String,
    bypass: bool,
}

impl Subject for ConsolePlayer {
    fn name(&self) -> &str {
        &self.username
    }

    fn has_permission(&self, permission: &str) -> bool {
        self.bypass && permission == BYPASS_PERMISSION
    }
}

/// Reads stdin lines on a dedicated thread.
///
/// Tokio's stdin blocks runtime shutdown until the pending read returns, so
/// the blocking reads live on a detached thread instead.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name("console-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("❌ Console input failed: {}", e);
                        break;
                    }
                }
            }
        });

    if let Err(e) = spawned {
        warn!("❌ Could not start console reader: {}", e);
    }
    rx
}

/// Runs the console on stdin until `stop` is entered or input ends.
pub async fn run_console(whitelist: Arc<TwitchWhitelist>) -> ConsoleExit {
    run_console_with(spawn_stdin_reader(), whitelist).await
}

/// Runs the console over any stream of lines.
pub async fn run_console_with(
    mut lines: mpsc::UnboundedReceiver<String>,
    whitelist: Arc<TwitchWhitelist>,
) -> ConsoleExit {
    let source: Arc<dyn CommandSource> = Arc::new(ConsoleSource);

    while let Some(line) = lines.recv().await {
        match parse_command(&line) {
            Ok(None) => {}
            Ok(Some(ConsoleCommand::Stop)) => {
                info!("🛑 Stop requested from console");
                return ConsoleExit::Stop;
            }
            Ok(Some(command)) => execute(command, &whitelist, &source),
            Err(e) => warn!("❓ {}", e),
        }
    }

    ConsoleExit::EndOfInput
}

fn execute(command: ConsoleCommand, whitelist: &TwitchWhitelist, source: &Arc<dyn CommandSource>) {
    match command {
        ConsoleCommand::Refresh => {
            if let Err(e) = whitelist.on_refresh_command(source.clone()) {
                warn!("❌ {}", e);
            }
        }
        ConsoleCommand::Login { username, bypass } => {
            let player = ConsolePlayer { username, bypass };
            match whitelist.on_login(&player) {
                LoginDecision::Allowed => info!("🟢 {} may join", player.username),
                LoginDecision::Denied { message } => {
                    info!("🔴 {} was disconnected: {}", player.username, message)
                }
            }
        }
        ConsoleCommand::Check { username } => {
            let status = if whitelist.is_whitelisted(&username) {
                "is"
            } else {
                "is not"
            };
            info!("🔍 {} {} whitelisted", username, status);
        }
        ConsoleCommand::Stats => {
            info!(
                "📊 {} cached entries | periodic refresh {} | {} service id(s)",
                whitelist.cache().len(),
                if whitelist.is_running() { "running" } else { "disabled" },
                whitelist.scheduler().service_ids().len()
            );
        }
        ConsoleCommand::Help => {
            info!("📖 Commands:");
            info!("  {}                      refresh the whitelist now", REFRESH_COMMAND);
            info!("  login <name> [--bypass]            simulate a player login");
            info!("  check <name>                       show whitelist status");
            info!("  stats                              cache statistics");
            info!("  stop                               shut down");
        }
        ConsoleCommand::Stop => {}
    }
}
