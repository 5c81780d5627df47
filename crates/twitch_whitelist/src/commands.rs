//! Operator command surface and permission names.

use crate::error::{Result, WhitelistError};
use crate::scheduler::RefreshScheduler;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Command name that triggers an immediate refresh.
pub const REFRESH_COMMAND: &str = "twitchrefresh";

/// Permission required to run [`REFRESH_COMMAND`].
pub const RELOAD_PERMISSION: &str = "twitchwhitelist.reload";

/// Permission that lets a player log in without being whitelisted.
pub const BYPASS_PERMISSION: &str = "twitchwhitelist.bypass";

/// Message sent to the operator once a manual refresh has finished.
pub const REFRESH_CONFIRMATION: &str = "Twitch whitelist refreshed!";

/// An identity the host can answer permission questions about.
pub trait Subject: Send + Sync {
    fn name(&self) -> &str;
    fn has_permission(&self, permission: &str) -> bool;
}

/// A [`Subject`] that can also receive feedback, such as a console or player.
pub trait CommandSource: Subject {
    fn send_message(&self, message: &str);
}

/// Handles `twitchrefresh` issued by `source`.
///
/// The refresh runs in the background; the confirmation is sent to `source`
/// when it completes, regardless of how many identifiers failed.
///
/// # Errors
///
/// [`WhitelistError::PermissionDenied`] if `source` lacks [`RELOAD_PERMISSION`].
pub fn execute_refresh(
    scheduler: &RefreshScheduler,
    source: Arc<dyn CommandSource>,
) -> Result<JoinHandle<()>> {
    if !source.has_permission(RELOAD_PERMISSION) {
        warn!(
            "🚫 {} tried to run {} without {}",
            source.name(),
            REFRESH_COMMAND,
            RELOAD_PERMISSION
        );
        return Err(WhitelistError::PermissionDenied {
            subject: source.name().to_string(),
            permission: RELOAD_PERMISSION,
        });
    }

    info!("🔧 {} requested a whitelist refresh", source.name());
    let requested_by = source.name().to_string();
    Ok(scheduler.trigger_manual(&requested_by, move |_report| {
        source.send_message(REFRESH_CONFIRMATION);
    }))
}
