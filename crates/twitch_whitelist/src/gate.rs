//! Login access gate.
//!
//! Consulted synchronously on every login attempt. It only reads the cache:
//! no network I/O and no waiting on a refresh in progress.

use crate::cache::WhitelistCache;
use crate::commands::{Subject, BYPASS_PERMISSION};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Default page players are sent to when they are not whitelisted.
pub const DEFAULT_ACTIVATION_URL: &str = "http://whitelist.twitchapps.com";

/// Outcome of a login check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginDecision {
    Allowed,
    /// The connection must be cancelled and `message` shown to the player
    Denied { message: String },
}

impl LoginDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, LoginDecision::Allowed)
    }
}

#[derive(Debug, Clone)]
pub struct AccessGate {
    cache: Arc<WhitelistCache>,
    rejection_message: String,
}

impl AccessGate {
    pub fn new(cache: Arc<WhitelistCache>, activation_url: &str) -> Self {
        Self {
            cache,
            rejection_message: rejection_message(activation_url),
        }
    }

    /// Whether `username` is currently on the whitelist.
    pub fn is_whitelisted(&self, username: &str, now: Instant) -> bool {
        self.cache.get(username, now)
    }

    /// Decides whether `player` may log in.
    ///
    /// Players off the whitelist are still let through when they hold
    /// [`BYPASS_PERMISSION`].
    pub fn check_login(&self, player: &dyn Subject, now: Instant) -> LoginDecision {
        if self.is_whitelisted(player.name(), now) {
            debug!("✅ {} is whitelisted", player.name());
            return LoginDecision::Allowed;
        }

        if player.has_permission(BYPASS_PERMISSION) {
            debug!("🔓 {} is not whitelisted but holds the bypass permission", player.name());
            return LoginDecision::Allowed;
        }

        info!("⛔ Denied login for {}: not on the whitelist", player.name());
        LoginDecision::Denied {
            message: self.rejection_message.clone(),
        }
    }

    pub fn rejection_message(&self) -> &str {
        &self.rejection_message
    }
}

fn rejection_message(activation_url: &str) -> String {
    format!(
        "You are not on the Twitch subserver whitelist!\n\n\
         Head to {activation_url} to activate your whitelist."
    )
}
