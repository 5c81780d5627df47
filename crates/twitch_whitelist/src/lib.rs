//! # Twitch Whitelist
//!
//! Login whitelist for a game server, backed by a remote list
//! service. Usernames are fetched per service identifier over HTTP, merged
//! case-insensitively into an expiring in-memory cache, and consulted
//! synchronously whenever a player logs in.
//!
//! ## Components
//!
//! * [`WhitelistCache`] - concurrent username map with a 30 minute TTL
//! * [`HttpFetcher`] - retrieves one identifier's list; failures read as empty
//! * [`Refresher`] - fans the fetcher out and merges results into the cache
//! * [`RefreshScheduler`] - periodic and manual refresh triggers
//! * [`AccessGate`] - login decision from the cache plus the bypass permission
//!
//! [`TwitchWhitelist`] wires them together for a host process.
//!
//! ## Example
//!
//! ```rust,no_run
//! use twitch_whitelist::{TwitchWhitelist, WhitelistSettings};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = WhitelistSettings {
//!     ids: vec!["my-channel".to_string()],
//!     ..Default::default()
//! };
//! let whitelist = TwitchWhitelist::from_settings(&settings)?;
//! whitelist.start();
//! assert!(!whitelist.is_whitelisted("somebody"));
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod commands;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod gate;
pub mod refresher;
pub mod scheduler;


pub use cache::{WhitelistCache, WHITELIST_TTL};
pub use commands::{
    execute_refresh, CommandSource, Subject, BYPASS_PERMISSION, REFRESH_COMMAND,
    REFRESH_CONFIRMATION, RELOAD_PERMISSION,
};
pub use config::WhitelistSettings;
pub use error::{FetchFailure, Result, WhitelistError};
pub use fetcher::{HttpFetcher, UsernameSource};
pub use gate::{AccessGate, LoginDecision};
pub use refresher::{RefreshReport, Refresher};
pub use scheduler::{RecurringTask, RefreshScheduler};

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::info;

/// The assembled whitelist: one cache shared by the gate and the scheduler.
pub struct TwitchWhitelist {
    cache: Arc<WhitelistCache>,
    gate: AccessGate,
    scheduler: RefreshScheduler,
    periodic: Mutex<Option<RecurringTask>>,
}

impl TwitchWhitelist {
    /// Assembles the whitelist around an arbitrary username source.
    pub fn new(settings: &WhitelistSettings, source: Arc<dyn UsernameSource>) -> Self {
        let cache = Arc::new(WhitelistCache::new());
        let gate = AccessGate::new(cache.clone(), &settings.activation_url);
        let refresher = Refresher::new(cache.clone(), source);
        let scheduler =
            RefreshScheduler::new(refresher, settings.ids.clone(), settings.refresh_interval());

        Self {
            cache,
            gate,
            scheduler,
            periodic: Mutex::new(None),
        }
    }

    /// Assembles the whitelist with an [`HttpFetcher`] built from `settings`.
    ///
    /// # Errors
    ///
    /// [`WhitelistError::InvalidSettings`] if `settings` fail validation.
    pub fn from_settings(settings: &WhitelistSettings) -> Result<Self> {
        settings.validate().map_err(WhitelistError::InvalidSettings)?;
        let fetcher = HttpFetcher::new(&settings.endpoint, settings.request_timeout())?;
        Ok(Self::new(settings, Arc::new(fetcher)))
    }

    /// Arms the periodic refresh. Returns false when no service identifiers
    /// are configured, in which case only manual refreshes will run.
    pub fn start(&self) -> bool {
        let mut periodic = self.periodic.lock().unwrap_or_else(PoisonError::into_inner);
        if periodic.is_some() {
            return true;
        }
        match self.scheduler.start() {
            Ok(task) => {
                info!("🚀 Started {}", task.name());
                *periodic = Some(task);
                true
            }
            Err(_) => false,
        }
    }

    /// Whether the periodic refresh is currently armed.
    pub fn is_running(&self) -> bool {
        self.periodic
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn is_whitelisted(&self, username: &str) -> bool {
        self.gate.is_whitelisted(username, Instant::now())
    }

    /// Login hook: decides whether `player` may join right now.
    pub fn on_login(&self, player: &dyn Subject) -> LoginDecision {
        self.gate.check_login(player, Instant::now())
    }

    /// Command hook for [`REFRESH_COMMAND`].
    pub fn on_refresh_command(&self, source: Arc<dyn CommandSource>) -> Result<JoinHandle<()>> {
        execute_refresh(&self.scheduler, source)
    }

    /// Cancels the periodic refresh. Manual refreshes already running finish
    /// on their own.
    pub fn shutdown(&self) {
        let task = self
            .periodic
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.cancel();
            info!("🛑 Stopped {}", task.name());
        }
    }

    pub fn cache(&self) -> &Arc<WhitelistCache> {
        &self.cache
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }
}
