//! Whitelist configuration section.

use crate::fetcher::{DEFAULT_ENDPOINT, DEFAULT_REQUEST_TIMEOUT};
use crate::gate::DEFAULT_ACTIVATION_URL;
use crate::scheduler::DEFAULT_REFRESH_INTERVAL;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_activation_url() -> String {
    DEFAULT_ACTIVATION_URL.to_string()
}

fn default_refresh_interval_secs() -> u64 {
    DEFAULT_REFRESH_INTERVAL.as_secs()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

/// Settings for the remote whitelist.
///
/// Only `ids` is required in practice; every other field has the public
/// whitelist service defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WhitelistSettings {
    /// Service identifiers whose lists are merged into the whitelist
    #[serde(default)]
    pub ids: Vec<String>,
    /// List endpoint queried as `<endpoint>?id=<service id>`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Page shown to players who are not whitelisted
    #[serde(default = "default_activation_url")]
    pub activation_url: String,
    /// Seconds between automatic refreshes
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// Upper bound in seconds on a single list request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for WhitelistSettings {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            endpoint: default_endpoint(),
            activation_url: default_activation_url(),
            refresh_interval_secs: default_refresh_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl WhitelistSettings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Checks the settings for values the core cannot run with.
    ///
    /// An empty `ids` list is accepted here; it only disables the periodic
    /// refresh.
    pub fn validate(&self) -> Result<(), String> {
        if reqwest::Url::parse(&self.endpoint).is_err() {
            return Err(format!("Invalid whitelist endpoint: {}", self.endpoint));
        }

        if self.refresh_interval_secs == 0 {
            return Err("whitelist.refresh_interval_secs must be greater than 0".to_string());
        }

        if self.request_timeout_secs == 0 {
            return Err("whitelist.request_timeout_secs must be greater than 0".to_string());
        }

        if self.ids.iter().any(|id| id.trim().is_empty()) {
            return Err("whitelist.ids cannot contain blank entries".to_string());
        }

        Ok(())
    }
}
