//! Error types for the whitelist core.
//!
//! None of these ever reach the login path. Fetch failures are absorbed by the
//! fetcher and configuration problems only disable the periodic refresh.

use thiserror::Error;

/// Enumeration of whitelist failures.
#[derive(Debug, Error)]
pub enum WhitelistError {
    /// No service identifiers were configured, so nothing can be refreshed
    #[error("No whitelist service ids configured! Please check the config!")]
    Configuration,

    /// Retrieving the list for one service identifier failed
    #[error("Error attempting to retrieve usernames for whitelist ID \"{service_id}\": {source}")]
    RemoteFetch {
        service_id: String,
        #[source]
        source: FetchFailure,
    },

    /// A command was issued by a subject without the required permission
    #[error("{subject} does not have permission {permission}")]
    PermissionDenied {
        subject: String,
        permission: &'static str,
    },

    /// Settings the core cannot run with, such as a zero interval
    #[error("Invalid whitelist settings: {0}")]
    InvalidSettings(String),

    /// The configured whitelist endpoint could not be parsed as a URL
    #[error("Invalid whitelist endpoint: {0}")]
    InvalidEndpoint(String),

    /// The HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Reason a single fetch attempt produced no usernames.
#[derive(Debug, Error)]
pub enum FetchFailure {
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("whitelist server returned status {0}")]
    Status(u16),

    #[error("response body was not valid text: {0}")]
    Body(#[source] reqwest::Error),
}

impl FetchFailure {
    /// Classifies a reqwest error raised while sending the request.
    pub fn from_send(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchFailure::Timeout
        } else {
            FetchFailure::Transport(err)
        }
    }

    /// Classifies a reqwest error raised while reading the body.
    pub fn from_body(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchFailure::Timeout
        } else {
            FetchFailure::Body(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, WhitelistError>;
