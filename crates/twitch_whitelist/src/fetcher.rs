//! Remote whitelist retrieval.
//!
//! The whitelist server exposes one plaintext list per service identifier at
//! `list.php?id=<id>`, one username per line. A failed fetch is never an error
//! for the caller: it is logged and reads as an empty list.

use crate::error::{FetchFailure, Result, WhitelistError};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{info, warn};

/// Default list endpoint of the public whitelist service.
pub const DEFAULT_ENDPOINT: &str = "http://whitelist.twitchapps.com/list.php";

/// Default bound on a single list request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Anything that can produce the usernames for a service identifier.
///
/// Implementations must not fail: an unreachable source yields an empty list.
#[async_trait]
pub trait UsernameSource: Send + Sync {
    async fn fetch(&self, service_id: &str) -> Vec<String>;
}

/// [`UsernameSource`] backed by the HTTP whitelist service.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    endpoint: Url,
}

impl HttpFetcher {
    /// Builds a fetcher with its own client bounded by `timeout`.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Full URL of the list endpoint, without the `id` query
    /// * `timeout` - Upper bound on each request, body included; must be non-zero
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(WhitelistError::InvalidSettings(
                "request timeout must be non-zero".to_string(),
            ));
        }
        let client = Client::builder()
            .user_agent(concat!("twitch_whitelist/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Self::with_client(client, endpoint)
    }

    /// Builds a fetcher around an existing client.
    pub fn with_client(client: Client, endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| WhitelistError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// URL for one service identifier, with the identifier form-encoded.
    pub fn list_url(&self, service_id: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("id", service_id);
        url
    }

    async fn try_fetch(&self, service_id: &str) -> std::result::Result<Vec<String>, FetchFailure> {
        let response = self
            .client
            .get(self.list_url(service_id))
            .send()
            .await
            .map_err(FetchFailure::from_send)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(FetchFailure::from_body)?;
        Ok(parse_usernames(&body))
    }
}

#[async_trait]
impl UsernameSource for HttpFetcher {
    async fn fetch(&self, service_id: &str) -> Vec<String> {
        let usernames = match self.try_fetch(service_id).await {
            Ok(usernames) => usernames,
            Err(source) => {
                let err = WhitelistError::RemoteFetch {
                    service_id: service_id.to_string(),
                    source,
                };
                warn!("⚠️ {}", err);
                Vec::new()
            }
        };

        info!(
            "📥 Loaded {} from the whitelist server for ID \"{}\"",
            pluralize_usernames(usernames.len()),
            service_id
        );
        usernames
    }
}

/// Splits a list body into usernames, preserving order and duplicates.
///
/// Handles both `\n` and `\r\n` line endings. Blank lines are dropped and
/// do not count towards the loaded total.
pub fn parse_usernames(body: &str) -> Vec<String> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

fn pluralize_usernames(count: usize) -> String {
    if count == 1 {
        "1 username".to_string()
    } else {
        format!("{count} usernames")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher_for(server: &MockServer) -> HttpFetcher {
        HttpFetcher::new(&format!("{}/list.php", server.uri()), Duration::from_millis(500))
            .expect("fetcher should build")
    }

    #[test]
    fn test_parse_usernames_keeps_order_and_duplicates() {
        let parsed = parse_usernames("Alice\r\nbob\n\nalice\n");
        assert_eq!(parsed, vec!["Alice", "bob", "alice"]);
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize_usernames(0), "0 usernames");
        assert_eq!(pluralize_usernames(1), "1 username");
        assert_eq!(pluralize_usernames(7), "7 usernames");
    }

    #[test]
    fn test_list_url_encodes_identifier() {
        let fetcher = HttpFetcher::new(DEFAULT_ENDPOINT, DEFAULT_REQUEST_TIMEOUT).unwrap();
        let url = fetcher.list_url("my id&more");
        assert_eq!(
            url.as_str(),
            "http://whitelist.twitchapps.com/list.php?id=my+id%26more"
        );
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let result = HttpFetcher::new("not a url", DEFAULT_REQUEST_TIMEOUT);
        assert!(matches!(result, Err(WhitelistError::InvalidEndpoint(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = HttpFetcher::new(DEFAULT_ENDPOINT, Duration::ZERO);
        assert!(matches!(result, Err(WhitelistError::InvalidSettings(_))));
    }

    #[tokio::test]
    async fn test_fetch_returns_lines() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/list.php"))
            .and(query_param("id", "s1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Alice\nBOB\n"))
            .expect(1)
            .mount(&server)
            .await;

        let usernames = fetcher_for(&server).fetch("s1").await;
        assert_eq!(usernames, vec!["Alice", "BOB"]);
    }

    #[tokio::test]
    async fn test_fetch_sends_encoded_identifier() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/list.php"))
            .and(query_param("id", "team one/two"))
            .respond_with(ResponseTemplate::new(200).set_body_string("carol"))
            .mount(&server)
            .await;

        let usernames = fetcher_for(&server).fetch("team one/two").await;
        assert_eq!(usernames, vec!["carol"]);
    }

    #[tokio::test]
    async fn test_non_success_status_yields_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/list.php"))
            .respond_with(ResponseTemplate::new(500).set_body_string("alice\nbob"))
            .mount(&server)
            .await;

        assert!(fetcher_for(&server).fetch("s1").await.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_yields_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("alice")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        assert!(fetcher_for(&server).fetch("slow").await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_host_yields_empty() {
        let fetcher =
            HttpFetcher::new("http://127.0.0.1:9/list.php", Duration::from_millis(500)).unwrap();
        assert!(fetcher.fetch("s1").await.is_empty());
    }
}
