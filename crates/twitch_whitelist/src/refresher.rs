//! Refresh cycle: fetch every service identifier and merge into the cache.

use crate::cache::{normalize, WhitelistCache};
use crate::fetcher::UsernameSource;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Summary of one refresh cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Number of service identifiers queried
    pub identifiers: usize,
    /// Usernames returned across all identifiers, duplicates included
    pub fetched: usize,
    /// Distinct lower-cased usernames written to the cache
    pub written: usize,
}

/// Fans a [`UsernameSource`] out over service identifiers and upserts the
/// merged result into a shared [`WhitelistCache`].
///
/// Entries are only ever added or re-stamped here. A username that drops off
/// the remote list stays whitelisted until its TTL runs out.
#[derive(Clone)]
pub struct Refresher {
    cache: Arc<WhitelistCache>,
    source: Arc<dyn UsernameSource>,
}

impl Refresher {
    pub fn new(cache: Arc<WhitelistCache>, source: Arc<dyn UsernameSource>) -> Self {
        Self { cache, source }
    }

    pub fn cache(&self) -> &Arc<WhitelistCache> {
        &self.cache
    }

    /// Runs one refresh cycle stamped with `now`.
    ///
    /// All identifiers are fetched concurrently. A failing identifier simply
    /// contributes no usernames; the others are still merged.
    pub async fn refresh(&self, service_ids: &[String], now: Instant) -> RefreshReport {
        let lists = join_all(service_ids.iter().map(|id| self.source.fetch(id))).await;

        let fetched = lists.iter().map(Vec::len).sum();
        let distinct: HashSet<String> = lists
            .into_iter()
            .flatten()
            .map(|username| normalize(&username))
            .collect();

        for username in &distinct {
            self.cache.put(username, true, now);
        }

        let report = RefreshReport {
            identifiers: service_ids.len(),
            fetched,
            written: distinct.len(),
        };
        debug!("🔄 Whitelist refresh merged: {:?}", report);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory source; identifiers without a list behave like a failed fetch.
    struct StaticSource {
        lists: HashMap<String, Vec<String>>,
        calls: AtomicUsize,
    }

    impl StaticSource {
        fn new(lists: Vec<(&str, Vec<&str>)>) -> Self {
            Self {
                lists: lists
                    .into_iter()
                    .map(|(id, names)| {
                        (id.to_string(), names.into_iter().map(str::to_string).collect())
                    })
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl UsernameSource for StaticSource {
        async fn fetch(&self, service_id: &str) -> Vec<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.lists.get(service_id).cloned().unwrap_or_default()
        }
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_refresh_normalizes_and_dedupes() {
        let cache = Arc::new(WhitelistCache::new());
        let source = Arc::new(StaticSource::new(vec![
            ("s1", vec!["Alice", "BOB"]),
            ("s2", vec!["alice", "Carol"]),
        ]));
        let refresher = Refresher::new(cache.clone(), source.clone());
        let now = Instant::now();

        let report = refresher.refresh(&ids(&["s1", "s2"]), now).await;

        assert_eq!(
            report,
            RefreshReport {
                identifiers: 2,
                fetched: 4,
                written: 3
            }
        );
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert!(cache.get("alice", now));
        assert!(cache.get("bob", now));
        assert!(cache.get("carol", now));
        assert_eq!(cache.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_identifier_is_isolated() {
        let cache = Arc::new(WhitelistCache::new());
        // "A" is unknown to the source, which is how a failed fetch looks
        let source = Arc::new(StaticSource::new(vec![("B", vec!["alice", "bob"])]));
        let refresher = Refresher::new(cache.clone(), source);
        let now = Instant::now();

        let report = refresher.refresh(&ids(&["A", "B"]), now).await;

        assert_eq!(report.written, 2);
        assert!(cache.get("alice", now));
        assert!(cache.get("bob", now));
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_twice_is_idempotent() {
        let cache = Arc::new(WhitelistCache::new());
        let source = Arc::new(StaticSource::new(vec![("s1", vec!["alice"])]));
        let refresher = Refresher::new(cache.clone(), source);
        let now = Instant::now();

        refresher.refresh(&ids(&["s1"]), now).await;
        refresher.refresh(&ids(&["s1"]), now).await;

        assert_eq!(cache.len(), 1);
        assert!(cache.get("alice", now));
        assert!(!cache.get("bob", now));
    }

    #[tokio::test]
    async fn test_no_identifiers_writes_nothing() {
        let cache = Arc::new(WhitelistCache::new());
        let source = Arc::new(StaticSource::new(vec![("s1", vec!["alice"])]));
        let refresher = Refresher::new(cache.clone(), source.clone());

        let report = refresher.refresh(&[], Instant::now()).await;

        assert_eq!(report, RefreshReport::default());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_omitted_username_kept_until_ttl() {
        let cache = Arc::new(WhitelistCache::new());
        let first = Refresher::new(
            cache.clone(),
            Arc::new(StaticSource::new(vec![("s1", vec!["alice", "bob"])])),
        );
        let second = Refresher::new(
            cache.clone(),
            Arc::new(StaticSource::new(vec![("s1", vec!["alice"])])),
        );
        let t = Instant::now();

        first.refresh(&ids(&["s1"]), t).await;
        let later = t + std::time::Duration::from_secs(10 * 60);
        second.refresh(&ids(&["s1"]), later).await;

        assert!(cache.get("bob", later));
        assert!(!cache.get("bob", t + crate::cache::WHITELIST_TTL));
        assert!(cache.get("alice", t + crate::cache::WHITELIST_TTL));
    }
}
