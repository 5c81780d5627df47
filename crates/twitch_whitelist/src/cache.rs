//! Expiring username cache.
//!
//! Entries live for a fixed time-to-live measured from their last write. Reads
//! never return an entry past its TTL, whether or not it has been purged yet.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Time-to-live applied to every whitelist entry.
pub const WHITELIST_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy)]
struct WhitelistEntry {
    present: bool,
    written_at: Instant,
}

impl WhitelistEntry {
    fn is_live(&self, now: Instant, ttl: Duration) -> bool {
        // `now` earlier than the write counts as live
        now.saturating_duration_since(self.written_at) < ttl
    }
}

/// Concurrent map from lower-cased username to whitelist status.
///
/// The cache is the only shared mutable state in the whitelist core. It is
/// built once at startup and handed out behind an `Arc`.
#[derive(Debug)]
pub struct WhitelistCache {
    entries: DashMap<String, WhitelistEntry>,
    ttl: Duration,
}

impl WhitelistCache {
    /// Creates an empty cache with the standard 30 minute TTL.
    pub fn new() -> Self {
        Self::with_ttl(WHITELIST_TTL)
    }

    /// Creates an empty cache with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Inserts or overwrites the entry for `username`, stamped with `now`.
    ///
    /// A write carrying an older timestamp than the stored entry is ignored so
    /// that overlapping refreshes resolve to the latest one.
    pub fn put(&self, username: &str, present: bool, now: Instant) {
        let key = normalize(username);
        let fresh = WhitelistEntry {
            present,
            written_at: now,
        };

        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().written_at <= now {
                    occupied.insert(fresh);
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
            }
        }
    }

    /// Returns true if `username` was marked present within the last TTL.
    pub fn get(&self, username: &str, now: Instant) -> bool {
        self.entries
            .get(&normalize(username))
            .map(|entry| entry.present && entry.is_live(now, self.ttl))
            .unwrap_or(false)
    }

    /// Removes every entry whose TTL has elapsed, returning how many went.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now, self.ttl));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!("🧹 Purged {} expired whitelist entries", removed);
        }
        removed
    }

    /// Number of physically stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for WhitelistCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical form of a username for storage and lookup.
pub fn normalize(username: &str) -> String {
    username.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_entry_live_for_full_ttl_window() {
        let cache = WhitelistCache::new();
        let t = Instant::now();
        cache.put("alice", true, t);

        assert!(cache.get("alice", t));
        assert!(cache.get("alice", t + Duration::from_secs(29 * 60)));
        assert!(cache.get("alice", t + WHITELIST_TTL - Duration::from_millis(1)));
        assert!(!cache.get("alice", t + WHITELIST_TTL));
        assert!(!cache.get("alice", t + WHITELIST_TTL + Duration::from_secs(1)));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let cache = WhitelistCache::new();
        let t = Instant::now();
        cache.put("Foo", true, t);

        assert!(cache.get("foo", t));
        assert!(cache.get("FOO", t));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_missing_and_absent_marker_are_not_whitelisted() {
        let cache = WhitelistCache::new();
        let t = Instant::now();
        assert!(!cache.get("nobody", t));

        cache.put("ghost", false, t);
        assert!(!cache.get("ghost", t));
    }

    #[test]
    fn test_rewrite_extends_window() {
        let cache = WhitelistCache::new();
        let t = Instant::now();
        cache.put("bob", true, t);
        cache.put("bob", true, t + Duration::from_secs(20 * 60));

        assert!(cache.get("bob", t + Duration::from_secs(45 * 60)));
        assert!(!cache.get("bob", t + Duration::from_secs(50 * 60)));
    }

    #[test]
    fn test_older_write_does_not_win() {
        let cache = WhitelistCache::new();
        let t = Instant::now();
        let later = t + Duration::from_secs(10 * 60);
        cache.put("carol", true, later);
        cache.put("carol", true, t);

        // Still anchored to the later write
        assert!(cache.get("carol", t + Duration::from_secs(35 * 60)));
    }

    #[test]
    fn test_purge_removes_only_expired() {
        let cache = WhitelistCache::new();
        let t = Instant::now();
        cache.put("old", true, t);
        cache.put("new", true, t + Duration::from_secs(20 * 60));

        let removed = cache.purge_expired(t + Duration::from_secs(31 * 60));
        assert_eq!(removed, 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("new", t + Duration::from_secs(31 * 60)));
    }

    #[test]
    fn test_custom_ttl() {
        let cache = WhitelistCache::with_ttl(Duration::from_secs(5));
        let t = Instant::now();
        cache.put("dave", true, t);
        assert!(cache.get("dave", t + Duration::from_secs(4)));
        assert!(!cache.get("dave", t + Duration::from_secs(5)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_puts_then_gets() {
        let cache = Arc::new(WhitelistCache::new());
        let now = Instant::now();

        let writers: Vec<_> = (0..100)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.put(&format!("User{i}"), true, now) })
            })
            .collect();
        for writer in writers {
            writer.await.expect("writer task panicked");
        }

        let readers: Vec<_> = (0..100)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get(&format!("user{i}"), now) })
            })
            .collect();
        for reader in readers {
            assert!(reader.await.expect("reader task panicked"));
        }

        assert_eq!(cache.len(), 100);
    }
}
