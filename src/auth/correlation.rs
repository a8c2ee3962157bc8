//! Short-lived store bridging two OAuth redirects.
//!
//! When the user starts authorizing one provider while the other provider's
//! tokens are already known, those tokens are parked here under a fresh state
//! token. The state token travels through the provider's redirect and comes
//! back on the callback, where the parked tokens are taken out in one step.
//! Entries nobody reads are dropped once they outlive the TTL.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::auth::credentials::Credentials;

pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

const STATE_TOKEN_BYTES: usize = 16;

#[derive(Debug, Clone)]
pub struct CorrelationEntry {
    pub spotify: Option<Credentials>,
    pub youtube: Option<Credentials>,
    pub updated_at: Instant,
}

impl CorrelationEntry {
    pub fn is_merged(&self) -> bool {
        self.spotify.is_some() && self.youtube.is_some()
    }
}

pub struct CorrelationStore {
    entries: Mutex<HashMap<String, CorrelationEntry>>,
    ttl: Duration,
}

impl Default for CorrelationStore {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl CorrelationStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// 128 random bits, hex encoded. One per authorization attempt.
    pub fn issue_token() -> String {
        let bytes: [u8; STATE_TOKEN_BYTES] = rand::random();
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Merge whichever tokens are present into the entry for `token`,
    /// creating it if needed. Absent values never clear a stored one.
    pub async fn upsert(
        &self,
        token: &str,
        spotify: Option<Credentials>,
        youtube: Option<Credentials>,
    ) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let entry = entries
            .entry(token.to_string())
            .or_insert_with(|| CorrelationEntry {
                spotify: None,
                youtube: None,
                updated_at: now,
            });

        if spotify.is_some() {
            entry.spotify = spotify;
        }
        if youtube.is_some() {
            entry.youtube = youtube;
        }
        entry.updated_at = now;

        debug!(
            "Stored tokens for state {} (spotify: {}, youtube: {})",
            short(token),
            entry.spotify.is_some(),
            entry.youtube.is_some()
        );
    }

    /// Expired entries read as absent even if the reaper has not run yet.
    pub async fn read(&self, token: &str) -> Option<CorrelationEntry> {
        let mut entries = self.entries.lock().await;

        let expired = match entries.get(token) {
            Some(entry) => entry.updated_at.elapsed() > self.ttl,
            None => {
                debug!("No stored tokens for state {}", short(token));
                return None;
            }
        };

        if expired {
            entries.remove(token);
            debug!("Stored tokens for state {} expired", short(token));
            return None;
        }

        entries.get(token).cloned()
    }

    /// Remove and return the entry under a single lock, so a state token is
    /// consumed at most once. Expired entries are dropped and read as absent.
    pub async fn take(&self, token: &str) -> Option<CorrelationEntry> {
        let entry = self.entries.lock().await.remove(token)?;

        if entry.updated_at.elapsed() > self.ttl {
            debug!("Stored tokens for state {} expired", short(token));
            return None;
        }

        debug!("Consumed stored tokens for state {}", short(token));
        Some(entry)
    }

    pub async fn clear(&self, token: &str) {
        if self.entries.lock().await.remove(token).is_some() {
            debug!("Cleared stored tokens for state {}", short(token));
        }
    }

    /// Drop every entry older than the TTL and return how many went.
    pub async fn sweep(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.updated_at.elapsed() <= self.ttl);
        let purged = before - entries.len();

        if purged > 0 {
            info!("Purged {} expired authorization state entries", purged);
        }
        purged
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Sweep on a fixed period until the store is dropped.
    pub fn spawn_reaper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match store.upgrade() {
                    Some(store) => {
                        store.sweep().await;
                    }
                    None => break,
                }
            }
        })
    }
}

fn short(token: &str) -> &str {
    token.get(..8).unwrap_or(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_tokens_are_hex_and_unique() {
        let a = CorrelationStore::issue_token();
        let b = CorrelationStore::issue_token();

        assert_eq!(a.len(), STATE_TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_upsert_merges_both_providers() {
        let store = CorrelationStore::default();
        let token = CorrelationStore::issue_token();

        store
            .upsert(&token, Some(Credentials::mock("spotify")), None)
            .await;
        store
            .upsert(&token, None, Some(Credentials::mock("youtube")))
            .await;

        let entry = store.read(&token).await.unwrap();
        assert!(entry.is_merged());
        assert_eq!(entry.spotify.unwrap().access_token, "spotify");
        assert_eq!(entry.youtube.unwrap().access_token, "youtube");
    }

    #[tokio::test]
    async fn test_absent_value_never_overwrites() {
        let store = CorrelationStore::default();

        store.upsert("state", Some(Credentials::mock("first")), None).await;
        store.upsert("state", None, None).await;

        let entry = store.read("state").await.unwrap();
        assert_eq!(entry.spotify.unwrap().access_token, "first");
        assert!(entry.youtube.is_none());
    }

    #[tokio::test]
    async fn test_explicit_newer_write_replaces() {
        let store = CorrelationStore::default();

        store.upsert("state", Some(Credentials::mock("old")), None).await;
        store.upsert("state", Some(Credentials::mock("new")), None).await;

        let entry = store.read("state").await.unwrap();
        assert_eq!(entry.spotify.unwrap().access_token, "new");
    }

    #[tokio::test]
    async fn test_clear_removes_entry() {
        let store = CorrelationStore::default();

        store.upsert("state", Some(Credentials::mock("s")), None).await;
        store.clear("state").await;

        assert!(store.read("state").await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_take_consumes_entry_once() {
        let store = CorrelationStore::default();
        store.upsert("state", Some(Credentials::mock("s")), None).await;

        let entry = store.take("state").await.unwrap();
        assert_eq!(entry.spotify.unwrap().access_token, "s");
        assert!(store.take("state").await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_take_drops_expired_entry() {
        let store = CorrelationStore::default();
        store.upsert("state", Some(Credentials::mock("s")), None).await;

        tokio::time::advance(DEFAULT_TTL + Duration::from_secs(1)).await;

        assert!(store.take("state").await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_takes_yield_one_entry() {
        for _ in 0..100 {
            let store = Arc::new(CorrelationStore::default());
            store.upsert("state", Some(Credentials::mock("s")), None).await;

            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let store = store.clone();
                    tokio::spawn(async move { store.take("state").await })
                })
                .collect();

            let mut taken = 0;
            for handle in handles {
                if handle.await.unwrap().is_some() {
                    taken += 1;
                }
            }
            assert_eq!(taken, 1);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_to_one_token_merge() {
        for _ in 0..100 {
            let store = Arc::new(CorrelationStore::default());
            let token = CorrelationStore::issue_token();

            let spotify = {
                let store = store.clone();
                let token = token.clone();
                tokio::spawn(async move {
                    store
                        .upsert(&token, Some(Credentials::mock("spotify")), None)
                        .await
                })
            };
            let youtube = {
                let store = store.clone();
                let token = token.clone();
                tokio::spawn(async move {
                    store
                        .upsert(&token, None, Some(Credentials::mock("youtube")))
                        .await
                })
            };
            spotify.await.unwrap();
            youtube.await.unwrap();

            let entry = store.read(&token).await.unwrap();
            assert!(entry.is_merged());
            assert_eq!(entry.spotify.unwrap().access_token, "spotify");
            assert_eq!(entry.youtube.unwrap().access_token, "youtube");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let store = CorrelationStore::default();
        store.upsert("state", Some(Credentials::mock("s")), None).await;

        tokio::time::advance(Duration::from_secs(9 * 60)).await;
        assert!(store.read("state").await.is_some());

        tokio::time::advance(Duration::from_secs(2 * 60)).await;
        assert!(store.read("state").await.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_refreshes_timestamp() {
        let store = CorrelationStore::default();
        store.upsert("state", Some(Credentials::mock("s")), None).await;

        tokio::time::advance(Duration::from_secs(8 * 60)).await;
        store.upsert("state", None, Some(Credentials::mock("y"))).await;

        tokio::time::advance(Duration::from_secs(8 * 60)).await;
        assert!(store.read("state").await.unwrap().is_merged());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_purges_only_stale_entries() {
        let store = CorrelationStore::default();
        store.upsert("old", Some(Credentials::mock("a")), None).await;

        tokio::time::advance(Duration::from_secs(6 * 60)).await;
        store.upsert("fresh", Some(Credentials::mock("b")), None).await;

        tokio::time::advance(Duration::from_secs(5 * 60)).await;
        assert_eq!(store.sweep().await, 1);
        assert_eq!(store.len().await, 1);
        assert!(store.read("fresh").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaper_purges_unread_entries() {
        let store = Arc::new(CorrelationStore::default());
        let reaper = store.spawn_reaper(DEFAULT_SWEEP_INTERVAL);

        store.upsert("abandoned", Some(Credentials::mock("a")), None).await;

        // Two sweep periods put the entry past the TTL at the second sweep.
        tokio::time::sleep(Duration::from_secs(10 * 60 + 1)).await;
        tokio::time::sleep(DEFAULT_SWEEP_INTERVAL).await;

        assert_eq!(store.len().await, 0);

        drop(store);
        tokio::time::sleep(DEFAULT_SWEEP_INTERVAL * 2).await;
        assert!(reaper.is_finished());
    }
}
