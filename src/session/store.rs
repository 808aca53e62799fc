//! In-memory per-session credential store
//!
//! One entry per MCP session holds the session's Terraform Cloud token along
//! with its workspace context and captured client context. The table is a
//! sharded `DashMap`, so writes for different sessions only contend when they
//! hash to the same shard, and every operation touches a single entry.
//!
//! Entries are dropped when the MCP session closes, when they sit idle past
//! the configured TTL, or when the table is full and a new session arrives
//! (least recently accessed goes first). Nothing is written to disk.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::error::CredentialError;
use super::types::{ClientContext, Secret, SessionSnapshot, WorkspaceContext};

/// Default idle TTL: 30 minutes
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Default upper bound on tracked sessions
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    /// Idle time after which an entry is discarded. Zero disables expiry.
    pub idle_ttl: Duration,
    /// Maximum number of sessions kept. Zero disables the bound.
    pub max_entries: usize,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            idle_ttl: DEFAULT_SESSION_TTL,
            max_entries: DEFAULT_MAX_SESSIONS,
        }
    }
}

#[derive(Debug)]
struct SessionEntry {
    token: Option<Secret>,
    context: WorkspaceContext,
    client: Option<ClientContext>,
    created_at: DateTime<Utc>,
    last_accessed: Instant,
}

impl SessionEntry {
    fn new() -> Self {
        Self {
            token: None,
            context: WorkspaceContext::default(),
            client: None,
            created_at: Utc::now(),
            last_accessed: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }
}

/// Process-wide session table, constructed once and shared behind an `Arc`
#[derive(Debug)]
pub struct SessionStore {
    entries: DashMap<String, SessionEntry>,
    config: SessionStoreConfig,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionStoreConfig::default())
    }
}

impl SessionStore {
    pub fn new(config: SessionStoreConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &SessionStoreConfig {
        &self.config
    }

    /// Store `token` (trimmed) for `session_id`, replacing any previous token
    pub fn set(&self, session_id: &str, token: &str) -> Result<(), CredentialError> {
        let session_id = require_session_id(session_id)?;
        let token = token.trim();
        if token.is_empty() {
            return Err(CredentialError::InvalidArgument(
                "token cannot be empty".to_string(),
            ));
        }

        self.with_entry(session_id, |entry| {
            entry.token = Some(Secret::new(token));
        });

        tracing::debug!(session_id = %session_id, "Session token stored");
        Ok(())
    }

    /// Token stored for `session_id`, if any
    pub fn get(&self, session_id: &str) -> Option<Secret> {
        if session_id.is_empty() {
            return None;
        }
        self.read_entry(session_id, |entry| entry.token.clone())
            .flatten()
    }

    pub fn has_token(&self, session_id: &str) -> bool {
        self.get(session_id).is_some()
    }

    /// Remove the token for `session_id`. No-op when nothing is stored.
    pub fn clear(&self, session_id: &str) {
        if let Some(mut entry) = self.entries.get_mut(session_id) {
            entry.token = None;
            entry.touch();
        }
    }

    /// Merge `update` into the session's workspace context and return the result
    pub fn set_context(
        &self,
        session_id: &str,
        update: WorkspaceContext,
    ) -> Result<WorkspaceContext, CredentialError> {
        let session_id = require_session_id(session_id)?;
        Ok(self.with_entry(session_id, |entry| {
            entry.context.merge(update);
            entry.context.clone()
        }))
    }

    pub fn context(&self, session_id: &str) -> WorkspaceContext {
        self.read_entry(session_id, |entry| entry.context.clone())
            .unwrap_or_default()
    }

    pub fn clear_context(&self, session_id: &str) {
        if let Some(mut entry) = self.entries.get_mut(session_id) {
            entry.context = WorkspaceContext::default();
            entry.touch();
        }
    }

    /// Record client metadata for the session. Empty contexts are ignored.
    pub fn set_client_context(&self, session_id: &str, client: ClientContext) {
        if session_id.is_empty() || client.is_empty() {
            return;
        }
        self.with_entry(session_id, |entry| {
            entry.client = Some(client);
        });
    }

    pub fn client_context(&self, session_id: &str) -> Option<ClientContext> {
        self.read_entry(session_id, |entry| entry.client.clone())
            .flatten()
    }

    pub fn snapshot(&self, session_id: &str) -> Option<SessionSnapshot> {
        self.read_entry(session_id, |entry| SessionSnapshot {
            session_id: session_id.to_string(),
            has_token: entry.token.is_some(),
            token_preview: entry.token.as_ref().map(Secret::masked),
            context: entry.context.clone(),
            client_context: entry.client.clone(),
            created_at: entry.created_at,
        })
    }

    /// Drop everything held for `session_id`. Returns whether an entry existed.
    pub fn remove_session(&self, session_id: &str) -> bool {
        self.entries.remove(session_id).is_some()
    }

    /// Remove all idle-expired entries, returning how many were dropped
    pub fn evict_expired(&self) -> usize {
        if self.config.idle_ttl.is_zero() {
            return 0;
        }
        let before = self.entries.len();
        self.entries.retain(|_, entry| !self.is_expired(entry));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Periodically evict expired entries until the store is dropped
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let store: Weak<SessionStore> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let evicted = store.evict_expired();
                if evicted > 0 {
                    tracing::info!(
                        evicted,
                        remaining = store.len(),
                        "Evicted idle sessions"
                    );
                }
            }
        })
    }

    fn is_expired(&self, entry: &SessionEntry) -> bool {
        !self.config.idle_ttl.is_zero() && entry.last_accessed.elapsed() > self.config.idle_ttl
    }

    /// Run `f` on the live entry for `session_id`, refreshing its access time.
    /// Expired entries are removed and yield `None`.
    fn read_entry<T>(&self, session_id: &str, f: impl FnOnce(&SessionEntry) -> T) -> Option<T> {
        let mut entry = self.entries.get_mut(session_id)?;
        if self.is_expired(&*entry) {
            // Release the shard lock before removing
            drop(entry);
            self.entries.remove_if(session_id, |_, e| self.is_expired(e));
            tracing::debug!(session_id = %session_id, "Session expired");
            return None;
        }
        entry.touch();
        Some(f(&*entry))
    }

    /// Run `f` on the entry for `session_id`, creating it if needed
    fn with_entry<T>(&self, session_id: &str, f: impl FnOnce(&mut SessionEntry) -> T) -> T {
        if !self.entries.contains_key(session_id) {
            self.make_room();
        }
        let mut entry = self
            .entries
            .entry(session_id.to_string())
            .or_insert_with(SessionEntry::new);
        if self.is_expired(&*entry) {
            *entry = SessionEntry::new();
        }
        entry.touch();
        f(&mut *entry)
    }

    /// Evict the least recently accessed session when the table is full.
    /// Concurrent inserts can overshoot the bound by the number of racing writers.
    fn make_room(&self) {
        let max = self.config.max_entries;
        if max == 0 || self.entries.len() < max {
            return;
        }
        if self.evict_expired() > 0 && self.entries.len() < max {
            return;
        }
        let oldest = self
            .entries
            .iter()
            .min_by_key(|item| item.value().last_accessed)
            .map(|item| item.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
            tracing::info!(session_id = %key, "Session table full, evicted least recently used session");
        }
    }
}

fn require_session_id(session_id: &str) -> Result<&str, CredentialError> {
    if session_id.trim().is_empty() {
        Err(CredentialError::InvalidArgument(
            "session id cannot be empty".to_string(),
        ))
    } else {
        Ok(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(store: &SessionStore, session_id: &str) -> Option<String> {
        store.get(session_id).map(|s| s.expose().to_string())
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::default();
        store.set("s1", "a").unwrap();
        store.set("s2", "b").unwrap();

        assert_eq!(token(&store, "s1").as_deref(), Some("a"));
        assert_eq!(token(&store, "s2").as_deref(), Some("b"));
    }

    #[test]
    fn test_last_write_wins() {
        let store = SessionStore::default();
        store.set("s", "x").unwrap();
        store.set("s", "y").unwrap();

        assert_eq!(token(&store, "s").as_deref(), Some("y"));
    }

    #[test]
    fn test_get_unknown_or_empty_session() {
        let store = SessionStore::default();
        assert!(store.get("never-set").is_none());
        assert!(store.get("").is_none());
    }

    #[test]
    fn test_token_is_trimmed() {
        let store = SessionStore::default();
        store.set("s", "  atlasv1.token \n").unwrap();
        assert_eq!(token(&store, "s").as_deref(), Some("atlasv1.token"));
    }

    #[test]
    fn test_blank_token_rejected_without_mutation() {
        let store = SessionStore::default();
        store.set("s", "keep").unwrap();

        let err = store.set("s", "   ").unwrap_err();
        assert!(matches!(err, CredentialError::InvalidArgument(_)));
        assert_eq!(token(&store, "s").as_deref(), Some("keep"));

        assert!(store.set("fresh", "").is_err());
        assert!(store.get("fresh").is_none());
        assert!(store.snapshot("fresh").is_none());
    }

    #[test]
    fn test_empty_session_id_rejected() {
        let store = SessionStore::default();
        let err = store.set("", "tok").unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
        assert!(store.is_empty());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = SessionStore::default();
        store.set("s", "tok").unwrap();
        store.clear("s");
        store.clear("s");
        store.clear("unknown");
        assert!(store.get("s").is_none());
    }

    #[test]
    fn test_clear_keeps_context() {
        let store = SessionStore::default();
        store.set("s", "tok").unwrap();
        store
            .set_context(
                "s",
                WorkspaceContext {
                    organization: Some("acme".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        store.clear("s");
        assert_eq!(store.context("s").organization.as_deref(), Some("acme"));
    }

    #[test]
    fn test_remove_session_drops_everything() {
        let store = SessionStore::default();
        store.set("s", "tok").unwrap();
        assert!(store.remove_session("s"));
        assert!(!store.remove_session("s"));
        assert!(store.get("s").is_none());
        assert!(store.context("s").is_empty());
    }

    #[test]
    fn test_empty_client_context_not_stored() {
        let store = SessionStore::default();
        store.set_client_context("s", ClientContext::default());
        assert!(store.client_context("s").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_idle_entries_expire() {
        let store = SessionStore::new(SessionStoreConfig {
            idle_ttl: Duration::from_millis(20),
            max_entries: 0,
        });
        store.set("s", "tok").unwrap();
        std::thread::sleep(Duration::from_millis(60));

        assert!(store.get("s").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_evict_expired_counts() {
        let store = SessionStore::new(SessionStoreConfig {
            idle_ttl: Duration::from_millis(20),
            max_entries: 0,
        });
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        std::thread::sleep(Duration::from_millis(60));
        store.set("c", "3").unwrap();

        assert_eq!(store.evict_expired(), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        let store = SessionStore::new(SessionStoreConfig {
            idle_ttl: Duration::ZERO,
            max_entries: 0,
        });
        store.set("s", "tok").unwrap();
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(store.evict_expired(), 0);
        assert!(store.get("s").is_some());
    }

    #[test]
    fn test_full_table_evicts_least_recently_used() {
        let store = SessionStore::new(SessionStoreConfig {
            idle_ttl: Duration::ZERO,
            max_entries: 2,
        });
        store.set("old", "1").unwrap();
        std::thread::sleep(Duration::from_millis(5));
        store.set("mid", "2").unwrap();
        std::thread::sleep(Duration::from_millis(5));
        // Reading refreshes "old", leaving "mid" as the eviction candidate
        assert!(store.get("old").is_some());
        std::thread::sleep(Duration::from_millis(5));
        store.set("new", "3").unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.get("mid").is_none());
        assert!(store.get("old").is_some());
        assert!(store.get("new").is_some());
    }

    #[test]
    fn test_overwrite_does_not_evict_when_full() {
        let store = SessionStore::new(SessionStoreConfig {
            idle_ttl: Duration::ZERO,
            max_entries: 1,
        });
        store.set("s", "1").unwrap();
        store.set("s", "2").unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(token(&store, "s").as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_sweeper_stops_when_store_dropped() {
        let store = Arc::new(SessionStore::default());
        let handle = store.spawn_sweeper(Duration::from_millis(10));
        drop(store);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("sweeper should exit")
            .unwrap();
    }
}
