//! Per-user conversation state with per-user serialization.
//!
//! Every entry point takes the user's lock before doing anything else. The lock
//! is a fair tokio mutex, so one user's updates are handled strictly in arrival
//! order while different users never wait on each other.

mod model;

pub use model::*;

use std::sync::Arc;
use teloxide::types::UserId;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::storage::MemoryCache;

pub type SessionGuard = OwnedMutexGuard<ConversationState>;

#[derive(Clone)]
pub struct SessionStore {
    sessions: MemoryCache<UserId, Arc<Mutex<ConversationState>>>,
    capacity: usize,
}

impl SessionStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: MemoryCache::new(capacity),
            capacity,
        }
    }

    /// Waits for exclusive access to the user's state. Hold the guard for the
    /// whole handling of one update.
    pub async fn lock(&self, user: UserId) -> SessionGuard {
        if self.sessions.len() >= self.capacity {
            self.evict_idle();
        }

        let slot = self
            .sessions
            .get_or_insert_with(user, || Arc::new(Mutex::new(ConversationState::default())));
        slot.lock_owned().await
    }

    /// Drops sessions that are idle and not held or awaited by anyone. A missing
    /// entry is recreated as idle, so nothing observable is lost.
    fn evict_idle(&self) {
        let before = self.sessions.len();
        self.sessions.retain(|_, slot| {
            Arc::strong_count(slot) > 1
                || slot
                    .try_lock()
                    .map_or(true, |state| *state != ConversationState::Idle)
        });
        debug!("Evicted {} idle sessions", before.saturating_sub(self.sessions.len()));
    }

    /// Current state, waiting for any in-flight update of that user to finish.
    #[cfg(test)]
    pub async fn snapshot(&self, user: UserId) -> ConversationState {
        match self.sessions.get(&user) {
            Some(slot) => slot.lock().await.clone(),
            None => ConversationState::default(),
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_unknown_user_is_idle() {
        let store = SessionStore::default();
        assert_eq!(store.snapshot(UserId(1)).await, ConversationState::Idle);
    }

    #[tokio::test]
    async fn test_state_persists_between_locks() {
        let store = SessionStore::default();

        *store.lock(UserId(1)).await = ConversationState::AwaitingTorobCredentials;

        assert_eq!(store.snapshot(UserId(1)).await, ConversationState::AwaitingTorobCredentials);
        assert_eq!(store.snapshot(UserId(2)).await, ConversationState::Idle);
    }

    #[tokio::test]
    async fn test_same_user_waits_other_users_do_not() {
        let store = SessionStore::default();
        let held = store.lock(UserId(1)).await;

        let other = tokio::time::timeout(Duration::from_millis(100), store.lock(UserId(2))).await;
        assert!(other.is_ok());

        let same = tokio::time::timeout(Duration::from_millis(50), store.lock(UserId(1))).await;
        assert!(same.is_err());

        drop(held);
        let same = tokio::time::timeout(Duration::from_millis(100), store.lock(UserId(1))).await;
        assert!(same.is_ok());
    }

    #[tokio::test]
    async fn test_idle_sessions_are_evicted_at_capacity() {
        let store = SessionStore::new(3);

        *store.lock(UserId(1)).await = ConversationState::AwaitingProductSearch;
        drop(store.lock(UserId(2)).await);
        let held = store.lock(UserId(3)).await;
        assert_eq!(store.sessions.len(), 3);

        // At capacity: the idle, unheld session of user 2 goes, the others stay.
        drop(store.lock(UserId(4)).await);
        assert_eq!(store.sessions.len(), 3);
        assert!(store.sessions.get(&UserId(2)).is_none());
        assert!(store.sessions.get(&UserId(3)).is_some());
        assert_eq!(store.snapshot(UserId(1)).await, ConversationState::AwaitingProductSearch);

        drop(held);
    }

    #[test]
    fn test_draft_debug_hides_key() {
        let step = WooCredentialStep::ConsumerSecret {
            store_url: "https://shop.example.com".into(),
            consumer_key: "ck_secretvalue".into(),
        };
        assert!(!format!("{step:?}").contains("ck_secretvalue"));
    }
}
