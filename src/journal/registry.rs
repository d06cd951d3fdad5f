//! In-memory registry of live sessions, one per user.

use std::collections::HashMap;
use std::sync::Arc;

use chrono_tz::Tz;
use thiserror::Error;
use tokio::sync::{Mutex, OnceCell};
use tracing::{info, warn};

use crate::journal::gateway::{JournalStore, ModelError, ModelGateway, StoreError};
use crate::journal::session::Session;
use crate::journal::user_key::UserKey;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to load history: {0}")]
    Store(#[from] StoreError),
    #[error("failed to start conversation: {0}")]
    Model(#[from] ModelError),
}

/// A slot is registered before its session exists so that concurrent first
/// contacts for one user wait on the same initialization.
type Slot = Arc<OnceCell<Arc<Session>>>;

pub struct SessionRegistry {
    sessions: Mutex<HashMap<UserKey, Slot>>,
    model: Arc<dyn ModelGateway>,
    store: Arc<dyn JournalStore>,
    history_limit: usize,
    /// Zone the seeded history lines are dated in.
    timezone: Tz,
}

impl SessionRegistry {
    pub fn new(
        model: Arc<dyn ModelGateway>,
        store: Arc<dyn JournalStore>,
        history_limit: usize,
        timezone: Tz,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            model,
            store,
            history_limit,
            timezone,
        }
    }

    /// Return the live session for `key`, opening and seeding one if needed.
    ///
    /// The map lock is only held to find or insert the slot; seeding runs
    /// outside it. On failure the empty slot is removed again.
    pub async fn get_or_create(&self, key: &UserKey) -> Result<Arc<Session>, SessionError> {
        let slot = {
            let mut sessions = self.sessions.lock().await;
            sessions.entry(key.clone()).or_default().clone()
        };

        let result = slot.get_or_try_init(|| self.open(key)).await.cloned();

        if result.is_err() {
            let mut sessions = self.sessions.lock().await;
            if let Some(current) = sessions.get(key)
                && Arc::ptr_eq(current, &slot)
                && !current.initialized()
            {
                sessions.remove(key);
            }
        }

        result
    }

    pub async fn get(&self, key: &UserKey) -> Option<Arc<Session>> {
        let sessions = self.sessions.lock().await;
        sessions.get(key).and_then(|slot| slot.get().cloned())
    }

    /// Drop the session for `key`. Returns whether one was registered.
    pub async fn delete(&self, key: &UserKey) -> bool {
        let mut sessions = self.sessions.lock().await;
        sessions.remove(key).is_some()
    }

    /// Drop the session for `key` only if it is still `session`.
    pub async fn evict(&self, key: &UserKey, session: &Arc<Session>) -> bool {
        let mut sessions = self.sessions.lock().await;
        let same = sessions
            .get(key)
            .and_then(|slot| slot.get())
            .is_some_and(|current| Arc::ptr_eq(current, session));
        if same {
            sessions.remove(key);
        }
        same
    }

    /// Number of initialized sessions.
    pub async fn len(&self) -> usize {
        let sessions = self.sessions.lock().await;
        sessions.values().filter(|slot| slot.initialized()).count()
    }

    async fn open(&self, key: &UserKey) -> Result<Arc<Session>, SessionError> {
        let entries = self.store.recent_entries(key, self.history_limit).await?;
        let seed: Vec<String> = entries.iter().map(|e| e.history_line(self.timezone)).collect();
        let seeded = seed.len();

        let session = self.model.start_conversation(key, seed).await?;
        info!("New chat session for {} ({} past entries)", key, seeded);

        if let Err(e) = self.store.mark_session_started(key, session.created_at()).await {
            warn!("Failed to record session start for {}: {}", key, e);
        }

        Ok(Arc::new(session))
    }
}
