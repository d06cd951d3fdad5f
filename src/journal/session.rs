//! Live conversation state for one user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use crate::journal::user_key::UserKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One exchange step. Serializes as `{"Parts": [...], "Role": "user"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Turn {
    pub parts: Vec<String>,
    pub role: Role,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { parts: vec![text.into()], role: Role::User }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { parts: vec![text.into()], role: Role::Model }
    }
}

/// A conversation with the model.
///
/// The turn history has its own lock, separate from the registry map, so a
/// slow model call for one user never blocks lookups for another.
pub struct Session {
    key: UserKey,
    created_at: DateTime<Utc>,
    instruction: Vec<String>,
    turns: Mutex<Vec<Turn>>,
}

impl Session {
    /// Open a session whose history starts with the given context lines as
    /// a single model turn. No lines means an empty history.
    pub fn seeded(key: UserKey, instruction: Vec<String>, seed: Vec<String>) -> Self {
        let turns = if seed.is_empty() {
            Vec::new()
        } else {
            vec![Turn { parts: seed, role: Role::Model }]
        };
        Self {
            key,
            created_at: Utc::now(),
            instruction,
            turns: Mutex::new(turns),
        }
    }

    pub fn key(&self) -> &UserKey {
        &self.key
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn instruction(&self) -> &[String] {
        &self.instruction
    }

    /// Exclusive access to the turn history.
    pub async fn turns(&self) -> MutexGuard<'_, Vec<Turn>> {
        self.turns.lock().await
    }

    pub async fn snapshot(&self) -> Vec<Turn> {
        self.turns.lock().await.clone()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("key", &self.key)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
