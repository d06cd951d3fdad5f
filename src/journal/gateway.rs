//! Seams to the external services: model, document store, chat transport.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::journal::analysis::{AnalysisResult, Mood};
use crate::journal::session::Session;
use crate::journal::user_key::UserKey;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("empty response")]
    Empty,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("corrupt record for {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

#[derive(Debug, Error)]
#[error("send failed: {0}")]
pub struct TransportError(pub String);

/// Model output for a summarization request.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub summary: String,
    pub mood: Vec<Mood>,
}

/// Which users a sweep wants, by their last session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFilter {
    /// `lastCreatedSession < t`
    StartedBefore(DateTime<Utc>),
    /// `lastCreatedSession >= t`
    StartedSince(DateTime<Utc>),
}

#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Open a conversation seeded with prior context lines.
    async fn start_conversation(&self, key: &UserKey, seed: Vec<String>) -> Result<Session, ModelError>;

    /// Send one user message; on success both turns are appended to the session.
    async fn send_turn(&self, session: &Session, text: &str) -> Result<String, ModelError>;

    async fn summarize(&self, session: &Session) -> Result<Summary, ModelError>;
}

#[async_trait]
pub trait JournalStore: Send + Sync {
    /// Up to `limit` most recent entries, oldest first.
    async fn recent_entries(&self, key: &UserKey, limit: usize) -> Result<Vec<AnalysisResult>, StoreError>;

    /// Write the entry for `date`, replacing any earlier one for that day.
    async fn put_entry(&self, key: &UserKey, date: NaiveDate, entry: &AnalysisResult) -> Result<(), StoreError>;

    async fn mark_session_started(&self, key: &UserKey, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn query_users(&self, filter: UserFilter) -> Result<Vec<UserKey>, StoreError>;
}

/// Outbound text delivery.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, recipient: i64, text: &str) -> Result<(), TransportError>;
}
