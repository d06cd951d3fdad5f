//! Journal engine: chat turns, manual commands and the summarize-and-persist step.

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::info;

use crate::journal::analysis::AnalysisResult;
use crate::journal::gateway::{JournalStore, ModelError, ModelGateway, StoreError};
use crate::journal::registry::{SessionError, SessionRegistry};
use crate::journal::session::Session;
use crate::journal::user_key::UserKey;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    #[error("error saving summary: {0}")]
    Store(#[from] StoreError),
}

impl JournalError {
    /// Short reply shown to the user; details only go to the log.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Session(_) => "Error creating chat session",
            Self::Model(_) => "Error processing your request",
            Self::Store(_) => "Error saving your journal entry",
        }
    }
}

pub struct Journal {
    registry: SessionRegistry,
    model: Arc<dyn ModelGateway>,
    store: Arc<dyn JournalStore>,
    timezone: Tz,
}

impl Journal {
    pub fn new(
        model: Arc<dyn ModelGateway>,
        store: Arc<dyn JournalStore>,
        timezone: Tz,
        history_limit: usize,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(model.clone(), store.clone(), history_limit, timezone),
            model,
            store,
            timezone,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn JournalStore> {
        &self.store
    }

    /// Forward one user message and return the model's reply.
    pub async fn reply(&self, key: &UserKey, text: &str) -> Result<String, JournalError> {
        let session = self.registry.get_or_create(key).await?;
        let reply = self.model.send_turn(&session, text).await?;
        Ok(reply)
    }

    /// Drop the user's live session. Returns whether one existed.
    pub async fn clear(&self, key: &UserKey) -> bool {
        let existed = self.registry.delete(key).await;
        info!("Cleared session for {} (existed: {})", key, existed);
        existed
    }

    /// Summarize the user's current session on demand. The session stays live.
    pub async fn summarize_now(&self, key: &UserKey) -> Result<AnalysisResult, JournalError> {
        let session = self.registry.get_or_create(key).await?;
        self.ingest(&session, Utc::now()).await
    }

    /// Summarize `session` and persist the entry under the calendar date of `now`.
    pub async fn ingest(&self, session: &Session, now: DateTime<Utc>) -> Result<AnalysisResult, JournalError> {
        let summary = self.model.summarize(session).await?;
        let entry = AnalysisResult {
            summary: summary.summary,
            mood: summary.mood,
            created_at: now,
        };

        let date = self.local_date(now);
        self.store.put_entry(session.key(), date, &entry).await?;
        info!("Saved entry {} for {}", date, session.key());
        Ok(entry)
    }

    /// Calendar date of `at` in the configured time zone.
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.timezone).date_naive()
    }

    /// First instant of `date` in the configured time zone.
    pub fn day_start(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        self.timezone
            .from_local_datetime(&midnight)
            .earliest()
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
    }

    /// Start of the local day containing `now`.
    pub fn start_of_today(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.day_start(self.local_date(now))
    }

    /// Start of the local day before the one containing `now`.
    pub fn start_of_yesterday(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = self.local_date(now);
        let yesterday = today.checked_sub_days(Days::new(1)).unwrap_or(today);
        self.day_start(yesterday)
    }
}
