//! Daily batch jobs over the user set: remind inactive users, summarize active sessions.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::journal::engine::Journal;
use crate::journal::gateway::{Messenger, StoreError, UserFilter};
use crate::journal::throttle::Throttle;
use crate::journal::user_key::UserKey;

#[derive(Debug, Clone)]
pub struct SweepSettings {
    pub reminder_text: String,
    pub reminder_interval: Duration,
    pub summarize_interval: Duration,
    /// Max in-flight tasks per sweep
    pub concurrency: usize,
}

/// Per-sweep tally. `attempted` counts every user the query returned.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum Outcome {
    Done,
    Skipped,
    Failed,
}

impl SweepReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Done => self.succeeded += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}

pub struct Sweeper {
    journal: Arc<Journal>,
    messenger: Arc<dyn Messenger>,
    settings: SweepSettings,
}

impl Sweeper {
    pub fn new(journal: Arc<Journal>, messenger: Arc<dyn Messenger>, settings: SweepSettings) -> Self {
        Self { journal, messenger, settings }
    }

    /// Remind every user who has not started a session since the start of today.
    pub async fn remind_daily(&self, now: DateTime<Utc>) -> Result<SweepReport, StoreError> {
        let since = self.journal.start_of_today(now);
        let users = self.journal.store().query_users(UserFilter::StartedBefore(since)).await?;
        info!("Reminder sweep: {} users inactive since {}", users.len(), since);

        let throttle = Arc::new(Throttle::new(self.settings.reminder_interval));
        let text: Arc<str> = Arc::from(self.settings.reminder_text.as_str());

        let report = self
            .fan_out(users, |key| {
                let messenger = self.messenger.clone();
                let throttle = throttle.clone();
                let text = text.clone();
                async move {
                    let recipient = match key.recipient_id() {
                        Ok(id) => id,
                        Err(e) => {
                            warn!("Skipping reminder for {}: {}", key, e);
                            return Outcome::Skipped;
                        }
                    };

                    throttle.process().await;
                    match messenger.send_text(recipient, &text).await {
                        Ok(()) => Outcome::Done,
                        Err(e) => {
                            warn!("Failed to remind {}: {}", key, e);
                            Outcome::Failed
                        }
                    }
                }
            })
            .await;

        info!("Reminder sweep done: {:?}", report);
        Ok(report)
    }

    /// Summarize, persist and evict the live session of every user active since
    /// the start of yesterday. A session is only evicted once its entry is saved.
    pub async fn summarize_daily(&self, now: DateTime<Utc>) -> Result<SweepReport, StoreError> {
        let since = self.journal.start_of_yesterday(now);
        let users = self.journal.store().query_users(UserFilter::StartedSince(since)).await?;
        info!(
            "Summarize sweep: {} users active since {}, {} live sessions",
            users.len(),
            since,
            self.journal.registry().len().await
        );

        let throttle = Arc::new(Throttle::new(self.settings.summarize_interval));

        let report = self
            .fan_out(users, |key| {
                let journal = self.journal.clone();
                let throttle = throttle.clone();
                async move {
                    let Some(session) = journal.registry().get(&key).await else {
                        info!("No live session for {}, skipping", key);
                        return Outcome::Skipped;
                    };

                    throttle.process().await;
                    match journal.ingest(&session, now).await {
                        Ok(_) => {
                            if !journal.registry().evict(&key, &session).await {
                                info!("Session for {} was replaced before eviction", key);
                            }
                            Outcome::Done
                        }
                        Err(e) => {
                            warn!("Failed to summarize {}: {}", key, e);
                            Outcome::Failed
                        }
                    }
                }
            })
            .await;

        info!("Summarize sweep done: {:?}", report);
        Ok(report)
    }

    /// Run `work` for every user with at most `concurrency` tasks in flight.
    async fn fan_out<F, Fut>(&self, users: Vec<UserKey>, work: F) -> SweepReport
    where
        F: Fn(UserKey) -> Fut,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut report = SweepReport { attempted: users.len(), ..Default::default() };

        for key in users {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let job = work(key);
            tasks.spawn(async move {
                let _permit = permit;
                job.await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    error!("Sweep task panicked: {}", e);
                    report.record(Outcome::Failed);
                }
            }
        }

        report
    }
}
