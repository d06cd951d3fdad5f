//! Fakes for the model and transport seams.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::journal::analysis::Mood;
use crate::journal::gateway::{Messenger, ModelError, ModelGateway, Summary, TransportError};
use crate::journal::session::{Session, Turn};
use crate::journal::user_key::UserKey;

#[derive(Default)]
pub struct FakeModel {
    started: AtomicUsize,
    summarized: AtomicUsize,
    start_delay: Option<Duration>,
    fail_start: bool,
    fail_summarize: bool,
}

impl FakeModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = Some(delay);
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn failing_summarize(mut self) -> Self {
        self.fail_summarize = true;
        self
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn summarized(&self) -> usize {
        self.summarized.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelGateway for FakeModel {
    async fn start_conversation(&self, key: &UserKey, seed: Vec<String>) -> Result<Session, ModelError> {
        if let Some(delay) = self.start_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_start {
            return Err(ModelError::Http("connection refused".to_string()));
        }
        self.started.fetch_add(1, Ordering::SeqCst);
        Ok(Session::seeded(key.clone(), vec!["be kind".to_string()], seed))
    }

    async fn send_turn(&self, session: &Session, text: &str) -> Result<String, ModelError> {
        let reply = format!("echo: {text}");
        let mut turns = session.turns().await;
        turns.push(Turn::user(text));
        turns.push(Turn::model(reply.clone()));
        Ok(reply)
    }

    async fn summarize(&self, session: &Session) -> Result<Summary, ModelError> {
        if self.fail_summarize {
            return Err(ModelError::Api("429: quota exceeded".to_string()));
        }
        self.summarized.fetch_add(1, Ordering::SeqCst);
        let turns = session.snapshot().await;
        Ok(Summary {
            summary: format!("{} turns with {}", turns.len(), session.key()),
            mood: vec![Mood::Neutral],
        })
    }
}

/// Records every send; recipients in `fail_for` get an error.
#[derive(Default)]
pub struct FakeMessenger {
    sent: Mutex<Vec<(i64, String)>>,
    fail_for: Vec<i64>,
    send_delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(recipients: Vec<i64>) -> Self {
        Self {
            fail_for: recipients,
            ..Self::default()
        }
    }

    /// Each send takes `delay`, so overlapping sends can be observed.
    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = Some(delay);
        self
    }

    /// Most sends that were ever running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn recipients(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.sent.lock().unwrap().iter().map(|(id, _)| *id).collect();
        ids.sort();
        ids
    }

    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for FakeMessenger {
    async fn send_text(&self, recipient: i64, text: &str) -> Result<(), TransportError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.send_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_for.contains(&recipient) {
            return Err(TransportError("Forbidden: bot was blocked by the user".to_string()));
        }
        self.sent.lock().unwrap().push((recipient, text.to_string()));
        Ok(())
    }
}
