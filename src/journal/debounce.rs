//! Trailing-edge debounce: fire once after a quiet period, with the last value.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::time::sleep;
use tracing::warn;

/// Debounce timer that calls back after a period of inactivity.
///
/// Each `trigger(value)` resets the timer and replaces the pending value.
/// When the timer expires the callback runs once with the most recent value.
/// A single task owns the timer, so resets and expiry never interleave.
pub struct Debouncer<T> {
    /// Channel to signal reset with the new value
    reset_tx: mpsc::Sender<T>,
    /// Notify to cancel the timer
    cancel: Arc<Notify>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a new debouncer with the given duration.
    pub fn new<F>(duration: Duration, callback: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let (reset_tx, mut reset_rx) = mpsc::channel::<T>(16);
        let cancel = Arc::new(Notify::new());
        let cancel_clone = cancel.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    _ = cancel_clone.notified() => {
                        break;
                    }
                    first = reset_rx.recv() => {
                        let Some(mut latest) = first else {
                            break;
                        };

                        // Keep resetting while triggers come in
                        loop {
                            tokio::select! {
                                biased;

                                _ = cancel_clone.notified() => {
                                    return;
                                }
                                next = reset_rx.recv() => {
                                    match next {
                                        Some(value) => latest = value,
                                        None => return,
                                    }
                                }
                                _ = sleep(duration) => {
                                    callback(latest);
                                    break;
                                }
                            }
                        }
                    }
                }
            }
        });

        Self { reset_tx, cancel }
    }

    /// Trigger/reset the debounce timer with a new value.
    pub async fn trigger(&self, value: T) {
        if self.reset_tx.send(value).await.is_err() {
            warn!("Debounce channel closed");
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.cancel.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl Fn(u32) + Send + Sync + 'static) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls_clone = calls.clone();
        (calls, move |v| calls_clone.lock().unwrap().push(v))
    }

    #[tokio::test]
    async fn test_debounce_fires_after_duration() {
        let (calls, cb) = recorder();
        let debouncer = Debouncer::new(Duration::from_millis(50), cb);

        debouncer.trigger(1).await;
        assert!(calls.lock().unwrap().is_empty());

        sleep(Duration::from_millis(120)).await;
        assert_eq!(*calls.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_debounce_coalesces_to_last_value() {
        let (calls, cb) = recorder();
        let debouncer = Debouncer::new(Duration::from_millis(80), cb);

        for i in 1..=5 {
            debouncer.trigger(i).await;
            sleep(Duration::from_millis(10)).await;
        }
        assert!(calls.lock().unwrap().is_empty());

        sleep(Duration::from_millis(200)).await;
        assert_eq!(*calls.lock().unwrap(), vec![5]);
    }

    #[tokio::test]
    async fn test_debounce_multiple_cycles() {
        let (calls, cb) = recorder();
        let debouncer = Debouncer::new(Duration::from_millis(30), cb);

        debouncer.trigger(1).await;
        sleep(Duration::from_millis(90)).await;
        debouncer.trigger(2).await;
        sleep(Duration::from_millis(90)).await;

        assert_eq!(*calls.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_debounce_drop_cancels() {
        let (calls, cb) = recorder();
        let debouncer = Debouncer::new(Duration::from_millis(50), cb);

        debouncer.trigger(1).await;
        drop(debouncer);

        sleep(Duration::from_millis(120)).await;
        assert!(calls.lock().unwrap().is_empty());
    }
}
