//! Fixed-interval pacing for calls against a rate-limited service.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Spaces successive `process()` returns at least `delay` apart.
///
/// Concurrent callers queue on the internal lock, so the spacing holds across
/// tasks. There is no burst allowance.
pub struct Throttle {
    delay: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last: Mutex::new(None),
        }
    }

    /// Wait for the next slot.
    pub async fn process(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.delay {
                sleep(self.delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_call_does_not_wait() {
        let throttle = Throttle::new(Duration::from_millis(200));
        let start = Instant::now();
        throttle.process().await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_sequential_calls_are_spaced() {
        let delay = Duration::from_millis(30);
        let throttle = Throttle::new(delay);
        let start = Instant::now();
        for _ in 0..5 {
            throttle.process().await;
        }
        assert!(start.elapsed() >= delay * 4);
    }

    #[tokio::test]
    async fn test_concurrent_callers_are_serialized() {
        let delay = Duration::from_millis(30);
        let throttle = Arc::new(Throttle::new(delay));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let throttle = throttle.clone();
            handles.push(tokio::spawn(async move { throttle.process().await }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert!(start.elapsed() >= delay * 3);
    }
}
