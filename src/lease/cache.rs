use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

/// Process-local record of when each job last ran
///
/// The check and the update happen under one lock so concurrent invocations
/// in the same process cannot both claim the window.
pub trait LeaseCache: Send + Sync {
    /// Claims `job` at `now` unless it was claimed less than `window` ago.
    /// Returns the time since the previous claim when the claim is refused.
    fn try_claim(&self, job: &str, now: DateTime<Utc>, window: Duration) -> Option<Duration>;
}

#[derive(Debug, Default)]
pub struct InMemoryLeaseCache {
    last_run: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryLeaseCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn last_run(&self, job: &str) -> Option<DateTime<Utc>> {
        self.last_run.lock().get(job).copied()
    }

    /// Forget every claim
    #[cfg(test)]
    pub fn reset(&self) {
        self.last_run.lock().clear();
    }
}

impl LeaseCache for InMemoryLeaseCache {
    fn try_claim(&self, job: &str, now: DateTime<Utc>, window: Duration) -> Option<Duration> {
        let mut last_run = self.last_run.lock();

        if let Some(previous) = last_run.get(job) {
            let elapsed = now - *previous;
            if elapsed < window {
                return Some(elapsed);
            }
        }

        last_run.insert(job.to_string(), now);
        debug!("🔒 Local lease claimed for {}", job);
        None
    }
}
