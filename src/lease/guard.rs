// Execution lease guard
//
// Absorbs duplicate triggers of a scheduled job: a run is a duplicate when the
// same job ran less than one window ago, checked first against the
// process-local cache and then against the durable lease table.
//
// The durable check is read-then-write with no compare-and-swap, so two
// processes triggered at the same instant can both pass. It assumes a single
// external trigger source and is not a mutual-exclusion lock.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::LeaseStoreError;
use crate::lease::cache::LeaseCache;
use crate::lease::store::LeaseStore;

/// Default duplicate window: 5 minutes
pub const DEFAULT_DUPLICATE_WINDOW_SECS: i64 = 5 * 60;

/// Outcome of a duplicate check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseDecision {
    pub is_duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl LeaseDecision {
    fn proceed() -> Self {
        Self {
            is_duplicate: false,
            reason: None,
        }
    }

    fn duplicate(reason: String) -> Self {
        Self {
            is_duplicate: true,
            reason: Some(reason),
        }
    }
}

pub struct ExecutionLeaseGuard {
    cache: Arc<dyn LeaseCache>,
    store: Option<Arc<dyn LeaseStore>>,
    window: Duration,
    provision_attempted: AtomicBool,
}

impl ExecutionLeaseGuard {
    pub fn new(
        cache: Arc<dyn LeaseCache>,
        store: Option<Arc<dyn LeaseStore>>,
        window: Duration,
    ) -> Self {
        Self {
            cache,
            store,
            window,
            provision_attempted: AtomicBool::new(false),
        }
    }

    /// Check and claim `job` now
    pub async fn check_duplicate(&self, job: &str, is_manual_override: bool) -> LeaseDecision {
        self.check_duplicate_at(job, is_manual_override, Utc::now()).await
    }

    /// Check and claim `job` as of `now`
    ///
    /// Manual runs are never throttled and never touch either lease tier.
    /// Lease store failures degrade to the local result; they never fail the job.
    pub async fn check_duplicate_at(
        &self,
        job: &str,
        is_manual_override: bool,
        now: DateTime<Utc>,
    ) -> LeaseDecision {
        if is_manual_override {
            debug!("[{}] manual run, lease check bypassed", job);
            return LeaseDecision::proceed();
        }

        // 1. Process-local tier
        if let Some(elapsed) = self.cache.try_claim(job, now, self.window) {
            let secs = rounded_secs(elapsed);
            info!("[{}] local duplicate: ran {}s ago, skipping", job, secs);
            return LeaseDecision::duplicate(format!("In-memory duplicate ({}s ago)", secs));
        }

        // 2. Durable tier
        let Some(store) = &self.store else {
            debug!("[{}] no durable lease store configured, local dedup only", job);
            return LeaseDecision::proceed();
        };

        match store.last_executed(job).await {
            Ok(Some(executed_at)) if now - executed_at < self.window => {
                let secs = rounded_secs(now - executed_at);
                info!("[{}] durable duplicate: ran {}s ago, skipping", job, secs);
                return LeaseDecision::duplicate(format!("DB duplicate ({}s ago)", secs));
            }
            Ok(_) => {
                if let Err(e) = store.record(job, now).await {
                    warn!("[{}] failed to record lease, continuing: {}", job, e);
                }
            }
            Err(LeaseStoreError::MissingTable) => {
                warn!("[{}] lease table missing, local dedup only", job);
                self.provision_once(job, store.as_ref(), now).await;
            }
            Err(e) => {
                warn!("[{}] lease store check failed, local dedup only: {}", job, e);
            }
        }

        LeaseDecision::proceed()
    }

    async fn provision_once(&self, job: &str, store: &dyn LeaseStore, now: DateTime<Utc>) {
        if self.provision_attempted.swap(true, Ordering::SeqCst) {
            return;
        }

        match store.provision().await {
            Ok(()) => {
                if let Err(e) = store.record(job, now).await {
                    warn!("[{}] failed to record lease after provisioning: {}", job, e);
                }
            }
            Err(e) => warn!(
                "[{}] could not provision lease table, create it manually: {} ({})",
                job,
                e,
                crate::lease::store::LEASE_TABLE_DDL.replace('\n', " ")
            ),
        }
    }
}

fn rounded_secs(elapsed: Duration) -> i64 {
    (elapsed.num_milliseconds() as f64 / 1000.0).round() as i64
}
