// Reconciliation scheduler
//
// Internal interval trigger for the reconciliation job. Every tick goes
// through the lease guard as a scheduled (non-manual) run, so an external
// cron hitting the HTTP trigger in the same window is absorbed.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::info;

use crate::settlement::{ReconcileJob, RECONCILE_JOB};

pub struct ReconcileScheduler {
    job: Arc<ReconcileJob>,
    period: Duration,
}

impl ReconcileScheduler {
    pub fn new(job: Arc<ReconcileJob>, period: Duration) -> Self {
        Self { job, period }
    }

    /// Start the scheduler (runs in background)
    pub fn start(&self) -> JoinHandle<()> {
        let job = self.job.clone();
        let period = self.period;

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; wait one full period instead
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let outcome = job.run(false).await;
                if outcome.skipped {
                    info!(
                        "⏭️  {} skipped: {}",
                        RECONCILE_JOB,
                        outcome.reason.unwrap_or_default()
                    );
                } else {
                    info!(
                        "✓ Scheduled {} completed - confirmed: {}, pending: {}",
                        RECONCILE_JOB,
                        outcome.confirmed.unwrap_or(0),
                        outcome.pending.unwrap_or(0)
                    );
                }
            }
        })
    }
}
