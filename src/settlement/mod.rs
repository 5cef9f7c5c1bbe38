// Scheduled settlement jobs
pub mod scheduler;

use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::lease::ExecutionLeaseGuard;
use crate::reconcile::Reconciler;

pub const RECONCILE_JOB: &str = "final-confirmation-reconcile";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutcome {
    pub success: bool,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<usize>,
}

/// The reconciliation run behind both the HTTP trigger and the interval scheduler
pub struct ReconcileJob {
    reconciler: Arc<Reconciler>,
    guard: Arc<ExecutionLeaseGuard>,
}

impl ReconcileJob {
    pub fn new(reconciler: Arc<Reconciler>, guard: Arc<ExecutionLeaseGuard>) -> Self {
        Self { reconciler, guard }
    }

    pub async fn run(&self, is_manual_override: bool) -> JobOutcome {
        let decision = self
            .guard
            .check_duplicate(RECONCILE_JOB, is_manual_override)
            .await;
        if decision.is_duplicate {
            return JobOutcome {
                success: true,
                skipped: true,
                reason: decision.reason,
                confirmed: None,
                pending: None,
            };
        }

        info!("🔄 Starting {} (manual: {})", RECONCILE_JOB, is_manual_override);
        let report = self.reconciler.reconcile().await;

        JobOutcome {
            success: true,
            skipped: false,
            reason: None,
            confirmed: Some(report.confirmed.len()),
            pending: Some(report.pending.len()),
        }
    }
}
