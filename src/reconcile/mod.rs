// Cross-region settlement reconciliation
pub mod aggregator;
pub mod manual_pay;
pub mod payment;
pub mod resolver;
pub mod reward;
pub mod unpaid;

pub use aggregator::{ReconcileOptions, Reconciler};
pub use manual_pay::{ManualPayService, ManualPayment};
pub use unpaid::UnpaidAudit;

use std::collections::HashSet;
use tracing::error;

use crate::error::AppResult;
use crate::region::models::RegionId;

/// Distinct non-empty ids in first-seen order
pub(crate) fn distinct_ids<'a, I>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Option<String>>,
{
    let mut seen = HashSet::new();
    ids.into_iter()
        .flatten()
        .filter(|id| !id.is_empty() && seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// A failed lookup table contributes nothing instead of failing the region
pub(crate) fn or_empty<T>(region: &RegionId, table: &str, result: AppResult<Vec<T>>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        error!("[{}] {} query failed, treating as empty: {}", region, table, e);
        vec![]
    })
}
