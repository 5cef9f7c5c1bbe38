// Reconciliation aggregator
//
// Fans out over the fixed region list, enriches each region's most recent
// submissions with application/campaign/profile/ledger data from that same
// region, then partitions into confirmed and pending sets.
//
// Per-region data loads complete before any row is enriched, so output is a
// pure function of the snapshot reads and re-running against unchanged stores
// yields identical output.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};

use crate::region::gateway::RegionGateway;
use crate::region::models::*;
use crate::region::registry::{RegionHandle, RegionRegistry};
use crate::reconcile::payment::PaymentIndex;
use crate::reconcile::resolver::{resolve, RegionIndexes};
use crate::reconcile::reward::resolve_reward;
use crate::reconcile::distinct_ids;

/// Default page of submissions per region
pub const DEFAULT_PAGE_SIZE: i64 = 500;

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Most recent submissions fetched per region
    pub page_size: i64,
    /// Bound on one region's whole fetch stage
    pub region_timeout: Duration,
    /// Fetch regions concurrently instead of one after another
    pub parallel: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            region_timeout: Duration::from_secs(20),
            parallel: false,
        }
    }
}

/// A submission joined with everything the settlement view needs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRecord {
    pub id: String,
    pub region: RegionId,
    pub user_id: Option<String>,
    pub campaign_id: Option<String>,
    pub application_id: Option<String>,
    pub status: SubmissionStatus,
    pub final_confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub creator_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub campaign_title: Option<String>,
    pub campaign_brand: Option<String>,
    pub campaign_type: Option<String>,
    pub point_amount: i64,
    pub is_paid: bool,
    pub paid_amount: i64,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconciliationReport {
    pub confirmed: Vec<EnrichedRecord>,
    pub pending: Vec<EnrichedRecord>,
}

pub struct Reconciler {
    registry: RegionRegistry,
    options: ReconcileOptions,
}

impl Reconciler {
    pub fn new(registry: RegionRegistry, options: ReconcileOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &RegionRegistry {
        &self.registry
    }

    /// Build the confirmed/pending view across all regions.
    ///
    /// Never fails: an unconfigured, failing or timed-out region contributes
    /// zero records and the rest of the run continues.
    pub async fn reconcile(&self) -> ReconciliationReport {
        let regions = self.registry.regions();

        let per_region: Vec<Vec<EnrichedRecord>> = if self.options.parallel {
            futures::future::join_all(regions.iter().map(|r| self.reconcile_bounded(r))).await
        } else {
            let mut results = Vec::with_capacity(regions.len());
            for region in regions {
                results.push(self.reconcile_bounded(region).await);
            }
            results
        };

        let report = partition_and_sort(per_region.into_iter().flatten().collect());
        info!(
            "✓ Reconciliation complete - confirmed: {}, pending: {}",
            report.confirmed.len(),
            report.pending.len()
        );
        report
    }

    async fn reconcile_bounded(&self, region: &RegionHandle) -> Vec<EnrichedRecord> {
        let Some(store) = &region.store else {
            info!("[{}] region store not configured, skipping", region.id);
            return vec![];
        };

        match tokio::time::timeout(
            self.options.region_timeout,
            reconcile_region(&region.id, store.gateway.as_ref(), self.options.page_size),
        )
        .await
        {
            Ok(records) => records,
            Err(_) => {
                error!(
                    "[{}] region timed out after {:?}, skipping",
                    region.id, self.options.region_timeout
                );
                vec![]
            }
        }
    }
}

/// Enrich one region's page of submissions
pub async fn reconcile_region(
    region: &RegionId,
    gateway: &dyn RegionGateway,
    page_size: i64,
) -> Vec<EnrichedRecord> {
    let submissions = match gateway.fetch_recent_submissions(page_size).await {
        Ok(submissions) => submissions,
        Err(e) => {
            error!("[{}] submissions query failed, skipping region: {}", region, e);
            return vec![];
        }
    };

    info!("[{}] submissions: {}", region, submissions.len());
    if submissions.is_empty() {
        return vec![];
    }

    let indexes = RegionIndexes::load(region, gateway, &submissions).await;
    let user_ids = distinct_ids(submissions.iter().map(|s| &s.user_id));
    let payments = PaymentIndex::load(region, gateway, &user_ids).await;

    submissions
        .into_iter()
        .map(|submission| enrich(region, submission, &indexes, &payments))
        .collect()
}

fn enrich(
    region: &RegionId,
    submission: Submission,
    indexes: &RegionIndexes,
    payments: &PaymentIndex,
) -> EnrichedRecord {
    let resolved = resolve(&submission, indexes);
    let campaign = resolved.campaign;
    let payment = payments.status_for(
        submission.user_id.as_deref(),
        submission.campaign_id.as_deref(),
    );

    EnrichedRecord {
        creator_name: resolved.creator_name(),
        phone: resolved.phone(),
        email: resolved.email(),
        campaign_title: campaign.and_then(|c| non_empty(&c.title)).map(str::to_string),
        campaign_brand: campaign.and_then(|c| non_empty(&c.brand)).map(str::to_string),
        campaign_type: campaign.and_then(|c| c.campaign_type.clone()),
        point_amount: campaign.map(resolve_reward).unwrap_or(0),
        is_paid: payment.paid,
        paid_amount: payment.amount,
        paid_at: payment.paid_at,
        id: submission.id,
        region: region.clone(),
        user_id: submission.user_id,
        campaign_id: submission.campaign_id,
        application_id: submission.application_id,
        status: submission.status,
        final_confirmed_at: submission.final_confirmed_at,
        created_at: submission.created_at,
    }
}

/// Split on `final_confirmed_at` presence, then sort each side newest first.
/// Sorts are stable, so ties keep fetch order.
pub fn partition_and_sort(records: Vec<EnrichedRecord>) -> ReconciliationReport {
    let (mut confirmed, mut pending): (Vec<_>, Vec<_>) = records
        .into_iter()
        .partition(|r| r.final_confirmed_at.is_some());

    confirmed.sort_by(|a, b| b.final_confirmed_at.cmp(&a.final_confirmed_at));
    pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    ReconciliationReport { confirmed, pending }
}
