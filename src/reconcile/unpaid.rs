// Unpaid audit
//
// Lists work that was delivered but has no payment on the ledger, with the
// likely reason each one is stuck. Two sources feed it: approved submissions
// that were never final-confirmed, and applications marked completed. A
// (user, campaign) pair is listed once, from the first source that has it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{error, info};

use crate::region::gateway::RegionGateway;
use crate::region::models::*;
use crate::region::registry::{RegionHandle, RegionRegistry};
use crate::reconcile::aggregator::ReconcileOptions;
use crate::reconcile::payment::PaymentIndex;
use crate::reconcile::resolver::{resolve, RegionIndexes, ResolvedEntities};
use crate::reconcile::reward::resolve_reward;
use crate::reconcile::{distinct_ids, or_empty};

/// Completed applications scanned per region
pub const COMPLETED_APPLICATION_LIMIT: i64 = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnpaidReason {
    CampaignMissing,
    MultiVideoIncomplete { completed: i64, required: i64 },
    RewardNotSet,
    ProfileMissing,
    /// Nothing obvious; needs a manual look
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnpaidSource {
    Submission,
    Application,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnpaidItem {
    #[serde(rename = "type")]
    pub source: UnpaidSource,
    pub region: RegionId,
    /// Submission id or application id, per `source`
    pub id: String,
    pub user_id: Option<String>,
    pub campaign_id: Option<String>,
    pub application_id: Option<String>,
    pub creator_name: Option<String>,
    pub creator_email: Option<String>,
    pub creator_phone: Option<String>,
    pub campaign_title: Option<String>,
    pub campaign_type: Option<String>,
    pub reward_points: i64,
    pub approved_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub days_since_approval: i64,
    pub is_multi_video: bool,
    pub required_count: i64,
    pub completed_count: i64,
    pub reasons: Vec<UnpaidReason>,
}

impl UnpaidItem {
    /// Approval time, or completion time for application items
    pub fn settled_at(&self) -> Option<DateTime<Utc>> {
        self.approved_at.or(self.completed_at)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnpaidSummary {
    pub total: usize,
    pub submissions: usize,
    pub applications: usize,
    pub multi_video_incomplete: usize,
    pub reward_not_set: usize,
    pub profile_missing: usize,
    pub campaign_missing: usize,
    pub unknown: usize,
    pub by_region: BTreeMap<RegionId, usize>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnpaidReport {
    pub items: Vec<UnpaidItem>,
    pub summary: UnpaidSummary,
}

/// Uploads a campaign expects per creator, for campaigns that need more than one
pub fn required_videos(campaign: &Campaign) -> Option<i64> {
    match campaign.campaign_type.as_deref() {
        Some("4week_challenge") => Some(4),
        Some("oliveyoung") | Some("oliveyoung_sale") => Some(2),
        _ => campaign
            .video_count
            .filter(|count| *count > 1)
            .map(i64::from),
    }
}

pub struct UnpaidAudit {
    registry: RegionRegistry,
    options: ReconcileOptions,
}

impl UnpaidAudit {
    pub fn new(registry: RegionRegistry, options: ReconcileOptions) -> Self {
        Self { registry, options }
    }

    pub async fn audit(&self) -> UnpaidReport {
        self.audit_at(Utc::now()).await
    }

    pub async fn audit_at(&self, now: DateTime<Utc>) -> UnpaidReport {
        let mut items = Vec::new();
        let mut summary = UnpaidSummary::default();

        for region in self.registry.regions() {
            let region_items = self.audit_bounded(region, now).await;
            if region.is_configured() {
                summary.by_region.insert(region.id.clone(), region_items.len());
            }
            items.extend(region_items);
        }

        // Oldest first; unknown times lead
        items.sort_by_key(UnpaidItem::settled_at);

        summary.total = items.len();
        for item in &items {
            match item.source {
                UnpaidSource::Submission => summary.submissions += 1,
                UnpaidSource::Application => summary.applications += 1,
            }
            for reason in &item.reasons {
                match reason {
                    UnpaidReason::CampaignMissing => summary.campaign_missing += 1,
                    UnpaidReason::MultiVideoIncomplete { .. } => summary.multi_video_incomplete += 1,
                    UnpaidReason::RewardNotSet => summary.reward_not_set += 1,
                    UnpaidReason::ProfileMissing => summary.profile_missing += 1,
                    UnpaidReason::Unknown => summary.unknown += 1,
                }
            }
        }

        info!("✓ Unpaid audit complete - {} items", summary.total);
        UnpaidReport { items, summary }
    }

    async fn audit_bounded(&self, region: &RegionHandle, now: DateTime<Utc>) -> Vec<UnpaidItem> {
        let Some(store) = &region.store else {
            info!("[{}] region store not configured, skipping", region.id);
            return vec![];
        };

        match tokio::time::timeout(
            self.options.region_timeout,
            audit_region(&region.id, store.gateway.as_ref(), self.options.page_size, now),
        )
        .await
        {
            Ok(items) => items,
            Err(_) => {
                error!("[{}] unpaid audit timed out, skipping", region.id);
                vec![]
            }
        }
    }
}

async fn audit_region(
    region: &RegionId,
    gateway: &dyn RegionGateway,
    page_size: i64,
    now: DateTime<Utc>,
) -> Vec<UnpaidItem> {
    let mut listed = HashSet::new();

    let mut items = audit_submissions(region, gateway, page_size, now, &mut listed).await;
    items.extend(audit_completed_applications(region, gateway, now, &mut listed).await);

    info!("[{}] unpaid items: {}", region, items.len());
    items
}

/// Approved submissions still waiting for final confirmation
async fn audit_submissions(
    region: &RegionId,
    gateway: &dyn RegionGateway,
    page_size: i64,
    now: DateTime<Utc>,
    listed: &mut HashSet<String>,
) -> Vec<UnpaidItem> {
    let awaiting = or_empty(
        region,
        "submissions",
        gateway.fetch_awaiting_confirmation(page_size).await,
    );

    // Multi-video campaigns have several approved uploads per creator; report the pair once
    let submissions: Vec<Submission> = awaiting
        .into_iter()
        .filter(|s| match (&s.user_id, &s.campaign_id) {
            (Some(user_id), Some(campaign_id)) => listed.insert(pair_key(user_id, campaign_id)),
            _ => true,
        })
        .collect();

    if submissions.is_empty() {
        return vec![];
    }

    let indexes = RegionIndexes::load(region, gateway, &submissions).await;
    let user_ids = distinct_ids(submissions.iter().map(|s| &s.user_id));
    let payments = PaymentIndex::load(region, gateway, &user_ids).await;

    let delivered = count_delivered(region, gateway, &submissions, &indexes).await;

    let mut items = Vec::new();
    for submission in submissions {
        let payment = payments.status_for(
            submission.user_id.as_deref(),
            submission.campaign_id.as_deref(),
        );
        if payment.paid {
            continue;
        }

        let resolved = resolve(&submission, &indexes);
        let campaign = resolved.campaign;
        let required = campaign.and_then(required_videos);
        let completed = match (&submission.user_id, &submission.campaign_id) {
            (Some(user_id), Some(campaign_id)) => delivered
                .get(&pair_key(user_id, campaign_id))
                .copied()
                .unwrap_or(0)
                .max(1),
            _ => 1,
        };
        let reward = campaign.map(resolve_reward).unwrap_or(0);
        let incomplete = required
            .filter(|r| completed < *r)
            .map(|required| (completed, required));

        items.push(UnpaidItem {
            source: UnpaidSource::Submission,
            region: region.clone(),
            creator_name: resolved.creator_name(),
            creator_email: resolved.email(),
            creator_phone: resolved.phone(),
            campaign_title: campaign.and_then(|c| c.title.clone()),
            campaign_type: campaign.and_then(|c| c.campaign_type.clone()),
            reward_points: reward,
            completed_at: None,
            days_since_approval: days_since(submission.approved_at, now),
            is_multi_video: required.is_some(),
            required_count: required.unwrap_or(1),
            completed_count: completed,
            reasons: diagnose(&resolved, incomplete, reward),
            id: submission.id,
            user_id: submission.user_id,
            campaign_id: submission.campaign_id,
            application_id: submission.application_id,
            approved_at: submission.approved_at,
        });
    }

    items
}

/// Applications marked completed whose pair never reached the ledger
async fn audit_completed_applications(
    region: &RegionId,
    gateway: &dyn RegionGateway,
    now: DateTime<Utc>,
    listed: &mut HashSet<String>,
) -> Vec<UnpaidItem> {
    let completed = or_empty(
        region,
        "applications",
        gateway
            .fetch_completed_applications(COMPLETED_APPLICATION_LIMIT)
            .await,
    );

    // Pairs already listed from a submission are skipped
    let applications: Vec<CompletedApplication> = completed
        .into_iter()
        .filter(|a| match (&a.user_id, &a.campaign_id) {
            (Some(user_id), Some(campaign_id)) => listed.insert(pair_key(user_id, campaign_id)),
            _ => true,
        })
        .collect();

    if applications.is_empty() {
        return vec![];
    }

    let user_ids = distinct_ids(applications.iter().map(|a| &a.user_id));
    let campaign_ids = distinct_ids(applications.iter().map(|a| &a.campaign_id));
    let campaigns = or_empty(
        region,
        "campaigns",
        gateway.fetch_campaigns_by_ids(&campaign_ids).await,
    );
    let profiles = or_empty(
        region,
        "user_profiles",
        gateway.fetch_profiles_by_ids(&user_ids).await,
    );
    let indexes = RegionIndexes::build(vec![], vec![], campaigns, profiles);
    let payments = PaymentIndex::load(region, gateway, &user_ids).await;

    let mut items = Vec::new();
    for application in applications {
        if payments
            .status_for(application.user_id.as_deref(), application.campaign_id.as_deref())
            .paid
        {
            continue;
        }

        let resolved = ResolvedEntities {
            application: None,
            campaign: application
                .campaign_id
                .as_ref()
                .and_then(|id| indexes.campaigns.get(id)),
            profile: application
                .user_id
                .as_ref()
                .and_then(|id| indexes.profiles.get(id)),
        };
        let campaign = resolved.campaign;
        let reward = campaign.map(resolve_reward).unwrap_or(0);

        items.push(UnpaidItem {
            source: UnpaidSource::Application,
            region: region.clone(),
            creator_name: resolved.creator_name(),
            creator_email: resolved.email(),
            creator_phone: resolved.phone(),
            campaign_title: campaign.and_then(|c| c.title.clone()),
            campaign_type: campaign.and_then(|c| c.campaign_type.clone()),
            reward_points: reward,
            approved_at: None,
            days_since_approval: days_since(application.completed_at, now),
            is_multi_video: false,
            required_count: 1,
            completed_count: 1,
            reasons: diagnose(&resolved, None, reward),
            application_id: Some(application.id.clone()),
            id: application.id,
            user_id: application.user_id,
            campaign_id: application.campaign_id,
            completed_at: application.completed_at,
        });
    }

    items
}

fn diagnose(
    resolved: &ResolvedEntities<'_>,
    incomplete: Option<(i64, i64)>,
    reward: i64,
) -> Vec<UnpaidReason> {
    let mut reasons = Vec::new();
    match resolved.campaign {
        None => reasons.push(UnpaidReason::CampaignMissing),
        Some(_) => {
            if let Some((completed, required)) = incomplete {
                reasons.push(UnpaidReason::MultiVideoIncomplete { completed, required });
            }
            if reward == 0 {
                reasons.push(UnpaidReason::RewardNotSet);
            }
        }
    }
    if resolved.profile.is_none() {
        reasons.push(UnpaidReason::ProfileMissing);
    }
    if reasons.is_empty() {
        reasons.push(UnpaidReason::Unknown);
    }
    reasons
}

fn days_since(at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    at.map(|at| (now - at).num_days()).unwrap_or(0)
}

/// Delivered uploads per `userId_campaignId`, for multi-video campaigns only, in one query
async fn count_delivered(
    region: &RegionId,
    gateway: &dyn RegionGateway,
    submissions: &[Submission],
    indexes: &RegionIndexes,
) -> HashMap<String, i64> {
    let multi_video: Vec<&Submission> = submissions
        .iter()
        .filter(|s| {
            s.campaign_id
                .as_ref()
                .and_then(|id| indexes.campaigns.get(id))
                .and_then(required_videos)
                .is_some()
        })
        .collect();

    if multi_video.is_empty() {
        return HashMap::new();
    }

    let user_ids = distinct_ids(multi_video.iter().map(|s| &s.user_id));
    let campaign_ids = distinct_ids(multi_video.iter().map(|s| &s.campaign_id));
    let rows = or_empty(
        region,
        "submissions",
        gateway
            .fetch_submissions_by_user_campaign(&user_ids, &campaign_ids)
            .await,
    );

    let mut counts = HashMap::new();
    for row in rows.iter().filter(|s| s.status.counts_as_delivered()) {
        if let (Some(user_id), Some(campaign_id)) = (&row.user_id, &row.campaign_id) {
            *counts.entry(pair_key(user_id, campaign_id)).or_insert(0) += 1;
        }
    }
    counts
}
