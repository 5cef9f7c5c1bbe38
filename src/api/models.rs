use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::reconcile::aggregator::EnrichedRecord;
use crate::reconcile::manual_pay::ManualPayReceipt;
use crate::reconcile::unpaid::{UnpaidItem, UnpaidSummary};
use crate::region::models::{LedgerEntry, RegionId};

// ========== REQUEST MODELS ==========

/// Ledger history for one user in one region
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentHistoryRequest {
    #[validate(length(min = 1, message = "region is required"))]
    pub region: String,
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: String,
}

/// Pay an unpaid (user, campaign) pair by hand
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ManualPayRequest {
    #[validate(length(min = 1, message = "region is required"))]
    pub region: String,
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: String,
    #[validate(length(min = 1, message = "campaignId is required"))]
    pub campaign_id: String,
    #[validate(range(min = 1, message = "amount must be positive"))]
    pub amount: i64,
    pub description: Option<String>,
    pub submission_id: Option<String>,
}

/// `?manual=true` or `?test=true` bypasses the duplicate-run lease
#[derive(Debug, Default, Deserialize)]
pub struct JobTriggerQuery {
    pub manual: Option<bool>,
    pub test: Option<bool>,
}

impl JobTriggerQuery {
    pub fn is_manual_override(&self) -> bool {
        self.manual.unwrap_or(false) || self.test.unwrap_or(false)
    }
}

// ========== RESPONSE MODELS ==========

#[derive(Debug, Serialize)]
pub struct RegionHealth {
    pub id: RegionId,
    pub configured: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub regions: Vec<RegionHealth>,
}

#[derive(Debug, Serialize)]
pub struct FinalConfirmationsResponse {
    pub success: bool,
    pub confirmed: Vec<EnrichedRecord>,
    pub pending: Vec<EnrichedRecord>,
}

#[derive(Debug, Serialize)]
pub struct PaymentHistoryResponse {
    pub success: bool,
    /// Point history table rows
    pub history: Vec<LedgerEntry>,
    /// Ledger rows, campaign-tagged or not
    pub transactions: Vec<LedgerEntry>,
}

#[derive(Debug, Serialize)]
pub struct ManualPayResponse {
    pub success: bool,
    #[serde(flatten)]
    pub receipt: ManualPayReceipt,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnpaidResponse {
    pub success: bool,
    pub unpaid_items: Vec<UnpaidItem>,
    pub count: usize,
    pub summary: UnpaidSummary,
}
