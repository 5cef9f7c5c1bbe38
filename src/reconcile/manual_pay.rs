use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::region::models::*;
use crate::region::registry::RegionRegistry;

pub const CAMPAIGN_PAYMENT: &str = "campaign_payment";
pub const DEFAULT_DESCRIPTION: &str = "Manual point payment (unpaid item)";

/// An out-of-band payment for one (user, campaign) pair
#[derive(Debug, Clone)]
pub struct ManualPayment {
    pub region: RegionId,
    pub user_id: String,
    pub campaign_id: String,
    pub amount: i64,
    pub description: Option<String>,
    pub submission_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualPayReceipt {
    pub entry: LedgerEntry,
    pub final_confirmed_backfilled: bool,
}

/// The one write path besides the lease upsert: append a campaign-tagged
/// ledger entry, then backfill the submission's `final_confirmed_at` if unset.
pub struct ManualPayService {
    registry: RegionRegistry,
}

impl ManualPayService {
    pub fn new(registry: RegionRegistry) -> Self {
        Self { registry }
    }

    pub async fn pay(&self, payment: ManualPayment) -> AppResult<ManualPayReceipt> {
        self.pay_at(payment, Utc::now()).await
    }

    pub async fn pay_at(&self, payment: ManualPayment, now: DateTime<Utc>) -> AppResult<ManualPayReceipt> {
        validate(&payment)?;
        let store = self.registry.store(&payment.region)?;

        let description = payment
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_DESCRIPTION)
            .to_string();

        let entry = store
            .writer
            .insert_ledger_entry(NewLedgerEntry {
                user_id: payment.user_id.clone(),
                related_campaign_id: payment.campaign_id.clone(),
                amount: payment.amount,
                transaction_type: CAMPAIGN_PAYMENT.to_string(),
                description,
                created_at: now,
            })
            .await?;

        // The ledger entry is already the proof of payment; a failed backfill
        // must not turn into an error that invites a second payment.
        let final_confirmed_backfilled = match payment.submission_id.as_deref().filter(|id| !id.is_empty()) {
            Some(submission_id) => match store.writer.backfill_final_confirmed(submission_id, now).await {
                Ok(updated) => updated,
                Err(e) => {
                    error!(
                        "[{}] final_confirmed_at backfill failed for submission {}: {}",
                        payment.region, submission_id, e
                    );
                    false
                }
            },
            None => false,
        };

        info!(
            "💰 Manual pay ({}): user={}, campaign={}, amount={}, backfilled={}",
            payment.region, payment.user_id, payment.campaign_id, payment.amount, final_confirmed_backfilled
        );

        Ok(ManualPayReceipt {
            entry,
            final_confirmed_backfilled,
        })
    }
}

fn validate(payment: &ManualPayment) -> AppResult<()> {
    if payment.user_id.trim().is_empty() || payment.campaign_id.trim().is_empty() {
        return Err(AppError::BadRequest(
            "userId and campaignId are required".to_string(),
        ));
    }
    if payment.amount < 1 {
        return Err(AppError::BadRequest("amount must be positive".to_string()));
    }
    Ok(())
}
