use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::region::gateway::RegionGateway;
use crate::region::models::*;
use crate::reconcile::or_empty;

/// Whether a (user, campaign) pair has been paid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentStatus {
    pub paid: bool,
    pub amount: i64,
    pub paid_at: Option<DateTime<Utc>>,
}

impl PaymentStatus {
    fn unpaid() -> Self {
        Self {
            paid: false,
            amount: 0,
            paid_at: None,
        }
    }
}

/// Campaign-tagged ledger entries keyed by `userId_campaignId`
///
/// When a pair has several entries, the earliest `created_at` is
/// authoritative. Entries are re-sorted here (stable) so the choice does not
/// depend on the store's result order.
#[derive(Debug, Default)]
pub struct PaymentIndex {
    entries: HashMap<String, LedgerEntry>,
}

impl PaymentIndex {
    pub fn build(mut ledger: Vec<LedgerEntry>) -> Self {
        ledger.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let mut entries = HashMap::new();
        for entry in ledger {
            let Some(campaign_id) = entry.related_campaign_id.as_deref() else {
                continue;
            };
            entries
                .entry(pair_key(&entry.user_id, campaign_id))
                .or_insert(entry);
        }
        Self { entries }
    }

    /// One ledger query for every user on the page; a failure means "nothing paid"
    pub async fn load(region: &RegionId, gateway: &dyn RegionGateway, user_ids: &[String]) -> Self {
        let ledger = or_empty(
            region,
            "ledger",
            gateway.fetch_campaign_ledger(user_ids).await,
        );
        Self::build(ledger)
    }

    pub fn is_paid(&self, user_id: &str, campaign_id: &str) -> PaymentStatus {
        match self.entries.get(&pair_key(user_id, campaign_id)) {
            Some(entry) => PaymentStatus {
                paid: true,
                amount: entry.amount,
                paid_at: Some(entry.created_at),
            },
            None => PaymentStatus::unpaid(),
        }
    }

    /// Same as `is_paid` for submissions that may lack either id
    pub fn status_for(&self, user_id: Option<&str>, campaign_id: Option<&str>) -> PaymentStatus {
        match (user_id, campaign_id) {
            (Some(user_id), Some(campaign_id)) => self.is_paid(user_id, campaign_id),
            _ => PaymentStatus::unpaid(),
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
