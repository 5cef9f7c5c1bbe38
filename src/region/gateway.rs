use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppResult;
use crate::region::models::*;

/// Read access to one region's data store.
///
/// Every batch method takes the full id set for a run so callers issue one
/// query per table instead of one per row. Columns a region lacks come back
/// as `None`; they are never an error.
#[async_trait]
pub trait RegionGateway: Send + Sync {
    /// Most recent submissions, newest `created_at` first
    async fn fetch_recent_submissions(&self, limit: i64) -> AppResult<Vec<Submission>>;

    /// Approved submissions not yet final-confirmed, oldest approval first
    async fn fetch_awaiting_confirmation(&self, limit: i64) -> AppResult<Vec<Submission>>;

    /// Submissions whose user is in `user_ids` and campaign is in `campaign_ids`
    async fn fetch_submissions_by_user_campaign(
        &self,
        user_ids: &[String],
        campaign_ids: &[String],
    ) -> AppResult<Vec<Submission>>;

    async fn fetch_applications_by_ids(&self, ids: &[String]) -> AppResult<Vec<Application>>;

    /// Applications whose user is in `user_ids` and campaign is in `campaign_ids`
    async fn fetch_applications_by_user_campaign(
        &self,
        user_ids: &[String],
        campaign_ids: &[String],
    ) -> AppResult<Vec<Application>>;

    /// Applications with status `completed`, most recently updated first
    async fn fetch_completed_applications(&self, limit: i64) -> AppResult<Vec<CompletedApplication>>;

    async fn fetch_campaigns_by_ids(&self, ids: &[String]) -> AppResult<Vec<Campaign>>;

    async fn fetch_profiles_by_ids(&self, ids: &[String]) -> AppResult<Vec<UserProfile>>;

    /// Campaign-tagged ledger entries for the users, oldest `created_at` first
    async fn fetch_campaign_ledger(&self, user_ids: &[String]) -> AppResult<Vec<LedgerEntry>>;

    /// All ledger entries for one user, newest first
    async fn fetch_user_ledger(&self, user_id: &str, limit: i64) -> AppResult<Vec<LedgerEntry>>;

    /// One user's rows from the point history table, newest first
    async fn fetch_point_history(&self, user_id: &str, limit: i64) -> AppResult<Vec<LedgerEntry>>;
}

/// The manual-pay write path. Nothing in reconciliation calls this.
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    async fn insert_ledger_entry(&self, entry: NewLedgerEntry) -> AppResult<LedgerEntry>;

    /// Sets `final_confirmed_at` only when it is still null.
    /// Returns whether a row was updated.
    async fn backfill_final_confirmed(
        &self,
        submission_id: &str,
        at: DateTime<Utc>,
    ) -> AppResult<bool>;
}
