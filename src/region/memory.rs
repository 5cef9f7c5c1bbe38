use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::region::gateway::{LedgerWriter, RegionGateway};
use crate::region::models::*;

/// Tables a `MemoryRegionGateway` can be told to fail on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Submissions,
    Applications,
    Campaigns,
    Profiles,
    Ledger,
    History,
}

#[derive(Default)]
struct Tables {
    submissions: Vec<Submission>,
    applications: Vec<Application>,
    campaigns: Vec<Campaign>,
    profiles: Vec<UserProfile>,
    ledger: Vec<LedgerEntry>,
    completed_applications: Vec<CompletedApplication>,
    point_history: Vec<LedgerEntry>,
}

/// In-memory region store with the same ordering contracts as the SQL adapter
#[derive(Default)]
pub struct MemoryRegionGateway {
    tables: RwLock<Tables>,
    failing: parking_lot::Mutex<HashSet<Table>>,
    delay: parking_lot::Mutex<Option<Duration>>,
}

impl MemoryRegionGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_submission(&self, submission: Submission) {
        self.tables.write().await.submissions.push(submission);
    }

    pub async fn add_application(&self, application: Application) {
        self.tables.write().await.applications.push(application);
    }

    pub async fn add_campaign(&self, campaign: Campaign) {
        self.tables.write().await.campaigns.push(campaign);
    }

    pub async fn add_profile(&self, profile: UserProfile) {
        self.tables.write().await.profiles.push(profile);
    }

    pub async fn add_ledger_entry(&self, entry: LedgerEntry) {
        self.tables.write().await.ledger.push(entry);
    }

    pub async fn add_completed_application(&self, application: CompletedApplication) {
        self.tables.write().await.completed_applications.push(application);
    }

    pub async fn add_history_entry(&self, entry: LedgerEntry) {
        self.tables.write().await.point_history.push(entry);
    }

    pub async fn submission(&self, id: &str) -> Option<Submission> {
        self.tables
            .read()
            .await
            .submissions
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    pub async fn ledger_len(&self) -> usize {
        self.tables.read().await.ledger.len()
    }

    /// Make every read and write of `table` fail
    pub fn fail_table(&self, table: Table) {
        self.failing.lock().insert(table);
    }

    /// Delay every read, to exercise request timeouts
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    async fn guard(&self, table: Table) -> AppResult<()> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().contains(&table) {
            return Err(AppError::Database(sqlx::Error::Protocol(format!(
                "{:?} query failed",
                table
            ))));
        }
        Ok(())
    }
}

fn contains(ids: &[String], value: &Option<String>) -> bool {
    value.as_ref().map_or(false, |v| ids.contains(v))
}

#[async_trait]
impl RegionGateway for MemoryRegionGateway {
    async fn fetch_recent_submissions(&self, limit: i64) -> AppResult<Vec<Submission>> {
        self.guard(Table::Submissions).await?;
        let mut rows = self.tables.read().await.submissions.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn fetch_awaiting_confirmation(&self, limit: i64) -> AppResult<Vec<Submission>> {
        self.guard(Table::Submissions).await?;
        let mut rows: Vec<Submission> = self
            .tables
            .read()
            .await
            .submissions
            .iter()
            .filter(|s| s.status == SubmissionStatus::Approved && s.final_confirmed_at.is_none())
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.approved_at.cmp(&b.approved_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn fetch_submissions_by_user_campaign(
        &self,
        user_ids: &[String],
        campaign_ids: &[String],
    ) -> AppResult<Vec<Submission>> {
        self.guard(Table::Submissions).await?;
        Ok(self
            .tables
            .read()
            .await
            .submissions
            .iter()
            .filter(|s| contains(user_ids, &s.user_id) && contains(campaign_ids, &s.campaign_id))
            .cloned()
            .collect())
    }

    async fn fetch_applications_by_ids(&self, ids: &[String]) -> AppResult<Vec<Application>> {
        self.guard(Table::Applications).await?;
        Ok(self
            .tables
            .read()
            .await
            .applications
            .iter()
            .filter(|a| ids.contains(&a.id))
            .cloned()
            .collect())
    }

    async fn fetch_applications_by_user_campaign(
        &self,
        user_ids: &[String],
        campaign_ids: &[String],
    ) -> AppResult<Vec<Application>> {
        self.guard(Table::Applications).await?;
        Ok(self
            .tables
            .read()
            .await
            .applications
            .iter()
            .filter(|a| contains(user_ids, &a.user_id) && contains(campaign_ids, &a.campaign_id))
            .cloned()
            .collect())
    }

    async fn fetch_completed_applications(&self, limit: i64) -> AppResult<Vec<CompletedApplication>> {
        self.guard(Table::Applications).await?;
        let mut rows = self.tables.read().await.completed_applications.clone();
        // Newest first, unknown update times last
        rows.sort_by(|a, b| match (a.completed_at, b.completed_at) {
            (Some(a), Some(b)) => b.cmp(&a),
            (a, b) => b.is_some().cmp(&a.is_some()),
        });
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn fetch_campaigns_by_ids(&self, ids: &[String]) -> AppResult<Vec<Campaign>> {
        self.guard(Table::Campaigns).await?;
        Ok(self
            .tables
            .read()
            .await
            .campaigns
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn fetch_profiles_by_ids(&self, ids: &[String]) -> AppResult<Vec<UserProfile>> {
        self.guard(Table::Profiles).await?;
        Ok(self
            .tables
            .read()
            .await
            .profiles
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn fetch_campaign_ledger(&self, user_ids: &[String]) -> AppResult<Vec<LedgerEntry>> {
        self.guard(Table::Ledger).await?;
        let mut rows: Vec<LedgerEntry> = self
            .tables
            .read()
            .await
            .ledger
            .iter()
            .filter(|e| user_ids.contains(&e.user_id) && e.related_campaign_id.is_some())
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(rows)
    }

    async fn fetch_user_ledger(&self, user_id: &str, limit: i64) -> AppResult<Vec<LedgerEntry>> {
        self.guard(Table::Ledger).await?;
        let mut rows: Vec<LedgerEntry> = self
            .tables
            .read()
            .await
            .ledger
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn fetch_point_history(&self, user_id: &str, limit: i64) -> AppResult<Vec<LedgerEntry>> {
        self.guard(Table::History).await?;
        let mut rows: Vec<LedgerEntry> = self
            .tables
            .read()
            .await
            .point_history
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }
}

#[async_trait]
impl LedgerWriter for MemoryRegionGateway {
    async fn insert_ledger_entry(&self, entry: NewLedgerEntry) -> AppResult<LedgerEntry> {
        self.guard(Table::Ledger).await?;
        let row = LedgerEntry {
            id: Uuid::new_v4().to_string(),
            user_id: entry.user_id,
            related_campaign_id: Some(entry.related_campaign_id),
            amount: entry.amount,
            transaction_type: Some(entry.transaction_type),
            description: Some(entry.description),
            created_at: entry.created_at,
        };
        self.tables.write().await.ledger.push(row.clone());
        Ok(row)
    }

    async fn backfill_final_confirmed(
        &self,
        submission_id: &str,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.guard(Table::Submissions).await?;
        let mut tables = self.tables.write().await;
        match tables
            .submissions
            .iter_mut()
            .find(|s| s.id == submission_id && s.final_confirmed_at.is_none())
        {
            Some(submission) => {
                submission.final_confirmed_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
