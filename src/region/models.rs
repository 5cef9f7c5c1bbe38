use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use sqlx::prelude::FromRow;
use std::fmt;

/// Region identifier ("korea", "japan", "us", ...)
///
/// Entities are region-scoped: nothing tagged with one region is ever
/// joined against another region's rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(String);

impl RegionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Submission workflow status
///
/// Statuses this service does not know about are carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubmissionStatus {
    Submitted,
    Approved,
    Completed,
    FinalConfirmed,
    Other(String),
}

impl SubmissionStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "submitted" => SubmissionStatus::Submitted,
            "approved" => SubmissionStatus::Approved,
            "completed" => SubmissionStatus::Completed,
            "final_confirmed" => SubmissionStatus::FinalConfirmed,
            other => SubmissionStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Completed => "completed",
            SubmissionStatus::FinalConfirmed => "final_confirmed",
            SubmissionStatus::Other(raw) => raw,
        }
    }

    /// Counts toward a multi-video campaign's completed uploads
    pub fn counts_as_delivered(&self) -> bool {
        matches!(
            self,
            SubmissionStatus::Approved
                | SubmissionStatus::Completed
                | SubmissionStatus::FinalConfirmed
        )
    }
}

impl From<String> for SubmissionStatus {
    fn from(raw: String) -> Self {
        SubmissionStatus::parse(&raw)
    }
}

impl Serialize for SubmissionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Creator upload (read-only here, except the manual-pay backfill)
#[derive(Debug, Clone, FromRow)]
pub struct Submission {
    pub id: String,
    pub user_id: Option<String>,
    pub campaign_id: Option<String>,
    pub application_id: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: SubmissionStatus,
    pub approved_at: Option<DateTime<Utc>>,
    pub final_confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Campaign application. Contact columns vary by region; absent ones are `None`.
#[derive(Debug, Clone, FromRow)]
pub struct Application {
    pub id: String,
    pub user_id: Option<String>,
    pub campaign_id: Option<String>,
    pub applicant_name: Option<String>,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

/// Application marked `completed`, with the time it was last updated
#[derive(Debug, Clone, FromRow)]
pub struct CompletedApplication {
    pub id: String,
    pub user_id: Option<String>,
    pub campaign_id: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Campaign {
    pub id: String,
    pub title: Option<String>,
    pub brand: Option<String>,
    pub campaign_type: Option<String>,
    pub creator_points_override: Option<i64>,
    pub reward_points: Option<i64>,
    pub estimated_cost: Option<f64>,
    pub video_count: Option<i32>,
}

#[derive(Debug, Clone, FromRow)]
pub struct UserProfile {
    pub id: String,
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Append-only point ledger row. A row with `related_campaign_id` set is
/// proof that the (user, campaign) pair was paid.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: String,
    pub user_id: String,
    pub related_campaign_id: Option<String>,
    pub amount: i64,
    pub transaction_type: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Ledger row to append through the manual-pay path
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub user_id: String,
    pub related_campaign_id: String,
    pub amount: i64,
    pub transaction_type: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Builds the `userId_campaignId` composite key used by the application and ledger indexes
pub fn pair_key(user_id: &str, campaign_id: &str) -> String {
    format!("{}_{}", user_id, campaign_id)
}

/// Treat empty or whitespace-only strings as missing
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
