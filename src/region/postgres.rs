use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::AppResult;
use crate::region::dialect::{select_or_null, RegionDialect};
use crate::region::gateway::{LedgerWriter, RegionGateway};
use crate::region::models::*;

/// Postgres-backed region store
///
/// Ids are compared as text so the same SQL works against uuid and bigint
/// key columns. Missing columns are selected as typed `NULL`s per the dialect.
pub struct PgRegionGateway {
    region: RegionId,
    pool: PgPool,
    dialect: RegionDialect,
}

impl PgRegionGateway {
    pub fn new(region: RegionId, pool: PgPool, dialect: RegionDialect) -> Self {
        Self {
            region,
            pool,
            dialect,
        }
    }

    /// Lazily connecting pool; an unreachable region fails per query, not at startup
    pub fn connect_lazy(
        region: RegionId,
        database_url: &str,
        dialect: RegionDialect,
        timeout: Duration,
    ) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(timeout)
            .idle_timeout(Duration::from_secs(600))
            .connect_lazy(database_url)?;

        info!("📊 Region {} pool configured", region);
        Ok(Self::new(region, pool, dialect))
    }
}

fn submission_columns(d: &RegionDialect) -> String {
    format!(
        "id::text AS id, user_id::text AS user_id, campaign_id::text AS campaign_id, \
         application_id::text AS application_id, COALESCE(status::text, '') AS status, \
         {}, final_confirmed_at::timestamptz AS final_confirmed_at, \
         created_at::timestamptz AS created_at",
        select_or_null(d.submission_approved_at, "timestamptz", "approved_at"),
    )
}

fn application_columns(d: &RegionDialect) -> String {
    format!(
        "id::text AS id, user_id::text AS user_id, campaign_id::text AS campaign_id, {}, {}, {}, {}",
        select_or_null(d.application_name, "text", "applicant_name"),
        select_or_null(d.application_nickname, "text", "nickname"),
        select_or_null(d.application_email, "text", "email"),
        select_or_null(d.application_phone, "text", "phone_number"),
    )
}

fn campaign_columns(d: &RegionDialect) -> String {
    format!(
        "id::text AS id, title::text AS title, {}, {}, {}, {}, {}, {}",
        select_or_null(d.campaign_brand, "text", "brand"),
        select_or_null(d.campaign_type, "text", "campaign_type"),
        select_or_null(d.campaign_points_override, "bigint", "creator_points_override"),
        select_or_null(d.campaign_reward_points, "bigint", "reward_points"),
        select_or_null(d.campaign_estimated_cost, "float8", "estimated_cost"),
        select_or_null(d.campaign_video_count, "int4", "video_count"),
    )
}

fn profile_columns(d: &RegionDialect) -> String {
    format!(
        "id::text AS id, name::text AS name, {}, {}, {}",
        select_or_null(d.profile_nickname, "text", "nickname"),
        select_or_null(d.profile_email, "text", "email"),
        select_or_null(d.profile_phone, "text", "phone"),
    )
}

fn ledger_columns(d: &RegionDialect) -> String {
    format!(
        "id::text AS id, user_id::text AS user_id, {}::text AS related_campaign_id, \
         COALESCE(amount, 0)::bigint AS amount, {}, {}, created_at::timestamptz AS created_at",
        d.ledger_campaign,
        select_or_null(d.ledger_transaction_type, "text", "transaction_type"),
        select_or_null(d.ledger_description, "text", "description"),
    )
}

/// Point history rows read into the ledger shape
const HISTORY_COLUMNS: &str = "id::text AS id, user_id::text AS user_id, \
     campaign_id::text AS related_campaign_id, COALESCE(amount, 0)::bigint AS amount, \
     type::text AS transaction_type, reason::text AS description, \
     created_at::timestamptz AS created_at";

#[async_trait]
impl RegionGateway for PgRegionGateway {
    async fn fetch_recent_submissions(&self, limit: i64) -> AppResult<Vec<Submission>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY created_at DESC LIMIT $1",
            submission_columns(&self.dialect),
            self.dialect.submissions_table,
        );
        let rows = sqlx::query_as::<_, Submission>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!("[{}] submissions: {}", self.region, rows.len());
        Ok(rows)
    }

    async fn fetch_awaiting_confirmation(&self, limit: i64) -> AppResult<Vec<Submission>> {
        let order = self.dialect.submission_approved_at.unwrap_or("created_at");
        let sql = format!(
            "SELECT {} FROM {} WHERE status = 'approved' AND final_confirmed_at IS NULL \
             ORDER BY {} ASC NULLS FIRST LIMIT $1",
            submission_columns(&self.dialect),
            self.dialect.submissions_table,
            order,
        );
        let rows = sqlx::query_as::<_, Submission>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn fetch_submissions_by_user_campaign(
        &self,
        user_ids: &[String],
        campaign_ids: &[String],
    ) -> AppResult<Vec<Submission>> {
        if user_ids.is_empty() || campaign_ids.is_empty() {
            return Ok(vec![]);
        }
        let sql = format!(
            "SELECT {} FROM {} WHERE user_id::text = ANY($1) AND campaign_id::text = ANY($2) \
             ORDER BY created_at ASC",
            submission_columns(&self.dialect),
            self.dialect.submissions_table,
        );
        let rows = sqlx::query_as::<_, Submission>(&sql)
            .bind(user_ids)
            .bind(campaign_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn fetch_applications_by_ids(&self, ids: &[String]) -> AppResult<Vec<Application>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let sql = format!(
            "SELECT {} FROM applications WHERE id::text = ANY($1)",
            application_columns(&self.dialect),
        );
        let rows = sqlx::query_as::<_, Application>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        debug!("[{}] applications by id: {}", self.region, rows.len());
        Ok(rows)
    }

    async fn fetch_applications_by_user_campaign(
        &self,
        user_ids: &[String],
        campaign_ids: &[String],
    ) -> AppResult<Vec<Application>> {
        if user_ids.is_empty() || campaign_ids.is_empty() {
            return Ok(vec![]);
        }
        let sql = format!(
            "SELECT {} FROM applications WHERE user_id::text = ANY($1) AND campaign_id::text = ANY($2) \
             ORDER BY id ASC",
            application_columns(&self.dialect),
        );
        let rows = sqlx::query_as::<_, Application>(&sql)
            .bind(user_ids)
            .bind(campaign_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn fetch_completed_applications(&self, limit: i64) -> AppResult<Vec<CompletedApplication>> {
        let rows = sqlx::query_as::<_, CompletedApplication>(
            r#"
            SELECT id::text AS id, user_id::text AS user_id, campaign_id::text AS campaign_id,
                   updated_at::timestamptz AS completed_at
            FROM applications
            WHERE status = 'completed'
            ORDER BY updated_at DESC NULLS LAST
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!("[{}] completed applications: {}", self.region, rows.len());
        Ok(rows)
    }

    async fn fetch_campaigns_by_ids(&self, ids: &[String]) -> AppResult<Vec<Campaign>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let sql = format!(
            "SELECT {} FROM campaigns WHERE id::text = ANY($1)",
            campaign_columns(&self.dialect),
        );
        let rows = sqlx::query_as::<_, Campaign>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        debug!("[{}] campaigns: {}", self.region, rows.len());
        Ok(rows)
    }

    async fn fetch_profiles_by_ids(&self, ids: &[String]) -> AppResult<Vec<UserProfile>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let sql = format!(
            "SELECT {} FROM user_profiles WHERE id::text = ANY($1)",
            profile_columns(&self.dialect),
        );
        let rows = sqlx::query_as::<_, UserProfile>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn fetch_campaign_ledger(&self, user_ids: &[String]) -> AppResult<Vec<LedgerEntry>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }
        let sql = format!(
            "SELECT {} FROM {} WHERE user_id::text = ANY($1) AND {} IS NOT NULL \
             ORDER BY created_at ASC, id ASC",
            ledger_columns(&self.dialect),
            self.dialect.ledger_table,
            self.dialect.ledger_campaign,
        );
        let rows = sqlx::query_as::<_, LedgerEntry>(&sql)
            .bind(user_ids)
            .fetch_all(&self.pool)
            .await?;

        debug!("[{}] campaign ledger entries: {}", self.region, rows.len());
        Ok(rows)
    }

    async fn fetch_user_ledger(&self, user_id: &str, limit: i64) -> AppResult<Vec<LedgerEntry>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE user_id::text = $1 ORDER BY created_at DESC LIMIT $2",
            ledger_columns(&self.dialect),
            self.dialect.ledger_table,
        );
        let rows = sqlx::query_as::<_, LedgerEntry>(&sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn fetch_point_history(&self, user_id: &str, limit: i64) -> AppResult<Vec<LedgerEntry>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE user_id::text = $1 ORDER BY created_at DESC LIMIT $2",
            HISTORY_COLUMNS, self.dialect.history_table,
        );
        let rows = sqlx::query_as::<_, LedgerEntry>(&sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl LedgerWriter for PgRegionGateway {
    async fn insert_ledger_entry(&self, entry: NewLedgerEntry) -> AppResult<LedgerEntry> {
        let d = &self.dialect;
        let mut record = serde_json::Map::new();
        record.insert("user_id".into(), json!(entry.user_id));
        record.insert("amount".into(), json!(entry.amount));
        record.insert(d.ledger_campaign.into(), json!(entry.related_campaign_id));
        record.insert("created_at".into(), json!(entry.created_at));
        if let Some(column) = d.ledger_transaction_type {
            record.insert(column.into(), json!(entry.transaction_type));
        }
        if let Some(column) = d.ledger_description {
            record.insert(column.into(), json!(entry.description));
        }

        // json_populate_record coerces each value into the column's own type (uuid, bigint, ...)
        let columns = record.keys().cloned().collect::<Vec<_>>().join(", ");
        let sql = format!(
            "INSERT INTO {table} ({columns}) SELECT {columns} FROM json_populate_record(NULL::{table}, $1) \
             RETURNING {returning}",
            table = d.ledger_table,
            columns = columns,
            returning = ledger_columns(&self.dialect),
        );

        let row = sqlx::query_as::<_, LedgerEntry>(&sql)
            .bind(serde_json::Value::Object(record))
            .fetch_one(&self.pool)
            .await?;

        info!(
            "[{}] ledger entry {} recorded for user {} / campaign {}",
            self.region, row.id, entry.user_id, entry.related_campaign_id
        );
        Ok(row)
    }

    async fn backfill_final_confirmed(
        &self,
        submission_id: &str,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let sql = format!(
            "UPDATE {} SET final_confirmed_at = $2 WHERE id::text = $1 AND final_confirmed_at IS NULL",
            self.dialect.submissions_table,
        );
        let result = sqlx::query(&sql)
            .bind(submission_id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
