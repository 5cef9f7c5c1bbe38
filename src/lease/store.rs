use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;

use crate::error::LeaseStoreError;

/// Durable, one-row-per-job lease table
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// When `job` last ran, if ever
    async fn last_executed(&self, job: &str) -> Result<Option<DateTime<Utc>>, LeaseStoreError>;

    /// Upsert by job name. The stored timestamp never moves backwards.
    async fn record(&self, job: &str, at: DateTime<Utc>) -> Result<(), LeaseStoreError>;

    /// Create the lease table if it does not exist
    async fn provision(&self) -> Result<(), LeaseStoreError>;
}

pub const LEASE_TABLE_DDL: &str = "CREATE TABLE IF NOT EXISTS scheduler_executions (
    function_name text PRIMARY KEY,
    executed_at timestamptz NOT NULL DEFAULT now()
)";

pub struct PgLeaseStore {
    pool: PgPool,
}

impl PgLeaseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeaseStore for PgLeaseStore {
    async fn last_executed(&self, job: &str) -> Result<Option<DateTime<Utc>>, LeaseStoreError> {
        let executed_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            SELECT executed_at
            FROM scheduler_executions
            WHERE function_name = $1
            ORDER BY executed_at DESC
            LIMIT 1
            "#,
        )
        .bind(job)
        .fetch_optional(&self.pool)
        .await?;

        Ok(executed_at)
    }

    async fn record(&self, job: &str, at: DateTime<Utc>) -> Result<(), LeaseStoreError> {
        sqlx::query(
            r#"
            INSERT INTO scheduler_executions (function_name, executed_at)
            VALUES ($1, $2)
            ON CONFLICT (function_name)
            DO UPDATE SET executed_at = GREATEST(scheduler_executions.executed_at, EXCLUDED.executed_at)
            "#,
        )
        .bind(job)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn provision(&self) -> Result<(), LeaseStoreError> {
        sqlx::query(LEASE_TABLE_DDL).execute(&self.pool).await?;
        info!("✓ scheduler_executions table provisioned");
        Ok(())
    }
}

#[cfg(test)]
pub mod memory {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Lease store double that can pretend its table is missing or the store is down
    #[derive(Default)]
    pub struct MemoryLeaseStore {
        rows: Mutex<HashMap<String, DateTime<Utc>>>,
        pub missing_table: AtomicBool,
        pub unavailable: AtomicBool,
        pub provision_calls: AtomicUsize,
        pub record_calls: AtomicUsize,
    }

    impl MemoryLeaseStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn without_table() -> Self {
            let store = Self::default();
            store.missing_table.store(true, Ordering::SeqCst);
            store
        }

        pub fn executed_at(&self, job: &str) -> Option<DateTime<Utc>> {
            self.rows.lock().get(job).copied()
        }

        fn check(&self) -> Result<(), LeaseStoreError> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(LeaseStoreError::Unavailable("connection refused".into()));
            }
            if self.missing_table.load(Ordering::SeqCst) {
                return Err(LeaseStoreError::MissingTable);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl LeaseStore for MemoryLeaseStore {
        async fn last_executed(&self, job: &str) -> Result<Option<DateTime<Utc>>, LeaseStoreError> {
            self.check()?;
            Ok(self.executed_at(job))
        }

        async fn record(&self, job: &str, at: DateTime<Utc>) -> Result<(), LeaseStoreError> {
            self.check()?;
            self.record_calls.fetch_add(1, Ordering::SeqCst);
            let mut rows = self.rows.lock();
            let slot = rows.entry(job.to_string()).or_insert(at);
            if at > *slot {
                *slot = at;
            }
            Ok(())
        }

        async fn provision(&self) -> Result<(), LeaseStoreError> {
            self.provision_calls.fetch_add(1, Ordering::SeqCst);
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(LeaseStoreError::Unavailable("connection refused".into()));
            }
            self.missing_table.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_record_never_rewinds() {
        use chrono::TimeZone;
        let store = MemoryLeaseStore::new();
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap();

        store.record("job", late).await.unwrap();
        store.record("job", early).await.unwrap();
        assert_eq!(store.last_executed("job").await.unwrap(), Some(late));
    }
}
