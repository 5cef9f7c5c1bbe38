use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

use crate::{
    api::handler::AppState,
    config::Config,
    error::AppResult,
    lease::{ExecutionLeaseGuard, InMemoryLeaseCache, LeaseStore, PgLeaseStore},
    reconcile::{ManualPayService, ReconcileOptions, Reconciler, UnpaidAudit},
    region::{
        models::RegionId, PgRegionGateway, RegionDialect, RegionRegistry, RegionStore,
    },
    settlement::{scheduler::ReconcileScheduler, ReconcileJob},
};

pub async fn initialize_app_state(config: &Config) -> AppResult<AppState> {
    info!("Initializing application components ...");

    let region_timeout = Duration::from_secs(config.region_timeout_secs);
    let registry = initialize_regions(config, region_timeout)?;

    let options = ReconcileOptions {
        page_size: config.submission_page_size,
        region_timeout,
        parallel: config.parallel_regions,
    };
    let reconciler = Arc::new(Reconciler::new(registry.clone(), options.clone()));
    info!("✅ Reconciler initialized (page size {}, parallel: {})", options.page_size, options.parallel);

    let manual_pay = Arc::new(ManualPayService::new(registry.clone()));
    let unpaid = Arc::new(UnpaidAudit::new(registry, options));

    let guard = Arc::new(ExecutionLeaseGuard::new(
        Arc::new(InMemoryLeaseCache::new()),
        initialize_lease_store(config)?,
        chrono::Duration::seconds(config.duplicate_window_secs),
    ));
    info!("✅ Execution lease guard initialized ({}s window)", config.duplicate_window_secs);

    let reconcile_job = Arc::new(ReconcileJob::new(reconciler.clone(), guard));

    if config.reconcile_interval_secs > 0 {
        ReconcileScheduler::new(
            reconcile_job.clone(),
            Duration::from_secs(config.reconcile_interval_secs),
        )
        .start();
        info!("✅ Reconciliation scheduler started (every {}s)", config.reconcile_interval_secs);
    }

    Ok(AppState {
        reconciler,
        manual_pay,
        unpaid,
        reconcile_job,
    })
}

fn initialize_regions(config: &Config, timeout: Duration) -> AppResult<RegionRegistry> {
    info!("📊 Configuring region stores...");
    let mut registry = RegionRegistry::new();

    for region in &config.regions {
        let id = RegionId::new(&region.id);
        match &region.database_url {
            Some(url) => {
                let gateway = PgRegionGateway::connect_lazy(
                    id.clone(),
                    url,
                    RegionDialect::for_region(id.as_str()),
                    timeout,
                )?;
                registry.register(id, RegionStore::new(Arc::new(gateway)));
            }
            None => {
                warn!("⚠️  REGION_{}_DATABASE_URL not set - region disabled", region.id.to_uppercase());
                registry.register_unconfigured(id);
            }
        }
    }

    let configured = registry.regions().iter().filter(|r| r.is_configured()).count();
    info!("✓ {} of {} regions configured", configured, registry.regions().len());
    Ok(registry)
}

fn initialize_lease_store(config: &Config) -> AppResult<Option<Arc<dyn LeaseStore>>> {
    let Some(url) = &config.lease_database_url else {
        warn!("⚠️  LEASE_DATABASE_URL not set - duplicate runs are only caught per process");
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(url)?;

    info!("✓ Lease store pool configured");
    Ok(Some(Arc::new(PgLeaseStore::new(pool))))
}
