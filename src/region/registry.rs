use std::sync::Arc;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::region::gateway::{LedgerWriter, RegionGateway};
use crate::region::models::RegionId;

/// A configured region's read and write handles (usually the same adapter)
#[derive(Clone)]
pub struct RegionStore {
    pub gateway: Arc<dyn RegionGateway>,
    pub writer: Arc<dyn LedgerWriter>,
}

impl RegionStore {
    pub fn new<T>(adapter: Arc<T>) -> Self
    where
        T: RegionGateway + LedgerWriter + 'static,
    {
        Self {
            gateway: adapter.clone(),
            writer: adapter,
        }
    }
}

/// One slot in the fixed region list. `store` is `None` when the region has
/// no credentials configured.
#[derive(Clone)]
pub struct RegionHandle {
    pub id: RegionId,
    pub store: Option<RegionStore>,
}

impl RegionHandle {
    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }
}

/// Ordered, fixed list of regions. Order is the output order of every
/// cross-region operation.
#[derive(Clone, Default)]
pub struct RegionRegistry {
    regions: Vec<RegionHandle>,
}

impl RegionRegistry {
    pub fn new() -> Self {
        Self { regions: vec![] }
    }

    pub fn register(&mut self, id: RegionId, store: RegionStore) {
        info!("Registering region: {}", id);
        self.upsert(RegionHandle {
            id,
            store: Some(store),
        });
    }

    pub fn register_unconfigured(&mut self, id: RegionId) {
        info!("Region {} has no store configured", id);
        self.upsert(RegionHandle { id, store: None });
    }

    fn upsert(&mut self, handle: RegionHandle) {
        match self.regions.iter_mut().find(|r| r.id == handle.id) {
            Some(existing) => *existing = handle,
            None => self.regions.push(handle),
        }
    }

    pub fn regions(&self) -> &[RegionHandle] {
        &self.regions
    }

    /// Store for a single-region operation; unknown and unconfigured regions are client errors
    pub fn store(&self, id: &RegionId) -> AppResult<&RegionStore> {
        self.regions
            .iter()
            .find(|r| &r.id == id)
            .and_then(|r| r.store.as_ref())
            .ok_or_else(|| AppError::RegionUnavailable(id.to_string()))
    }
}
