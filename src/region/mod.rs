// Regional data stores: one adapter per region behind a common gateway
pub mod dialect;
pub mod gateway;
#[cfg(test)]
pub mod memory;
pub mod models;
pub mod postgres;
pub mod registry;

pub use dialect::RegionDialect;
pub use postgres::PgRegionGateway;
pub use registry::{RegionRegistry, RegionStore};
