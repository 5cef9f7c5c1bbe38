pub mod cache;
pub mod guard;
pub mod store;

pub use cache::InMemoryLeaseCache;
pub use guard::ExecutionLeaseGuard;
pub use store::{LeaseStore, PgLeaseStore};
