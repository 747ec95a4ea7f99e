pub mod batch_store;
pub mod cost_tracker;
pub mod database;
pub mod rate_limiter;

pub use batch_store::BatchResultStore;
pub use cost_tracker::{CostState, CostTracker};
pub use database::{Database, PoolConfig, SharedDatabase};
pub use rate_limiter::{LimitStatus, RateLimiter};
