pub mod config;
pub mod pool;

pub use config::PoolConfig;
pub use pool::{ConnectionPool, PoolGuard, PoolStats};
