use std::time::Duration;

/// Connection pool configuration
///
/// Builder-style, in the spirit of `PgPoolOptions`:
///
/// ```
/// # use recipe_api::PoolConfig;
/// # use std::time::Duration;
/// let config = PoolConfig::new()
///     .max_connections(20)
///     .connect_timeout(Duration::from_secs(5));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// How long `get_connection` waits for a free slot
    pub connect_timeout: Duration,

    /// Maximum number of connections in pool
    pub max_connections: usize,

    /// Connections opened eagerly when the pool is built
    pub min_connections: usize,

    /// Connection idle timeout
    pub idle_timeout: Option<Duration>,

    /// Maximum connection lifetime
    pub max_lifetime: Option<Duration>,
}

impl PoolConfig {
    pub fn new() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            max_connections: 10,
            min_connections: 0,
            idle_timeout: Some(Duration::from_secs(600)), // 10 minutes
            max_lifetime: Some(Duration::from_secs(1800)), // 30 minutes
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: usize) -> Self {
        self.min_connections = min;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = Some(lifetime);
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_connections == 0 {
            return Err("max_connections must be greater than 0".to_string());
        }

        if self.min_connections > self.max_connections {
            return Err("min_connections cannot be greater than max_connections".to_string());
        }

        if self.connect_timeout.is_zero() {
            return Err("connect_timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}
