use super::config::PoolConfig;
use crate::core::{DbError, Result, Value};
use crate::interface::{DatabaseClient, DatabaseFactory};
use crate::result::QueryResult;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

/// Connection pool
///
/// Hands out connections produced by a [`DatabaseFactory`]. The number of
/// connections that exist at once is bounded by `max_connections`; each
/// checked-out connection holds one semaphore permit until its [`PoolGuard`]
/// is dropped.
pub struct ConnectionPool<F: DatabaseFactory> {
    inner: Arc<PoolInner<F>>,
}

struct PoolInner<F: DatabaseFactory> {
    config: PoolConfig,
    factory: F,
    /// Idle connections; a plain mutex so `Drop` can always return a connection
    idle: Mutex<VecDeque<PooledConnection<F::Client>>>,
    permits: Arc<Semaphore>,
    /// Connections currently open, idle or checked out
    total_connections: AtomicUsize,
}

/// A connection owned by the pool
struct PooledConnection<C> {
    client: C,
    created_at: Instant,
    last_used: Instant,
}

impl<C> PooledConnection<C> {
    fn new(client: C) -> Self {
        let now = Instant::now();
        Self {
            client,
            created_at: now,
            last_used: now,
        }
    }

    fn is_expired(&self, max_lifetime: Option<Duration>) -> bool {
        max_lifetime.is_some_and(|lifetime| self.created_at.elapsed() > lifetime)
    }

    fn is_idle_too_long(&self, idle_timeout: Option<Duration>) -> bool {
        idle_timeout.is_some_and(|timeout| self.last_used.elapsed() > timeout)
    }

    fn refresh_last_used(&mut self) {
        self.last_used = Instant::now();
    }
}

impl<F: DatabaseFactory> PoolInner<F> {
    fn idle(&self) -> MutexGuard<'_, VecDeque<PooledConnection<F::Client>>> {
        // The queue stays consistent even if a holder panicked.
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn release(&self, mut pooled: PooledConnection<F::Client>) {
        pooled.refresh_last_used();
        self.idle().push_back(pooled);
    }

    fn discard(&self) {
        self.total_connections.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<F: DatabaseFactory> ConnectionPool<F> {
    /// Create a new pool and open `min_connections` connections up front.
    pub async fn new(config: PoolConfig, factory: F) -> Result<Self> {
        config.validate().map_err(DbError::Connection)?;

        let permits = Arc::new(Semaphore::new(config.max_connections));
        let pool = Self {
            inner: Arc::new(PoolInner {
                config,
                factory,
                idle: Mutex::new(VecDeque::new()),
                permits,
                total_connections: AtomicUsize::new(0),
            }),
        };

        pool.ensure_min_connections().await?;

        Ok(pool)
    }

    /// Get a connection from the pool
    ///
    /// Waits up to `connect_timeout` for a free slot. The returned guard gives
    /// the connection back when dropped, whatever happened while it was held.
    pub async fn get_connection(&self) -> Result<PoolGuard<F>> {
        let timeout = self.inner.config.connect_timeout;
        let permit = tokio::time::timeout(timeout, Arc::clone(&self.inner.permits).acquire_owned())
            .await
            .map_err(|_| DbError::PoolTimeout(timeout))?
            .map_err(|_| DbError::Connection("connection pool is closed".into()))?;

        let pooled = match self.try_get_available() {
            Some(pooled) => pooled,
            None => {
                // On failure the permit drops here and the slot is free again.
                let client = self.inner.factory.connect().await?;
                let total = self.inner.total_connections.fetch_add(1, Ordering::SeqCst) + 1;
                debug!(total, "opened new pooled connection");
                PooledConnection::new(client)
            }
        };

        Ok(PoolGuard {
            connection: Some(pooled),
            pool: Arc::clone(&self.inner),
            broken: false,
            _permit: permit,
        })
    }

    /// Pop an idle connection, dropping any that outlived their limits
    fn try_get_available(&self) -> Option<PooledConnection<F::Client>> {
        let config = &self.inner.config;
        let mut idle = self.inner.idle();

        while let Some(pooled) = idle.pop_front() {
            if pooled.is_expired(config.max_lifetime) || pooled.is_idle_too_long(config.idle_timeout)
            {
                self.inner.discard();
                continue;
            }
            return Some(pooled);
        }

        None
    }

    async fn ensure_min_connections(&self) -> Result<()> {
        while self.inner.total_connections.load(Ordering::SeqCst) < self.inner.config.min_connections
        {
            let client = self.inner.factory.connect().await?;
            self.inner.idle().push_back(PooledConnection::new(client));
            self.inner.total_connections.fetch_add(1, Ordering::SeqCst);
        }

        Ok(())
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        let idle = self.inner.idle().len();
        let total = self.inner.total_connections.load(Ordering::SeqCst);

        PoolStats {
            total_connections: total,
            idle_connections: idle,
            active_connections: total.saturating_sub(idle),
            max_connections: self.inner.config.max_connections,
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }
}

impl<F: DatabaseFactory> Clone for ConnectionPool<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Connection pool statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub total_connections: usize,
    pub idle_connections: usize,
    pub active_connections: usize,
    pub max_connections: usize,
}

impl std::fmt::Display for PoolStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pool Stats: {}/{} active, {} idle, max {}",
            self.active_connections,
            self.total_connections,
            self.idle_connections,
            self.max_connections
        )
    }
}

/// RAII guard for pooled connections
///
/// Returns the connection to the pool when dropped. A connection that failed
/// with a connection-level error is closed instead of being returned.
pub struct PoolGuard<F: DatabaseFactory> {
    connection: Option<PooledConnection<F::Client>>,
    pool: Arc<PoolInner<F>>,
    broken: bool,
    // Declared last: released only after the connection is back in the queue.
    _permit: OwnedSemaphorePermit,
}

impl<F: DatabaseFactory> PoolGuard<F> {
    /// Get a reference to the connection
    pub fn client(&self) -> &F::Client {
        &self
            .connection
            .as_ref()
            .expect("Connection already returned to pool")
            .client
    }

    /// Execute a statement on the held connection
    pub async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let result = self.client().execute(sql, params).await;
        if let Err(err) = &result {
            if err.is_connection_fatal() {
                self.broken = true;
            }
        }
        result
    }
}

impl<F: DatabaseFactory> Drop for PoolGuard<F> {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            if self.broken {
                warn!("dropping broken pooled connection");
                self.pool.discard();
                return;
            }
            self.pool.release(connection);
        }
    }
}
