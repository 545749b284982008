use crate::core::{Result, Value};
use crate::result::QueryResult;
use async_trait::async_trait;

/// A connection to a SQL store that accepts positional parameters.
///
/// Statements use PostgreSQL-style placeholders (`$1`, `$2`, ...). Values are
/// always passed through `params` and never spliced into `sql`.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Execute a statement and return its rows and affected-row count.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Check if the connection is still usable.
    async fn ping(&self) -> Result<()>;
}

/// Opens new connections for a [`ConnectionPool`](crate::connection::ConnectionPool).
#[async_trait]
pub trait DatabaseFactory: Send + Sync + 'static {
    type Client: DatabaseClient + 'static;

    async fn connect(&self) -> Result<Self::Client>;
}
