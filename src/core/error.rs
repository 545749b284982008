use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Connection pool timeout: no connection available within {0:?}")]
    PoolTimeout(std::time::Duration),

    #[error("Driver error: {0}")]
    Driver(String),
}

impl DbError {
    /// Errors after which the connection that produced them should not be reused.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

impl From<tokio_postgres::Error> for DbError {
    fn from(err: tokio_postgres::Error) -> Self {
        if err.is_closed() {
            Self::Connection(err.to_string())
        } else {
            Self::Driver(err.to_string())
        }
    }
}
