use std::fmt;
use std::time::Duration;

/// Failures raised by a connection pool or a pooled connection
#[derive(Debug)]
pub enum StoreError {
    /// No connection became available within the pool's wait bound
    PoolExhausted {
        pool: String,
        waited: Duration,
        reason: String,
    },
    Sqlite(rusqlite::Error),
    /// Backend failure that does not come from SQLite (in-memory store, injected faults)
    Backend(String),
    /// Restoring or returning a connection failed. Only ever logged.
    ReleaseFailed(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PoolExhausted { pool, waited, reason } => write!(
                f,
                "Pool {} exhausted after waiting {}ms: {}",
                pool,
                waited.as_millis(),
                reason
            ),
            Self::Sqlite(e) => write!(f, "SQLite error: {}", e),
            Self::Backend(msg) => write!(f, "Backend error: {}", msg),
            Self::ReleaseFailed(msg) => write!(f, "Connection release failed: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sqlite(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Sqlite(err)
    }
}
