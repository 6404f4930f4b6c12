//! Connection pool and connection capabilities
//!
//! The transfer coordinator only sees these two traits. `sqlite` backs them with an
//! r2d2 pool of rusqlite connections; `mock` is an in-memory store with fault injection.

pub mod error;
pub mod events;
pub mod mock;
pub mod probe;
pub mod sqlite;

pub use error::StoreError;
pub use events::PoolEventLogger;
pub use mock::{FaultPlan, MockConnection, MockPool};
pub use probe::{probe_pool, time_checkout, CheckoutTiming, ProbeReport};
pub use sqlite::{SqliteConnection, SqlitePool, TxSafeManager};

/// A stateful connection handle checked out of a pool.
///
/// A handle starts in auto-commit mode. `set_auto_commit(false)` opens a transaction that
/// stays open until `commit` or `rollback`.
pub trait TxConnection {
    /// Switch auto-commit mode.
    ///
    /// Turning auto-commit back on while a transaction is still open discards that transaction.
    fn set_auto_commit(&mut self, enabled: bool) -> Result<(), StoreError>;

    fn is_auto_commit(&self) -> bool;

    fn commit(&mut self) -> Result<(), StoreError>;

    fn rollback(&mut self) -> Result<(), StoreError>;

    /// Hand the connection back to its pool (or close it, per pool semantics)
    fn close(self) -> Result<(), StoreError>
    where
        Self: Sized;
}

/// Snapshot of pool accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub connections: u32,
    pub idle: u32,
    pub checked_out: u32,
}

/// Shared source of connections. Acquisition blocks for at most the pool's wait bound.
pub trait ConnectionPool: Send + Sync {
    type Conn: TxConnection;

    /// Check out a connection. Fails with `StoreError::PoolExhausted` when the wait bound elapses.
    fn acquire(&self) -> Result<Self::Conn, StoreError>;

    fn status(&self) -> PoolStatus;

    fn name(&self) -> &str;
}
