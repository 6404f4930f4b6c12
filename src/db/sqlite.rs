use std::path::Path;
use std::time::Instant;

use r2d2::{ManageConnection, Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;

use crate::configure::DatabaseConfig;
use crate::db::{ConnectionPool, PoolEventLogger, PoolStatus, StoreError, TxConnection};

const CREATE_MEMBER_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS member (
        member_id TEXT PRIMARY KEY,
        balance   INTEGER NOT NULL DEFAULT 0
    )
";

// IMMEDIATE takes the database write lock when the transaction opens, so two transfers never
// hold locks on different members while waiting for each other.
const BEGIN_SQL: &str = "BEGIN IMMEDIATE";
const COMMIT_SQL: &str = "COMMIT";
const ROLLBACK_SQL: &str = "ROLLBACK";

/// `SqliteConnectionManager` that refuses to recycle a connection still inside a transaction.
///
/// r2d2 asks `has_broken` on every checkin. The stock manager always answers no, so a handle
/// whose auto-commit could not be restored would reach the next borrower with the previous
/// transfer's writes pending. Here such a handle is closed and replaced instead.
pub struct TxSafeManager {
    inner: SqliteConnectionManager,
}

impl TxSafeManager {
    pub fn new(inner: SqliteConnectionManager) -> Self {
        Self { inner }
    }
}

impl ManageConnection for TxSafeManager {
    type Connection = rusqlite::Connection;
    type Error = rusqlite::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        self.inner.connect()
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        self.inner.is_valid(conn)
    }

    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        if !conn.is_autocommit() {
            log::warn!("Discarding pooled connection returned inside a transaction");
            return true;
        }
        self.inner.has_broken(conn)
    }
}

/// r2d2 pool of SQLite connections with a bounded checkout wait
pub struct SqlitePool {
    name: String,
    pool: Pool<TxSafeManager>,
}

impl SqlitePool {
    pub fn open(config: &DatabaseConfig) -> Result<Self, StoreError> {
        if config.max_pool_size == 0 {
            return Err(StoreError::Backend("max_pool_size must be positive".to_string()));
        }
        if config.min_idle.is_some_and(|min| min > config.max_pool_size) {
            return Err(StoreError::Backend(format!(
                "min_idle {:?} exceeds max_pool_size {}",
                config.min_idle, config.max_pool_size
            )));
        }

        ensure_parent_dir(&config.path)?;

        let busy_timeout = config.busy_timeout();
        let manager = SqliteConnectionManager::file(&config.path).with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            let _mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(config.min_idle)
            .connection_timeout(config.connection_timeout())
            .event_handler(Box::new(PoolEventLogger::new(&config.pool_name)))
            .build(TxSafeManager::new(manager))
            .map_err(|e| {
                StoreError::Backend(format!("failed to build pool {}: {}", config.pool_name, e))
            })?;

        log::info!(
            "Opened pool {} on {} (max_size={}, timeout={}ms)",
            config.pool_name,
            config.path,
            config.max_pool_size,
            config.connection_timeout_ms
        );

        Ok(Self {
            name: config.pool_name.clone(),
            pool,
        })
    }

    /// Open a standalone connection that bypasses the pool
    pub fn open_direct(config: &DatabaseConfig) -> Result<rusqlite::Connection, StoreError> {
        ensure_parent_dir(&config.path)?;
        let conn = rusqlite::Connection::open(&config.path)?;
        conn.busy_timeout(config.busy_timeout())?;
        Ok(conn)
    }

    pub fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.acquire()?;
        conn.raw().execute_batch(CREATE_MEMBER_TABLE_SQL)?;
        conn.close()
    }
}

fn ensure_parent_dir(path: &str) -> Result<(), StoreError> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Backend(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
    }
    Ok(())
}

impl ConnectionPool for SqlitePool {
    type Conn = SqliteConnection;

    fn acquire(&self) -> Result<SqliteConnection, StoreError> {
        let started = Instant::now();
        match self.pool.get() {
            Ok(conn) => Ok(SqliteConnection { conn }),
            Err(e) => Err(StoreError::PoolExhausted {
                pool: self.name.clone(),
                waited: started.elapsed(),
                reason: e.to_string(),
            }),
        }
    }

    fn status(&self) -> PoolStatus {
        let state = self.pool.state();
        PoolStatus {
            connections: state.connections,
            idle: state.idle_connections,
            checked_out: state.connections - state.idle_connections,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A pooled SQLite connection. Dropping or closing it returns it to the pool.
pub struct SqliteConnection {
    conn: PooledConnection<TxSafeManager>,
}

impl SqliteConnection {
    pub fn raw(&self) -> &rusqlite::Connection {
        &self.conn
    }
}

impl TxConnection for SqliteConnection {
    fn set_auto_commit(&mut self, enabled: bool) -> Result<(), StoreError> {
        match (enabled, self.conn.is_autocommit()) {
            (false, true) => self.conn.execute_batch(BEGIN_SQL)?,
            (true, false) => self.conn.execute_batch(ROLLBACK_SQL)?,
            _ => {}
        }
        Ok(())
    }

    fn is_auto_commit(&self) -> bool {
        self.conn.is_autocommit()
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if self.conn.is_autocommit() {
            return Err(StoreError::Backend(
                "commit with no transaction in progress".to_string(),
            ));
        }
        self.conn.execute_batch(COMMIT_SQL)?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        if self.conn.is_autocommit() {
            return Err(StoreError::Backend(
                "rollback with no transaction in progress".to_string(),
            ));
        }
        self.conn.execute_batch(ROLLBACK_SQL)?;
        Ok(())
    }

    /// Returns the handle to the pool. One still inside a transaction is discarded by
    /// `TxSafeManager` rather than reused.
    fn close(self) -> Result<(), StoreError> {
        drop(self.conn);
        Ok(())
    }
}
