//! Scoped connection ownership
//!
//! `ConnectionGuard` owns a checked-out connection for the length of one transfer. Whatever path
//! leaves the scope (normal return, early `?` return, panic), `Drop` restores auto-commit and hands
//! the connection back to its pool. Failures while doing so are logged and never propagated.

use std::mem::ManuallyDrop;

use crate::db::{ConnectionPool, StoreError, TxConnection};
use crate::transfer::state::{transition, ConnectionEvent, ConnectionState};

pub struct ConnectionGuard<C: TxConnection> {
    // Moved out exactly once, in Drop
    conn: ManuallyDrop<C>,
    state: ConnectionState,
    pool_name: String,
}

impl<C: TxConnection> ConnectionGuard<C> {
    /// Check a connection out of `pool`, waiting at most the pool's bound
    pub fn acquire<P>(pool: &P) -> Result<Self, StoreError>
    where
        P: ConnectionPool<Conn = C>,
    {
        let conn = pool.acquire()?;
        log::debug!("[{}] connection acquired", pool.name());
        Ok(Self {
            conn: ManuallyDrop::new(conn),
            state: ConnectionState::Acquired,
            pool_name: pool.name().to_string(),
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn connection(&mut self) -> &mut C {
        &mut self.conn
    }

    /// Turn auto-commit off, opening a transaction
    pub fn begin(&mut self) -> Result<(), StoreError> {
        self.connection().set_auto_commit(false)?;
        self.state = transition(self.state, ConnectionEvent::Begin);
        Ok(())
    }

    pub fn commit(&mut self) -> Result<(), StoreError> {
        match self.connection().commit() {
            Ok(()) => {
                self.state = transition(self.state, ConnectionEvent::CommitOk);
                Ok(())
            }
            Err(e) => {
                self.state = transition(self.state, ConnectionEvent::CommitFail);
                Err(e)
            }
        }
    }

    /// Roll back the open transaction. A rollback failure is logged and swallowed so the
    /// caller keeps reporting the failure that triggered it.
    pub fn rollback(&mut self) {
        if self.connection().is_auto_commit() {
            log::debug!(
                "[{}] no transaction open, nothing to roll back",
                self.pool_name
            );
            return;
        }

        match self.connection().rollback() {
            Ok(()) => {
                self.state = transition(self.state, ConnectionEvent::RollbackOk);
                log::info!("[{}] transaction rolled back", self.pool_name);
            }
            Err(e) => {
                self.state = transition(self.state, ConnectionEvent::RollbackFail);
                log::error!("[{}] rollback failed (suppressed): {}", self.pool_name, e);
            }
        }
    }
}

impl<C: TxConnection> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        // SAFETY: `conn` is never touched again after this point
        let mut conn = unsafe { ManuallyDrop::take(&mut self.conn) };

        if self.state.has_open_transaction() {
            log::warn!(
                "[{}] releasing connection with an open transaction, discarding it",
                self.pool_name
            );
        }

        // Restore the default before the next borrower gets this connection
        if let Err(e) = conn.set_auto_commit(true) {
            log::error!(
                "[{}] failed to restore auto-commit on release: {}",
                self.pool_name, e
            );
        }

        if let Err(e) = conn.close() {
            log::error!("[{}] failed to return connection: {}", self.pool_name, e);
        }

        self.state = transition(self.state, ConnectionEvent::Release);
        log::debug!("[{}] connection released", self.pool_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{FaultPlan, MockConnection, MockPool};
    use std::panic::{self, AssertUnwindSafe};
    use std::time::Duration;

    fn pool() -> MockPool {
        MockPool::new("guard", 1, Duration::from_millis(20))
            .with_members(&[("A", 100)])
    }

    #[test]
    fn test_drop_discards_open_transaction_and_releases() {
        let pool = pool();
        {
            let mut guard = ConnectionGuard::acquire(&pool).unwrap();
            guard.begin().unwrap();
            assert_eq!(guard.state(), ConnectionState::InTransaction);
            guard.connection().put("A", Some(1)).unwrap();
            assert_eq!(pool.status().checked_out, 1);
        }

        assert_eq!(pool.balance("A"), Some(100));
        assert_eq!(pool.status().checked_out, 0);
        assert_eq!(
            pool.journal(),
            vec![
                "acquire",
                "begin",
                "write:A=1",
                "discard",
                "restore",
                "close",
            ]
        );
    }

    #[test]
    fn test_commit_then_release() {
        let pool = pool();
        {
            let mut guard = ConnectionGuard::acquire(&pool).unwrap();
            guard.begin().unwrap();
            guard.connection().put("A", Some(42)).unwrap();
            guard.commit().unwrap();
            assert_eq!(guard.state(), ConnectionState::Committed);
        }
        assert_eq!(pool.balance("A"), Some(42));
        assert_eq!(pool.status().checked_out, 0);
    }

    #[test]
    fn test_rollback_without_transaction_is_skipped() {
        let pool = pool();
        let mut guard: ConnectionGuard<MockConnection> = ConnectionGuard::acquire(&pool).unwrap();
        guard.rollback();
        assert_eq!(guard.state(), ConnectionState::Acquired);
        assert!(!pool.journal().contains(&"rollback".to_string()));
    }

    #[test]
    fn test_rollback_failure_is_suppressed() {
        let pool = pool();
        pool.set_faults(FaultPlan {
            fail_rollback: true,
            ..Default::default()
        });
        {
            let mut guard = ConnectionGuard::acquire(&pool).unwrap();
            guard.begin().unwrap();
            guard.connection().put("A", Some(0)).unwrap();
            guard.rollback();
            assert!(guard.state().has_open_transaction());
        }
        // Release still discards the writes
        assert_eq!(pool.balance("A"), Some(100));
        assert_eq!(pool.status().checked_out, 0);
    }

    #[test]
    fn test_release_failures_still_return_connection() {
        let pool = pool();
        pool.set_faults(FaultPlan {
            fail_restore: true,
            fail_close: true,
            ..Default::default()
        });
        {
            let mut guard = ConnectionGuard::acquire(&pool).unwrap();
            guard.begin().unwrap();
        }
        assert_eq!(pool.status().checked_out, 0);
    }

    #[test]
    fn test_panic_inside_scope_releases_connection() {
        let pool = pool();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut guard = ConnectionGuard::acquire(&pool).unwrap();
            guard.begin().unwrap();
            guard.connection().put("A", Some(-1)).unwrap();
            panic!("business logic blew up");
        }));

        assert!(result.is_err());
        assert_eq!(pool.balance("A"), Some(100));
        assert_eq!(pool.status().checked_out, 0);
    }
}
