//! In-memory pool for testing
//!
//! Holds committed balances in a map. Each checked-out connection buffers its writes until
//! commit. Faults can be injected at every step of the connection lifecycle, and every
//! operation is appended to a journal so tests can assert on ordering.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::db::{ConnectionPool, PoolStatus, StoreError, TxConnection};

/// Faults to inject into the mock store
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    /// `set_auto_commit(false)` fails
    pub fail_begin: bool,
    pub fail_commit: bool,
    pub fail_rollback: bool,
    /// `set_auto_commit(true)` fails while releasing
    pub fail_restore: bool,
    pub fail_close: bool,
    /// Reads of this member id fail with a backend error
    pub fail_read_for: Option<String>,
    /// Writes to this member id fail with a backend error
    pub fail_write_for: Option<String>,
}

struct MockState {
    committed: HashMap<String, i64>,
    capacity: u32,
    checked_out: u32,
    next_conn_id: u32,
    faults: FaultPlan,
    journal: Vec<String>,
}

struct Shared {
    state: Mutex<MockState>,
    available: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, entry: String) {
        self.lock().journal.push(entry);
    }
}

/// Mock pool with a fixed number of connections
pub struct MockPool {
    name: String,
    timeout: Duration,
    shared: Arc<Shared>,
}

impl MockPool {
    pub fn new(name: &str, capacity: u32, timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            timeout,
            shared: Arc::new(Shared {
                state: Mutex::new(MockState {
                    committed: HashMap::new(),
                    capacity,
                    checked_out: 0,
                    next_conn_id: 0,
                    faults: FaultPlan::default(),
                    journal: Vec::new(),
                }),
                available: Condvar::new(),
            }),
        }
    }

    /// Seed committed balances
    pub fn with_members(self, members: &[(&str, i64)]) -> Self {
        {
            let mut state = self.shared.lock();
            for (id, balance) in members {
                state.committed.insert(id.to_string(), *balance);
            }
        }
        self
    }

    /// Committed balance of a member, ignoring any open transaction
    pub fn balance(&self, member_id: &str) -> Option<i64> {
        self.shared.lock().committed.get(member_id).copied()
    }

    pub fn set_faults(&self, faults: FaultPlan) {
        self.shared.lock().faults = faults;
    }

    pub fn journal(&self) -> Vec<String> {
        self.shared.lock().journal.clone()
    }
}

impl ConnectionPool for MockPool {
    type Conn = MockConnection;

    fn acquire(&self) -> Result<MockConnection, StoreError> {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut state = self.shared.lock();

        while state.checked_out >= state.capacity {
            let now = Instant::now();
            if now >= deadline {
                return Err(StoreError::PoolExhausted {
                    pool: self.name.clone(),
                    waited: started.elapsed(),
                    reason: format!("all {} connections checked out", state.capacity),
                });
            }
            let (guard, _) = self
                .shared
                .available
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state = guard;
        }

        state.checked_out += 1;
        state.next_conn_id += 1;
        let id = state.next_conn_id;
        state.journal.push("acquire".to_string());

        Ok(MockConnection {
            id,
            shared: Arc::clone(&self.shared),
            auto_commit: true,
            pending: HashMap::new(),
        })
    }

    fn status(&self) -> PoolStatus {
        let state = self.shared.lock();
        PoolStatus {
            connections: state.capacity,
            idle: state.capacity - state.checked_out,
            checked_out: state.checked_out,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Connection checked out of a `MockPool`. Checked back in when dropped.
pub struct MockConnection {
    id: u32,
    shared: Arc<Shared>,
    auto_commit: bool,
    /// Uncommitted writes; `None` marks a delete
    pending: HashMap<String, Option<i64>>,
}

impl MockConnection {
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Read a balance as seen by this connection (its own pending writes included)
    pub fn get(&mut self, member_id: &str) -> Result<Option<i64>, StoreError> {
        let mut state = self.shared.lock();
        if state.faults.fail_read_for.as_deref() == Some(member_id) {
            return Err(StoreError::Backend(format!(
                "injected read failure for {}",
                member_id
            )));
        }
        state.journal.push(format!("find:{}", member_id));

        if let Some(pending) = self.pending.get(member_id) {
            return Ok(*pending);
        }
        Ok(state.committed.get(member_id).copied())
    }

    /// Whether the member exists as seen by this connection. Not journaled: it stands in for
    /// the row count a SQL write reports, not for a read.
    pub fn contains(&self, member_id: &str) -> bool {
        match self.pending.get(member_id) {
            Some(pending) => pending.is_some(),
            None => self.shared.lock().committed.contains_key(member_id),
        }
    }

    /// Write a balance, or delete the member when `balance` is `None`
    pub fn put(&mut self, member_id: &str, balance: Option<i64>) -> Result<(), StoreError> {
        let mut state = self.shared.lock();
        if state.faults.fail_write_for.as_deref() == Some(member_id) {
            return Err(StoreError::Backend(format!(
                "injected write failure for {}",
                member_id
            )));
        }
        match balance {
            Some(value) => state.journal.push(format!("write:{}={}", member_id, value)),
            None => state.journal.push(format!("delete:{}", member_id)),
        }

        if self.auto_commit {
            apply(&mut state.committed, member_id, balance);
        } else {
            self.pending.insert(member_id.to_string(), balance);
        }
        Ok(())
    }
}

fn apply(committed: &mut HashMap<String, i64>, member_id: &str, balance: Option<i64>) {
    match balance {
        Some(value) => {
            committed.insert(member_id.to_string(), value);
        }
        None => {
            committed.remove(member_id);
        }
    }
}

impl TxConnection for MockConnection {
    fn set_auto_commit(&mut self, enabled: bool) -> Result<(), StoreError> {
        let mut state = self.shared.lock();
        if enabled {
            if state.faults.fail_restore {
                return Err(StoreError::Backend(
                    "injected auto-commit restore failure".to_string(),
                ));
            }
            if !self.pending.is_empty() {
                state.journal.push("discard".to_string());
                self.pending.clear();
            }
            state.journal.push("restore".to_string());
        } else {
            if state.faults.fail_begin {
                return Err(StoreError::Backend("injected begin failure".to_string()));
            }
            state.journal.push("begin".to_string());
        }
        self.auto_commit = enabled;
        Ok(())
    }

    fn is_auto_commit(&self) -> bool {
        self.auto_commit
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if self.auto_commit {
            return Err(StoreError::Backend(
                "commit with no transaction in progress".to_string(),
            ));
        }
        let mut state = self.shared.lock();
        if state.faults.fail_commit {
            return Err(StoreError::Backend("injected commit failure".to_string()));
        }
        for (member_id, balance) in self.pending.drain() {
            apply(&mut state.committed, &member_id, balance);
        }
        state.journal.push("commit".to_string());
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        if self.auto_commit {
            return Err(StoreError::Backend(
                "rollback with no transaction in progress".to_string(),
            ));
        }
        let mut state = self.shared.lock();
        if state.faults.fail_rollback {
            return Err(StoreError::Backend("injected rollback failure".to_string()));
        }
        self.pending.clear();
        state.journal.push("rollback".to_string());
        Ok(())
    }

    fn close(self) -> Result<(), StoreError> {
        let fail_close = self.shared.lock().faults.fail_close;
        // Checked in by Drop either way
        if fail_close {
            return Err(StoreError::ReleaseFailed(format!(
                "injected close failure on connection {}",
                self.id
            )));
        }
        self.shared.record("close".to_string());
        Ok(())
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.checked_out -= 1;
        drop(state);
        self.shared.available.notify_one();
    }
}
