//! Connection lifecycle state machine
//!
//! Tracks a pooled connection from checkout to release during one transfer.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Checked out, auto-commit on
    Acquired,
    /// Auto-commit off, writes pending
    InTransaction,
    Committed,
    RolledBack,
    /// Commit was rejected; whether the writes landed is unknown
    CommitFailed,
    /// Auto-commit restored and connection handed back to the pool
    Released,
}

impl ConnectionState {
    /// Check if a transaction may still hold uncommitted writes
    pub fn has_open_transaction(&self) -> bool {
        matches!(self, ConnectionState::InTransaction)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ConnectionEvent {
    Begin,
    CommitOk,
    CommitFail,
    RollbackOk,
    /// Rollback failed; the transaction is left for release to discard
    RollbackFail,
    Release,
}

/// State transition function
///
/// Invalid transitions return the current state (no change).
pub fn transition(current: ConnectionState, event: ConnectionEvent) -> ConnectionState {
    use ConnectionEvent::*;
    use ConnectionState::*;

    match (current, event) {
        (Released, _) => Released,
        (_, Release) => Released,

        (Acquired, Begin) => InTransaction,

        (InTransaction, CommitOk) => Committed,
        (InTransaction, CommitFail) => CommitFailed,
        (InTransaction, RollbackOk) => RolledBack,
        (InTransaction, RollbackFail) => InTransaction,

        _ => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let state = transition(ConnectionState::Acquired, ConnectionEvent::Begin);
        assert_eq!(state, ConnectionState::InTransaction);
        let state = transition(state, ConnectionEvent::CommitOk);
        assert_eq!(state, ConnectionState::Committed);
        let state = transition(state, ConnectionEvent::Release);
        assert_eq!(state, ConnectionState::Released);
    }

    #[test]
    fn test_failed_rollback_keeps_transaction_open() {
        let state = transition(
            ConnectionState::InTransaction,
            ConnectionEvent::RollbackFail,
        );
        assert!(state.has_open_transaction());
    }

    #[test]
    fn test_commit_failure_is_not_rolled_back() {
        let state = transition(ConnectionState::InTransaction, ConnectionEvent::CommitFail);
        assert_eq!(state, ConnectionState::CommitFailed);
        let state = transition(state, ConnectionEvent::RollbackOk);
        assert_eq!(state, ConnectionState::CommitFailed);
    }

    #[test]
    fn test_released_is_terminal() {
        let state = transition(ConnectionState::Released, ConnectionEvent::Begin);
        assert_eq!(state, ConnectionState::Released);
    }

    #[test]
    fn test_invalid_transition_stays_in_current() {
        assert_eq!(
            transition(ConnectionState::Acquired, ConnectionEvent::CommitOk),
            ConnectionState::Acquired
        );
        assert_eq!(
            transition(ConnectionState::Committed, ConnectionEvent::Begin),
            ConnectionState::Committed
        );
    }
}
