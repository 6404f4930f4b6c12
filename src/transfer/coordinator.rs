//! Transfer Coordinator
//!
//! Runs a member-to-member transfer as one transaction on one pooled connection.

use std::sync::Arc;

use crate::db::ConnectionPool;
use crate::repository::MemberRepository;
use crate::transfer::errors::TransferError;
use crate::transfer::guard::ConnectionGuard;
use crate::transfer::policy::TransferPolicy;
use crate::transfer::types::TransferRequest;

/// Transfer Coordinator - owns the transaction boundary around the repository calls
pub struct TransferCoordinator<P, R> {
    pool: Arc<P>,
    repository: R,
    policy: TransferPolicy,
}

impl<P, R> TransferCoordinator<P, R>
where
    P: ConnectionPool,
    R: MemberRepository<P::Conn>,
{
    pub fn new(pool: Arc<P>, repository: R) -> Self {
        Self::with_policy(pool, repository, TransferPolicy::default())
    }

    pub fn with_policy(pool: Arc<P>, repository: R, policy: TransferPolicy) -> Self {
        Self {
            pool,
            repository,
            policy,
        }
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    /// Move `amount` from `from` to `to`. Either both balances change or neither does.
    pub fn transfer(&self, from: &str, to: &str, amount: u64) -> Result<(), TransferError> {
        self.execute(&TransferRequest::new(from, to, amount))
    }

    pub fn execute(&self, req: &TransferRequest) -> Result<(), TransferError> {
        let delta = req.validate()?;

        log::info!(
            "Transfer started: {} -> {} amount={}",
            req.from, req.to, req.amount
        );

        // 1. Borrow a connection; it goes back to the pool when the guard drops
        let mut guard = ConnectionGuard::acquire(self.pool.as_ref()).map_err(|e| {
            log::warn!(
                "Transfer {} -> {} could not get a connection: {}",
                req.from, req.to, e
            );
            TransferError::PoolExhausted(e.to_string())
        })?;

        // 2. Open the transaction
        if let Err(e) = guard.begin() {
            guard.rollback();
            log::error!(
                "Transfer {} -> {} could not start a transaction: {}",
                req.from, req.to, e
            );
            return Err(TransferError::TransactionStartFailed(e.to_string()));
        }

        // 3. Business logic on the same connection
        if let Err(e) = self.biz_logic(guard.connection(), req, delta) {
            guard.rollback();
            log::warn!(
                "Transfer failed: {} -> {} amount={}: [{}] {}",
                req.from,
                req.to,
                req.amount,
                e.error_code(),
                e
            );
            return Err(e);
        }

        // 4. Commit. A failure here is reported as-is, never rolled back.
        guard.commit().map_err(|e| {
            log::error!(
                "Commit failed for {} -> {} amount={} (outcome unknown): {}",
                req.from,
                req.to,
                req.amount,
                e
            );
            TransferError::CommitFailed {
                from: req.from.clone(),
                to: req.to.clone(),
                amount: req.amount,
                reason: e.to_string(),
            }
        })?;

        log::info!(
            "Transfer committed: {} -> {} amount={}",
            req.from, req.to, req.amount
        );
        Ok(())
    }

    // Order matters: the debit is written before the destination is validated, so a
    // rejected destination is undone by rollback rather than never written.
    fn biz_logic(
        &self,
        conn: &mut P::Conn,
        req: &TransferRequest,
        delta: i64,
    ) -> Result<(), TransferError> {
        let from_member = self
            .repository
            .find_by_id(conn, &req.from)
            .map_err(|e| TransferError::from_read(&req.from, e))?;
        let to_member = self
            .repository
            .find_by_id(conn, &req.to)
            .map_err(|e| TransferError::from_read(&req.to, e))?;

        let debited = from_member.balance.checked_sub(delta).ok_or_else(|| {
            TransferError::ValidationFailed {
                member_id: req.from.clone(),
                reason: format!(
                    "balance {} cannot be debited by {}",
                    from_member.balance, delta
                ),
            }
        })?;
        self.repository
            .update(conn, &req.from, debited)
            .map_err(|e| TransferError::from_write(&req.from, e))?;

        self.policy.validate_destination(&to_member)?;

        let credited = to_member.balance.checked_add(delta).ok_or_else(|| {
            TransferError::ValidationFailed {
                member_id: req.to.clone(),
                reason: format!(
                    "balance {} cannot be credited by {}",
                    to_member.balance, delta
                ),
            }
        })?;
        self.repository
            .update(conn, &req.to, credited)
            .map_err(|e| TransferError::from_write(&req.to, e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{FaultPlan, MockPool};
    use crate::repository::MockMemberRepository;
    use std::time::Duration;

    fn setup(members: &[(&str, i64)]) -> TransferCoordinator<MockPool, MockMemberRepository> {
        let pool = MockPool::new("test-pool", 2, Duration::from_millis(50))
            .with_members(members);
        TransferCoordinator::new(Arc::new(pool), MockMemberRepository)
    }

    fn balance(coordinator: &TransferCoordinator<MockPool, MockMemberRepository>, id: &str) -> i64 {
        coordinator.pool().balance(id).unwrap()
    }

    #[test]
    fn test_account_transfer_then_reserved_destination() {
        let coordinator = setup(&[("memberA", 10_000), ("memberB", 10_000), ("ex", 10_000)]);

        coordinator.transfer("memberA", "memberB", 2000).unwrap();
        assert_eq!(balance(&coordinator, "memberA"), 8000);
        assert_eq!(balance(&coordinator, "memberB"), 12_000);

        let err = coordinator.transfer("memberA", "ex", 1000).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
        assert_eq!(balance(&coordinator, "memberA"), 8000);
        assert_eq!(balance(&coordinator, "ex"), 10_000);
        assert_eq!(coordinator.pool().status().checked_out, 0);
    }

    #[test]
    fn test_debit_is_written_before_validation_then_rolled_back() {
        let coordinator = setup(&[("memberA", 10_000), ("ex", 10_000)]);

        let err = coordinator.transfer("memberA", "ex", 2000).unwrap_err();
        assert!(matches!(err, TransferError::ValidationFailed { .. }));
        assert_eq!(
            coordinator.pool().journal(),
            vec![
                "acquire",
                "begin",
                "find:memberA",
                "find:ex",
                "write:memberA=8000",
                "rollback",
                "restore",
                "close",
            ]
        );
    }

    #[test]
    fn test_successful_transfer_conserves_total() {
        let coordinator = setup(&[("A", 5000), ("B", 700)]);
        coordinator.transfer("A", "B", 1234).unwrap();
        assert_eq!(
            balance(&coordinator, "A") + balance(&coordinator, "B"),
            5700
        );
        assert_eq!(
            coordinator.pool().journal(),
            vec![
                "acquire",
                "begin",
                "find:A",
                "find:B",
                "write:A=3766",
                "write:B=1934",
                "commit",
                "restore",
                "close",
            ]
        );
    }

    #[test]
    fn test_unknown_member_rolls_back_without_writes() {
        let coordinator = setup(&[("A", 100), ("B", 100)]);

        let err = coordinator.transfer("A", "nobody", 10).unwrap_err();
        assert_eq!(err, TransferError::EntityNotFound("nobody".to_string()));

        let err = coordinator.transfer("nobody", "B", 10).unwrap_err();
        assert_eq!(err, TransferError::EntityNotFound("nobody".to_string()));

        assert_eq!(balance(&coordinator, "A"), 100);
        assert_eq!(balance(&coordinator, "B"), 100);
        let journal = coordinator.pool().journal();
        assert!(!journal.iter().any(|op| op.starts_with("write:")));
        assert_eq!(coordinator.pool().status().checked_out, 0);
    }

    #[test]
    fn test_credit_write_failure_undoes_debit() {
        let coordinator = setup(&[("A", 100), ("B", 100)]);
        coordinator.pool().set_faults(FaultPlan {
            fail_write_for: Some("B".to_string()),
            ..Default::default()
        });

        let err = coordinator.transfer("A", "B", 40).unwrap_err();
        assert_eq!(err.error_code(), "WRITE_FAILED");
        assert_eq!(balance(&coordinator, "A"), 100);
        assert_eq!(balance(&coordinator, "B"), 100);
    }

    #[test]
    fn test_read_failure_is_reported() {
        let coordinator = setup(&[("A", 100), ("B", 100)]);
        coordinator.pool().set_faults(FaultPlan {
            fail_read_for: Some("B".to_string()),
            ..Default::default()
        });

        let err = coordinator.transfer("A", "B", 40).unwrap_err();
        assert_eq!(err.error_code(), "READ_FAILED");
        assert_eq!(coordinator.pool().status().checked_out, 0);
    }

    #[test]
    fn test_commit_failure_is_surfaced_not_rolled_back() {
        let coordinator = setup(&[("A", 100), ("B", 100)]);
        coordinator.pool().set_faults(FaultPlan {
            fail_commit: true,
            ..Default::default()
        });

        let err = coordinator.transfer("A", "B", 40).unwrap_err();
        assert!(err.is_indeterminate());
        assert_eq!(
            err,
            TransferError::CommitFailed {
                from: "A".to_string(),
                to: "B".to_string(),
                amount: 40,
                reason: "Backend error: injected commit failure".to_string(),
            }
        );

        let journal = coordinator.pool().journal();
        assert!(!journal.contains(&"rollback".to_string()));
        assert_eq!(
            journal[journal.len() - 3..],
            ["discard", "restore", "close"]
        );
        assert_eq!(coordinator.pool().status().checked_out, 0);
    }

    #[test]
    fn test_begin_failure_releases_connection() {
        let coordinator = setup(&[("A", 100), ("B", 100)]);
        coordinator.pool().set_faults(FaultPlan {
            fail_begin: true,
            ..Default::default()
        });

        let err = coordinator.transfer("A", "B", 40).unwrap_err();
        assert_eq!(err.error_code(), "TRANSACTION_START_FAILED");
        assert_eq!(
            coordinator.pool().journal(),
            vec!["acquire", "restore", "close"]
        );
        assert_eq!(coordinator.pool().status().checked_out, 0);
    }

    #[test]
    fn test_rollback_failure_keeps_primary_error() {
        let coordinator = setup(&[("A", 100), ("ex", 0)]);
        coordinator.pool().set_faults(FaultPlan {
            fail_rollback: true,
            ..Default::default()
        });

        let err = coordinator.transfer("A", "ex", 40).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
        // Release discards what the rollback could not
        assert_eq!(balance(&coordinator, "A"), 100);
        assert_eq!(coordinator.pool().status().checked_out, 0);
    }

    #[test]
    fn test_release_failure_does_not_override_success() {
        let coordinator = setup(&[("A", 100), ("B", 100)]);
        coordinator.pool().set_faults(FaultPlan {
            fail_restore: true,
            fail_close: true,
            ..Default::default()
        });

        coordinator.transfer("A", "B", 40).unwrap();
        assert_eq!(balance(&coordinator, "A"), 60);
        assert_eq!(balance(&coordinator, "B"), 140);
        assert_eq!(coordinator.pool().status().checked_out, 0);
    }

    #[test]
    fn test_pool_exhausted() {
        let coordinator = setup(&[("A", 100), ("B", 100)]);
        let _held = (
            coordinator.pool().acquire().unwrap(),
            coordinator.pool().acquire().unwrap(),
        );

        let err = coordinator.transfer("A", "B", 40).unwrap_err();
        assert!(matches!(err, TransferError::PoolExhausted(_)));
        assert!(err.is_retryable());
        assert_eq!(balance(&coordinator, "A"), 100);
    }

    #[test]
    fn test_invalid_requests_never_touch_the_pool() {
        let coordinator = setup(&[("A", 100)]);

        assert_eq!(
            coordinator.transfer("A", "B", 0),
            Err(TransferError::InvalidAmount(0))
        );
        assert_eq!(
            coordinator.transfer("A", "A", 10),
            Err(TransferError::SameAccount("A".to_string()))
        );
        assert!(coordinator.pool().journal().is_empty());
    }

    #[test]
    fn test_credit_overflow_rolls_back() {
        let coordinator = setup(&[("A", 100), ("B", i64::MAX)]);

        let err = coordinator.transfer("A", "B", 1).unwrap_err();
        assert!(matches!(
            err,
            TransferError::ValidationFailed { ref member_id, .. } if member_id == "B"
        ));
        assert_eq!(balance(&coordinator, "A"), 100);
    }

    #[test]
    fn test_custom_policy() {
        let pool = MockPool::new("test-pool", 1, Duration::from_millis(50))
            .with_members(&[("A", 100), ("frozen", 0), ("ex", 0)]);
        let coordinator = TransferCoordinator::with_policy(
            Arc::new(pool),
            MockMemberRepository,
            TransferPolicy::new(vec!["frozen".to_string()]),
        );

        assert!(coordinator.transfer("A", "frozen", 10).is_err());
        coordinator.transfer("A", "ex", 10).unwrap();
        assert_eq!(balance(&coordinator, "ex"), 10);
    }
}
