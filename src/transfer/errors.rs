// Error types for member transfers
use std::fmt;

use crate::repository::RepositoryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    // Request errors
    InvalidAmount(u64),
    SameAccount(String),

    // Connection errors
    PoolExhausted(String),
    TransactionStartFailed(String),

    // Business errors (rolled back)
    EntityNotFound(String),
    ValidationFailed { member_id: String, reason: String },

    // Repository errors (rolled back)
    ReadFailed { member_id: String, reason: String },
    WriteFailed { member_id: String, reason: String },
    StaleWrite(String),

    // Commit errors - outcome unknown
    CommitFailed {
        from: String,
        to: String,
        amount: u64,
        reason: String,
    },
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAmount(amount) => write!(f, "Invalid transfer amount: {}", amount),
            Self::SameAccount(id) => write!(f, "Cannot transfer from {} to itself", id),
            Self::PoolExhausted(msg) => write!(f, "No connection available: {}", msg),
            Self::TransactionStartFailed(msg) => {
                write!(f, "Failed to start transaction: {}", msg)
            }
            Self::EntityNotFound(id) => write!(f, "Member not found: {}", id),
            Self::ValidationFailed { member_id, reason } => {
                write!(f, "Validation failed for {}: {}", member_id, reason)
            }
            Self::ReadFailed { member_id, reason } => {
                write!(f, "Failed to read {}: {}", member_id, reason)
            }
            Self::WriteFailed { member_id, reason } => {
                write!(f, "Failed to write {}: {}", member_id, reason)
            }
            Self::StaleWrite(id) => write!(f, "Update of {} affected no rows", id),
            Self::CommitFailed { from, to, amount, reason } => write!(
                f,
                "Commit failed for transfer {} -> {} amount={}, outcome unknown: {}",
                from, to, amount, reason
            ),
        }
    }
}

impl std::error::Error for TransferError {}

impl TransferError {
    /// Map a repository failure on a read of `member_id`
    pub fn from_read(member_id: &str, err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => Self::EntityNotFound(id),
            other => Self::ReadFailed {
                member_id: member_id.to_string(),
                reason: other.to_string(),
            },
        }
    }

    /// Map a repository failure on a write of `member_id`
    pub fn from_write(member_id: &str, err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => Self::EntityNotFound(id),
            RepositoryError::StaleWrite(id) => Self::StaleWrite(id),
            other => Self::WriteFailed {
                member_id: member_id.to_string(),
                reason: other.to_string(),
            },
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::SameAccount(_) => "SAME_ACCOUNT",
            Self::PoolExhausted(_) => "POOL_EXHAUSTED",
            Self::TransactionStartFailed(_) => "TRANSACTION_START_FAILED",
            Self::EntityNotFound(_) => "ENTITY_NOT_FOUND",
            Self::ValidationFailed { .. } => "VALIDATION_FAILED",
            Self::ReadFailed { .. } => "READ_FAILED",
            Self::WriteFailed { .. } => "WRITE_FAILED",
            Self::StaleWrite(_) => "STALE_WRITE",
            Self::CommitFailed { .. } => "COMMIT_FAILED",
        }
    }

    /// Only pool exhaustion is safe to retry; a failed commit must not be retried blindly
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PoolExhausted(_))
    }

    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount(_)
                | Self::SameAccount(_)
                | Self::EntityNotFound(_)
                | Self::ValidationFailed { .. }
        )
    }

    /// True when the writes may or may not have been applied
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Self::CommitFailed { .. })
    }
}
