use std::fmt;

use crate::db::{StoreError, TxConnection};
use crate::models::Member;

#[derive(Debug)]
pub enum RepositoryError {
    NotFound(String),
    /// An update matched no row
    StaleWrite(String),
    /// A key lookup matched more than one row
    MultipleRows { member_id: String, rows: usize },
    Duplicate(String),
    Store(StoreError),
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "Member not found: member_id={}", id),
            Self::StaleWrite(id) => write!(f, "Update affected no rows: member_id={}", id),
            Self::MultipleRows { member_id, rows } => {
                write!(
                    f,
                    "Expected one row for member_id={}, found {}", member_id, rows
                )
            }
            Self::Duplicate(id) => write!(f, "Member already exists: member_id={}", id),
            Self::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RepositoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        RepositoryError::Store(err)
    }
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        RepositoryError::Store(StoreError::Sqlite(err))
    }
}

/// Member persistence on a caller-supplied connection.
///
/// Every operation joins whatever transaction is open on `conn`.
pub trait MemberRepository<C: TxConnection> {
    fn save(&self, conn: &mut C, member: &Member) -> Result<(), RepositoryError>;

    /// Fails with `NotFound` on zero rows and `MultipleRows` on more than one
    fn find_by_id(&self, conn: &mut C, member_id: &str) -> Result<Member, RepositoryError>;

    /// Fails with `StaleWrite` when no row is affected
    fn update(&self, conn: &mut C, member_id: &str, balance: i64) -> Result<(), RepositoryError>;

    fn delete(&self, conn: &mut C, member_id: &str) -> Result<(), RepositoryError>;
}
