//! Member repository
//!
//! Point reads and writes of members on a connection owned by the caller. Repositories never
//! acquire, commit, roll back or release a connection, so any caller holding a handle can
//! compose them into a larger atomic unit.

pub mod mock;
pub mod sqlite;
pub mod traits;

pub use mock::MockMemberRepository;
pub use sqlite::SqliteMemberRepository;
pub use traits::{MemberRepository, RepositoryError};
