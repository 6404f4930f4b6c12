use crate::db::MockConnection;
use crate::models::Member;
use crate::repository::traits::{MemberRepository, RepositoryError};

/// Member repository over the in-memory mock store
#[derive(Debug, Clone, Copy, Default)]
pub struct MockMemberRepository;

impl MemberRepository<MockConnection> for MockMemberRepository {
    fn save(&self, conn: &mut MockConnection, member: &Member) -> Result<(), RepositoryError> {
        if conn.contains(&member.member_id) {
            return Err(RepositoryError::Duplicate(member.member_id.clone()));
        }
        conn.put(&member.member_id, Some(member.balance))?;
        Ok(())
    }

    fn find_by_id(
        &self,
        conn: &mut MockConnection,
        member_id: &str,
    ) -> Result<Member, RepositoryError> {
        match conn.get(member_id)? {
            Some(balance) => Ok(Member::new(member_id, balance)),
            None => Err(RepositoryError::NotFound(member_id.to_string())),
        }
    }

    fn update(
        &self,
        conn: &mut MockConnection,
        member_id: &str,
        balance: i64,
    ) -> Result<(), RepositoryError> {
        // A missing row means the update would affect nothing
        if !conn.contains(member_id) {
            return Err(RepositoryError::StaleWrite(member_id.to_string()));
        }
        conn.put(member_id, Some(balance))?;
        Ok(())
    }

    fn delete(&self, conn: &mut MockConnection, member_id: &str) -> Result<(), RepositoryError> {
        if !conn.contains(member_id) {
            return Err(RepositoryError::NotFound(member_id.to_string()));
        }
        conn.put(member_id, None)?;
        Ok(())
    }
}
