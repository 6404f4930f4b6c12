use rusqlite::{params, ErrorCode};

use crate::db::SqliteConnection;
use crate::models::Member;
use crate::repository::traits::{MemberRepository, RepositoryError};

const INSERT_MEMBER_SQL: &str = "INSERT INTO member (member_id, balance) VALUES (?1, ?2)";

const SELECT_MEMBER_SQL: &str = "SELECT member_id, balance FROM member WHERE member_id = ?1";

const UPDATE_BALANCE_SQL: &str = "UPDATE member SET balance = ?1 WHERE member_id = ?2";

const DELETE_MEMBER_SQL: &str = "DELETE FROM member WHERE member_id = ?1";

/// Member repository over the `member` table
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteMemberRepository;

impl MemberRepository<SqliteConnection> for SqliteMemberRepository {
    fn save(&self, conn: &mut SqliteConnection, member: &Member) -> Result<(), RepositoryError> {
        match conn.raw().execute(INSERT_MEMBER_SQL, params![member.member_id, member.balance]) {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(RepositoryError::Duplicate(member.member_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn find_by_id(
        &self,
        conn: &mut SqliteConnection,
        member_id: &str,
    ) -> Result<Member, RepositoryError> {
        let mut stmt = conn.raw().prepare(SELECT_MEMBER_SQL)?;

        let mut members = stmt
            .query_map(params![member_id], |row| {
                Ok(Member {
                    member_id: row.get(0)?,
                    balance: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        match members.len() {
            0 => Err(RepositoryError::NotFound(member_id.to_string())),
            1 => Ok(members.remove(0)),
            rows => Err(RepositoryError::MultipleRows {
                member_id: member_id.to_string(),
                rows,
            }),
        }
    }

    fn update(
        &self,
        conn: &mut SqliteConnection,
        member_id: &str,
        balance: i64,
    ) -> Result<(), RepositoryError> {
        let rows_affected = conn
            .raw()
            .execute(UPDATE_BALANCE_SQL, params![balance, member_id])?;

        match rows_affected {
            0 => Err(RepositoryError::StaleWrite(member_id.to_string())),
            1 => Ok(()),
            rows => Err(RepositoryError::MultipleRows {
                member_id: member_id.to_string(),
                rows,
            }),
        }
    }

    fn delete(&self, conn: &mut SqliteConnection, member_id: &str) -> Result<(), RepositoryError> {
        let rows_affected = conn.raw().execute(DELETE_MEMBER_SQL, params![member_id])?;

        if rows_affected == 0 {
            return Err(RepositoryError::NotFound(member_id.to_string()));
        }
        Ok(())
    }
}
