use serde::Serialize;

/// A member account as stored in the `member` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub member_id: String,
    pub balance: i64,
}

impl Member {
    pub fn new(member_id: impl Into<String>, balance: i64) -> Self {
        Self {
            member_id: member_id.into(),
            balance,
        }
    }
}
