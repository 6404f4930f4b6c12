//! Destination checks run inside the transaction

use crate::configure::{TransferConfig, RESERVED_MEMBER_ID};
use crate::models::Member;
use crate::transfer::errors::TransferError;

#[derive(Debug, Clone)]
pub struct TransferPolicy {
    reserved_member_ids: Vec<String>,
}

impl TransferPolicy {
    pub fn new(reserved_member_ids: Vec<String>) -> Self {
        Self {
            reserved_member_ids,
        }
    }

    pub fn from_config(config: &TransferConfig) -> Self {
        Self::new(config.reserved_member_ids.clone())
    }

    /// Reject credits to reserved members
    pub fn validate_destination(&self, destination: &Member) -> Result<(), TransferError> {
        if self.reserved_member_ids.iter().any(|id| *id == destination.member_id) {
            return Err(TransferError::ValidationFailed {
                member_id: destination.member_id.clone(),
                reason: "destination is a reserved member".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for TransferPolicy {
    fn default() -> Self {
        Self::new(vec![RESERVED_MEMBER_ID.to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rejects_sentinel() {
        let policy = TransferPolicy::default();
        assert!(policy.validate_destination(&Member::new("B", 0)).is_ok());

        let sentinel = Member::new("ex", 0);
        let err = policy.validate_destination(&sentinel).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
    }

    #[test]
    fn test_configured_reserved_ids() {
        let policy = TransferPolicy::from_config(&TransferConfig {
            reserved_member_ids: vec!["frozen".to_string()],
        });
        assert!(policy.validate_destination(&Member::new("ex", 0)).is_ok());
        let frozen = Member::new("frozen", 0);
        assert!(policy.validate_destination(&frozen).is_err());
    }
}
