//! Core types for member transfers

use crate::transfer::errors::TransferError;

/// Request to move `amount` from one member to another. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    /// Positive amount in the smallest currency unit
    pub amount: u64,
}

impl TransferRequest {
    pub fn new(from: &str, to: &str, amount: u64) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            amount,
        }
    }

    /// Check the request shape before any connection is borrowed.
    ///
    /// Returns the amount as a balance delta.
    pub fn validate(&self) -> Result<i64, TransferError> {
        if self.amount == 0 {
            return Err(TransferError::InvalidAmount(self.amount));
        }
        let delta = i64::try_from(self.amount)
            .map_err(|_| TransferError::InvalidAmount(self.amount))?;

        // Both reads would see the same starting balance and the credit would overwrite the
        // debit, creating funds
        if self.from == self.to {
            return Err(TransferError::SameAccount(self.from.clone()));
        }
        Ok(delta)
    }
}
