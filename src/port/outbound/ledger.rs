//! Balance ledger port.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Amount, ContractId, UserId};
use crate::error::LedgerError;

/// Deduplication key for a credit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Key for a user's resolution payout on a contract.
    #[must_use]
    pub fn resolution(contract_id: &ContractId, user_id: &UserId) -> Self {
        Self(format!("resolution:{contract_id}:{user_id}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single balance change. Negative amounts debit the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub key: IdempotencyKey,
    pub user_id: UserId,
    pub amount: Amount,
}

impl Payment {
    /// Resolution payout for `user_id` on `contract_id`.
    #[must_use]
    pub fn resolution(contract_id: &ContractId, user_id: UserId, amount: Amount) -> Self {
        Self {
            key: IdempotencyKey::resolution(contract_id, &user_id),
            user_id,
            amount,
        }
    }
}

/// What the ledger did with a credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditReceipt {
    /// The balance changed.
    Applied,
    /// A payment with this key was already applied; nothing changed.
    Duplicate,
}

/// User balance service.
///
/// Implementations must deduplicate by [`Payment::key`] so a retried
/// payment never credits twice.
#[async_trait]
pub trait BalanceLedger: Send + Sync {
    /// Apply a payment.
    async fn credit(&self, payment: &Payment) -> Result<CreditReceipt, LedgerError>;

    /// Current balance of a user.
    async fn balance(&self, user_id: &UserId) -> Result<Amount, LedgerError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn resolution_key_names_contract_and_user() {
        let payment = Payment::resolution(&ContractId::new("c9"), UserId::new("alice"), dec!(12));
        assert_eq!(payment.key.as_str(), "resolution:c9:alice");
        assert_eq!(payment.amount, dec!(12));
    }
}
