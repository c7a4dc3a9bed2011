//! In-memory balance ledger.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::domain::{Amount, UserId};
use crate::error::LedgerError;
use crate::port::{BalanceLedger, CreditReceipt, IdempotencyKey, Payment};

#[derive(Debug, Default)]
struct Books {
    balances: HashMap<UserId, Amount>,
    applied: HashSet<IdempotencyKey>,
}

/// [`BalanceLedger`] that keeps balances in a map and deduplicates by key.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    books: Mutex<Books>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to a user's balance outside of any payment.
    pub fn deposit(&self, user_id: &UserId, amount: Amount) {
        *self
            .books
            .lock()
            .balances
            .entry(user_id.clone())
            .or_insert(Decimal::ZERO) += amount;
    }

    /// All balances, sorted by user.
    #[must_use]
    pub fn balances(&self) -> Vec<(UserId, Amount)> {
        let mut balances: Vec<_> = self
            .books
            .lock()
            .balances
            .iter()
            .map(|(user_id, amount)| (user_id.clone(), *amount))
            .collect();
        balances.sort_by(|a, b| a.0.cmp(&b.0));
        balances
    }

    /// Number of distinct payments applied.
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.books.lock().applied.len()
    }
}

#[async_trait]
impl BalanceLedger for MemoryLedger {
    async fn credit(&self, payment: &Payment) -> Result<CreditReceipt, LedgerError> {
        let mut books = self.books.lock();
        if !books.applied.insert(payment.key.clone()) {
            return Ok(CreditReceipt::Duplicate);
        }
        *books
            .balances
            .entry(payment.user_id.clone())
            .or_insert(Decimal::ZERO) += payment.amount;
        Ok(CreditReceipt::Applied)
    }

    async fn balance(&self, user_id: &UserId) -> Result<Amount, LedgerError> {
        Ok(self
            .books
            .lock()
            .balances
            .get(user_id)
            .copied()
            .unwrap_or(Decimal::ZERO))
    }
}
