//! Balance ledger doubles.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::adapter::outbound::memory::MemoryLedger;
use crate::domain::{Amount, UserId};
use crate::error::LedgerError;
use crate::port::{BalanceLedger, CreditReceipt, Payment};

/// Ledger that fails credits for chosen users before delegating to a
/// [`MemoryLedger`].
#[derive(Debug, Default)]
pub struct FlakyLedger {
    inner: MemoryLedger,
    failures: Mutex<HashMap<UserId, u32>>,
    attempts: Mutex<HashMap<UserId, u32>>,
}

impl FlakyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` credits to `user_id`.
    pub fn fail_user(self, user_id: &UserId, times: u32) -> Self {
        self.failures.lock().insert(user_id.clone(), times);
        self
    }

    /// Fail every credit to `user_id` until [`FlakyLedger::recover`].
    pub fn fail_user_always(self, user_id: &UserId) -> Self {
        self.fail_user(user_id, u32::MAX)
    }

    /// Let all further credits through.
    pub fn recover(&self) {
        self.failures.lock().clear();
    }

    /// Credit calls made for `user_id`, failed or not.
    pub fn attempts(&self, user_id: &UserId) -> u32 {
        self.attempts.lock().get(user_id).copied().unwrap_or(0)
    }

    pub fn inner(&self) -> &MemoryLedger {
        &self.inner
    }
}

#[async_trait]
impl BalanceLedger for FlakyLedger {
    async fn credit(&self, payment: &Payment) -> Result<CreditReceipt, LedgerError> {
        *self
            .attempts
            .lock()
            .entry(payment.user_id.clone())
            .or_insert(0) += 1;

        let fail = {
            let mut failures = self.failures.lock();
            match failures.get_mut(&payment.user_id) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    true
                }
                _ => false,
            }
        };
        if fail {
            return Err(LedgerError::Unavailable(format!(
                "injected failure for {}",
                payment.user_id
            )));
        }
        self.inner.credit(payment).await
    }

    async fn balance(&self, user_id: &UserId) -> Result<Amount, LedgerError> {
        self.inner.balance(user_id).await
    }
}
