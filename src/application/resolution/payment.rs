//! Payment delivery with retries.
//!
//! Each payment is retried on its own with exponential backoff. The ledger
//! deduplicates by idempotency key, so re-sending a payment that did land is
//! harmless.

use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, error, warn};

use crate::error::LedgerError;
use crate::port::{BalanceLedger, CreditReceipt, Payment};

/// Backoff settings for ledger credits.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts per payment, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay_ms: u64,
    /// Cap on any single delay.
    pub max_delay_ms: u64,
    /// Growth factor between delays.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that retries without sleeping. Used by tests.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay_ms: 0,
            max_delay_ms: 0,
            backoff_multiplier: 1.0,
        }
    }

    /// Delays between consecutive attempts, before jitter.
    #[must_use]
    pub fn delays(&self) -> Backoff {
        Backoff {
            current_delay_ms: self.initial_delay_ms,
            max_delay_ms: self.max_delay_ms,
            multiplier: self.backoff_multiplier,
        }
    }
}

/// Exponential delay sequence derived from a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct Backoff {
    current_delay_ms: u64,
    max_delay_ms: u64,
    multiplier: f64,
}

impl Backoff {
    /// Return the current delay and advance to the next one.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current_delay_ms.min(self.max_delay_ms);
        let next = (self.current_delay_ms as f64 * self.multiplier) as u64;
        self.current_delay_ms = next.min(self.max_delay_ms);
        Duration::from_millis(delay + jitter(delay))
    }
}

/// Up to 20% extra delay so retries from concurrent payments spread out.
fn jitter(base_ms: u64) -> u64 {
    let range = base_ms / 5;
    if range == 0 {
        return 0;
    }
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()))
        .unwrap_or(0);
    nanos % range
}

/// Result of delivering one payment.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub payment: Payment,
    pub attempts: u32,
    pub result: Result<CreditReceipt, LedgerError>,
}

impl Delivery {
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        self.result.is_err()
    }
}

/// Credit one payment, retrying until it lands or attempts run out.
pub async fn deliver(
    ledger: &dyn BalanceLedger,
    payment: Payment,
    policy: &RetryPolicy,
) -> Delivery {
    let max_attempts = policy.max_attempts.max(1);
    let mut backoff = policy.delays();
    let mut attempt = 0;

    loop {
        attempt += 1;
        match ledger.credit(&payment).await {
            Ok(receipt) => {
                debug!(
                    user_id = %payment.user_id,
                    amount = %payment.amount,
                    key = %payment.key,
                    ?receipt,
                    "Payment credited"
                );
                return Delivery {
                    payment,
                    attempts: attempt,
                    result: Ok(receipt),
                };
            }
            Err(e) if attempt < max_attempts => {
                let delay = backoff.next_delay();
                warn!(
                    user_id = %payment.user_id,
                    amount = %payment.amount,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Payment failed, retrying"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            Err(e) => {
                error!(
                    user_id = %payment.user_id,
                    amount = %payment.amount,
                    key = %payment.key,
                    attempts = attempt,
                    error = %e,
                    "Payment abandoned"
                );
                return Delivery {
                    payment,
                    attempts: attempt,
                    result: Err(e),
                };
            }
        }
    }
}

/// Deliver all payments concurrently. Output order matches input order.
pub async fn deliver_all(
    ledger: &dyn BalanceLedger,
    payments: Vec<Payment>,
    policy: &RetryPolicy,
) -> Vec<Delivery> {
    join_all(
        payments
            .into_iter()
            .map(|payment| deliver(ledger, payment, policy)),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Amount, ContractId, UserId};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;

    /// Fails the first `failures` credits, then succeeds.
    struct Stubborn {
        failures: Mutex<u32>,
        calls: Mutex<u32>,
    }

    impl Stubborn {
        fn new(failures: u32) -> Self {
            Self {
                failures: Mutex::new(failures),
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl BalanceLedger for Stubborn {
        async fn credit(&self, _payment: &Payment) -> Result<CreditReceipt, LedgerError> {
            *self.calls.lock() += 1;
            let mut failures = self.failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(LedgerError::Unavailable("down".into()));
            }
            Ok(CreditReceipt::Applied)
        }

        async fn balance(&self, _user_id: &UserId) -> Result<Amount, LedgerError> {
            Ok(Amount::ZERO)
        }
    }

    fn payment() -> Payment {
        Payment::resolution(&ContractId::new("c1"), UserId::new("alice"), dec!(10))
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay_ms: 100,
            max_delay_ms: 300,
            backoff_multiplier: 2.0,
        };
        let mut backoff = policy.delays();
        let first = backoff.next_delay().as_millis();
        let second = backoff.next_delay().as_millis();
        let third = backoff.next_delay().as_millis();
        assert!((100..120).contains(&first));
        assert!((200..240).contains(&second));
        assert!((300..360).contains(&third));
    }

    #[tokio::test]
    async fn retries_until_success() {
        let ledger = Stubborn::new(2);
        let delivery = deliver(&ledger, payment(), &RetryPolicy::immediate(3)).await;
        assert!(!delivery.is_failed());
        assert_eq!(delivery.attempts, 3);
        assert_eq!(*ledger.calls.lock(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let ledger = Stubborn::new(10);
        let delivery = deliver(&ledger, payment(), &RetryPolicy::immediate(2)).await;
        assert!(delivery.is_failed());
        assert_eq!(delivery.attempts, 2);
        assert_eq!(*ledger.calls.lock(), 2);
    }
}
