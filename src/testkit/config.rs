//! Canonical test configurations.

use crate::application::RetryPolicy;
use crate::domain::LoanPolicy;
use crate::infrastructure::config::payments::PaymentsConfig;
use crate::infrastructure::config::settings::Config;

/// Retries with zero delays so failing payments never sleep.
pub fn retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::immediate(max_attempts)
}

/// No house loans.
pub fn no_loans() -> LoanPolicy {
    LoanPolicy {
        max_per_contract: rust_decimal::Decimal::ZERO,
        ..LoanPolicy::default()
    }
}

/// Default configuration with 1ms payment retries.
pub fn fast() -> Config {
    Config {
        payments: PaymentsConfig {
            max_attempts: 3,
            initial_delay_ms: 1,
            max_delay_ms: 1,
            backoff_multiplier: 1.0,
        },
        ..Config::default()
    }
}
