//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings. Every
//! section has defaults, so an empty file is a valid configuration.
//!
//! # Example
//!
//! ```no_run
//! use oddsmith::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("oddsmith.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use super::logging::LoggingConfig;
use super::market::{FeesConfig, LoansConfig};
use super::payments::PaymentsConfig;
use crate::domain::{FeeSchedule, LoanPolicy};
use crate::error::{ConfigError, Result};

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Fee rates for both mechanisms.
    #[serde(default)]
    pub fees: FeesConfig,

    /// House loans on new bets.
    #[serde(default)]
    pub loans: LoansConfig,

    /// Resolution payment retries.
    #[serde(default)]
    pub payments: PaymentsConfig,
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML is malformed or
    /// validation fails.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Initialize tracing from the `[logging]` section.
    pub fn init_logging(&self) {
        self.logging.init();
    }

    #[must_use]
    pub fn fee_schedule(&self) -> FeeSchedule {
        self.fees.schedule()
    }

    #[must_use]
    pub fn loan_policy(&self) -> LoanPolicy {
        self.loans.policy()
    }

    /// Check that values are within acceptable ranges.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::InvalidValue {
                field: "format",
                reason: "must be \"pretty\" or \"json\"".to_string(),
            }
            .into());
        }

        let dpm = &self.fees.dpm;
        check_rate("fees.dpm.creator", dpm.creator)?;
        check_rate("fees.dpm.platform", dpm.platform)?;
        if dpm.creator + dpm.platform >= Decimal::ONE {
            return Err(ConfigError::InvalidValue {
                field: "fees.dpm",
                reason: "combined rate must be below 1".to_string(),
            }
            .into());
        }

        let cpmm = &self.fees.cpmm;
        check_rate("fees.cpmm.creator", cpmm.creator)?;
        check_rate("fees.cpmm.platform", cpmm.platform)?;
        check_rate("fees.cpmm.liquidity", cpmm.liquidity)?;
        if cpmm.creator + cpmm.platform + cpmm.liquidity >= Decimal::ONE {
            return Err(ConfigError::InvalidValue {
                field: "fees.cpmm",
                reason: "combined rate must be below 1".to_string(),
            }
            .into());
        }

        if self.loans.max_per_contract < Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "max_per_contract",
                reason: "must be 0 or greater".to_string(),
            }
            .into());
        }
        check_rate("fraction", self.loans.fraction)?;

        let payments = &self.payments;
        if payments.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_attempts",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if payments.initial_delay_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "initial_delay_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if payments.max_delay_ms < payments.initial_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "max_delay_ms",
                reason: "must be >= initial_delay_ms".to_string(),
            }
            .into());
        }
        if !payments.backoff_multiplier.is_finite() || payments.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "backoff_multiplier",
                reason: "must be >= 1.0".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

#[allow(clippy::result_large_err)]
fn check_rate(field: &'static str, rate: Decimal) -> Result<()> {
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must be between 0 and 1".to_string(),
        }
        .into());
    }
    Ok(())
}
