//! Fee and loan configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::domain::{CpmmFeeRates, DpmFeeRates, FeeSchedule, LoanPolicy};

/// `[fees]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FeesConfig {
    #[serde(default)]
    pub dpm: DpmFeesConfig,
    #[serde(default)]
    pub cpmm: CpmmFeesConfig,
}

impl FeesConfig {
    #[must_use]
    pub fn schedule(&self) -> FeeSchedule {
        FeeSchedule {
            dpm: DpmFeeRates {
                creator: self.dpm.creator,
                platform: self.dpm.platform,
            },
            cpmm: CpmmFeeRates {
                creator: self.cpmm.creator,
                platform: self.cpmm.platform,
                liquidity: self.cpmm.liquidity,
            },
        }
    }
}

/// `[fees.dpm]`: rates skimmed from parimutuel profit at resolution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DpmFeesConfig {
    #[serde(default = "default_dpm_creator")]
    pub creator: Decimal,
    #[serde(default = "default_dpm_platform")]
    pub platform: Decimal,
}

fn default_dpm_creator() -> Decimal {
    dec!(0.04)
}

fn default_dpm_platform() -> Decimal {
    dec!(0.01)
}

impl Default for DpmFeesConfig {
    fn default() -> Self {
        Self {
            creator: default_dpm_creator(),
            platform: default_dpm_platform(),
        }
    }
}

/// `[fees.cpmm]`: rates charged on each constant-product trade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CpmmFeesConfig {
    #[serde(default)]
    pub creator: Decimal,
    #[serde(default)]
    pub platform: Decimal,
    #[serde(default)]
    pub liquidity: Decimal,
}

/// `[loans]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoansConfig {
    /// Cap on open loans per user per contract.
    #[serde(default = "default_max_per_contract")]
    pub max_per_contract: Decimal,
    /// Fraction of each wager the house advances.
    #[serde(default = "default_fraction")]
    pub fraction: Decimal,
}

fn default_max_per_contract() -> Decimal {
    dec!(20)
}

fn default_fraction() -> Decimal {
    Decimal::ONE
}

impl Default for LoansConfig {
    fn default() -> Self {
        Self {
            max_per_contract: default_max_per_contract(),
            fraction: default_fraction(),
        }
    }
}

impl LoansConfig {
    #[must_use]
    pub fn policy(&self) -> LoanPolicy {
        LoanPolicy {
            max_per_contract: self.max_per_contract,
            fraction: self.fraction,
        }
    }
}
