//! Fee amounts and fee-rate schedules.

use std::ops::{Add, AddAssign};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::money::Amount;

/// Fee amounts split by recipient.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fees {
    /// Paid to the market creator.
    #[serde(default)]
    pub creator_fee: Amount,
    /// Retained by the house.
    #[serde(default)]
    pub platform_fee: Amount,
    /// Added to the pool for liquidity providers.
    #[serde(default)]
    pub liquidity_fee: Amount,
}

impl Fees {
    /// No fees.
    pub const ZERO: Self = Self {
        creator_fee: Decimal::ZERO,
        platform_fee: Decimal::ZERO,
        liquidity_fee: Decimal::ZERO,
    };

    /// Sum of all fee components.
    #[must_use]
    pub fn total(&self) -> Amount {
        self.creator_fee + self.platform_fee + self.liquidity_fee
    }

    /// Fees that leave the pool (creator and house).
    #[must_use]
    pub fn withdrawn(&self) -> Amount {
        self.creator_fee + self.platform_fee
    }

    /// Every component multiplied by `factor`.
    #[must_use]
    pub fn scaled(&self, factor: Decimal) -> Self {
        Self {
            creator_fee: self.creator_fee * factor,
            platform_fee: self.platform_fee * factor,
            liquidity_fee: self.liquidity_fee * factor,
        }
    }
}

impl Add for Fees {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            creator_fee: self.creator_fee + rhs.creator_fee,
            platform_fee: self.platform_fee + rhs.platform_fee,
            liquidity_fee: self.liquidity_fee + rhs.liquidity_fee,
        }
    }
}

impl AddAssign for Fees {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Parimutuel fee rates, charged on profit at settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DpmFeeRates {
    pub creator: Decimal,
    pub platform: Decimal,
}

impl DpmFeeRates {
    /// Combined rate skimmed from profit.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.creator + self.platform
    }

    /// Fees owed on a set of (non-negative) profits.
    #[must_use]
    pub fn on_profit(&self, profit: Amount) -> Fees {
        Fees {
            creator_fee: self.creator * profit,
            platform_fee: self.platform * profit,
            liquidity_fee: Decimal::ZERO,
        }
    }

    /// Payout after fees: only the profit above the original stake is taxed.
    #[must_use]
    pub fn deduct(&self, amount: Amount, winnings: Amount) -> Amount {
        if winnings > amount {
            amount + (Decimal::ONE - self.total()) * (winnings - amount)
        } else {
            winnings
        }
    }
}

impl Default for DpmFeeRates {
    fn default() -> Self {
        Self {
            creator: dec!(0.04),
            platform: dec!(0.01),
        }
    }
}

/// Constant-product fee rates, charged on each trade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpmmFeeRates {
    pub creator: Decimal,
    pub platform: Decimal,
    pub liquidity: Decimal,
}

impl CpmmFeeRates {
    /// Combined rate.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.creator + self.platform + self.liquidity
    }
}

/// Fee rates for both mechanisms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub dpm: DpmFeeRates,
    pub cpmm: CpmmFeeRates,
}

impl FeeSchedule {
    /// A schedule that charges nothing, handy for exact arithmetic in tests.
    #[must_use]
    pub fn free() -> Self {
        Self {
            dpm: DpmFeeRates {
                creator: Decimal::ZERO,
                platform: Decimal::ZERO,
            },
            cpmm: CpmmFeeRates::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dpm_deduct_only_taxes_profit() {
        let rates = DpmFeeRates::default();
        assert_eq!(rates.deduct(dec!(100), dec!(200)), dec!(195));
        assert_eq!(rates.deduct(dec!(100), dec!(80)), dec!(80));
    }

    #[test]
    fn fees_add_componentwise() {
        let a = Fees {
            creator_fee: dec!(1),
            platform_fee: dec!(2),
            liquidity_fee: dec!(3),
        };
        let mut b = Fees::ZERO;
        b += a;
        b += a;
        assert_eq!(b.total(), dec!(12));
        assert_eq!(b.withdrawn(), dec!(6));
    }
}
