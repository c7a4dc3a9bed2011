//! Share/probability model.
//!
//! Two automated market makers share one [`MarketMechanism`] contract so the
//! rest of the crate stays mechanism-agnostic:
//!
//! - [`Dpm`] - dynamic parimutuel: price from squared outcome share totals
//! - [`Cpmm`] - constant product: price from a YES/NO reserve pool
//!
//! Everything here is pure. A fill returns the new [`MarketState`]; nothing
//! is mutated in place.

pub mod cpmm;
pub mod dpm;

pub use cpmm::Cpmm;
pub use dpm::Dpm;

use rust_decimal::{Decimal, MathematicalOps};

use super::bet::Bet;
use super::contract::{Contract, MarketState, MechanismKind};
use super::error::DomainError;
use super::fees::{FeeSchedule, Fees};
use super::liquidity::LiquidityProvision;
use super::money::{Amount, Probability, Shares};
use super::outcome::Outcome;
use super::payout::Settlement;
use super::settlement::ResolutionInput;

/// Result of buying into an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetFill {
    pub outcome: Outcome,
    pub amount: Amount,
    pub shares: Shares,
    pub fees: Fees,
    pub prob_before: Probability,
    pub prob_after: Probability,
    pub state: MarketState,
}

/// Result of unwinding a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleFill {
    pub outcome: Outcome,
    /// Shares given back (positive).
    pub shares: Shares,
    /// Value removed from the market for those shares.
    pub sale_value: Amount,
    /// Amount credited to the seller after fees.
    pub proceeds: Amount,
    pub fees: Fees,
    pub prob_before: Probability,
    pub prob_after: Probability,
    pub state: MarketState,
}

/// Result of adding liquidity to a pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidityFill {
    pub amount: Amount,
    /// Pool units issued for `amount`.
    pub liquidity: Amount,
    pub state: MarketState,
}

/// Pricing and settlement rules for one market-making mechanism.
pub trait MarketMechanism: Send + Sync {
    /// Mechanism tag.
    fn kind(&self) -> MechanismKind;

    /// Current probability of `outcome`.
    fn probability(&self, contract: &Contract, outcome: &Outcome) -> Probability;

    /// Fill a bet of `amount` on `outcome` without touching `contract`.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] if the amount is not positive, the outcome
    /// type is unsupported or the pool cannot price the bet.
    fn apply_bet(
        &self,
        contract: &Contract,
        outcome: &Outcome,
        amount: Amount,
    ) -> Result<BetFill, DomainError>;

    /// Shares a bet of `amount` would receive.
    ///
    /// # Errors
    ///
    /// See [`MarketMechanism::apply_bet`].
    fn shares_for_bet(
        &self,
        contract: &Contract,
        outcome: &Outcome,
        amount: Amount,
    ) -> Result<Shares, DomainError> {
        self.apply_bet(contract, outcome, amount).map(|fill| fill.shares)
    }

    /// Probability of `outcome` after a hypothetical bet.
    ///
    /// A zero amount returns the current probability.
    ///
    /// # Errors
    ///
    /// See [`MarketMechanism::apply_bet`].
    fn probability_after_bet(
        &self,
        contract: &Contract,
        outcome: &Outcome,
        amount: Amount,
    ) -> Result<Probability, DomainError> {
        if amount.is_zero() {
            return Ok(self.probability(contract, outcome));
        }
        let fill = self.apply_bet(contract, outcome, amount)?;
        let after = contract.clone().with_state(fill.state);
        Ok(self.probability(&after, outcome))
    }

    /// Sell an entire bet back to the market.
    ///
    /// # Errors
    ///
    /// [`DomainError::UnsupportedOperation`] unless the mechanism prices whole bets.
    fn sell_bet(&self, _contract: &Contract, _bet: &Bet) -> Result<SaleFill, DomainError> {
        Err(DomainError::UnsupportedOperation {
            mechanism: self.kind(),
            operation: "selling whole bets",
        })
    }

    /// Sell a quantity of fungible shares back to the market.
    ///
    /// # Errors
    ///
    /// [`DomainError::UnsupportedOperation`] unless shares are fungible.
    fn sell_shares(
        &self,
        _contract: &Contract,
        _outcome: &Outcome,
        _shares: Shares,
    ) -> Result<SaleFill, DomainError> {
        Err(DomainError::UnsupportedOperation {
            mechanism: self.kind(),
            operation: "selling shares",
        })
    }

    /// Add liquidity to the market's pool.
    ///
    /// # Errors
    ///
    /// [`DomainError::UnsupportedOperation`] unless the mechanism has a pool.
    fn add_liquidity(
        &self,
        _contract: &Contract,
        _amount: Amount,
    ) -> Result<LiquidityFill, DomainError> {
        Err(DomainError::UnsupportedOperation {
            mechanism: self.kind(),
            operation: "adding liquidity",
        })
    }

    /// Compute final payouts for a resolution.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] if the resolution is malformed for this
    /// contract or the mechanism cannot settle its outcome type.
    fn settle(
        &self,
        input: &ResolutionInput,
        contract: &Contract,
        bets: &[Bet],
        liquidity: &[LiquidityProvision],
    ) -> Result<Settlement, DomainError>;
}

/// Mechanism implementation for a contract's tag.
#[must_use]
pub fn for_kind(kind: MechanismKind, fees: &FeeSchedule) -> Box<dyn MarketMechanism> {
    match kind {
        MechanismKind::Dpm => Box::new(Dpm::new(fees.dpm)),
        MechanismKind::Cpmm => Box::new(Cpmm::new(fees.cpmm)),
    }
}

pub(crate) fn ensure_positive(amount: Amount) -> Result<(), DomainError> {
    if amount <= Decimal::ZERO {
        return Err(DomainError::NonPositiveAmount { amount });
    }
    Ok(())
}

pub(crate) fn sqrt(value: Decimal) -> Result<Decimal, DomainError> {
    value
        .sqrt()
        .ok_or(DomainError::Arithmetic("square root of a negative value"))
}
