//! Constant-product mechanism for binary markets.
//!
//! The pool holds YES and NO reserves `y` and `n`; `y * n` is invariant
//! across fee-free trades and the YES probability is `n / (y + n)`.

use rust_decimal::Decimal;

use super::{ensure_positive, sqrt, BetFill, LiquidityFill, MarketMechanism, SaleFill};
use crate::domain::bet::Bet;
use crate::domain::contract::{add_to, Contract, MarketState, MechanismKind, OutcomeType};
use crate::domain::error::DomainError;
use crate::domain::fees::{CpmmFeeRates, Fees};
use crate::domain::liquidity::LiquidityProvision;
use crate::domain::money::{self, Amount, Probability, Shares};
use crate::domain::outcome::Outcome;
use crate::domain::payout::Settlement;
use crate::domain::settlement::{self, ResolutionInput};

/// Constant-product market maker with per-trade fees.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cpmm {
    rates: CpmmFeeRates,
}

/// YES/NO reserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Reserves {
    yes: Amount,
    no: Amount,
}

impl Reserves {
    fn of(state: &MarketState) -> Self {
        Self {
            yes: state.pool(&Outcome::yes()),
            no: state.pool(&Outcome::no()),
        }
    }

    /// (reserve of `outcome`, reserve of the other side)
    fn split(self, outcome: &Outcome) -> (Amount, Amount) {
        if outcome.is_yes() {
            (self.yes, self.no)
        } else {
            (self.no, self.yes)
        }
    }

    fn join(outcome: &Outcome, own: Amount, other: Amount) -> Self {
        if outcome.is_yes() {
            Self { yes: own, no: other }
        } else {
            Self { yes: other, no: own }
        }
    }

    fn probability_yes(self) -> Probability {
        let total = self.yes + self.no;
        if total <= Decimal::ZERO {
            return Decimal::new(5, 1);
        }
        self.no / total
    }

    fn probability(self, outcome: &Outcome) -> Probability {
        let yes = self.probability_yes();
        if outcome.is_yes() {
            yes
        } else {
            Decimal::ONE - yes
        }
    }

    fn write(self, state: &mut MarketState) {
        state.pool.insert(Outcome::yes(), self.yes);
        state.pool.insert(Outcome::no(), self.no);
    }
}

/// YES probability of a constant-product pool.
#[must_use]
pub fn probability_yes(state: &MarketState) -> Probability {
    Reserves::of(state).probability_yes()
}

fn ensure_binary(outcome_type: OutcomeType) -> Result<(), DomainError> {
    if outcome_type != OutcomeType::Binary {
        return Err(DomainError::UnsupportedOutcomeType {
            mechanism: MechanismKind::Cpmm,
            outcome_type,
        });
    }
    Ok(())
}

/// Shares bought by putting `amount` into the pool on `outcome`, and the
/// reserves afterwards.
fn buy(reserves: Reserves, outcome: &Outcome, amount: Amount) -> Result<(Shares, Reserves), DomainError> {
    let (own, other) = reserves.split(outcome);
    if own <= Decimal::ZERO || other <= Decimal::ZERO {
        return Err(DomainError::EmptyPool);
    }
    let shares = own + amount - own * other / (other + amount);
    Ok((shares, Reserves::join(outcome, own + amount - shares, other + amount)))
}

/// Value returned for `shares` of `outcome`, and the reserves afterwards.
///
/// Solves `(own + shares - v) * (other - v) = own * other` for the smaller root.
fn sell(reserves: Reserves, outcome: &Outcome, shares: Shares) -> Result<(Amount, Reserves), DomainError> {
    let (own, other) = reserves.split(outcome);
    if own <= Decimal::ZERO || other <= Decimal::ZERO {
        return Err(DomainError::EmptyPool);
    }
    let sum = own + shares + other;
    let discriminant = money::max(sum * sum - Decimal::from(4) * shares * other, Decimal::ZERO);
    let value = (sum - sqrt(discriminant)?) / Decimal::TWO;
    Ok((value, Reserves::join(outcome, own + shares - value, other - value)))
}

impl Cpmm {
    #[must_use]
    pub const fn new(rates: CpmmFeeRates) -> Self {
        Self { rates }
    }

    #[must_use]
    pub const fn rates(&self) -> CpmmFeeRates {
        self.rates
    }

    /// Split `amount` by fee rate, weighted by `bet_p`.
    fn fees(&self, bet_p: Probability, amount: Amount) -> Fees {
        Fees {
            creator_fee: self.rates.creator * bet_p * amount,
            platform_fee: self.rates.platform * bet_p * amount,
            liquidity_fee: self.rates.liquidity * bet_p * amount,
        }
    }

    /// Fees on a bet, priced off the fee-free fill.
    fn bet_fees(&self, reserves: Reserves, outcome: &Outcome, amount: Amount) -> Result<Fees, DomainError> {
        if self.rates.total().is_zero() {
            return Ok(Fees::ZERO);
        }
        let (_, after) = buy(reserves, outcome, amount)?;
        let bet_p = Decimal::ONE - after.probability(outcome);
        Ok(self.fees(bet_p, amount))
    }

    fn sale_fees(&self, reserves: Reserves, outcome: &Outcome, shares: Shares) -> Result<Fees, DomainError> {
        if self.rates.total().is_zero() {
            return Ok(Fees::ZERO);
        }
        let (value, after) = sell(reserves, outcome, shares)?;
        Ok(self.fees(after.probability(outcome), value))
    }
}

impl MarketMechanism for Cpmm {
    fn kind(&self) -> MechanismKind {
        MechanismKind::Cpmm
    }

    fn probability(&self, contract: &Contract, outcome: &Outcome) -> Probability {
        Reserves::of(&contract.state).probability(outcome)
    }

    fn apply_bet(
        &self,
        contract: &Contract,
        outcome: &Outcome,
        amount: Amount,
    ) -> Result<BetFill, DomainError> {
        ensure_binary(contract.outcome_type)?;
        ensure_positive(amount)?;
        let reserves = Reserves::of(&contract.state);
        let fees = self.bet_fees(reserves, outcome, amount)?;
        let (shares, after) = buy(reserves, outcome, amount - fees.total())?;
        let after = Reserves {
            yes: after.yes + fees.liquidity_fee,
            no: after.no + fees.liquidity_fee,
        };

        let mut next = contract.state.clone();
        after.write(&mut next);
        add_to(&mut next.total_shares, outcome, shares);
        add_to(&mut next.total_bets, outcome, amount);
        next.collected_fees += fees;

        Ok(BetFill {
            outcome: outcome.clone(),
            amount,
            shares,
            fees,
            prob_before: reserves.probability(outcome),
            prob_after: after.probability(outcome),
            state: next,
        })
    }

    fn sell_shares(
        &self,
        contract: &Contract,
        outcome: &Outcome,
        shares: Shares,
    ) -> Result<SaleFill, DomainError> {
        ensure_binary(contract.outcome_type)?;
        if shares <= Decimal::ZERO {
            return Err(DomainError::NonPositiveShares { shares });
        }
        let available = contract.state.shares(outcome);
        if shares > available {
            return Err(DomainError::InsufficientShares {
                requested: shares,
                available,
            });
        }

        let reserves = Reserves::of(&contract.state);
        let fees = self.sale_fees(reserves, outcome, shares)?;
        let (sale_value, after) = sell(reserves, outcome, shares)?;
        let after = Reserves {
            yes: after.yes + fees.liquidity_fee,
            no: after.no + fees.liquidity_fee,
        };
        let proceeds = sale_value - fees.total();

        let mut next = contract.state.clone();
        after.write(&mut next);
        add_to(&mut next.total_shares, outcome, -shares);
        add_to(&mut next.total_bets, outcome, -proceeds);
        next.collected_fees += fees;

        Ok(SaleFill {
            outcome: outcome.clone(),
            shares,
            sale_value,
            proceeds,
            fees,
            prob_before: reserves.probability(outcome),
            prob_after: after.probability(outcome),
            state: next,
        })
    }

    /// Adds `amount` to both reserves. On an unbalanced pool this pulls the
    /// probability toward 0.5.
    fn add_liquidity(&self, contract: &Contract, amount: Amount) -> Result<LiquidityFill, DomainError> {
        ensure_binary(contract.outcome_type)?;
        ensure_positive(amount)?;
        let before = Reserves::of(&contract.state);
        let after = Reserves {
            yes: before.yes + amount,
            no: before.no + amount,
        };
        let liquidity = sqrt(after.yes * after.no)? - sqrt(before.yes * before.no)?;

        let mut next = contract.state.clone();
        after.write(&mut next);
        next.total_liquidity += liquidity;
        Ok(LiquidityFill {
            amount,
            liquidity,
            state: next,
        })
    }

    fn settle(
        &self,
        input: &ResolutionInput,
        contract: &Contract,
        bets: &[Bet],
        liquidity: &[LiquidityProvision],
    ) -> Result<Settlement, DomainError> {
        ensure_binary(contract.outcome_type)?;
        settlement::cpmm::settle(input, contract, bets, liquidity)
    }
}

/// Seed a new constant-product market with `ante` on both sides.
///
/// The market opens at 50% and the creator holds the only provision.
///
/// # Errors
///
/// Returns [`DomainError::UnsupportedOutcomeType`] for free-response
/// contracts and [`DomainError::NonPositiveAmount`] for a non-positive ante.
pub fn ante(contract: &Contract, ante: Amount) -> Result<(MarketState, LiquidityProvision), DomainError> {
    ensure_binary(contract.outcome_type)?;
    ensure_positive(ante)?;
    let mut state = MarketState::default();
    Reserves { yes: ante, no: ante }.write(&mut state);
    state.total_liquidity = ante;

    let mut provision = LiquidityProvision::new(
        contract.creator_id.clone(),
        contract.id.clone(),
        ante,
        ante,
        contract.created_time,
    );
    provision.is_ante = true;
    Ok((state, provision))
}
