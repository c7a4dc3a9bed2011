//! Constant-product settlement.
//!
//! Every bet record counts, sales included: they carry negative shares and
//! amounts. Winning shares redeem one-for-one and liquidity providers split
//! whatever is left in the pool.

use rust_decimal::Decimal;

use super::ResolutionInput;
use crate::domain::bet::Bet;
use crate::domain::contract::Contract;
use crate::domain::error::DomainError;
use crate::domain::fees::Fees;
use crate::domain::liquidity::LiquidityProvision;
use crate::domain::mechanism::cpmm::probability_yes;
use crate::domain::money::{Amount, Probability};
use crate::domain::outcome::{Outcome, ResolutionOutcome};
use crate::domain::payout::{Payout, Settlement};

pub(crate) fn settle(
    input: &ResolutionInput,
    contract: &Contract,
    bets: &[Bet],
    liquidity: &[LiquidityProvision],
) -> Result<Settlement, DomainError> {
    let settlement = match &input.outcome {
        ResolutionOutcome::Cancel => cancel(bets, liquidity),
        ResolutionOutcome::Mkt => {
            let prob = input
                .probability
                .unwrap_or_else(|| probability_yes(&contract.state));
            at_probability(contract, bets, liquidity, prob)
        }
        ResolutionOutcome::Yes => outright(contract, bets, liquidity, &Outcome::yes()),
        ResolutionOutcome::No => outright(contract, bets, liquidity, &Outcome::no()),
        ResolutionOutcome::Answer(answer) => {
            return Err(DomainError::InvalidOutcome {
                outcome: answer.to_string(),
                outcome_type: contract.outcome_type,
            });
        }
    };
    Ok(settlement)
}

/// Refund bets and provisions at cost; nothing is collected.
fn cancel(bets: &[Bet], liquidity: &[LiquidityProvision]) -> Settlement {
    Settlement {
        payouts: bets
            .iter()
            .map(|bet| Payout::new(bet.user_id.clone(), bet.amount))
            .collect(),
        creator_payout: Decimal::ZERO,
        liquidity_payouts: liquidity
            .iter()
            .map(|lp| Payout::new(lp.user_id.clone(), lp.amount))
            .collect(),
        collected_fees: Fees::ZERO,
    }
}

fn outright(
    contract: &Contract,
    bets: &[Bet],
    liquidity: &[LiquidityProvision],
    outcome: &Outcome,
) -> Settlement {
    let payouts = bets
        .iter()
        .filter(|bet| &bet.outcome == outcome)
        .map(|bet| Payout::new(bet.user_id.clone(), bet.shares))
        .collect();
    let residual = contract.state.pool(outcome);
    accrued(contract, payouts, pool_payouts(liquidity, residual))
}

/// YES shares redeem at `prob`, NO shares at `1 - prob`.
fn at_probability(
    contract: &Contract,
    bets: &[Bet],
    liquidity: &[LiquidityProvision],
    prob: Probability,
) -> Settlement {
    let price = |outcome: &Outcome| {
        if outcome.is_yes() {
            prob
        } else {
            Decimal::ONE - prob
        }
    };
    let payouts = bets
        .iter()
        .filter(|bet| !price(&bet.outcome).is_zero())
        .map(|bet| Payout::new(bet.user_id.clone(), price(&bet.outcome) * bet.shares))
        .collect();

    let state = &contract.state;
    let residual = prob * state.pool(&Outcome::yes()) + (Decimal::ONE - prob) * state.pool(&Outcome::no());
    accrued(contract, payouts, pool_payouts(liquidity, residual))
}

/// Creator takes the fees accrued at bet time.
fn accrued(contract: &Contract, payouts: Vec<Payout>, liquidity_payouts: Vec<Payout>) -> Settlement {
    let collected_fees = contract.state.collected_fees;
    Settlement {
        payouts,
        creator_payout: collected_fees.creator_fee,
        liquidity_payouts,
        collected_fees,
    }
}

/// Split `residual` across providers by liquidity units.
fn pool_payouts(liquidity: &[LiquidityProvision], residual: Amount) -> Vec<Payout> {
    let units: Amount = liquidity.iter().map(|lp| lp.liquidity).sum();
    if units <= Decimal::ZERO {
        return Vec::new();
    }
    liquidity
        .iter()
        .map(|lp| Payout::new(lp.user_id.clone(), lp.liquidity / units * residual))
        .collect()
}
