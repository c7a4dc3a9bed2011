//! Parimutuel settlement.
//!
//! Only open bets take part: sold bets and sale records have already been
//! paid out through the sale. Winners split the whole pool by share; fees
//! come out of profit only.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use super::ResolutionInput;
use crate::domain::bet::{open_bets, Bet};
use crate::domain::contract::{total_of, Contract, OutcomeType};
use crate::domain::error::DomainError;
use crate::domain::fees::DpmFeeRates;
use crate::domain::mechanism::dpm::outcome_probability;
use crate::domain::money::{self, Probability, Shares};
use crate::domain::outcome::{Outcome, ResolutionOutcome};
use crate::domain::payout::{Payout, Settlement};

pub(crate) fn settle(
    input: &ResolutionInput,
    contract: &Contract,
    bets: &[Bet],
    rates: DpmFeeRates,
) -> Result<Settlement, DomainError> {
    let open: Vec<&Bet> = open_bets(bets).collect();
    match &input.outcome {
        ResolutionOutcome::Cancel => Ok(cancel(&open)),
        ResolutionOutcome::Mkt => match contract.outcome_type {
            OutcomeType::Binary => {
                let prob = input.probability.unwrap_or_else(|| {
                    outcome_probability(&contract.state, contract.outcome_type, &Outcome::yes())
                });
                Ok(binary_mkt(contract, &open, prob, rates))
            }
            OutcomeType::FreeResponse => {
                let weights = input.resolutions.as_ref().ok_or_else(|| DomainError::InvalidResolutions {
                    reason: "answer weights are required".to_string(),
                })?;
                Ok(weighted(contract, &open, weights, rates))
            }
        },
        winner => {
            let Some(outcome) = winner.winning_outcome() else {
                return Ok(Settlement::default());
            };
            Ok(standard(contract, &open, &outcome, rates))
        }
    }
}

/// Refund every open bet exactly; no fees.
fn cancel(open: &[&Bet]) -> Settlement {
    Settlement {
        payouts: open
            .iter()
            .map(|bet| Payout::new(bet.user_id.clone(), bet.amount))
            .collect(),
        ..Settlement::default()
    }
}

/// Split `pool_total` over `(bet, weighted shares)` in proportion to weight.
fn distribute(
    contract: &Contract,
    weighted: &[(&Bet, Shares)],
    rates: DpmFeeRates,
) -> Settlement {
    let weight_total: Shares = weighted.iter().map(|(_, weight)| *weight).sum();
    if weight_total <= Decimal::ZERO {
        return Settlement::default();
    }
    let pool_total = contract.state.pool_total();

    let mut profits = Decimal::ZERO;
    let payouts = weighted
        .iter()
        .map(|(bet, weight)| {
            let winnings = *weight / weight_total * pool_total;
            profits += money::max(winnings - bet.amount, Decimal::ZERO);
            Payout::new(bet.user_id.clone(), rates.deduct(bet.amount, winnings))
        })
        .collect();

    let fees = rates.on_profit(profits);
    Settlement {
        payouts,
        creator_payout: fees.creator_fee,
        liquidity_payouts: Vec::new(),
        collected_fees: fees,
    }
}

/// One outcome wins outright.
fn standard(contract: &Contract, open: &[&Bet], outcome: &Outcome, rates: DpmFeeRates) -> Settlement {
    let weighted: Vec<(&Bet, Shares)> = open
        .iter()
        .filter(|bet| &bet.outcome == outcome)
        .map(|bet| (*bet, bet.shares))
        .collect();
    distribute(contract, &weighted, rates)
}

/// Binary resolution at probability `prob`: every bet is paid
/// `prob * paid_as_yes + (1 - prob) * paid_as_no`, and fees interpolate the
/// same way. At 1 or 0 this is exactly a YES or NO resolution.
///
/// A side with no open bets has nothing to be paid as, so its weight goes to
/// the other side and the pool is still paid out in full.
fn binary_mkt(contract: &Contract, open: &[&Bet], prob: Probability, rates: DpmFeeRates) -> Settlement {
    let as_yes = standard(contract, open, &Outcome::yes(), rates);
    let as_no = standard(contract, open, &Outcome::no(), rates);
    let prob = match (as_yes.payouts.is_empty(), as_no.payouts.is_empty()) {
        (true, false) => Decimal::ZERO,
        (false, true) => Decimal::ONE,
        _ => prob,
    };

    // `standard` yields one payout per winning bet, in open-bet order.
    let mut yes_payouts = as_yes.payouts.iter();
    let mut no_payouts = as_no.payouts.iter();
    let payouts = open
        .iter()
        .filter_map(|bet| {
            let (paid, weight) = if bet.outcome.is_yes() {
                (yes_payouts.next(), prob)
            } else {
                (no_payouts.next(), Decimal::ONE - prob)
            };
            let paid = paid?;
            (!weight.is_zero()).then(|| Payout::new(paid.user_id.clone(), weight * paid.payout))
        })
        .collect();

    let fees = as_yes.collected_fees.scaled(prob) + as_no.collected_fees.scaled(Decimal::ONE - prob);
    Settlement {
        payouts,
        creator_payout: fees.creator_fee,
        liquidity_payouts: Vec::new(),
        collected_fees: fees,
    }
}

/// Free-response resolution by answer weights.
///
/// Weights are normalised over answers that have open bets so that the
/// whole pool is paid out. Within an answer, bettors split that answer's
/// slice by shares.
fn weighted(
    contract: &Contract,
    open: &[&Bet],
    weights: &BTreeMap<Outcome, Decimal>,
    rates: DpmFeeRates,
) -> Settlement {
    let mut shares_by_answer: BTreeMap<Outcome, Shares> = BTreeMap::new();
    for bet in open {
        if total_of(weights, &bet.outcome) > Decimal::ZERO {
            *shares_by_answer.entry(bet.outcome.clone()).or_default() += bet.shares;
        }
    }
    shares_by_answer.retain(|_, shares| *shares > Decimal::ZERO);

    let weight_total: Decimal = shares_by_answer
        .keys()
        .map(|answer| total_of(weights, answer))
        .sum();
    if weight_total <= Decimal::ZERO {
        return Settlement::default();
    }

    // Scale each bet so that an answer's bettors together hold its weight.
    let scaled: Vec<(&Bet, Shares)> = open
        .iter()
        .filter_map(|bet| {
            let answer_shares = shares_by_answer.get(&bet.outcome)?;
            let share_of_answer = bet.shares / *answer_shares;
            Some((*bet, share_of_answer * total_of(weights, &bet.outcome) / weight_total))
        })
        .collect();
    distribute(contract, &scaled, rates)
}
