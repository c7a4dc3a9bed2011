//! Dynamic parimutuel mechanism.
//!
//! Probability of an outcome is its squared share total over the sum of
//! squared share totals. Money staked stays in the pool and is split among
//! winners by share at resolution.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{ensure_positive, sqrt, BetFill, MarketMechanism, SaleFill};
use crate::domain::bet::Bet;
use crate::domain::contract::{add_to, total_of, Contract, MarketState, MechanismKind, OutcomeType};
use crate::domain::error::DomainError;
use crate::domain::fees::{DpmFeeRates, Fees};
use crate::domain::liquidity::LiquidityProvision;
use crate::domain::money::{self, Amount, Probability, Shares};
use crate::domain::outcome::Outcome;
use crate::domain::payout::Settlement;
use crate::domain::settlement::{self, ResolutionInput};

/// Parimutuel market maker with fees charged on profit.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dpm {
    rates: DpmFeeRates,
}

impl Dpm {
    #[must_use]
    pub const fn new(rates: DpmFeeRates) -> Self {
        Self { rates }
    }

    #[must_use]
    pub const fn rates(&self) -> DpmFeeRates {
        self.rates
    }
}

/// Probability of `outcome` given share totals.
///
/// With no shares issued a binary market sits at 0.5 and a free-response
/// market splits uniformly over its known answers; an answer the market has
/// never seen is at 0.
#[must_use]
pub fn outcome_probability(
    state: &MarketState,
    outcome_type: OutcomeType,
    outcome: &Outcome,
) -> Probability {
    let square_sum = state.square_sum();
    if square_sum.is_zero() {
        return match outcome_type {
            OutcomeType::Binary => dec!(0.5),
            OutcomeType::FreeResponse if state.total_shares.contains_key(outcome) => {
                Decimal::ONE / Decimal::from(state.total_shares.len())
            }
            OutcomeType::FreeResponse => Decimal::ZERO,
        };
    }
    let shares = state.shares(outcome);
    shares * shares / square_sum
}

/// Shares issued for `amount` staked on `outcome`.
///
/// # Errors
///
/// Returns [`DomainError::Arithmetic`] if a square root cannot be taken.
pub fn bet_shares(state: &MarketState, outcome: &Outcome, amount: Amount) -> Result<Shares, DomainError> {
    let root = sqrt(state.square_sum())?;
    let current = state.shares(outcome);
    let grown = sqrt(amount * amount + current * current + Decimal::TWO * amount * root)?;
    Ok(money::max(grown - current, Decimal::ZERO))
}

/// Value released by removing `shares` from `outcome`, before the money
/// ratio and fees.
fn raw_share_value(state: &MarketState, outcome: &Outcome, shares: Shares) -> Result<Amount, DomainError> {
    let square_sum = state.square_sum();
    let current = state.shares(outcome);
    let remaining = money::max(current - shares, Decimal::ZERO);
    let after = square_sum - current * current + remaining * remaining;
    Ok(sqrt(square_sum)? - sqrt(money::max(after, Decimal::ZERO))?)
}

/// Money actually in the pool over the money the share prices imply.
fn money_ratio(contract: &Contract, bet: &Bet, share_value: Amount) -> Decimal {
    let state = &contract.state;
    let prob = outcome_probability(state, contract.outcome_type, &bet.outcome);
    let actual = state.pool_total() - share_value;
    let expected: Amount = state
        .total_bets
        .iter()
        .map(|(outcome, staked)| outcome_probability(state, contract.outcome_type, outcome) * staked)
        .sum::<Amount>()
        - prob * bet.amount;

    if actual <= Decimal::ZERO || expected <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    actual / expected
}

impl MarketMechanism for Dpm {
    fn kind(&self) -> MechanismKind {
        MechanismKind::Dpm
    }

    fn probability(&self, contract: &Contract, outcome: &Outcome) -> Probability {
        outcome_probability(&contract.state, contract.outcome_type, outcome)
    }

    fn apply_bet(
        &self,
        contract: &Contract,
        outcome: &Outcome,
        amount: Amount,
    ) -> Result<BetFill, DomainError> {
        ensure_positive(amount)?;
        let state = &contract.state;
        let shares = bet_shares(state, outcome, amount)?;
        let prob_before = outcome_probability(state, contract.outcome_type, outcome);

        let mut next = state.clone();
        add_to(&mut next.total_shares, outcome, shares);
        add_to(&mut next.total_bets, outcome, amount);
        add_to(&mut next.pool, outcome, amount);
        let prob_after = outcome_probability(&next, contract.outcome_type, outcome);

        Ok(BetFill {
            outcome: outcome.clone(),
            amount,
            shares,
            fees: Fees::ZERO,
            prob_before,
            prob_after,
            state: next,
        })
    }

    fn sell_bet(&self, contract: &Contract, bet: &Bet) -> Result<SaleFill, DomainError> {
        if !bet.is_open() {
            return Err(DomainError::BetNotOpen);
        }
        if bet.shares <= Decimal::ZERO {
            return Err(DomainError::NonPositiveShares { shares: bet.shares });
        }
        let state = &contract.state;
        let outcome = &bet.outcome;
        let available = state.shares(outcome);
        if bet.shares > available {
            return Err(DomainError::InsufficientShares {
                requested: bet.shares,
                available,
            });
        }

        let raw = raw_share_value(state, outcome, bet.shares)?;
        let ratio = money::min(Decimal::ONE, money_ratio(contract, bet, raw));
        let sale_value = money::min(ratio * raw, state.pool(outcome));
        let fees = self
            .rates
            .on_profit(money::max(sale_value - bet.amount, Decimal::ZERO));
        let proceeds = self.rates.deduct(bet.amount, sale_value);

        let prob_before = outcome_probability(state, contract.outcome_type, outcome);
        let mut next = state.clone();
        add_to(&mut next.total_shares, outcome, -bet.shares);
        add_to(&mut next.total_bets, outcome, -bet.amount);
        add_to(&mut next.pool, outcome, -sale_value);
        let prob_after = outcome_probability(&next, contract.outcome_type, outcome);

        Ok(SaleFill {
            outcome: outcome.clone(),
            shares: bet.shares,
            sale_value,
            proceeds,
            fees,
            prob_before,
            prob_after,
            state: next,
        })
    }

    fn settle(
        &self,
        input: &ResolutionInput,
        contract: &Contract,
        bets: &[Bet],
        _liquidity: &[LiquidityProvision],
    ) -> Result<Settlement, DomainError> {
        settlement::dpm::settle(input, contract, bets, self.rates)
    }
}

/// Seed totals for a new binary parimutuel market at `initial_prob`.
///
/// `phantom` shares count toward prices but belong to nobody; the rest of the
/// seed is held by two ante bets from the creator.
///
/// # Errors
///
/// Returns [`DomainError::InvalidProbability`] unless `initial_prob` lies in
/// `(0, 1)`, or [`DomainError::NonPositiveAmount`] for a non-positive ante.
pub fn binary_ante(
    contract: &Contract,
    initial_prob: Probability,
    ante: Amount,
    phantom: Amount,
) -> Result<(MarketState, Vec<Bet>), DomainError> {
    if initial_prob <= Decimal::ZERO || initial_prob >= Decimal::ONE {
        return Err(DomainError::InvalidProbability {
            probability: initial_prob,
        });
    }
    ensure_positive(ante)?;

    let total = ante + money::max(phantom, Decimal::ZERO);
    let shares_yes = sqrt(initial_prob * total * total)?;
    let shares_no = sqrt(money::max(total * total - shares_yes * shares_yes, Decimal::ZERO))?;
    let pool_yes = initial_prob * ante;
    let pool_no = (Decimal::ONE - initial_prob) * ante;
    let phantom_yes = sqrt(initial_prob)? * phantom;
    let phantom_no = sqrt(Decimal::ONE - initial_prob)? * phantom;

    let (yes, no) = (Outcome::yes(), Outcome::no());
    let mut state = MarketState::default();
    add_to(&mut state.total_shares, &yes, shares_yes);
    add_to(&mut state.total_shares, &no, shares_no);
    add_to(&mut state.pool, &yes, pool_yes);
    add_to(&mut state.pool, &no, pool_no);
    add_to(&mut state.total_bets, &yes, pool_yes);
    add_to(&mut state.total_bets, &no, pool_no);
    if phantom > Decimal::ZERO {
        add_to(&mut state.phantom_shares, &yes, phantom_yes);
        add_to(&mut state.phantom_shares, &no, phantom_no);
    }

    let seeded = contract.clone().with_state(state.clone());
    let prob = outcome_probability(&state, contract.outcome_type, &yes);
    let bets = [(yes, pool_yes), (no, pool_no)]
        .into_iter()
        .map(|(outcome, amount)| {
            let shares = state.shares(&outcome) - total_of(&state.phantom_shares, &outcome);
            Bet::new(
                seeded.creator_id.clone(),
                seeded.id.clone(),
                outcome,
                amount,
                shares,
                seeded.created_time,
            )
            .with_probabilities(prob, prob)
            .ante()
        })
        .collect();

    Ok((state, bets))
}

/// Phantom shares per market that opens without an ante.
pub const EMPTY_MARKET_PHANTOM: Amount = Decimal::ONE;

/// Seed totals for a binary parimutuel market that opens with no money.
///
/// Both sides carry unowned phantom shares (`phantom`, or
/// [`EMPTY_MARKET_PHANTOM`] when it is not positive), so no bet or sale can
/// drive the price to 0 or 1. The pool starts empty.
///
/// # Errors
///
/// Returns [`DomainError::InvalidProbability`] unless `initial_prob` lies in
/// `(0, 1)`.
pub fn phantom_seed(initial_prob: Probability, phantom: Amount) -> Result<MarketState, DomainError> {
    if initial_prob <= Decimal::ZERO || initial_prob >= Decimal::ONE {
        return Err(DomainError::InvalidProbability {
            probability: initial_prob,
        });
    }
    let phantom = if phantom > Decimal::ZERO {
        phantom
    } else {
        EMPTY_MARKET_PHANTOM
    };

    let mut state = MarketState::default();
    for (outcome, weight) in [
        (Outcome::yes(), initial_prob),
        (Outcome::no(), Decimal::ONE - initial_prob),
    ] {
        let shares = sqrt(weight)? * phantom;
        add_to(&mut state.total_shares, &outcome, shares);
        add_to(&mut state.phantom_shares, &outcome, shares);
    }
    Ok(state)
}

/// Seed totals for a new free-response market: the whole ante backs answer
/// `0`, the "none of the above" placeholder.
///
/// # Errors
///
/// Returns [`DomainError::NonPositiveAmount`] for a non-positive ante.
pub fn free_response_ante(contract: &Contract, ante: Amount) -> Result<(MarketState, Bet), DomainError> {
    ensure_positive(ante)?;
    let placeholder = Outcome::answer(0);
    let mut state = MarketState::default();
    add_to(&mut state.total_shares, &placeholder, ante);
    add_to(&mut state.total_bets, &placeholder, ante);
    add_to(&mut state.pool, &placeholder, ante);

    let bet = Bet::new(
        contract.creator_id.clone(),
        contract.id.clone(),
        placeholder,
        ante,
        ante,
        contract.created_time,
    )
    .with_probabilities(Decimal::ONE, Decimal::ONE)
    .ante();
    Ok((state, bet))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::id::{ContractId, UserId};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn contract(outcome_type: OutcomeType) -> Contract {
        Contract::new(
            ContractId::new("c1"),
            UserId::new("creator"),
            "?",
            outcome_type,
            MechanismKind::Dpm,
            Utc::now(),
        )
    }

    fn close(a: Decimal, b: Decimal) -> bool {
        (a - b).abs() < dec!(0.000001)
    }

    #[test]
    fn empty_binary_market_is_even() {
        let dpm = Dpm::default();
        assert_eq!(dpm.probability(&contract(OutcomeType::Binary), &Outcome::yes()), dec!(0.5));
    }

    #[test]
    fn empty_free_response_market_is_uniform_over_answers() {
        let mut c = contract(OutcomeType::FreeResponse);
        for answer in 0..4 {
            add_to(&mut c.state.total_shares, &Outcome::answer(answer), Decimal::ZERO);
        }
        let dpm = Dpm::default();
        assert_eq!(dpm.probability(&c, &Outcome::answer(2)), dec!(0.25));
        assert_eq!(dpm.probability(&c, &Outcome::answer(9)), Decimal::ZERO);
    }

    #[test]
    fn free_response_market_without_answers_prices_nothing() {
        let dpm = Dpm::default();
        let c = contract(OutcomeType::FreeResponse);
        assert_eq!(dpm.probability(&c, &Outcome::answer(0)), Decimal::ZERO);
    }

    #[test]
    fn first_bet_on_empty_market_gets_shares_equal_to_amount() {
        let dpm = Dpm::default();
        let fill = dpm
            .apply_bet(&contract(OutcomeType::Binary), &Outcome::yes(), dec!(100))
            .unwrap();
        assert_eq!(fill.shares, dec!(100));
        assert_eq!(fill.prob_before, dec!(0.5));
        assert_eq!(fill.prob_after, Decimal::ONE);
        assert_eq!(fill.state.pool_total(), dec!(100));
        assert_eq!(fill.fees, Fees::ZERO);
    }

    #[test]
    fn bet_moves_probability_toward_outcome() {
        let dpm = Dpm::default();
        let c = contract(OutcomeType::Binary);
        let after_yes = dpm.apply_bet(&c, &Outcome::yes(), dec!(100)).unwrap();
        let c = c.with_state(after_yes.state);
        let fill = dpm.apply_bet(&c, &Outcome::no(), dec!(100)).unwrap();

        assert!(close(fill.shares, sqrt(dec!(30000)).unwrap()));
        assert!(fill.prob_after > fill.prob_before);
        let yes = outcome_probability(&fill.state, OutcomeType::Binary, &Outcome::yes());
        assert!(close(yes, dec!(0.25)));
    }

    #[test]
    fn probabilities_sum_to_one() {
        let dpm = Dpm::default();
        let mut c = contract(OutcomeType::FreeResponse);
        for (answer, amount) in [(1, dec!(30)), (2, dec!(50)), (3, dec!(20))] {
            let fill = dpm.apply_bet(&c, &Outcome::answer(answer), amount).unwrap();
            c = c.with_state(fill.state);
        }
        let total: Decimal = c
            .state
            .total_shares
            .keys()
            .map(|o| dpm.probability(&c, o))
            .sum();
        assert!(close(total, Decimal::ONE));
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let dpm = Dpm::default();
        let err = dpm
            .apply_bet(&contract(OutcomeType::Binary), &Outcome::yes(), Decimal::ZERO)
            .unwrap_err();
        assert_eq!(err, DomainError::NonPositiveAmount { amount: Decimal::ZERO });
    }

    fn seeded(phantom: Amount) -> Contract {
        let state = phantom_seed(dec!(0.5), phantom).unwrap();
        contract(OutcomeType::Binary).with_state(state)
    }

    #[test]
    fn phantom_seed_keeps_prices_strictly_inside_the_unit_interval() {
        let dpm = Dpm::default();
        let c = seeded(Decimal::ZERO);
        assert!(close(dpm.probability(&c, &Outcome::yes()), dec!(0.5)));
        assert_eq!(c.state.pool_total(), Decimal::ZERO);

        let fill = dpm.apply_bet(&c, &Outcome::yes(), dec!(1)).unwrap();
        assert!(fill.prob_after > dec!(0.5) && fill.prob_after < Decimal::ONE);

        let c = c.with_state(fill.state);
        let bet = Bet::new(
            UserId::new("alice"),
            c.id.clone(),
            Outcome::yes(),
            dec!(1),
            fill.shares,
            Utc::now(),
        );
        let sale = dpm.sell_bet(&c, &bet).unwrap();
        assert!(sale.prob_after > Decimal::ZERO && sale.prob_after < Decimal::ONE);
    }

    #[test]
    fn phantom_seed_opens_at_initial_probability() {
        let state = phantom_seed(dec!(0.2), dec!(10)).unwrap();
        let yes = outcome_probability(&state, OutcomeType::Binary, &Outcome::yes());
        assert!(close(yes, dec!(0.2)));
        assert_eq!(state.phantom_shares, state.total_shares);
        assert!(phantom_seed(Decimal::ONE, dec!(10)).is_err());
    }

    #[test]
    fn selling_a_losing_position_returns_its_share_value() {
        let dpm = Dpm::default();
        let c = contract(OutcomeType::Binary);
        let first = dpm.apply_bet(&c, &Outcome::yes(), dec!(100)).unwrap();
        let c = c.with_state(first.state);
        let second = dpm.apply_bet(&c, &Outcome::no(), dec!(100)).unwrap();
        let c = c.with_state(second.state);

        let bet = Bet::new(
            UserId::new("alice"),
            c.id.clone(),
            Outcome::yes(),
            dec!(100),
            dec!(100),
            Utc::now(),
        );
        let sale = dpm.sell_bet(&c, &bet).unwrap();

        let expected = dec!(200) - sqrt(dec!(30000)).unwrap();
        assert!(close(sale.sale_value, expected));
        assert_eq!(sale.proceeds, sale.sale_value);
        assert_eq!(sale.fees, Fees::ZERO);
        assert_eq!(sale.prob_after, Decimal::ZERO);
        assert!(close(sale.state.pool(&Outcome::yes()), dec!(100) - expected));
    }

    #[test]
    fn sold_bets_cannot_be_sold_again() {
        let dpm = Dpm::default();
        let mut bet = Bet::new(
            UserId::new("alice"),
            ContractId::new("c1"),
            Outcome::yes(),
            dec!(10),
            dec!(10),
            Utc::now(),
        );
        bet.is_sold = true;
        assert_eq!(
            dpm.sell_bet(&contract(OutcomeType::Binary), &bet),
            Err(DomainError::BetNotOpen)
        );
    }

    #[test]
    fn binary_ante_starts_at_initial_probability() {
        let c = contract(OutcomeType::Binary);
        let (state, bets) = binary_ante(&c, dec!(0.7), dec!(100), dec!(1)).unwrap();

        let prob = outcome_probability(&state, OutcomeType::Binary, &Outcome::yes());
        assert!(close(prob, dec!(0.7)));
        assert!(close(state.pool_total(), dec!(100)));
        assert_eq!(bets.len(), 2);
        assert!(bets.iter().all(|b| b.is_ante));
        let held: Decimal = bets.iter().map(|b| b.shares).sum();
        let phantom: Decimal = state.phantom_shares.values().copied().sum();
        let issued: Decimal = state.total_shares.values().copied().sum();
        assert!(close(held + phantom, issued));
    }

    #[test]
    fn binary_ante_rejects_degenerate_probability() {
        let c = contract(OutcomeType::Binary);
        assert!(binary_ante(&c, Decimal::ONE, dec!(100), Decimal::ZERO).is_err());
        assert!(binary_ante(&c, Decimal::ZERO, dec!(100), Decimal::ZERO).is_err());
    }

    #[test]
    fn free_response_ante_backs_placeholder_answer() {
        let c = contract(OutcomeType::FreeResponse);
        let (state, bet) = free_response_ante(&c, dec!(50)).unwrap();
        assert_eq!(bet.outcome, Outcome::answer(0));
        assert_eq!(bet.shares, dec!(50));
        assert_eq!(state.pool(&Outcome::answer(0)), dec!(50));
        assert_eq!(
            outcome_probability(&state, OutcomeType::FreeResponse, &Outcome::answer(0)),
            Decimal::ONE
        );
    }
}
