//! Bet execution.
//!
//! [`TradingService`] loads a contract, prices the trade with the
//! contract's mechanism and commits the bet together with the new market
//! state. Writes to one contract are serialized by a per-contract async lock
//! and the store's revision check rejects anything that slips past it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::error::DomainError;
use crate::domain::mechanism::{self, cpmm, dpm, MarketMechanism};
use crate::domain::{
    Amount, Bet, BetId, Contract, ContractId, FeeSchedule, Fees, LiquidityProvision, LoanPolicy,
    MarketState, MechanismKind, Outcome, OutcomeType, Probability, Sale, Shares, UserId,
};
use crate::error::TradeError;
use crate::port::{BetEvent, Event, MarketStore, Notifier, TradeCommit};

/// Parameters for a new market.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMarket {
    pub id: ContractId,
    pub creator_id: UserId,
    pub question: String,
    pub outcome_type: OutcomeType,
    pub mechanism: MechanismKind,
    /// Creator's seed money. Zero opens a parimutuel market with an empty
    /// pool, priced by phantom shares alone when binary.
    pub ante: Amount,
    /// Opening YES probability of a binary parimutuel market.
    pub initial_prob: Probability,
    /// Unowned seed shares that soften early parimutuel prices.
    pub phantom: Amount,
    pub close_time: Option<DateTime<Utc>>,
}

impl NewMarket {
    pub fn binary(
        creator_id: UserId,
        question: impl Into<String>,
        mechanism: MechanismKind,
        ante: Amount,
    ) -> Self {
        Self {
            id: ContractId::generate(),
            creator_id,
            question: question.into(),
            outcome_type: OutcomeType::Binary,
            mechanism,
            ante,
            initial_prob: dec!(0.5),
            phantom: Decimal::ZERO,
            close_time: None,
        }
    }

    pub fn free_response(creator_id: UserId, question: impl Into<String>, ante: Amount) -> Self {
        Self {
            outcome_type: OutcomeType::FreeResponse,
            ..Self::binary(creator_id, question, MechanismKind::Dpm, ante)
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: ContractId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn with_initial_prob(mut self, initial_prob: Probability) -> Self {
        self.initial_prob = initial_prob;
        self
    }

    #[must_use]
    pub fn with_phantom(mut self, phantom: Amount) -> Self {
        self.phantom = phantom;
        self
    }

    #[must_use]
    pub fn with_close_time(mut self, close_time: DateTime<Utc>) -> Self {
        self.close_time = Some(close_time);
        self
    }
}

/// Price preview for a hypothetical bet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub outcome: Outcome,
    pub amount: Amount,
    pub prob_before: Probability,
    pub prob_after: Probability,
    pub shares: Shares,
}

/// Result of a committed bet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetReceipt {
    pub bet: Bet,
    pub contract: Contract,
    pub prob_after: Probability,
    /// House-funded part of the wager.
    pub loan: Amount,
    /// What the caller must take from the user's balance.
    pub debit: Amount,
}

/// Result of a committed sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleReceipt {
    /// The sale record written.
    pub sale: Bet,
    pub contract: Contract,
    /// What the caller must credit to the user's balance.
    pub proceeds: Amount,
    pub fees: Fees,
    pub prob_after: Probability,
}

/// Result of a committed liquidity provision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidityReceipt {
    pub provision: LiquidityProvision,
    pub contract: Contract,
}

/// Places bets, sales and liquidity against stored contracts.
pub struct TradingService {
    store: Arc<dyn MarketStore>,
    notifier: Arc<dyn Notifier>,
    fees: FeeSchedule,
    loans: LoanPolicy,
    locks: DashMap<ContractId, Arc<Mutex<()>>>,
}

impl TradingService {
    pub fn new(store: Arc<dyn MarketStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            fees: FeeSchedule::default(),
            loans: LoanPolicy::default(),
            locks: DashMap::new(),
        }
    }

    #[must_use]
    pub fn with_fees(mut self, fees: FeeSchedule) -> Self {
        self.fees = fees;
        self
    }

    #[must_use]
    pub fn with_loan_policy(mut self, loans: LoanPolicy) -> Self {
        self.loans = loans;
        self
    }

    fn mechanism(&self, kind: MechanismKind) -> Box<dyn MarketMechanism> {
        mechanism::for_kind(kind, &self.fees)
    }

    fn lock_for(&self, contract_id: &ContractId) -> Arc<Mutex<()>> {
        self.locks.entry(contract_id.clone()).or_default().clone()
    }

    async fn load(&self, contract_id: &ContractId) -> Result<Contract, TradeError> {
        self.store
            .contract(contract_id)
            .await?
            .ok_or_else(|| TradeError::ContractNotFound {
                contract_id: contract_id.clone(),
            })
    }

    /// Create a contract and its seed records.
    ///
    /// # Errors
    ///
    /// Fails for a negative ante, an opening probability outside `(0, 1)`, a
    /// free-response constant-product market, or a taken id.
    pub async fn create_market(&self, market: NewMarket) -> Result<Contract, TradeError> {
        if market.ante < Decimal::ZERO {
            return Err(TradeError::NonPositiveAmount {
                amount: market.ante,
            });
        }

        let mut contract = Contract::new(
            market.id,
            market.creator_id,
            market.question,
            market.outcome_type,
            market.mechanism,
            Utc::now(),
        );
        if let Some(close_time) = market.close_time {
            contract = contract.with_close_time(close_time);
        }

        let (state, bets, liquidity) = match (market.mechanism, market.outcome_type) {
            (MechanismKind::Dpm, OutcomeType::Binary) if market.ante.is_zero() => {
                let state = dpm::phantom_seed(market.initial_prob, market.phantom)?;
                (state, Vec::new(), Vec::new())
            }
            (MechanismKind::Dpm, OutcomeType::FreeResponse) if market.ante.is_zero() => {
                (MarketState::default(), Vec::new(), Vec::new())
            }
            (MechanismKind::Dpm, OutcomeType::Binary) => {
                let (state, bets) =
                    dpm::binary_ante(&contract, market.initial_prob, market.ante, market.phantom)?;
                (state, bets, Vec::new())
            }
            (MechanismKind::Dpm, OutcomeType::FreeResponse) => {
                let (state, bet) = dpm::free_response_ante(&contract, market.ante)?;
                (state, vec![bet], Vec::new())
            }
            (MechanismKind::Cpmm, _) => {
                let (state, provision) = cpmm::ante(&contract, market.ante)?;
                (state, Vec::new(), vec![provision])
            }
        };

        let contract = contract.with_state(state);
        self.store
            .insert_contract(contract.clone(), bets, liquidity)
            .await?;
        info!(
            contract_id = %contract.id,
            mechanism = %contract.mechanism,
            outcome_type = %contract.outcome_type,
            ante = %market.ante,
            "Market created"
        );
        Ok(contract)
    }

    /// Preview a bet without writing anything.
    ///
    /// # Errors
    ///
    /// Fails if the contract is missing, the outcome is not legal for it or
    /// the amount is negative.
    pub async fn quote(
        &self,
        contract_id: &ContractId,
        outcome: &str,
        amount: Amount,
    ) -> Result<Quote, TradeError> {
        let contract = self.load(contract_id).await?;
        quote(&contract, &self.fees, outcome, amount)
    }

    /// Place a bet of `amount` on `outcome`.
    ///
    /// # Errors
    ///
    /// Checked in order: contract exists, amount positive, outcome legal,
    /// contract unresolved, contract not closed. Nothing is written on error.
    pub async fn place_bet(
        &self,
        user_id: &UserId,
        contract_id: &ContractId,
        outcome: &str,
        amount: Amount,
    ) -> Result<BetReceipt, TradeError> {
        let lock = self.lock_for(contract_id);
        let _guard = lock.lock().await;

        let contract = self.load(contract_id).await?;
        if amount <= Decimal::ZERO {
            return Err(TradeError::NonPositiveAmount { amount });
        }
        let outcome = Outcome::parse_bet(outcome, contract.outcome_type)?;
        let now = Utc::now();
        ensure_open(&contract, now)?;

        let fill = self.mechanism(contract.mechanism).apply_bet(&contract, &outcome, amount)?;
        let bets = self.store.bets(contract_id).await?;
        let loan = self
            .loans
            .loan_for(bets.iter().filter(|b| b.user_id == *user_id), amount);

        let bet = Bet::new(
            user_id.clone(),
            contract_id.clone(),
            outcome.clone(),
            amount,
            fill.shares,
            now,
        )
        .with_loan(loan)
        .with_probabilities(fill.prob_before, fill.prob_after)
        .with_fees(fill.fees);

        let updated = self
            .store
            .commit_trade(
                contract_id,
                contract.revision,
                TradeCommit::new(fill.state).with_bet(bet.clone()),
            )
            .await?;

        info!(
            contract_id = %contract_id,
            user_id = %user_id,
            outcome = %outcome,
            amount = %amount,
            shares = %fill.shares,
            loan = %loan,
            prob_after = %fill.prob_after,
            "Bet placed"
        );
        self.notifier.notify(Event::BetPlaced(BetEvent {
            contract_id: contract_id.clone(),
            user_id: user_id.clone(),
            outcome,
            amount,
            shares: fill.shares,
            prob_after: fill.prob_after,
        }));

        Ok(BetReceipt {
            bet,
            contract: updated,
            prob_after: fill.prob_after,
            loan,
            debit: amount - loan,
        })
    }

    /// Sell a whole parimutuel bet back to the market.
    ///
    /// # Errors
    ///
    /// Fails if the bet is missing, owned by someone else, already sold, or
    /// the contract no longer trades.
    pub async fn sell_bet(
        &self,
        user_id: &UserId,
        contract_id: &ContractId,
        bet_id: &BetId,
    ) -> Result<SaleReceipt, TradeError> {
        let lock = self.lock_for(contract_id);
        let _guard = lock.lock().await;

        let contract = self.load(contract_id).await?;
        let now = Utc::now();
        ensure_open(&contract, now)?;

        let bets = self.store.bets(contract_id).await?;
        let bet = bets
            .iter()
            .find(|b| b.id == *bet_id)
            .ok_or_else(|| TradeError::BetNotFound {
                bet_id: bet_id.clone(),
            })?;
        if bet.user_id != *user_id {
            return Err(TradeError::NotBetOwner {
                bet_id: bet_id.clone(),
            });
        }

        let fill = self.mechanism(contract.mechanism).sell_bet(&contract, bet)?;
        let sale = Bet::new(
            user_id.clone(),
            contract_id.clone(),
            fill.outcome.clone(),
            -fill.sale_value,
            -fill.shares,
            now,
        )
        .with_probabilities(fill.prob_before, fill.prob_after)
        .with_fees(fill.fees);
        let sale = Bet {
            sale: Some(Sale {
                amount: fill.proceeds,
                bet_id: bet_id.clone(),
            }),
            ..sale
        };

        let updated = self
            .store
            .commit_trade(
                contract_id,
                contract.revision,
                TradeCommit::new(fill.state)
                    .with_bet(sale.clone())
                    .with_sold_bet(bet_id.clone()),
            )
            .await?;

        info!(
            contract_id = %contract_id,
            user_id = %user_id,
            bet_id = %bet_id,
            proceeds = %fill.proceeds,
            "Bet sold"
        );
        Ok(SaleReceipt {
            sale,
            contract: updated,
            proceeds: fill.proceeds,
            fees: fill.fees,
            prob_after: fill.prob_after,
        })
    }

    /// Sell `shares` of `outcome` back to a constant-product pool.
    ///
    /// # Errors
    ///
    /// Fails if the user holds fewer shares than requested or the contract
    /// no longer trades.
    pub async fn sell_shares(
        &self,
        user_id: &UserId,
        contract_id: &ContractId,
        outcome: &str,
        shares: Shares,
    ) -> Result<SaleReceipt, TradeError> {
        let lock = self.lock_for(contract_id);
        let _guard = lock.lock().await;

        let contract = self.load(contract_id).await?;
        if shares <= Decimal::ZERO {
            return Err(TradeError::Engine(DomainError::NonPositiveShares { shares }));
        }
        let outcome = Outcome::parse_bet(outcome, contract.outcome_type)?;
        let now = Utc::now();
        ensure_open(&contract, now)?;

        let bets = self.store.bets(contract_id).await?;
        let held: Shares = bets
            .iter()
            .filter(|b| b.user_id == *user_id && b.outcome == outcome)
            .map(|b| b.shares)
            .sum();
        if shares > held {
            return Err(TradeError::InsufficientShares {
                requested: shares,
                available: held,
            });
        }

        let fill = self
            .mechanism(contract.mechanism)
            .sell_shares(&contract, &outcome, shares)?;
        let sale = Bet::new(
            user_id.clone(),
            contract_id.clone(),
            outcome,
            -fill.proceeds,
            -fill.shares,
            now,
        )
        .with_probabilities(fill.prob_before, fill.prob_after)
        .with_fees(fill.fees);

        let updated = self
            .store
            .commit_trade(
                contract_id,
                contract.revision,
                TradeCommit::new(fill.state).with_bet(sale.clone()),
            )
            .await?;

        info!(
            contract_id = %contract_id,
            user_id = %user_id,
            shares = %shares,
            proceeds = %fill.proceeds,
            "Shares sold"
        );
        Ok(SaleReceipt {
            sale,
            contract: updated,
            proceeds: fill.proceeds,
            fees: fill.fees,
            prob_after: fill.prob_after,
        })
    }

    /// Add `amount` of liquidity to a constant-product pool.
    ///
    /// # Errors
    ///
    /// Fails for non-positive amounts, parimutuel contracts, or a contract
    /// that no longer trades.
    pub async fn add_liquidity(
        &self,
        user_id: &UserId,
        contract_id: &ContractId,
        amount: Amount,
    ) -> Result<LiquidityReceipt, TradeError> {
        let lock = self.lock_for(contract_id);
        let _guard = lock.lock().await;

        let contract = self.load(contract_id).await?;
        if amount <= Decimal::ZERO {
            return Err(TradeError::NonPositiveAmount { amount });
        }
        let now = Utc::now();
        ensure_open(&contract, now)?;

        let fill = self
            .mechanism(contract.mechanism)
            .add_liquidity(&contract, amount)?;
        let provision = LiquidityProvision::new(
            user_id.clone(),
            contract_id.clone(),
            amount,
            fill.liquidity,
            now,
        );

        let updated = self
            .store
            .commit_trade(
                contract_id,
                contract.revision,
                TradeCommit::new(fill.state).with_liquidity(provision.clone()),
            )
            .await?;

        debug!(
            contract_id = %contract_id,
            user_id = %user_id,
            amount = %amount,
            liquidity = %fill.liquidity,
            "Liquidity added"
        );
        Ok(LiquidityReceipt {
            provision,
            contract: updated,
        })
    }
}

fn ensure_open(contract: &Contract, now: DateTime<Utc>) -> Result<(), TradeError> {
    if contract.is_resolved() {
        return Err(TradeError::AlreadyResolved {
            contract_id: contract.id.clone(),
        });
    }
    if let Some(close_time) = contract.close_time.filter(|_| contract.is_closed_at(now)) {
        return Err(TradeError::Closed {
            contract_id: contract.id.clone(),
            close_time,
        });
    }
    Ok(())
}

/// Preview a bet on an already loaded contract.
///
/// # Errors
///
/// Fails for an illegal outcome or a negative amount.
pub fn quote(
    contract: &Contract,
    fees: &FeeSchedule,
    outcome: &str,
    amount: Amount,
) -> Result<Quote, TradeError> {
    if amount < Decimal::ZERO {
        return Err(TradeError::NonPositiveAmount { amount });
    }
    let outcome = Outcome::parse_bet(outcome, contract.outcome_type)?;
    let mechanism = mechanism::for_kind(contract.mechanism, fees);
    let prob_before = mechanism.probability(contract, &outcome);
    let prob_after = mechanism.probability_after_bet(contract, &outcome, amount)?;
    let shares = if amount.is_zero() {
        Decimal::ZERO
    } else {
        mechanism.shares_for_bet(contract, &outcome, amount)?
    };
    Ok(Quote {
        outcome,
        amount,
        prob_before,
        prob_after,
        shares,
    })
}
