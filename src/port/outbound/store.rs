//! Market store port.
//!
//! Contracts are the unit of consistency: every write names the contract and
//! either happens entirely or not at all.

use async_trait::async_trait;

use crate::domain::{Bet, BetId, Contract, ContractId, LiquidityProvision, MarketState, Resolution};
use crate::error::StoreError;

/// Everything one trade writes, committed together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradeCommit {
    /// New running totals for the contract.
    pub state: MarketState,
    /// Bet records to append (a bet, or a sale record).
    pub bets: Vec<Bet>,
    /// Existing bet to flag as sold.
    pub sold_bet: Option<BetId>,
    /// Liquidity provision to append.
    pub liquidity: Option<LiquidityProvision>,
}

impl TradeCommit {
    #[must_use]
    pub fn new(state: MarketState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_bet(mut self, bet: Bet) -> Self {
        self.bets.push(bet);
        self
    }

    #[must_use]
    pub fn with_sold_bet(mut self, bet_id: BetId) -> Self {
        self.sold_bet = Some(bet_id);
        self
    }

    #[must_use]
    pub fn with_liquidity(mut self, provision: LiquidityProvision) -> Self {
        self.liquidity = Some(provision);
        self
    }
}

/// Persistence for contracts and their bet and liquidity sub-collections.
#[async_trait]
pub trait MarketStore: Send + Sync {
    /// Fetch a contract by id.
    async fn contract(&self, id: &ContractId) -> Result<Option<Contract>, StoreError>;

    /// All bet records of a contract, in creation order.
    async fn bets(&self, id: &ContractId) -> Result<Vec<Bet>, StoreError>;

    /// All liquidity provisions of a contract, in creation order.
    async fn liquidity(&self, id: &ContractId) -> Result<Vec<LiquidityProvision>, StoreError>;

    /// Create a contract together with its seed records.
    ///
    /// Fails with [`StoreError::ContractExists`] if the id is taken.
    async fn insert_contract(
        &self,
        contract: Contract,
        bets: Vec<Bet>,
        liquidity: Vec<LiquidityProvision>,
    ) -> Result<(), StoreError>;

    /// Apply a trade if the contract is still at `expected_revision` and
    /// unresolved. Returns the updated contract.
    async fn commit_trade(
        &self,
        id: &ContractId,
        expected_revision: u64,
        commit: TradeCommit,
    ) -> Result<Contract, StoreError>;

    /// Set the resolution only if the contract is still open and at
    /// `expected_revision`.
    ///
    /// This is the single `OPEN -> RESOLVED` transition. A loser of a
    /// concurrent race gets [`StoreError::AlreadyResolved`]; a trade committed
    /// since the settlement was computed gives [`StoreError::RevisionConflict`].
    async fn resolve_if_open(
        &self,
        id: &ContractId,
        expected_revision: u64,
        resolution: Resolution,
    ) -> Result<Contract, StoreError>;
}
