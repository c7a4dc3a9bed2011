//! In-memory market store.
//!
//! Each contract lives in one record behind a single `RwLock`, so every
//! write is applied to the contract and its sub-collections together.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::{Bet, Contract, ContractId, LiquidityProvision, Resolution};
use crate::error::StoreError;
use crate::port::{MarketStore, TradeCommit};

#[derive(Debug, Clone)]
struct Record {
    contract: Contract,
    bets: Vec<Bet>,
    liquidity: Vec<LiquidityProvision>,
}

/// Thread-safe [`MarketStore`] backed by a hash map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<ContractId, Record>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored contracts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

fn not_found(id: &ContractId) -> StoreError {
    StoreError::ContractNotFound {
        contract_id: id.clone(),
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn contract(&self, id: &ContractId) -> Result<Option<Contract>, StoreError> {
        Ok(self.records.read().get(id).map(|r| r.contract.clone()))
    }

    async fn bets(&self, id: &ContractId) -> Result<Vec<Bet>, StoreError> {
        self.records
            .read()
            .get(id)
            .map(|r| r.bets.clone())
            .ok_or_else(|| not_found(id))
    }

    async fn liquidity(&self, id: &ContractId) -> Result<Vec<LiquidityProvision>, StoreError> {
        self.records
            .read()
            .get(id)
            .map(|r| r.liquidity.clone())
            .ok_or_else(|| not_found(id))
    }

    async fn insert_contract(
        &self,
        contract: Contract,
        bets: Vec<Bet>,
        liquidity: Vec<LiquidityProvision>,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write();
        if records.contains_key(&contract.id) {
            return Err(StoreError::ContractExists {
                contract_id: contract.id,
            });
        }
        records.insert(
            contract.id.clone(),
            Record {
                contract,
                bets,
                liquidity,
            },
        );
        Ok(())
    }

    async fn commit_trade(
        &self,
        id: &ContractId,
        expected_revision: u64,
        commit: TradeCommit,
    ) -> Result<Contract, StoreError> {
        let mut records = self.records.write();
        let record = records.get_mut(id).ok_or_else(|| not_found(id))?;

        if record.contract.is_resolved() {
            return Err(StoreError::AlreadyResolved {
                contract_id: id.clone(),
            });
        }
        if record.contract.revision != expected_revision {
            return Err(StoreError::RevisionConflict {
                contract_id: id.clone(),
                expected: expected_revision,
                actual: record.contract.revision,
            });
        }
        if let Some(sold) = &commit.sold_bet {
            let bet = record
                .bets
                .iter_mut()
                .find(|b| b.id == *sold)
                .ok_or_else(|| StoreError::BetNotFound {
                    bet_id: sold.clone(),
                })?;
            bet.is_sold = true;
        }

        record.contract.state = commit.state;
        record.contract.revision += 1;
        record.bets.extend(commit.bets);
        record.liquidity.extend(commit.liquidity);
        Ok(record.contract.clone())
    }

    async fn resolve_if_open(
        &self,
        id: &ContractId,
        expected_revision: u64,
        resolution: Resolution,
    ) -> Result<Contract, StoreError> {
        let mut records = self.records.write();
        let record = records.get_mut(id).ok_or_else(|| not_found(id))?;
        if record.contract.is_resolved() {
            return Err(StoreError::AlreadyResolved {
                contract_id: id.clone(),
            });
        }
        if record.contract.revision != expected_revision {
            return Err(StoreError::RevisionConflict {
                contract_id: id.clone(),
                expected: expected_revision,
                actual: record.contract.revision,
            });
        }
        record
            .contract
            .mark_resolved(resolution)
            .map_err(|_| StoreError::AlreadyResolved {
                contract_id: id.clone(),
            })?;
        Ok(record.contract.clone())
    }
}
