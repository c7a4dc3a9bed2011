//! Scenario files.
//!
//! A scenario is a snapshot of one contract with its bet and liquidity
//! records, in the same JSON shape the domain types serialize to.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{Bet, Contract, ContractId, LiquidityProvision};
use crate::error::{Error, Result};
use crate::port::MarketStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub contract: Contract,
    #[serde(default)]
    pub bets: Vec<Bet>,
    #[serde(default)]
    pub liquidity: Vec<LiquidityProvision>,
}

impl Scenario {
    /// Parse a scenario from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a record belongs to a
    /// different contract.
    pub fn from_json(content: &str) -> Result<Self> {
        let scenario: Self = serde_json::from_str(content)?;
        let id = &scenario.contract.id;
        let foreign = scenario
            .bets
            .iter()
            .map(|b| &b.contract_id)
            .chain(scenario.liquidity.iter().map(|l| &l.contract_id))
            .find(|contract_id| *contract_id != id);
        if let Some(other) = foreign {
            return Err(Error::Parse(format!(
                "scenario holds a record for contract {other}, expected {id}"
            )));
        }
        Ok(scenario)
    }

    /// Read and parse a scenario file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Insert the scenario into a store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store already holds the contract.
    pub async fn seed(self, store: &dyn MarketStore) -> Result<ContractId> {
        let id = self.contract.id.clone();
        store
            .insert_contract(self.contract, self.bets, self.liquidity)
            .await?;
        Ok(id)
    }
}
