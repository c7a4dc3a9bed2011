//! Resolution use case surface.
//!
//! [`ResolveRequest`] and [`ResolveResponse`] are the wire shapes a driver
//! (HTTP handler, CLI) exchanges with the resolver.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Contract, ContractId, LoanLedger, PayoutLedger, Settlement, UserId};
use crate::error::ResolveError;

/// A request to resolve one contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    /// `YES`, `NO`, `MKT`, `CANCEL` or a free-response answer id.
    pub outcome: String,
    pub contract_id: ContractId,
    /// Binary MKT probability as a percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability_int: Option<f64>,
    /// Free-response MKT weights by answer id. Need not be normalised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolutions: Option<BTreeMap<String, f64>>,
}

impl ResolveRequest {
    pub fn new(contract_id: ContractId, outcome: impl Into<String>) -> Self {
        Self {
            outcome: outcome.into(),
            contract_id,
            probability_int: None,
            resolutions: None,
        }
    }

    #[must_use]
    pub fn with_probability_int(mut self, probability_int: f64) -> Self {
        self.probability_int = Some(probability_int);
        self
    }

    #[must_use]
    pub fn with_resolutions(mut self, resolutions: BTreeMap<String, f64>) -> Self {
        self.resolutions = Some(resolutions);
        self
    }
}

/// Wire result of a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ResolveResponse {
    Success,
    Error { message: String },
}

impl<T> From<&Result<T, ResolveError>> for ResolveResponse {
    fn from(result: &Result<T, ResolveError>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(err) => Self::Error {
                message: err.to_string(),
            },
        }
    }
}

/// What a successful resolution did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    /// The contract as written by the resolution.
    pub contract: Contract,
    /// Profit payouts before loans.
    pub settlement: Settlement,
    /// Loans clawed back.
    pub loans: LoanLedger,
    /// Final per-user balance deltas (profit plus claw-back).
    pub ledger: PayoutLedger,
}

/// Inbound port implemented by the resolver.
#[async_trait]
pub trait ResolutionService: Send + Sync {
    /// Resolve a contract on behalf of `caller`.
    async fn resolve(
        &self,
        caller: Option<&UserId>,
        request: ResolveRequest,
    ) -> Result<ResolutionReport, ResolveError>;

    /// Re-send credits that failed during an earlier resolution of
    /// `contract_id`.
    async fn retry_payments(&self, contract_id: &ContractId) -> Result<(), ResolveError>;
}
