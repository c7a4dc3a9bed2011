use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::error::DomainError;
use crate::domain::{BetId, ContractId, UserId};

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Market store failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("contract {contract_id} not found")]
    ContractNotFound { contract_id: ContractId },

    #[error("contract {contract_id} already exists")]
    ContractExists { contract_id: ContractId },

    #[error("contract {contract_id} is already resolved")]
    AlreadyResolved { contract_id: ContractId },

    #[error("contract {contract_id} changed: expected revision {expected}, found {actual}")]
    RevisionConflict {
        contract_id: ContractId,
        expected: u64,
        actual: u64,
    },

    #[error("bet {bet_id} not found")]
    BetNotFound { bet_id: BetId },

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Balance ledger failures. All of them are retriable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("credit to {user_id} rejected: {reason}")]
    Rejected { user_id: UserId, reason: String },
}

/// Bet execution failures. Nothing is written when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TradeError {
    #[error("contract {contract_id} not found")]
    ContractNotFound { contract_id: ContractId },

    #[error("amount must be positive, got {amount}")]
    NonPositiveAmount { amount: Decimal },

    #[error("invalid outcome '{outcome}': {reason}")]
    InvalidOutcome { outcome: String, reason: String },

    #[error("'{outcome}' is a resolution-only token")]
    ReservedOutcome { outcome: String },

    #[error("contract {contract_id} is already resolved")]
    AlreadyResolved { contract_id: ContractId },

    #[error("contract {contract_id} closed at {close_time}")]
    Closed {
        contract_id: ContractId,
        close_time: DateTime<Utc>,
    },

    #[error("bet {bet_id} not found on contract")]
    BetNotFound { bet_id: BetId },

    #[error("bet {bet_id} belongs to another user")]
    NotBetOwner { bet_id: BetId },

    #[error("cannot sell {requested} shares, only {available} held")]
    InsufficientShares { requested: Decimal, available: Decimal },

    #[error("market engine rejected trade: {0}")]
    Engine(DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DomainError> for TradeError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NonPositiveAmount { amount } => Self::NonPositiveAmount { amount },
            DomainError::InvalidOutcome { outcome, .. } => Self::InvalidOutcome {
                reason: outcome_reason(&outcome),
                outcome,
            },
            DomainError::ReservedOutcome { outcome } => Self::ReservedOutcome { outcome },
            DomainError::InsufficientShares {
                requested,
                available,
            } => Self::InsufficientShares {
                requested,
                available,
            },
            other => Self::Engine(other),
        }
    }
}

fn outcome_reason(outcome: &str) -> String {
    format!("'{outcome}' is not an outcome of this contract")
}

/// Resolution failures.
///
/// Everything up to [`ResolveError::AlreadyResolved`] is detected before any
/// write. [`ResolveError::PartialPayoutFailure`] means the contract *is*
/// resolved and only the listed credits still need to be retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error("caller is not authenticated")]
    NotAuthorized,

    #[error("contract {contract_id} does not exist")]
    InvalidContract { contract_id: ContractId },

    #[error("invalid outcome '{outcome}': {reason}")]
    InvalidOutcome { outcome: String, reason: String },

    #[error("invalid probability {value}: must be a finite number within [0, 100]")]
    InvalidProbability { value: String },

    #[error("user {user_id} is not the creator of contract {contract_id}")]
    NotCreator {
        contract_id: ContractId,
        user_id: UserId,
    },

    #[error("contract {contract_id} is already resolved")]
    AlreadyResolved { contract_id: ContractId },

    #[error("contract {contract_id} resolved but {} payment(s) failed", failed_users.len())]
    PartialPayoutFailure {
        contract_id: ContractId,
        failed_users: Vec<UserId>,
    },

    #[error("payout engine failed: {0}")]
    Engine(DomainError),

    #[error(transparent)]
    Store(StoreError),
}

impl ResolveError {
    /// True for failures detected before anything was written.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NotAuthorized
                | Self::InvalidContract { .. }
                | Self::InvalidOutcome { .. }
                | Self::InvalidProbability { .. }
                | Self::NotCreator { .. }
                | Self::AlreadyResolved { .. }
        )
    }
}

impl From<StoreError> for ResolveError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ContractNotFound { contract_id } => Self::InvalidContract { contract_id },
            StoreError::AlreadyResolved { contract_id } => Self::AlreadyResolved { contract_id },
            other => Self::Store(other),
        }
    }
}

/// Crate-level error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Trade(#[from] TradeError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
