//! Domain errors raised when market invariants are violated.
//!
//! These errors come from the pure pricing and settlement code. Application
//! services wrap them into their own error kinds before they reach a caller.

use rust_decimal::Decimal;
use thiserror::Error;

use super::contract::{MechanismKind, OutcomeType};

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Wagers and liquidity must be strictly positive.
    #[error("amount must be positive, got {amount}")]
    NonPositiveAmount {
        /// The rejected amount.
        amount: Decimal,
    },

    /// Share quantities must be strictly positive.
    #[error("shares must be positive, got {shares}")]
    NonPositiveShares {
        /// The rejected share count.
        shares: Decimal,
    },

    /// The outcome token is not legal for the contract's outcome type.
    #[error("invalid outcome '{outcome}' for {outcome_type} contract")]
    InvalidOutcome {
        /// The rejected token.
        outcome: String,
        /// Outcome type of the contract.
        outcome_type: OutcomeType,
    },

    /// `MKT` and `CANCEL` are resolution tokens and cannot be bet on.
    #[error("'{outcome}' is reserved for resolutions")]
    ReservedOutcome {
        /// The reserved token.
        outcome: String,
    },

    /// Weighted resolutions are malformed.
    #[error("invalid resolutions: {reason}")]
    InvalidResolutions {
        /// What is wrong with them.
        reason: String,
    },

    /// A resolution probability outside `[0, 1]`.
    #[error("probability must be within [0, 1], got {probability}")]
    InvalidProbability {
        /// The rejected probability.
        probability: Decimal,
    },

    /// The mechanism does not support the contract's outcome type.
    #[error("{mechanism} does not support {outcome_type} contracts")]
    UnsupportedOutcomeType {
        /// The mechanism tag.
        mechanism: MechanismKind,
        /// The requested outcome type.
        outcome_type: OutcomeType,
    },

    /// The mechanism does not support the requested operation.
    #[error("{mechanism} does not support {operation}")]
    UnsupportedOperation {
        /// The mechanism tag.
        mechanism: MechanismKind,
        /// The requested operation.
        operation: &'static str,
    },

    /// A sale asked for more shares than are outstanding.
    #[error("cannot sell {requested} shares, only {available} available")]
    InsufficientShares {
        /// Shares requested for sale.
        requested: Decimal,
        /// Shares actually held.
        available: Decimal,
    },

    /// The bet has already been sold or is itself a sale record.
    #[error("bet is not open")]
    BetNotOpen,

    /// The contract already carries a resolution.
    #[error("contract is already resolved")]
    AlreadyResolved,

    /// A pool reserve is empty or negative where a positive one is required.
    #[error("pool is empty")]
    EmptyPool,

    /// A square root or division could not be evaluated.
    #[error("arithmetic failure: {0}")]
    Arithmetic(&'static str),
}
