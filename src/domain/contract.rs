//! Contract (market) aggregate.
//!
//! - [`Contract`] - question, outcome type, mechanism tag and resolution state
//! - [`MarketState`] - the running share, bet and pool totals a mechanism prices from
//! - [`Resolution`] - the fields written together when a contract resolves

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::fees::Fees;
use super::id::{ContractId, UserId};
use super::money::{Amount, Probability, Shares};
use super::outcome::{Outcome, ResolutionOutcome};

/// Per-outcome decimal totals, iterated in outcome order.
pub type OutcomeMap = BTreeMap<Outcome, Decimal>;

/// Read an outcome total, treating a missing entry as zero.
#[must_use]
pub fn total_of(map: &OutcomeMap, outcome: &Outcome) -> Decimal {
    map.get(outcome).copied().unwrap_or(Decimal::ZERO)
}

/// Add `delta` to an outcome total, creating it at zero if absent.
pub fn add_to(map: &mut OutcomeMap, outcome: &Outcome, delta: Decimal) {
    *map.entry(outcome.clone()).or_insert(Decimal::ZERO) += delta;
}

/// Two-outcome or open-ended multi-outcome question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeType {
    Binary,
    FreeResponse,
}

impl fmt::Display for OutcomeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary => write!(f, "BINARY"),
            Self::FreeResponse => write!(f, "FREE_RESPONSE"),
        }
    }
}

/// Market-making mechanism tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MechanismKind {
    /// Dynamic parimutuel.
    #[serde(rename = "dpm-2")]
    Dpm,
    /// Constant-product market maker.
    #[serde(rename = "cpmm-1")]
    Cpmm,
}

impl fmt::Display for MechanismKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dpm => write!(f, "DPM"),
            Self::Cpmm => write!(f, "CPMM"),
        }
    }
}

/// Running totals owned by a contract.
///
/// For DPM, `pool` holds the money staked on each outcome. For CPMM, `pool`
/// holds the YES/NO reserves and `total_shares` the shares held by bettors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketState {
    #[serde(default)]
    pub total_shares: OutcomeMap,
    #[serde(default)]
    pub total_bets: OutcomeMap,
    #[serde(default)]
    pub pool: OutcomeMap,
    /// Parimutuel seed shares that belong to no bettor.
    #[serde(default)]
    pub phantom_shares: OutcomeMap,
    /// CPMM liquidity units issued to providers.
    #[serde(default)]
    pub total_liquidity: Decimal,
    /// Bet-time fees accrued so far.
    #[serde(default)]
    pub collected_fees: Fees,
}

impl MarketState {
    #[must_use]
    pub fn shares(&self, outcome: &Outcome) -> Shares {
        total_of(&self.total_shares, outcome)
    }

    #[must_use]
    pub fn pool(&self, outcome: &Outcome) -> Amount {
        total_of(&self.pool, outcome)
    }

    /// Sum over all pool entries.
    #[must_use]
    pub fn pool_total(&self) -> Amount {
        self.pool.values().copied().sum()
    }

    /// Sum of squared share totals, the parimutuel "value" of the market.
    #[must_use]
    pub fn square_sum(&self) -> Decimal {
        self.total_shares.values().map(|s| s * s).sum()
    }
}

/// Resolution fields, set together exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub outcome: ResolutionOutcome,
    pub resolution_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_probability: Option<Probability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolutions: Option<OutcomeMap>,
    pub collected_fees: Fees,
}

/// A prediction market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub creator_id: UserId,
    pub question: String,
    pub outcome_type: OutcomeType,
    pub mechanism: MechanismKind,
    #[serde(default)]
    pub state: MarketState,
    pub created_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    /// Incremented on every committed write; used for conditional updates.
    #[serde(default)]
    pub revision: u64,
}

impl Contract {
    /// Create an unresolved contract with empty totals.
    pub fn new(
        id: ContractId,
        creator_id: UserId,
        question: impl Into<String>,
        outcome_type: OutcomeType,
        mechanism: MechanismKind,
        created_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            creator_id,
            question: question.into(),
            outcome_type,
            mechanism,
            state: MarketState::default(),
            created_time,
            close_time: None,
            resolution: None,
            revision: 0,
        }
    }

    /// Set the close time.
    #[must_use]
    pub fn with_close_time(mut self, close_time: DateTime<Utc>) -> Self {
        self.close_time = Some(close_time);
        self
    }

    /// Replace the running totals.
    #[must_use]
    pub fn with_state(mut self, state: MarketState) -> Self {
        self.state = state;
        self
    }

    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    /// True when trading has closed as of `now`.
    #[must_use]
    pub fn is_closed_at(&self, now: DateTime<Utc>) -> bool {
        self.close_time.is_some_and(|close| now > close)
    }

    /// Close time after a resolution at `resolution_time`.
    #[must_use]
    pub fn frozen_close_time(&self, resolution_time: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.close_time.map(|close| close.min(resolution_time))
    }

    /// Apply a resolution, freezing the close time in the same step.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::AlreadyResolved`] if a resolution is already set.
    pub fn mark_resolved(&mut self, resolution: Resolution) -> Result<(), DomainError> {
        if self.is_resolved() {
            return Err(DomainError::AlreadyResolved);
        }
        self.close_time = self.frozen_close_time(resolution.resolution_time);
        self.resolution = Some(resolution);
        self.revision += 1;
        Ok(())
    }
}
