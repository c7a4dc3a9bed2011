//! Outcome tokens for bets and resolutions.
//!
//! - [`Outcome`] - something a bet can be placed on: `YES`, `NO` or a
//!   free-response answer id
//! - [`ResolutionOutcome`] - how a contract resolves, which adds the
//!   resolution-only tokens `MKT` and `CANCEL`

use std::fmt;

use serde::{Deserialize, Serialize};

use super::contract::OutcomeType;
use super::error::DomainError;

/// Binary YES token.
pub const YES: &str = "YES";
/// Binary NO token.
pub const NO: &str = "NO";
/// Resolve at market (probabilistic or weighted split).
pub const MKT: &str = "MKT";
/// Cancel and refund.
pub const CANCEL: &str = "CANCEL";

/// A bettable outcome.
///
/// Ordered so that share maps iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct Outcome(String);

impl Outcome {
    /// The binary YES outcome.
    #[must_use]
    pub fn yes() -> Self {
        Self(YES.to_string())
    }

    /// The binary NO outcome.
    #[must_use]
    pub fn no() -> Self {
        Self(NO.to_string())
    }

    /// A free-response answer outcome.
    #[must_use]
    pub fn answer(id: impl fmt::Display) -> Self {
        Self(id.to_string())
    }

    /// Get the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_yes(&self) -> bool {
        self.0 == YES
    }

    #[must_use]
    pub fn is_no(&self) -> bool {
        self.0 == NO
    }

    /// The other side of a binary outcome.
    #[must_use]
    pub fn opposite(&self) -> Option<Self> {
        match self.0.as_str() {
            YES => Some(Self::no()),
            NO => Some(Self::yes()),
            _ => None,
        }
    }

    /// Parse a bet token for a contract of the given outcome type.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ReservedOutcome`] for `MKT`/`CANCEL` and
    /// [`DomainError::InvalidOutcome`] for anything else that is not legal.
    pub fn parse_bet(token: &str, outcome_type: OutcomeType) -> Result<Self, DomainError> {
        if token == MKT || token == CANCEL {
            return Err(DomainError::ReservedOutcome {
                outcome: token.to_string(),
            });
        }

        let parsed = match outcome_type {
            OutcomeType::Binary if token == YES || token == NO => Some(Self(token.to_string())),
            OutcomeType::Binary => None,
            OutcomeType::FreeResponse => answer_id(token).map(Self::answer),
        };
        parsed.ok_or_else(|| DomainError::InvalidOutcome {
            outcome: token.to_string(),
            outcome_type,
        })
    }
}

impl From<String> for Outcome {
    /// Answer ids are stored in canonical form, so `"01"` and `"1"` name the
    /// same answer.
    fn from(token: String) -> Self {
        match answer_id(&token) {
            Some(id) => Self::answer(id),
            None => Self(token),
        }
    }
}

impl From<Outcome> for String {
    fn from(outcome: Outcome) -> Self {
        outcome.0
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Free-response answers are numbered; leading zeros are not significant.
fn answer_id(token: &str) -> Option<u64> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Final outcome of a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ResolutionOutcome {
    /// Binary YES.
    Yes,
    /// Binary NO.
    No,
    /// A specific free-response answer won.
    Answer(Outcome),
    /// Resolve at market: binary at a probability, free response by weights.
    Mkt,
    /// Refund everything.
    Cancel,
}

impl ResolutionOutcome {
    /// Parse a resolution token for a contract of the given outcome type.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidOutcome`] when the token is not legal for
    /// the outcome type.
    pub fn parse(token: &str, outcome_type: OutcomeType) -> Result<Self, DomainError> {
        let parsed = match (token, outcome_type) {
            (MKT, _) => Some(Self::Mkt),
            (CANCEL, _) => Some(Self::Cancel),
            (YES, OutcomeType::Binary) => Some(Self::Yes),
            (NO, OutcomeType::Binary) => Some(Self::No),
            (answer, OutcomeType::FreeResponse) => {
                answer_id(answer).map(|id| Self::Answer(Outcome::answer(id)))
            }
            _ => None,
        };

        parsed.ok_or_else(|| DomainError::InvalidOutcome {
            outcome: token.to_string(),
            outcome_type,
        })
    }

    /// The wire token for this resolution.
    #[must_use]
    pub fn token(&self) -> &str {
        match self {
            Self::Yes => YES,
            Self::No => NO,
            Self::Answer(outcome) => outcome.as_str(),
            Self::Mkt => MKT,
            Self::Cancel => CANCEL,
        }
    }

    /// The single winning outcome, for full resolutions.
    #[must_use]
    pub fn winning_outcome(&self) -> Option<Outcome> {
        match self {
            Self::Yes => Some(Outcome::yes()),
            Self::No => Some(Outcome::no()),
            Self::Answer(outcome) => Some(outcome.clone()),
            Self::Mkt | Self::Cancel => None,
        }
    }
}

impl fmt::Display for ResolutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

impl From<ResolutionOutcome> for String {
    fn from(outcome: ResolutionOutcome) -> Self {
        outcome.token().to_string()
    }
}

impl TryFrom<String> for ResolutionOutcome {
    type Error = DomainError;

    fn try_from(token: String) -> Result<Self, Self::Error> {
        match token.as_str() {
            YES => Ok(Self::Yes),
            NO => Ok(Self::No),
            MKT => Ok(Self::Mkt),
            CANCEL => Ok(Self::Cancel),
            answer => match answer_id(answer) {
                Some(id) => Ok(Self::Answer(Outcome::answer(id))),
                None => Err(DomainError::InvalidOutcome {
                    outcome: token,
                    outcome_type: OutcomeType::FreeResponse,
                }),
            },
        }
    }
}
