//! Payout engine.
//!
//! Turns a resolution plus the contract's bets (and, for CPMM, liquidity
//! provisions) into a [`Settlement`]. Loans are handled separately by
//! [`LoanLedger`](super::loan::LoanLedger).

pub(crate) mod cpmm;
pub(crate) mod dpm;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::bet::Bet;
use super::contract::{Contract, OutcomeMap, OutcomeType};
use super::error::DomainError;
use super::fees::FeeSchedule;
use super::liquidity::LiquidityProvision;
use super::mechanism;
use super::money::Probability;
use super::outcome::{Outcome, ResolutionOutcome};
use super::payout::Settlement;

/// A validated-on-demand resolution request in domain units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionInput {
    pub outcome: ResolutionOutcome,
    /// Answer weights for a free-response MKT resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolutions: Option<OutcomeMap>,
    /// Resolution probability in `[0, 1]` for a binary MKT resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<Probability>,
}

impl ResolutionInput {
    #[must_use]
    pub fn new(outcome: ResolutionOutcome) -> Self {
        Self {
            outcome,
            resolutions: None,
            probability: None,
        }
    }

    #[must_use]
    pub fn with_probability(mut self, probability: Probability) -> Self {
        self.probability = Some(probability);
        self
    }

    #[must_use]
    pub fn with_resolutions(mut self, resolutions: OutcomeMap) -> Self {
        self.resolutions = Some(resolutions);
        self
    }

    /// Check the request against the contract's outcome type.
    ///
    /// # Errors
    ///
    /// - [`DomainError::InvalidOutcome`] for an outcome the contract does not have
    /// - [`DomainError::InvalidResolutions`] for a malformed free-response MKT
    /// - [`DomainError::InvalidProbability`] for a probability outside `[0, 1]`
    pub fn validate(&self, outcome_type: OutcomeType) -> Result<(), DomainError> {
        match (&self.outcome, outcome_type) {
            (ResolutionOutcome::Answer(answer), OutcomeType::Binary) => {
                return Err(DomainError::InvalidOutcome {
                    outcome: answer.to_string(),
                    outcome_type,
                });
            }
            (ResolutionOutcome::Yes | ResolutionOutcome::No, OutcomeType::FreeResponse) => {
                return Err(DomainError::InvalidOutcome {
                    outcome: self.outcome.token().to_string(),
                    outcome_type,
                });
            }
            (ResolutionOutcome::Mkt, OutcomeType::FreeResponse) => {
                validate_resolutions(self.resolutions.as_ref())?;
            }
            _ => {}
        }

        if let Some(probability) = self.probability {
            if probability < Decimal::ZERO || probability > Decimal::ONE {
                return Err(DomainError::InvalidProbability { probability });
            }
        }
        Ok(())
    }
}

fn validate_resolutions(resolutions: Option<&OutcomeMap>) -> Result<(), DomainError> {
    let resolutions = resolutions.ok_or_else(|| DomainError::InvalidResolutions {
        reason: "answer weights are required".to_string(),
    })?;
    if resolutions.is_empty() {
        return Err(DomainError::InvalidResolutions {
            reason: "no answers given".to_string(),
        });
    }
    for (answer, weight) in resolutions {
        Outcome::parse_bet(answer.as_str(), OutcomeType::FreeResponse).map_err(|_| {
            DomainError::InvalidResolutions {
                reason: format!("{answer} is not an answer id"),
            }
        })?;
        if *weight < Decimal::ZERO {
            return Err(DomainError::InvalidResolutions {
                reason: format!("negative weight for answer {answer}"),
            });
        }
    }
    if resolutions.values().copied().sum::<Decimal>() <= Decimal::ZERO {
        return Err(DomainError::InvalidResolutions {
            reason: "weights sum to zero".to_string(),
        });
    }
    Ok(())
}

/// Compute final payouts for `contract` under `input`.
///
/// # Errors
///
/// Returns a [`DomainError`] if the input is invalid for the contract or
/// its mechanism cannot settle it.
pub fn compute_payouts(
    input: &ResolutionInput,
    contract: &Contract,
    bets: &[Bet],
    liquidity: &[LiquidityProvision],
    fees: &FeeSchedule,
) -> Result<Settlement, DomainError> {
    input.validate(contract.outcome_type)?;
    mechanism::for_kind(contract.mechanism, fees).settle(input, contract, bets, liquidity)
}
