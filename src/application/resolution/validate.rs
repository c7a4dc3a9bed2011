//! Request validation.
//!
//! Converts a wire [`ResolveRequest`] into a domain [`ResolutionInput`] for a
//! loaded contract. Caller and state checks live in the resolver; this only
//! looks at the request body.

use rust_decimal::Decimal;

use crate::domain::error::DomainError;
use crate::domain::{
    add_to, Contract, Outcome, OutcomeMap, OutcomeType, ResolutionInput, ResolutionOutcome,
};
use crate::error::ResolveError;
use crate::port::ResolveRequest;

/// Build the resolution input for `contract`.
///
/// # Errors
///
/// - [`ResolveError::InvalidOutcome`] for a token the contract does not have,
///   or a free-response MKT without well-formed answer weights
/// - [`ResolveError::InvalidProbability`] for a binary `probability_int` that
///   is not finite or lies outside `[0, 100]`
pub fn resolution_input(
    request: &ResolveRequest,
    contract: &Contract,
) -> Result<ResolutionInput, ResolveError> {
    let outcome_type = contract.outcome_type;
    let outcome = ResolutionOutcome::parse(&request.outcome, outcome_type)
        .map_err(|e| invalid_outcome(&request.outcome, &e))?;
    let mut input = ResolutionInput::new(outcome);

    match outcome_type {
        OutcomeType::Binary => {
            if let Some(probability_int) = request.probability_int {
                let probability = percentage(probability_int)?;
                if input.outcome == ResolutionOutcome::Mkt {
                    input = input.with_probability(probability);
                }
            }
        }
        OutcomeType::FreeResponse => {
            if input.outcome == ResolutionOutcome::Mkt {
                input = input.with_resolutions(weights(request)?);
            }
        }
    }

    input.validate(outcome_type).map_err(|e| match e {
        DomainError::InvalidProbability { probability } => ResolveError::InvalidProbability {
            value: probability.to_string(),
        },
        other => invalid_outcome(&request.outcome, &other),
    })?;
    Ok(input)
}

fn invalid_outcome(outcome: &str, err: &DomainError) -> ResolveError {
    ResolveError::InvalidOutcome {
        outcome: outcome.to_string(),
        reason: err.to_string(),
    }
}

/// `probability_int` is a percentage.
fn percentage(value: f64) -> Result<Decimal, ResolveError> {
    let invalid = || ResolveError::InvalidProbability {
        value: value.to_string(),
    };
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(invalid());
    }
    let percent = Decimal::try_from(value).map_err(|_| invalid())?;
    Ok(percent / Decimal::ONE_HUNDRED)
}

fn weights(request: &ResolveRequest) -> Result<OutcomeMap, ResolveError> {
    let Some(resolutions) = &request.resolutions else {
        return Err(ResolveError::InvalidOutcome {
            outcome: request.outcome.clone(),
            reason: "MKT on a free-response contract needs answer weights".to_string(),
        });
    };

    // Spellings of one answer id ("1", "01") pool their weight.
    let mut weights = OutcomeMap::new();
    for (answer, weight) in resolutions {
        let outcome = Outcome::parse_bet(answer, OutcomeType::FreeResponse)
            .map_err(|e| invalid_outcome(&request.outcome, &e))?;
        let weight = Decimal::try_from(*weight)
            .ok()
            .filter(|_| weight.is_finite())
            .ok_or_else(|| ResolveError::InvalidOutcome {
                outcome: request.outcome.clone(),
                reason: format!("weight for answer {answer} is not a number"),
            })?;
        add_to(&mut weights, &outcome, weight);
    }
    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContractId, MechanismKind, UserId};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn contract(outcome_type: OutcomeType) -> Contract {
        Contract::new(
            ContractId::new("c1"),
            UserId::new("creator"),
            "?",
            outcome_type,
            MechanismKind::Dpm,
            Utc::now(),
        )
    }

    fn request(outcome: &str) -> ResolveRequest {
        ResolveRequest::new(ContractId::new("c1"), outcome)
    }

    #[test]
    fn binary_mkt_takes_probability_as_percentage() {
        let input =
            resolution_input(&request("MKT").with_probability_int(73.0), &contract(OutcomeType::Binary))
                .unwrap();
        assert_eq!(input.outcome, ResolutionOutcome::Mkt);
        assert_eq!(input.probability, Some(dec!(0.73)));
    }

    #[test]
    fn binary_mkt_without_probability_leaves_it_unset() {
        let input = resolution_input(&request("MKT"), &contract(OutcomeType::Binary)).unwrap();
        assert_eq!(input.probability, None);
    }

    #[test]
    fn probability_is_ignored_for_full_resolutions() {
        let input =
            resolution_input(&request("YES").with_probability_int(40.0), &contract(OutcomeType::Binary))
                .unwrap();
        assert_eq!(input.probability, None);
    }

    #[test]
    fn rejects_out_of_range_or_non_finite_probability() {
        let binary = contract(OutcomeType::Binary);
        for bad in [-1.0, 100.5, f64::NAN, f64::INFINITY] {
            let err = resolution_input(&request("MKT").with_probability_int(bad), &binary).unwrap_err();
            assert!(matches!(err, ResolveError::InvalidProbability { .. }), "{bad}");
        }
    }

    #[test]
    fn rejects_outcome_foreign_to_contract() {
        let err = resolution_input(&request("7"), &contract(OutcomeType::Binary)).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidOutcome { .. }));

        let err = resolution_input(&request("YES"), &contract(OutcomeType::FreeResponse)).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidOutcome { .. }));
    }

    #[test]
    fn free_response_mkt_needs_weights() {
        let fr = contract(OutcomeType::FreeResponse);
        let err = resolution_input(&request("MKT"), &fr).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidOutcome { .. }));

        let zero = BTreeMap::from([("1".to_string(), 0.0)]);
        let err = resolution_input(&request("MKT").with_resolutions(zero), &fr).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidOutcome { .. }));

        let weights = BTreeMap::from([("1".to_string(), 75.0), ("2".to_string(), 25.0)]);
        let input = resolution_input(&request("MKT").with_resolutions(weights), &fr).unwrap();
        let resolutions = input.resolutions.unwrap();
        assert_eq!(resolutions[&Outcome::answer(1)], dec!(75));
        assert_eq!(resolutions[&Outcome::answer(2)], dec!(25));
    }

    #[test]
    fn padded_answer_ids_share_one_weight() {
        let fr = contract(OutcomeType::FreeResponse);
        let weights = BTreeMap::from([("01".to_string(), 30.0), ("1".to_string(), 20.0)]);
        let input = resolution_input(&request("MKT").with_resolutions(weights), &fr).unwrap();
        let resolutions = input.resolutions.unwrap();
        assert_eq!(resolutions.len(), 1);
        assert_eq!(resolutions[&Outcome::answer(1)], dec!(50));

        let input = resolution_input(&request("01"), &fr).unwrap();
        assert_eq!(input.outcome, ResolutionOutcome::Answer(Outcome::answer(1)));
    }
}
