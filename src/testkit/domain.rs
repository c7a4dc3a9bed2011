//! Builders for domain primitives used across tests.

use chrono::{DateTime, TimeZone, Utc};

use crate::domain::{
    Amount, Bet, Contract, ContractId, MechanismKind, Outcome, OutcomeType, Shares, UserId,
};

/// Fixed creation time so fixtures are reproducible.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

pub fn user(id: &str) -> UserId {
    UserId::new(id)
}

pub fn contract_id(id: &str) -> ContractId {
    ContractId::new(id)
}

/// Empty, unresolved contract created by `creator`.
pub fn contract(
    id: &str,
    creator: &str,
    outcome_type: OutcomeType,
    mechanism: MechanismKind,
) -> Contract {
    Contract::new(
        contract_id(id),
        user(creator),
        format!("Question {id}?"),
        outcome_type,
        mechanism,
        epoch(),
    )
}

pub fn binary_dpm(id: &str, creator: &str) -> Contract {
    contract(id, creator, OutcomeType::Binary, MechanismKind::Dpm)
}

pub fn free_response_dpm(id: &str, creator: &str) -> Contract {
    contract(id, creator, OutcomeType::FreeResponse, MechanismKind::Dpm)
}

pub fn binary_cpmm(id: &str, creator: &str) -> Contract {
    contract(id, creator, OutcomeType::Binary, MechanismKind::Cpmm)
}

/// Open bet record with explicit shares.
pub fn bet(
    user_id: &str,
    contract: &Contract,
    outcome: Outcome,
    amount: Amount,
    shares: Shares,
) -> Bet {
    Bet::new(
        user(user_id),
        contract.id.clone(),
        outcome,
        amount,
        shares,
        epoch(),
    )
}
