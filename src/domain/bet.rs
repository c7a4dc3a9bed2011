//! Bet records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::fees::Fees;
use super::id::{BetId, ContractId, UserId};
use super::money::{Amount, Probability, Shares};
use super::outcome::Outcome;

/// Link from a sale record back to the bet it unwound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    /// Amount credited to the seller, after fees.
    pub amount: Amount,
    /// The bet that was sold.
    pub bet_id: BetId,
}

/// An immutable wager on one outcome.
///
/// Only `is_sold` changes after creation, when the position is unwound by a
/// later sale record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    pub id: BetId,
    pub user_id: UserId,
    pub contract_id: ContractId,
    pub outcome: Outcome,
    /// Amount wagered. Negative for sale records.
    pub amount: Amount,
    /// Shares received. Negative for sale records.
    pub shares: Shares,
    /// Capital advanced by the house against this bet.
    #[serde(default)]
    pub loan_amount: Amount,
    #[serde(default)]
    pub prob_before: Probability,
    #[serde(default)]
    pub prob_after: Probability,
    #[serde(default)]
    pub fees: Fees,
    pub created_time: DateTime<Utc>,
    #[serde(default)]
    pub is_ante: bool,
    #[serde(default)]
    pub is_sold: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale: Option<Sale>,
}

impl Bet {
    /// Create a plain bet with a fresh ID.
    pub fn new(
        user_id: UserId,
        contract_id: ContractId,
        outcome: Outcome,
        amount: Amount,
        shares: Shares,
        created_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: BetId::generate(),
            user_id,
            contract_id,
            outcome,
            amount,
            shares,
            loan_amount: Decimal::ZERO,
            prob_before: Decimal::ZERO,
            prob_after: Decimal::ZERO,
            fees: Fees::ZERO,
            created_time,
            is_ante: false,
            is_sold: false,
            sale: None,
        }
    }

    /// Mark as a creator seed bet.
    #[must_use]
    pub fn ante(mut self) -> Self {
        self.is_ante = true;
        self
    }

    /// Attach a loan amount.
    #[must_use]
    pub fn with_loan(mut self, loan_amount: Amount) -> Self {
        self.loan_amount = loan_amount;
        self
    }

    /// Record the probabilities around the fill.
    #[must_use]
    pub fn with_probabilities(mut self, before: Probability, after: Probability) -> Self {
        self.prob_before = before;
        self.prob_after = after;
        self
    }

    #[must_use]
    pub fn with_fees(mut self, fees: Fees) -> Self {
        self.fees = fees;
        self
    }

    /// Neither sold nor a sale record.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        !self.is_sold && self.sale.is_none()
    }
}

/// Bets that still take part in parimutuel settlement.
pub fn open_bets(bets: &[Bet]) -> impl Iterator<Item = &Bet> {
    bets.iter().filter(|bet| bet.is_open())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bet() -> Bet {
        Bet::new(
            UserId::new("alice"),
            ContractId::new("c1"),
            Outcome::yes(),
            dec!(10),
            dec!(12),
            Utc::now(),
        )
    }

    #[test]
    fn sold_bets_and_sale_records_are_not_open() {
        let open = bet();
        let mut sold = bet();
        sold.is_sold = true;
        let mut sale = bet();
        sale.sale = Some(Sale {
            amount: dec!(11),
            bet_id: open.id.clone(),
        });

        let bets = vec![open.clone(), sold, sale];
        let ids: Vec<_> = open_bets(&bets).map(|b| b.id.clone()).collect();
        assert_eq!(ids, vec![open.id]);
    }

    #[test]
    fn missing_optional_fields_deserialize_to_defaults() {
        let json = serde_json::json!({
            "id": "b1",
            "user_id": "u1",
            "contract_id": "c1",
            "outcome": "NO",
            "amount": "5",
            "shares": "7.5",
            "created_time": "2024-01-01T00:00:00Z"
        });
        let bet: Bet = serde_json::from_value(json).unwrap();
        assert!(bet.is_open());
        assert!(!bet.is_ante);
        assert_eq!(bet.loan_amount, Decimal::ZERO);
    }
}
