//! Payout entries, per-user ledgers and settlement results.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::fees::Fees;
use super::id::UserId;
use super::money::Amount;

/// A single credit (or, for loan claw-backs, debit) to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub user_id: UserId,
    pub payout: Amount,
}

impl Payout {
    pub fn new(user_id: UserId, payout: Amount) -> Self {
        Self { user_id, payout }
    }
}

/// Per-user totals built by summing payout entries.
///
/// Entries for the same user are merged, never overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutLedger {
    totals: BTreeMap<UserId, Amount>,
}

impl PayoutLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one entry to the user's running total.
    pub fn credit(&mut self, user_id: &UserId, amount: Amount) {
        *self
            .totals
            .entry(user_id.clone())
            .or_insert(Decimal::ZERO) += amount;
    }

    /// Fold another ledger into this one.
    pub fn merge(&mut self, other: &Self) {
        for (user_id, amount) in &other.totals {
            self.credit(user_id, *amount);
        }
    }

    #[must_use]
    pub fn get(&self, user_id: &UserId) -> Option<Amount> {
        self.totals.get(user_id).copied()
    }

    /// Grand total over all users.
    #[must_use]
    pub fn total(&self) -> Amount {
        self.totals.values().copied().sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.totals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Iterate users in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&UserId, Amount)> {
        self.totals.iter().map(|(user_id, amount)| (user_id, *amount))
    }
}

impl<'a> FromIterator<&'a Payout> for PayoutLedger {
    fn from_iter<I: IntoIterator<Item = &'a Payout>>(iter: I) -> Self {
        let mut ledger = Self::new();
        for payout in iter {
            ledger.credit(&payout.user_id, payout.payout);
        }
        ledger
    }
}

/// Output of the payout engine for one resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Payouts to bettors.
    pub payouts: Vec<Payout>,
    /// Creator's share of the fees, paid to the contract creator.
    pub creator_payout: Amount,
    /// Payouts to liquidity providers.
    pub liquidity_payouts: Vec<Payout>,
    /// Fees collected on this contract.
    pub collected_fees: Fees,
}

impl Settlement {
    /// Every profit entry including the creator's fee and provider payouts.
    #[must_use]
    pub fn ledger(&self, creator_id: &UserId) -> PayoutLedger {
        let mut ledger: PayoutLedger = self
            .payouts
            .iter()
            .chain(self.liquidity_payouts.iter())
            .collect();
        if !self.creator_payout.is_zero() {
            ledger.credit(creator_id, self.creator_payout);
        }
        ledger
    }

    /// Sum over bettor and provider payouts plus the creator payout.
    #[must_use]
    pub fn total_paid(&self) -> Amount {
        self.payouts
            .iter()
            .chain(self.liquidity_payouts.iter())
            .map(|p| p.payout)
            .sum::<Amount>()
            + self.creator_payout
    }
}
