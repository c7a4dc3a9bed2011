//! Loan accounting.
//!
//! New bets may be partly funded by the house. The advanced amount is stored
//! on the bet as `loan_amount` and clawed back when the contract resolves.
//! [`LoanLedger`] is computed once per resolution so the split between loan
//! repayment and profit stays auditable.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::bet::Bet;
use super::id::UserId;
use super::money::{self, Amount};
use super::payout::{Payout, PayoutLedger};

/// How much the house advances on new bets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanPolicy {
    /// Cap on open loans per user per contract.
    pub max_per_contract: Amount,
    /// Fraction of each wager eligible for a loan.
    pub fraction: Decimal,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self {
            max_per_contract: dec!(20),
            fraction: Decimal::ONE,
        }
    }
}

impl LoanPolicy {
    /// Loan for a new wager given the user's existing bets on the contract.
    #[must_use]
    pub fn loan_for<'a>(
        &self,
        user_bets: impl IntoIterator<Item = &'a Bet>,
        amount: Amount,
    ) -> Amount {
        let outstanding: Amount = user_bets
            .into_iter()
            .filter(|bet| bet.is_open())
            .map(|bet| bet.loan_amount)
            .sum();
        let headroom = money::max(self.max_per_contract - outstanding, Decimal::ZERO);
        money::max(money::min(amount * self.fraction, headroom), Decimal::ZERO)
    }
}

/// Outstanding loans per user for one contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanLedger {
    loans: BTreeMap<UserId, Amount>,
}

impl LoanLedger {
    /// Sum loans over open, non-ante bets.
    ///
    /// Each user's loan is capped at what they actually wagered, so nobody
    /// is charged back more than they put in.
    #[must_use]
    pub fn from_open_bets(bets: &[Bet]) -> Self {
        let mut loans: BTreeMap<UserId, Amount> = BTreeMap::new();
        let mut wagered: BTreeMap<UserId, Amount> = BTreeMap::new();

        for bet in bets.iter().filter(|b| b.is_open() && !b.is_ante) {
            *wagered.entry(bet.user_id.clone()).or_default() += money::max(bet.amount, Decimal::ZERO);
            if bet.loan_amount > Decimal::ZERO {
                *loans.entry(bet.user_id.clone()).or_default() += bet.loan_amount;
            }
        }

        for (user_id, loan) in &mut loans {
            let cap = wagered.get(user_id).copied().unwrap_or(Decimal::ZERO);
            *loan = money::min(*loan, cap);
        }
        loans.retain(|_, loan| *loan > Decimal::ZERO);

        Self { loans }
    }

    #[must_use]
    pub fn loan(&self, user_id: &UserId) -> Amount {
        self.loans.get(user_id).copied().unwrap_or(Decimal::ZERO)
    }

    /// Total advanced across users.
    #[must_use]
    pub fn total(&self) -> Amount {
        self.loans.values().copied().sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loans.is_empty()
    }

    /// Claw-back entries: one negative payout per borrower.
    #[must_use]
    pub fn payouts(&self) -> Vec<Payout> {
        self.loans
            .iter()
            .map(|(user_id, loan)| Payout::new(user_id.clone(), -*loan))
            .collect()
    }

    /// Claw-backs as a ledger, ready to merge with profit payouts.
    #[must_use]
    pub fn ledger(&self) -> PayoutLedger {
        self.payouts().iter().collect()
    }
}
