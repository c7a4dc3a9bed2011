//! Mechanism-agnostic market domain. Pure: no I/O, no clocks, no locks.

mod bet;
mod contract;
mod fees;
mod id;
mod liquidity;
mod loan;
mod money;
mod outcome;
mod payout;

pub mod error;
pub mod mechanism;
pub mod settlement;

// Identifiers and amounts
pub use id::{BetId, ContractId, LiquidityId, UserId};
pub use money::{clamp_probability, Amount, Probability, Shares, DISPLAY_DP};

// Market aggregate
pub use contract::{
    add_to, total_of, Contract, MarketState, MechanismKind, OutcomeMap, OutcomeType, Resolution,
};
pub use outcome::{Outcome, ResolutionOutcome, CANCEL, MKT, NO, YES};

// Positions
pub use bet::{open_bets, Bet, Sale};
pub use liquidity::LiquidityProvision;

// Fees, loans and payouts
pub use fees::{CpmmFeeRates, DpmFeeRates, FeeSchedule, Fees};
pub use loan::{LoanLedger, LoanPolicy};
pub use payout::{Payout, PayoutLedger, Settlement};

// Engines
pub use mechanism::{BetFill, LiquidityFill, MarketMechanism, SaleFill};
pub use settlement::{compute_payouts, ResolutionInput};
