//! Oddsmith - market-maker pricing and resolution settlement for
//! play-money prediction markets.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - **`domain`** - Pure pricing and settlement rules
//!   - `Dpm` - dynamic parimutuel, priced from squared outcome shares
//!   - `Cpmm` - constant-product pool over YES/NO reserves
//!   - `compute_payouts` - resolution payouts for either mechanism
//!   - `LoanLedger` - house loans clawed back at resolution
//!
//! - **`port`** - Traits for the market store, balance ledger and notifiers
//! - **`application`** - `TradingService` and the `Resolver`
//! - **`adapter`** - In-memory store and ledger, and the CLI
//! - **`infrastructure`** - Configuration and service wiring
//!
//! # Features
//!
//! - `testkit` - Builders and ledger/notifier doubles for integration tests
//!
//! # Example
//!
//! ```no_run
//! use oddsmith::domain::{
//!     compute_payouts, Contract, ContractId, FeeSchedule, MechanismKind, OutcomeType,
//!     ResolutionInput, ResolutionOutcome, UserId,
//! };
//!
//! let contract = Contract::new(
//!     ContractId::new("rain"),
//!     UserId::new("carol"),
//!     "Will it rain?",
//!     OutcomeType::Binary,
//!     MechanismKind::Dpm,
//!     chrono::Utc::now(),
//! );
//! let input = ResolutionInput::new(ResolutionOutcome::Cancel);
//! let settlement = compute_payouts(&input, &contract, &[], &[], &FeeSchedule::default());
//! assert!(settlement.is_ok());
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
