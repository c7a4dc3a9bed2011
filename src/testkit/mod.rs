//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`domain`] - Builders for contracts, bets and users.
//! - [`ledger`] - Balance ledger doubles: `FlakyLedger`.
//! - [`notifier`] - `RecordingNotifier` that keeps every event.
//! - [`config`] - Canonical test configurations (zero-delay retries).

pub mod config;
pub mod domain;
pub mod ledger;
pub mod notifier;
