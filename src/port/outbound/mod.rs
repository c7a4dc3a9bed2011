//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the market store, the balance ledger and
//! notification delivery.

pub mod ledger;
pub mod notifier;
pub mod store;
