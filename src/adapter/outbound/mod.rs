//! Outbound adapters (driven side).

pub mod memory;
