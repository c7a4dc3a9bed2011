//! In-memory outbound adapters for tests, the CLI and embedding.

mod ledger;
mod store;

pub use ledger::MemoryLedger;
pub use store::MemoryStore;
