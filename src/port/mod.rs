//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!   CLI ───────────▶ │  Application services   │
//!                    │  (trading, resolution)  │
//!                    └────────────┬────────────┘
//!             ┌───────────────────┼───────────────────┐
//!             ▼                   ▼                   ▼
//!      ┌─────────────┐     ┌─────────────┐     ┌────────────┐
//!      │ MarketStore │     │BalanceLedger│     │  Notifier  │
//!      └─────────────┘     └─────────────┘     └────────────┘
//! ```

pub mod inbound;
pub mod outbound;

pub use inbound::resolution::{ResolutionReport, ResolutionService, ResolveRequest, ResolveResponse};
pub use outbound::ledger::{BalanceLedger, CreditReceipt, IdempotencyKey, Payment};
pub use outbound::notifier::{
    BetEvent, Event, LogNotifier, Notifier, NotifierRegistry, NullNotifier, PaymentFailedEvent,
    ResolvedEvent, UserResolutionEvent,
};
pub use outbound::store::{MarketStore, TradeCommit};
