//! Application services (use cases).
//!
//! These services orchestrate domain logic and coordinate adapters
//! to implement the application's use cases.

pub mod resolution;
pub mod trading;

pub use resolution::{Resolver, RetryPolicy};
pub use trading::{
    BetReceipt, LiquidityReceipt, NewMarket, Quote, SaleReceipt, TradingService,
};
