//! Composition root: wires adapters into the application services.

use std::sync::Arc;

use tracing::debug;

use crate::adapter::outbound::memory::{MemoryLedger, MemoryStore};
use crate::application::{Resolver, TradingService};
use crate::infrastructure::config::settings::Config;
use crate::port::outbound::notifier::{LogNotifier, Notifier, NotifierRegistry};
use crate::port::{BalanceLedger, MarketStore};

/// Build the notifier registry. Events are always logged.
#[must_use]
pub fn build_notifier_registry() -> NotifierRegistry {
    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(LogNotifier));
    registry
}

/// Build a trading service over `store` with the configured fees and loans.
#[must_use]
pub fn build_trading(
    config: &Config,
    store: Arc<dyn MarketStore>,
    notifier: Arc<dyn Notifier>,
) -> TradingService {
    TradingService::new(store, notifier)
        .with_fees(config.fee_schedule())
        .with_loan_policy(config.loan_policy())
}

/// Build a resolver with the configured fees and payment retries.
#[must_use]
pub fn build_resolver(
    config: &Config,
    store: Arc<dyn MarketStore>,
    ledger: Arc<dyn BalanceLedger>,
    notifier: Arc<dyn Notifier>,
) -> Resolver {
    Resolver::new(store, ledger, notifier)
        .with_fees(config.fee_schedule())
        .with_retry_policy(config.payments.retry_policy())
}

/// Services backed by the in-memory adapters.
pub struct InMemory {
    pub store: Arc<MemoryStore>,
    pub ledger: Arc<MemoryLedger>,
    pub trading: TradingService,
    pub resolver: Resolver,
}

/// Wire every service against fresh in-memory adapters.
#[must_use]
pub fn in_memory(config: &Config) -> InMemory {
    let store = Arc::new(MemoryStore::new());
    let ledger = Arc::new(MemoryLedger::new());
    let notifier: Arc<dyn Notifier> = Arc::new(build_notifier_registry());

    let trading = build_trading(config, store.clone(), notifier.clone());
    let resolver = build_resolver(config, store.clone(), ledger.clone(), notifier);
    debug!(
        dpm_fee = %config.fee_schedule().dpm.total(),
        max_attempts = config.payments.max_attempts,
        "In-memory services ready"
    );

    InMemory {
        store,
        ledger,
        trading,
        resolver,
    }
}
