//! Notifier port for event notifications.
//!
//! Notifications are fire-and-forget: a failing notifier never changes the
//! outcome of the trade or resolution that produced the event.

use rust_decimal::Decimal;

use crate::domain::{
    Amount, ContractId, Outcome, OutcomeMap, Probability, ResolutionOutcome, Shares, UserId,
};

/// Events that can trigger notifications.
#[derive(Debug, Clone)]
pub enum Event {
    /// A bet was committed.
    BetPlaced(BetEvent),
    /// A contract was resolved.
    ContractResolved(ResolvedEvent),
    /// A user's personal resolution summary.
    UserResolved(UserResolutionEvent),
    /// A payment was abandoned after exhausting its retries.
    PaymentFailed(PaymentFailedEvent),
}

/// Bet placement event.
#[derive(Debug, Clone)]
pub struct BetEvent {
    pub contract_id: ContractId,
    pub user_id: UserId,
    pub outcome: Outcome,
    pub amount: Amount,
    pub shares: Shares,
    /// Probability of `outcome` after the fill.
    pub prob_after: Probability,
}

/// Contract resolution event.
#[derive(Debug, Clone)]
pub struct ResolvedEvent {
    pub contract_id: ContractId,
    pub question: String,
    pub outcome: ResolutionOutcome,
    pub resolution_probability: Option<Probability>,
    /// Sum over all users of the final balance deltas.
    pub total_paid: Amount,
    /// Number of users credited.
    pub users: usize,
}

/// Per-user resolution summary.
///
/// `payout` excludes loan claw-backs: loans are bookkeeping, not profit.
#[derive(Debug, Clone)]
pub struct UserResolutionEvent {
    pub user_id: UserId,
    pub contract_id: ContractId,
    pub creator_id: UserId,
    pub question: String,
    pub outcome: ResolutionOutcome,
    /// Sum of the user's open bet amounts.
    pub invested: Amount,
    pub payout: Amount,
    pub resolution_probability: Option<Probability>,
    pub resolutions: Option<OutcomeMap>,
}

/// Abandoned payment event.
#[derive(Debug, Clone)]
pub struct PaymentFailedEvent {
    pub contract_id: ContractId,
    pub user_id: UserId,
    pub amount: Decimal,
    pub attempts: u32,
    pub reason: String,
}

/// Trait for notification handlers.
///
/// Implementations must be thread-safe and return quickly. For slow
/// delivery, spawn a task.
pub trait Notifier: Send + Sync {
    /// Handle an event.
    fn notify(&self, event: Event);
}

/// Registry of notifiers (composite pattern).
///
/// Broadcasts events to all registered notifiers.
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { notifiers: vec![] }
    }

    /// Register a notifier.
    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    /// Notify all registered notifiers.
    pub fn notify_all(&self, event: Event) {
        for notifier in &self.notifiers {
            notifier.notify(event.clone());
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl Default for NotifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for NotifierRegistry {
    fn notify(&self, event: Event) {
        self.notify_all(event);
    }
}

/// A no-op notifier for testing or when notifications are disabled.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: Event) {}
}

/// A logging notifier that logs events via tracing.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: Event) {
        use tracing::{info, warn};
        match event {
            Event::BetPlaced(e) => {
                info!(
                    contract_id = %e.contract_id,
                    user_id = %e.user_id,
                    outcome = %e.outcome,
                    amount = %e.amount,
                    prob_after = %e.prob_after,
                    "Bet placed"
                );
            }
            Event::ContractResolved(e) => {
                info!(
                    contract_id = %e.contract_id,
                    outcome = %e.outcome,
                    total_paid = %e.total_paid,
                    users = e.users,
                    "Contract resolved"
                );
            }
            Event::UserResolved(e) => {
                info!(
                    contract_id = %e.contract_id,
                    user_id = %e.user_id,
                    invested = %e.invested,
                    payout = %e.payout,
                    "Resolution notice"
                );
            }
            Event::PaymentFailed(e) => {
                warn!(
                    contract_id = %e.contract_id,
                    user_id = %e.user_id,
                    amount = %e.amount,
                    attempts = e.attempts,
                    reason = %e.reason,
                    "Payment abandoned"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting(Arc<AtomicUsize>);

    impl Notifier for Counting {
        fn notify(&self, _event: Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn event() -> Event {
        Event::PaymentFailed(PaymentFailedEvent {
            contract_id: ContractId::new("c1"),
            user_id: UserId::new("alice"),
            amount: Decimal::ONE,
            attempts: 3,
            reason: "down".into(),
        })
    }

    #[test]
    fn registry_broadcasts_to_every_notifier() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut registry = NotifierRegistry::new();
        registry.register(Box::new(Counting(count.clone())));
        registry.register(Box::new(Counting(count.clone())));
        registry.register(Box::new(NullNotifier));

        registry.notify(event());
        assert_eq!(registry.len(), 3);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
