//! Resolution orchestrator.
//!
//! Validates a resolution request, computes the settlement, performs the
//! single conditional `OPEN -> RESOLVED` write and then pays users.
//!
//! Payment happens after the write so a contract is never paid twice: a
//! concurrent resolver that loses the race gets
//! [`ResolveError::AlreadyResolved`] and pays nothing. Failed credits are
//! kept and can be re-sent with [`Resolver::retry_payments`].

mod payment;
mod validate;

pub use payment::{deliver, deliver_all, Backoff, Delivery, RetryPolicy};
pub use validate::resolution_input;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::domain::{
    compute_payouts, open_bets, Amount, Bet, Contract, ContractId, FeeSchedule, LoanLedger,
    PayoutLedger, Resolution, ResolutionInput, Settlement, UserId,
};
use crate::error::{ResolveError, StoreError};
use crate::port::{
    BalanceLedger, Event, MarketStore, Notifier, Payment, PaymentFailedEvent, ResolutionReport,
    ResolutionService, ResolveRequest, ResolvedEvent, UserResolutionEvent,
};

/// Settlement attempts before a contract that keeps trading is given up on.
const MAX_SETTLE_ATTEMPTS: u32 = 5;

/// A resolution written to the store, with the snapshot it was computed from.
struct Settled {
    contract: Contract,
    input: ResolutionInput,
    bets: Vec<Bet>,
    settlement: Settlement,
    loans: LoanLedger,
}

/// Resolves contracts and pays out their settlements.
pub struct Resolver {
    store: Arc<dyn MarketStore>,
    ledger: Arc<dyn BalanceLedger>,
    notifier: Arc<dyn Notifier>,
    fees: FeeSchedule,
    retry: RetryPolicy,
    pending: Mutex<HashMap<ContractId, Vec<Payment>>>,
}

impl Resolver {
    /// Create a resolver with default fees and retry policy.
    pub fn new(
        store: Arc<dyn MarketStore>,
        ledger: Arc<dyn BalanceLedger>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            ledger,
            notifier,
            fees: FeeSchedule::default(),
            retry: RetryPolicy::default(),
            pending: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_fees(mut self, fees: FeeSchedule) -> Self {
        self.fees = fees;
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Payments still owed from an earlier partial failure.
    #[must_use]
    pub fn pending_payments(&self, contract_id: &ContractId) -> Vec<Payment> {
        self.pending
            .lock()
            .get(contract_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Run every pre-write check, in order, and return the loaded contract
    /// with its resolution input.
    async fn check(
        &self,
        caller: Option<&UserId>,
        request: &ResolveRequest,
    ) -> Result<(Contract, ResolutionInput), ResolveError> {
        let caller = caller.ok_or(ResolveError::NotAuthorized)?;
        let contract = self
            .store
            .contract(&request.contract_id)
            .await?
            .ok_or_else(|| ResolveError::InvalidContract {
                contract_id: request.contract_id.clone(),
            })?;

        let input = resolution_input(request, &contract)?;

        if contract.creator_id != *caller {
            return Err(ResolveError::NotCreator {
                contract_id: contract.id.clone(),
                user_id: caller.clone(),
            });
        }
        if contract.is_resolved() {
            return Err(ResolveError::AlreadyResolved {
                contract_id: contract.id.clone(),
            });
        }
        Ok((contract, input))
    }

    /// Send payments and remember the ones that failed.
    async fn pay(&self, contract_id: &ContractId, payments: Vec<Payment>) -> Vec<UserId> {
        let deliveries = deliver_all(self.ledger.as_ref(), payments, &self.retry).await;

        let mut failed = Vec::new();
        for delivery in deliveries {
            if let Err(e) = &delivery.result {
                self.notifier.notify(Event::PaymentFailed(PaymentFailedEvent {
                    contract_id: contract_id.clone(),
                    user_id: delivery.payment.user_id.clone(),
                    amount: delivery.payment.amount,
                    attempts: delivery.attempts,
                    reason: e.to_string(),
                }));
                failed.push(delivery.payment);
            }
        }

        let failed_users: Vec<UserId> = failed.iter().map(|p| p.user_id.clone()).collect();
        let mut pending = self.pending.lock();
        if failed.is_empty() {
            pending.remove(contract_id);
        } else {
            pending.insert(contract_id.clone(), failed);
        }
        failed_users
    }

    /// Compute the settlement and write the resolution against the revision
    /// it was computed from.
    ///
    /// A trade committed in between moves the revision; the snapshot is then
    /// re-read and the settlement recomputed so no stake is left unsettled.
    async fn settle(
        &self,
        caller: Option<&UserId>,
        request: &ResolveRequest,
    ) -> Result<Settled, ResolveError> {
        let mut attempt = 1;
        loop {
            let (contract, input) = self.check(caller, request).await?;
            let contract_id = contract.id.clone();

            let bets = self.store.bets(&contract_id).await?;
            let liquidity = self.store.liquidity(&contract_id).await?;
            let settlement: Settlement =
                compute_payouts(&input, &contract, &bets, &liquidity, &self.fees)
                    .map_err(ResolveError::Engine)?;
            let loans = LoanLedger::from_open_bets(&bets);

            let resolution = Resolution {
                outcome: input.outcome.clone(),
                resolution_time: Utc::now(),
                resolution_probability: input.probability,
                resolutions: input.resolutions.clone(),
                collected_fees: settlement.collected_fees,
            };
            match self
                .store
                .resolve_if_open(&contract_id, contract.revision, resolution)
                .await
            {
                Ok(resolved) => {
                    info!(
                        contract_id = %contract_id,
                        outcome = %input.outcome,
                        bets = bets.len(),
                        "Contract resolved"
                    );
                    return Ok(Settled {
                        contract: resolved,
                        input,
                        bets,
                        settlement,
                        loans,
                    });
                }
                Err(StoreError::RevisionConflict { actual, .. })
                    if attempt < MAX_SETTLE_ATTEMPTS =>
                {
                    warn!(
                        contract_id = %contract_id,
                        expected = contract.revision,
                        actual,
                        attempt,
                        "Contract traded during resolution, recomputing settlement"
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn notify_users(
        &self,
        contract: &Contract,
        input: &ResolutionInput,
        bets: &[Bet],
        profit: &PayoutLedger,
    ) {
        let mut invested: BTreeMap<&UserId, Amount> = BTreeMap::new();
        for bet in open_bets(bets) {
            *invested.entry(&bet.user_id).or_default() += bet.amount;
        }
        let users: BTreeSet<&UserId> = invested
            .keys()
            .copied()
            .chain(profit.iter().map(|(user_id, _)| user_id))
            .collect();

        for user_id in users {
            self.notifier.notify(Event::UserResolved(UserResolutionEvent {
                user_id: user_id.clone(),
                contract_id: contract.id.clone(),
                creator_id: contract.creator_id.clone(),
                question: contract.question.clone(),
                outcome: input.outcome.clone(),
                invested: invested.get(user_id).copied().unwrap_or(Decimal::ZERO),
                payout: profit.get(user_id).unwrap_or(Decimal::ZERO),
                resolution_probability: input.probability,
                resolutions: input.resolutions.clone(),
            }));
        }
    }
}

#[async_trait]
impl ResolutionService for Resolver {
    async fn resolve(
        &self,
        caller: Option<&UserId>,
        request: ResolveRequest,
    ) -> Result<ResolutionReport, ResolveError> {
        let Settled {
            contract: resolved,
            input,
            bets,
            settlement,
            loans,
        } = self.settle(caller, &request).await?;
        let contract_id = resolved.id.clone();

        let profit = settlement.ledger(&resolved.creator_id);
        let mut ledger = profit.clone();
        ledger.merge(&loans.ledger());

        let payments: Vec<Payment> = ledger
            .iter()
            .filter(|(_, amount)| !amount.is_zero())
            .map(|(user_id, amount)| Payment::resolution(&contract_id, user_id.clone(), amount))
            .collect();
        let failed_users = self.pay(&contract_id, payments).await;

        self.notify_users(&resolved, &input, &bets, &profit);
        self.notifier.notify(Event::ContractResolved(ResolvedEvent {
            contract_id: contract_id.clone(),
            question: resolved.question.clone(),
            outcome: input.outcome.clone(),
            resolution_probability: input.probability,
            total_paid: ledger.total(),
            users: ledger.len(),
        }));

        if !failed_users.is_empty() {
            warn!(
                contract_id = %contract_id,
                failed = failed_users.len(),
                "Resolution left unpaid users"
            );
            return Err(ResolveError::PartialPayoutFailure {
                contract_id,
                failed_users,
            });
        }

        info!(
            contract_id = %contract_id,
            users = ledger.len(),
            total_paid = %ledger.total(),
            loans = %loans.total(),
            "Payouts complete"
        );
        Ok(ResolutionReport {
            contract: resolved,
            settlement,
            loans,
            ledger,
        })
    }

    async fn retry_payments(&self, contract_id: &ContractId) -> Result<(), ResolveError> {
        let payments = self.pending_payments(contract_id);
        if payments.is_empty() {
            return Ok(());
        }
        info!(
            contract_id = %contract_id,
            payments = payments.len(),
            "Retrying failed payments"
        );

        let failed_users = self.pay(contract_id, payments).await;
        if failed_users.is_empty() {
            Ok(())
        } else {
            Err(ResolveError::PartialPayoutFailure {
                contract_id: contract_id.clone(),
                failed_users,
            })
        }
    }
}
