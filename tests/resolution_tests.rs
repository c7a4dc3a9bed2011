//! End-to-end resolution flows over the in-memory store and ledger.

mod support;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use oddsmith::adapter::outbound::memory::MemoryStore;
use oddsmith::application::{NewMarket, Resolver, TradingService};
use oddsmith::domain::{
    Bet, Contract, ContractId, LiquidityProvision, Resolution, ResolutionOutcome, UserId,
};
use oddsmith::error::{ResolveError, StoreError};
use oddsmith::port::{Event, MarketStore, ResolutionService, ResolveRequest, TradeCommit};
use oddsmith::testkit::config::retry;
use oddsmith::testkit::ledger::FlakyLedger;

use support::assertions::assert_decimal_near;
use support::market::Harness;

const TOLERANCE: Decimal = dec!(0.0001);

fn yes(contract_id: &ContractId) -> ResolveRequest {
    ResolveRequest::new(contract_id.clone(), "YES")
}

#[tokio::test]
async fn yes_resolution_pays_winner_and_claws_back_loans() {
    let harness = Harness::new();
    let contract_id = harness.two_bettors("rain").await;

    let report = harness.resolve_as_creator(yes(&contract_id)).await.unwrap();

    assert_decimal_near(harness.balance("alice").await, dec!(175), TOLERANCE);
    assert_decimal_near(harness.balance("bob").await, dec!(-20), TOLERANCE);
    assert_decimal_near(harness.balance("carol").await, dec!(4), TOLERANCE);

    assert_eq!(report.loans.total(), dec!(40));
    assert_decimal_near(report.settlement.creator_payout, dec!(4), TOLERANCE);
    assert_decimal_near(
        report.settlement.collected_fees.platform_fee,
        dec!(1),
        TOLERANCE,
    );
    assert_eq!(
        report.contract.resolution.as_ref().map(|r| &r.outcome),
        Some(&ResolutionOutcome::Yes)
    );
}

#[tokio::test]
async fn no_resolution_mirrors_yes() {
    let harness = Harness::new();
    let contract_id = harness.two_bettors("rain").await;

    harness
        .resolve_as_creator(ResolveRequest::new(contract_id, "NO"))
        .await
        .unwrap();

    assert_decimal_near(harness.balance("bob").await, dec!(175), TOLERANCE);
    assert_decimal_near(harness.balance("alice").await, dec!(-20), TOLERANCE);
    assert_decimal_near(harness.balance("carol").await, dec!(4), TOLERANCE);
}

#[tokio::test]
async fn checks_run_in_order_and_write_nothing() {
    let harness = Harness::new();
    let contract_id = harness.two_bettors("rain").await;
    let stranger = UserId::new("mallory");

    let err = harness
        .resolver
        .resolve(None, ResolveRequest::new(ContractId::new("nope"), "MAYBE"))
        .await
        .unwrap_err();
    assert_eq!(err, ResolveError::NotAuthorized);

    let err = harness
        .resolver
        .resolve(Some(&stranger), ResolveRequest::new(ContractId::new("nope"), "MAYBE"))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::InvalidContract { .. }));

    let err = harness
        .resolver
        .resolve(Some(&stranger), ResolveRequest::new(contract_id.clone(), "MAYBE"))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::InvalidOutcome { .. }));

    let err = harness
        .resolver
        .resolve(
            Some(&stranger),
            ResolveRequest::new(contract_id.clone(), "MKT").with_probability_int(150.0),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::InvalidProbability { .. }));

    let err = harness
        .resolver
        .resolve(Some(&stranger), yes(&contract_id))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::NotCreator { .. }));
    assert!(err.is_validation());

    let contract = harness.store.contract(&contract_id).await.unwrap().unwrap();
    assert!(!contract.is_resolved());
    assert_eq!(harness.ledger.inner().applied_count(), 0);
}

#[tokio::test]
async fn second_resolution_is_rejected_without_paying() {
    let harness = Harness::new();
    let contract_id = harness.two_bettors("rain").await;

    harness.resolve_as_creator(yes(&contract_id)).await.unwrap();
    let applied = harness.ledger.inner().applied_count();

    let err = harness
        .resolve_as_creator(ResolveRequest::new(contract_id.clone(), "NO"))
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::AlreadyResolved { .. }));
    assert_eq!(harness.ledger.inner().applied_count(), applied);
    assert_decimal_near(harness.balance("alice").await, dec!(175), TOLERANCE);
}

#[tokio::test]
async fn concurrent_resolutions_pay_once() {
    let harness = Harness::new();
    let contract_id = harness.two_bettors("rain").await;
    let carol = UserId::new("carol");

    let (first, second) = tokio::join!(
        harness.resolver.resolve(Some(&carol), yes(&contract_id)),
        harness
            .resolver
            .resolve(Some(&carol), ResolveRequest::new(contract_id.clone(), "NO")),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(ResolveError::AlreadyResolved { .. }))));

    // Whichever side won, the pot was paid exactly once.
    let total = harness.balance("alice").await
        + harness.balance("bob").await
        + harness.balance("carol").await;
    assert_decimal_near(total, dec!(159), TOLERANCE);
}

#[tokio::test]
async fn failed_payment_is_reported_and_retried() {
    let ledger = FlakyLedger::new().fail_user_always(&UserId::new("bob"));
    let harness = Harness::with_ledger(ledger);
    let contract_id = harness.two_bettors("rain").await;

    let err = harness.resolve_as_creator(yes(&contract_id)).await.unwrap_err();
    match &err {
        ResolveError::PartialPayoutFailure { failed_users, .. } => {
            assert_eq!(failed_users, &vec![UserId::new("bob")]);
        }
        other => panic!("expected partial failure, got {other:?}"),
    }
    assert!(!err.is_validation());

    let contract = harness.store.contract(&contract_id).await.unwrap().unwrap();
    assert!(contract.is_resolved());
    assert_decimal_near(harness.balance("alice").await, dec!(175), TOLERANCE);
    assert_eq!(harness.balance("bob").await, Decimal::ZERO);
    assert_eq!(harness.ledger.attempts(&UserId::new("bob")), 3);
    assert_eq!(harness.resolver.pending_payments(&contract_id).len(), 1);
    assert_eq!(
        harness
            .notifier
            .count(|e| matches!(e, Event::PaymentFailed(_))),
        1
    );

    harness.ledger.recover();
    harness.resolver.retry_payments(&contract_id).await.unwrap();

    assert_decimal_near(harness.balance("bob").await, dec!(-20), TOLERANCE);
    assert!(harness.resolver.pending_payments(&contract_id).is_empty());

    // Nothing left to send.
    harness.resolver.retry_payments(&contract_id).await.unwrap();
    assert_eq!(harness.ledger.attempts(&UserId::new("bob")), 4);
}

#[tokio::test]
async fn transient_ledger_failures_are_retried_inline() {
    let ledger = FlakyLedger::new().fail_user(&UserId::new("alice"), 2);
    let harness = Harness::with_ledger(ledger);
    let contract_id = harness.two_bettors("rain").await;

    harness.resolve_as_creator(yes(&contract_id)).await.unwrap();

    assert_eq!(harness.ledger.attempts(&UserId::new("alice")), 3);
    assert_decimal_near(harness.balance("alice").await, dec!(175), TOLERANCE);
    assert!(harness.resolver.pending_payments(&contract_id).is_empty());
}

#[tokio::test]
async fn cancel_refunds_stakes_net_of_loans() {
    let harness = Harness::new();
    let contract_id = harness.two_bettors("rain").await;

    let report = harness
        .resolve_as_creator(ResolveRequest::new(contract_id, "CANCEL"))
        .await
        .unwrap();

    assert_eq!(harness.balance("alice").await, dec!(80));
    assert_eq!(harness.balance("bob").await, dec!(80));
    assert_eq!(harness.balance("carol").await, Decimal::ZERO);
    assert!(report.settlement.collected_fees.total().is_zero());
}

#[tokio::test]
async fn market_resolution_at_the_extremes_matches_outright() {
    for (probability, outright) in [(100.0, "YES"), (0.0, "NO")] {
        let at_market = Harness::new();
        let contract_id = at_market.two_bettors("rain").await;
        let mkt = at_market
            .resolve_as_creator(
                ResolveRequest::new(contract_id, "MKT").with_probability_int(probability),
            )
            .await
            .unwrap();

        let plain = Harness::new();
        let contract_id = plain.two_bettors("rain").await;
        let full = plain
            .resolve_as_creator(ResolveRequest::new(contract_id, outright))
            .await
            .unwrap();

        for user in ["alice", "bob", "carol"] {
            let user = UserId::new(user);
            assert_decimal_near(
                mkt.ledger.get(&user).unwrap_or_default(),
                full.ledger.get(&user).unwrap_or_default(),
                TOLERANCE,
            );
        }
    }
}

#[tokio::test]
async fn market_resolution_pays_out_the_whole_pool() {
    let harness = Harness::without_loans();
    let contract_id = harness.two_bettors("rain").await;

    let report = harness
        .resolve_as_creator(ResolveRequest::new(contract_id, "MKT").with_probability_int(50.0))
        .await
        .unwrap();

    let settlement = &report.settlement;
    let bettors: Decimal = settlement.payouts.iter().map(|p| p.payout).sum();
    assert_decimal_near(
        bettors + settlement.collected_fees.withdrawn(),
        dec!(200),
        TOLERANCE,
    );
    assert!(harness.balance("alice").await > Decimal::ZERO);
    assert!(harness.balance("bob").await > Decimal::ZERO);
}

#[tokio::test]
async fn free_response_market_resolution_splits_by_weight() {
    let harness = Harness::without_loans();
    let market = NewMarket::free_response(UserId::new("carol"), "Which colour?", dec!(100))
        .with_id(ContractId::new("colour"));
    let contract_id = harness.trading.create_market(market).await.unwrap().id;
    harness.bet("alice", &contract_id, "1", dec!(50)).await;
    harness.bet("bob", &contract_id, "2", dec!(50)).await;

    let weights = BTreeMap::from([("1".to_string(), 70.0), ("2".to_string(), 30.0)]);
    let report = harness
        .resolve_as_creator(ResolveRequest::new(contract_id, "MKT").with_resolutions(weights))
        .await
        .unwrap();

    let settlement = &report.settlement;
    let bettors: Decimal = settlement.payouts.iter().map(|p| p.payout).sum();
    assert_decimal_near(
        bettors + settlement.collected_fees.withdrawn(),
        dec!(200),
        TOLERANCE,
    );
    assert!(harness.balance("alice").await > harness.balance("bob").await);
}

#[tokio::test]
async fn padded_answer_ids_settle_as_the_same_answer() {
    let harness = Harness::without_loans();
    let market = NewMarket::free_response(UserId::new("carol"), "Which colour?", dec!(100))
        .with_id(ContractId::new("colour"));
    let contract_id = harness.trading.create_market(market).await.unwrap().id;
    harness.bet("alice", &contract_id, "01", dec!(50)).await;
    harness.bet("bob", &contract_id, "2", dec!(50)).await;

    harness
        .resolve_as_creator(ResolveRequest::new(contract_id, "1"))
        .await
        .unwrap();

    // The whole 200 pool less 5% of alice's 150 profit.
    assert_decimal_near(harness.balance("alice").await, dec!(192.5), TOLERANCE);
    assert_eq!(harness.balance("bob").await, Decimal::ZERO);
}

#[tokio::test]
async fn free_response_market_resolution_requires_weights() {
    let harness = Harness::new();
    let market = NewMarket::free_response(UserId::new("carol"), "Which colour?", dec!(100))
        .with_id(ContractId::new("colour"));
    let contract_id = harness.trading.create_market(market).await.unwrap().id;

    let err = harness
        .resolve_as_creator(ResolveRequest::new(contract_id, "MKT"))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::InvalidOutcome { .. }));
}

#[tokio::test]
async fn pool_market_redeems_winning_shares_and_returns_the_rest_to_providers() {
    let harness = Harness::new();
    let contract_id = harness.pool_binary("rain", "carol", dec!(100)).await;
    harness.bet("alice", &contract_id, "YES", dec!(100)).await;

    harness.resolve_as_creator(yes(&contract_id)).await.unwrap();

    // 150 YES shares, less the 20 loan.
    assert_decimal_near(harness.balance("alice").await, dec!(130), TOLERANCE);
    assert_decimal_near(harness.balance("carol").await, dec!(50), TOLERANCE);
}

#[tokio::test]
async fn pool_market_cancel_refunds_bets_and_liquidity() {
    let harness = Harness::new();
    let contract_id = harness.pool_binary("rain", "carol", dec!(100)).await;
    harness.bet("alice", &contract_id, "YES", dec!(100)).await;

    harness
        .resolve_as_creator(ResolveRequest::new(contract_id, "CANCEL"))
        .await
        .unwrap();

    assert_eq!(harness.balance("alice").await, dec!(80));
    assert_eq!(harness.balance("carol").await, dec!(100));
}

#[tokio::test]
async fn resolution_notifies_every_participant() {
    let harness = Harness::new();
    let contract_id = harness.two_bettors("rain").await;

    harness.resolve_as_creator(yes(&contract_id)).await.unwrap();

    let notices = harness.notifier.user_notices();
    assert_eq!(notices.len(), 3);

    let alice = notices
        .iter()
        .find(|n| n.user_id == UserId::new("alice"))
        .unwrap();
    assert_eq!(alice.invested, dec!(100));
    assert_decimal_near(alice.payout, dec!(195), TOLERANCE);

    let bob = notices
        .iter()
        .find(|n| n.user_id == UserId::new("bob"))
        .unwrap();
    assert_eq!(bob.invested, dec!(100));
    assert_eq!(bob.payout, Decimal::ZERO);

    let resolved: Vec<_> = harness
        .notifier
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Event::ContractResolved(resolved) => Some(resolved),
            _ => None,
        })
        .collect();
    assert_eq!(resolved.len(), 1);
    assert_decimal_near(resolved[0].total_paid, dec!(159), TOLERANCE);
    assert_eq!(resolved[0].users, 3);
}

/// Store that lets one bet land between the resolver's reads and its write.
struct MidResolutionBet {
    inner: Arc<MemoryStore>,
    trading: TradingService,
    placed: AtomicBool,
}

#[async_trait]
impl MarketStore for MidResolutionBet {
    async fn contract(&self, id: &ContractId) -> Result<Option<Contract>, StoreError> {
        self.inner.contract(id).await
    }

    async fn bets(&self, id: &ContractId) -> Result<Vec<Bet>, StoreError> {
        self.inner.bets(id).await
    }

    async fn liquidity(&self, id: &ContractId) -> Result<Vec<LiquidityProvision>, StoreError> {
        if !self.placed.swap(true, Ordering::SeqCst) {
            self.trading
                .place_bet(&UserId::new("dave"), id, "YES", dec!(50))
                .await
                .expect("late bet");
        }
        self.inner.liquidity(id).await
    }

    async fn insert_contract(
        &self,
        contract: Contract,
        bets: Vec<Bet>,
        liquidity: Vec<LiquidityProvision>,
    ) -> Result<(), StoreError> {
        self.inner.insert_contract(contract, bets, liquidity).await
    }

    async fn commit_trade(
        &self,
        id: &ContractId,
        expected_revision: u64,
        commit: TradeCommit,
    ) -> Result<Contract, StoreError> {
        self.inner.commit_trade(id, expected_revision, commit).await
    }

    async fn resolve_if_open(
        &self,
        id: &ContractId,
        expected_revision: u64,
        resolution: Resolution,
    ) -> Result<Contract, StoreError> {
        self.inner.resolve_if_open(id, expected_revision, resolution).await
    }
}

#[tokio::test]
async fn bet_placed_during_resolution_is_settled() {
    let harness = Harness::new();
    let contract_id = harness.two_bettors("rain").await;

    let store = Arc::new(MidResolutionBet {
        inner: harness.store.clone(),
        trading: TradingService::new(harness.store.clone(), harness.notifier.clone()),
        placed: AtomicBool::new(false),
    });
    let resolver = Resolver::new(store, harness.ledger.clone(), harness.notifier.clone())
        .with_retry_policy(retry(3));

    let report = resolver
        .resolve(Some(&UserId::new("carol")), yes(&contract_id))
        .await
        .unwrap();

    let bets = harness.store.bets(&contract_id).await.unwrap();
    assert_eq!(bets.len(), 3);
    assert_eq!(report.contract.state.pool_total(), dec!(250));

    let settlement = &report.settlement;
    let bettors: Decimal = settlement.payouts.iter().map(|p| p.payout).sum();
    assert_decimal_near(
        bettors + settlement.collected_fees.withdrawn(),
        dec!(250),
        TOLERANCE,
    );
    assert!(settlement
        .payouts
        .iter()
        .any(|p| p.user_id == UserId::new("dave") && p.payout > dec!(50)));
    assert_eq!(report.loans.total(), dec!(60));
}
