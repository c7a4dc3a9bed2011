use std::sync::Arc;

use rust_decimal::Decimal;

use oddsmith::adapter::outbound::memory::MemoryStore;
use oddsmith::application::{NewMarket, Resolver, TradingService};
use oddsmith::domain::{Amount, ContractId, LoanPolicy, MechanismKind, UserId};
use oddsmith::port::{BalanceLedger, MarketStore, ResolutionReport, ResolutionService, ResolveRequest};
use oddsmith::testkit::config::{no_loans, retry};
use oddsmith::testkit::ledger::FlakyLedger;
use oddsmith::testkit::notifier::RecordingNotifier;

/// In-memory market wired the way `bootstrap` wires it, with recording
/// doubles on the outbound side.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub ledger: Arc<FlakyLedger>,
    pub notifier: Arc<RecordingNotifier>,
    pub trading: TradingService,
    pub resolver: Resolver,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(FlakyLedger::new(), LoanPolicy::default())
    }

    pub fn without_loans() -> Self {
        Self::build(FlakyLedger::new(), no_loans())
    }

    pub fn with_ledger(ledger: FlakyLedger) -> Self {
        Self::build(ledger, LoanPolicy::default())
    }

    pub fn build(ledger: FlakyLedger, loans: LoanPolicy) -> Self {
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(ledger);
        let notifier = Arc::new(RecordingNotifier::new());

        let trading = TradingService::new(store.clone(), notifier.clone()).with_loan_policy(loans);
        let resolver = Resolver::new(store.clone(), ledger.clone(), notifier.clone())
            .with_retry_policy(retry(3));

        Self {
            store,
            ledger,
            notifier,
            trading,
            resolver,
        }
    }

    /// Empty parimutuel binary market owned by `creator`.
    pub async fn empty_binary(&self, id: &str, creator: &str) -> ContractId {
        let market = NewMarket::binary(
            UserId::new(creator),
            format!("Will {id} happen?"),
            MechanismKind::Dpm,
            Decimal::ZERO,
        )
        .with_id(ContractId::new(id));
        self.trading
            .create_market(market)
            .await
            .expect("create market")
            .id
    }

    /// Constant-product binary market seeded with `ante` by `creator`.
    pub async fn pool_binary(&self, id: &str, creator: &str, ante: Amount) -> ContractId {
        let market = NewMarket::binary(
            UserId::new(creator),
            format!("Will {id} happen?"),
            MechanismKind::Cpmm,
            ante,
        )
        .with_id(ContractId::new(id));
        self.trading
            .create_market(market)
            .await
            .expect("create market")
            .id
    }

    pub async fn bet(&self, user: &str, contract_id: &ContractId, outcome: &str, amount: Amount) {
        self.trading
            .place_bet(&UserId::new(user), contract_id, outcome, amount)
            .await
            .expect("place bet");
    }

    /// A bets 100 on YES, then B bets 100 on NO.
    pub async fn two_bettors(&self, id: &str) -> ContractId {
        let contract_id = self.empty_binary(id, "carol").await;
        self.bet("alice", &contract_id, "YES", Decimal::from(100)).await;
        self.bet("bob", &contract_id, "NO", Decimal::from(100)).await;
        contract_id
    }

    pub async fn resolve_as_creator(
        &self,
        request: ResolveRequest,
    ) -> Result<ResolutionReport, oddsmith::error::ResolveError> {
        let contract = self
            .store
            .contract(&request.contract_id)
            .await
            .expect("store")
            .expect("contract exists");
        self.resolver
            .resolve(Some(&contract.creator_id), request)
            .await
    }

    pub async fn balance(&self, user: &str) -> Amount {
        self.ledger
            .balance(&UserId::new(user))
            .await
            .expect("balance")
    }
}
