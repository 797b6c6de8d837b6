//! Test doubles shared by the engine integration tests.
#![allow(dead_code)]

use alerter::{AlerterError, Notifier};
use async_trait::async_trait;
use broker::{Broker, BrokerError};
use chrono::Utc;
use core_types::{Account, MarketHours, OptionChain, Order, OrderStatus, OrderType, Quote};
use database::{Database, DbError, InMemoryDatabase};
use engine::{Bot, BotSettings, EngineError};
use mediator::*;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use strategies::{Strategy, StrategyError, StrategyIdentity};
use tokio::time::Instant;

// --- Broker ---

/// A broker that answers every call with a canned response and logs which calls it received.
pub struct MockBroker {
    pub name: String,
    account: Option<Account>,
    fail_accounts: AtomicBool,
    calls: Mutex<Vec<&'static str>>,
    mediator: MediatorSlot,
}

impl MockBroker {
    pub fn new(name: &str) -> Arc<Self> {
        Self::with_account(name, Some(account(name)))
    }

    /// A broker whose account lookups find nothing.
    pub fn empty(name: &str) -> Arc<Self> {
        Self::with_account(name, None)
    }

    fn with_account(name: &str, account: Option<Account>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            account,
            fail_accounts: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            mediator: MediatorSlot::new(),
        })
    }

    pub fn fail_accounts(&self) {
        self.fail_accounts.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls().iter().filter(|c| **c == operation).count()
    }

    pub fn has_mediator(&self) -> bool {
        self.mediator.is_bound()
    }

    fn record(&self, operation: &'static str) {
        self.calls.lock().unwrap().push(operation);
    }
}

pub fn account(account_id: &str) -> Account {
    Account {
        account_id: account_id.to_string(),
        cash_balance: Decimal::new(1000, 0),
        buying_power: Decimal::new(1000, 0),
        liquidation_value: Decimal::new(1000, 0),
        positions: Vec::new(),
        orders: Vec::new(),
    }
}

#[async_trait]
impl Broker for MockBroker {
    fn set_mediator(&self, mediator: Weak<dyn Mediator>) {
        self.mediator.set(mediator);
    }

    async fn get_account(&self, _: &GetAccountRequest) -> Result<Option<GetAccountResponse>, BrokerError> {
        self.record("get_account");
        if self.fail_accounts.load(Ordering::SeqCst) {
            return Err(BrokerError::Request(format!("{} is down", self.name)));
        }
        Ok(self.account.clone().map(|account| GetAccountResponse { account }))
    }

    async fn place_order(&self, request: &PlaceOrderRequest) -> Result<Option<PlaceOrderResponse>, BrokerError> {
        self.record("place_order");
        Ok(Some(PlaceOrderResponse {
            broker_order_id: format!("{}-{}", self.name, request.order.strategy_id),
        }))
    }

    async fn cancel_order(&self, _: &CancelOrderRequest) -> Result<Option<CancelOrderResponse>, BrokerError> {
        self.record("cancel_order");
        Ok(Some(CancelOrderResponse { accepted: true }))
    }

    async fn get_order(&self, request: &GetOrderRequest) -> Result<Option<GetOrderResponse>, BrokerError> {
        self.record("get_order");
        let mut order = Order::new(request.strategy_id, OrderType::Market, Decimal::ZERO, Decimal::ONE, Vec::new());
        order.broker_order_id = Some(request.broker_order_id.clone());
        order.status = OrderStatus::Working;
        Ok(Some(GetOrderResponse { order }))
    }

    async fn get_market_hours(
        &self,
        request: &GetMarketHoursRequest,
    ) -> Result<Option<GetMarketHoursResponse>, BrokerError> {
        self.record("get_market_hours");
        Ok(Some(GetMarketHoursResponse {
            hours: MarketHours {
                market: request.market,
                date: request.date,
                start: None,
                end: None,
                is_open: false,
            },
        }))
    }

    async fn get_quote(&self, request: &GetQuoteRequest) -> Result<Option<GetQuoteResponse>, BrokerError> {
        self.record("get_quote");
        let quotes = request
            .symbols
            .iter()
            .map(|symbol| Quote {
                symbol: symbol.clone(),
                bid: Decimal::ONE,
                ask: Decimal::TWO,
                last: Decimal::ONE,
                timestamp: Utc::now(),
            })
            .collect();
        Ok(Some(GetQuoteResponse { quotes }))
    }

    async fn get_option_chain(
        &self,
        request: &GetOptionChainRequest,
    ) -> Result<Option<GetOptionChainResponse>, BrokerError> {
        self.record("get_option_chain");
        Ok(Some(GetOptionChainResponse {
            chain: OptionChain {
                underlying: request.symbol.clone(),
                underlying_price: Decimal::ONE,
                contracts: Vec::new(),
            },
        }))
    }
}

// --- Database ---

/// An in-memory database that counts reconciliation calls and can be made to fail.
#[derive(Default)]
pub struct CountingDatabase {
    pub inner: InMemoryDatabase,
    reads: AtomicUsize,
    creates: AtomicUsize,
    unreachable: AtomicBool,
    mediator: MediatorSlot,
}

impl CountingDatabase {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn unreachable() -> Arc<Self> {
        let db = Self::default();
        db.unreachable.store(true, Ordering::SeqCst);
        Arc::new(db)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn has_mediator(&self) -> bool {
        self.mediator.is_bound()
    }

    fn check(&self) -> Result<(), DbError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(DbError::ConnectionConfigError("database is unreachable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Database for CountingDatabase {
    fn set_mediator(&self, mediator: Weak<dyn Mediator>) {
        self.mediator.set(mediator);
    }

    async fn read_first_strategy_by_name(
        &self,
        request: &ReadStrategyByNameRequest,
    ) -> Result<ReadStrategyByNameResponse, DbError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.read_first_strategy_by_name(request).await
    }

    async fn create_strategy(&self, request: &CreateStrategyRequest) -> Result<CreateStrategyResponse, DbError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.create_strategy(request).await
    }

    async fn create_order(&self, request: &CreateOrderRequest) -> Result<Option<CreateOrderResponse>, DbError> {
        self.check()?;
        self.inner.create_order(request).await
    }

    async fn update_order(&self, request: &UpdateOrderRequest) -> Result<Option<UpdateOrderResponse>, DbError> {
        self.check()?;
        self.inner.update_order(request).await
    }

    async fn read_active_orders(
        &self,
        request: &ReadActiveOrdersRequest,
    ) -> Result<Option<ReadActiveOrdersResponse>, DbError> {
        self.check()?;
        self.inner.read_active_orders(request).await
    }

    async fn read_offset_legs_by_expiration(
        &self,
        request: &ReadOffsetLegsByExpirationRequest,
    ) -> Result<Option<ReadOffsetLegsByExpirationResponse>, DbError> {
        self.check()?;
        self.inner.read_offset_legs_by_expiration(request).await
    }
}

// --- Notifier ---

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
    failing: AtomicBool,
    mediator: MediatorSlot,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let notifier = Self::default();
        notifier.failing.store(true, Ordering::SeqCst);
        Arc::new(notifier)
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn count(&self, message: &str) -> usize {
        self.messages().iter().filter(|m| *m == message).count()
    }

    pub fn has_mediator(&self) -> bool {
        self.mediator.is_bound()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn set_mediator(&self, mediator: Weak<dyn Mediator>) {
        self.mediator.set(mediator);
    }

    async fn send_notification(&self, request: &SendNotificationRequest) -> Result<(), AlerterError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AlerterError::ApiError("chat not found".to_string()));
        }
        self.messages.lock().unwrap().push(request.message.clone());
        Ok(())
    }
}

// --- Strategy ---

/// A strategy whose decision cycle is scripted by the test.
pub struct ScriptedStrategy {
    identity: StrategyIdentity,
    work: Duration,
    failing: bool,
    kill_after: Option<usize>,
    runs: AtomicUsize,
    started: Mutex<Vec<Instant>>,
}

impl ScriptedStrategy {
    pub fn new(name: &str) -> Self {
        Self {
            identity: StrategyIdentity::new(name),
            work: Duration::ZERO,
            failing: false,
            kill_after: None,
            runs: AtomicUsize::new(0),
            started: Mutex::new(Vec::new()),
        }
    }

    /// Each cycle takes `work` of (tokio) time.
    pub fn working_for(mut self, work: Duration) -> Self {
        self.work = work;
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Sets the bot's kill switch at the end of its `runs`-th cycle.
    pub fn killing_after(mut self, runs: usize) -> Self {
        self.kill_after = Some(runs);
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> Vec<Instant> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl Strategy for ScriptedStrategy {
    fn strategy_name(&self) -> &str {
        self.identity.name()
    }

    fn strategy_id(&self) -> Option<i64> {
        self.identity.id()
    }

    fn bind(&self, strategy_id: i64, mediator: Weak<dyn Mediator>) -> Result<(), StrategyError> {
        self.identity.bind(strategy_id, mediator)
    }

    async fn process_strategy(&self) -> Result<(), StrategyError> {
        self.started.lock().unwrap().push(Instant::now());
        let runs = self.runs.fetch_add(1, Ordering::SeqCst) + 1;

        if !self.work.is_zero() {
            tokio::time::sleep(self.work).await;
        }
        if self.failing {
            return Err(StrategyError::InvalidParameters("scripted failure".to_string()));
        }
        if self.kill_after == Some(runs) {
            let (_, mediator) = self.identity.context()?;
            mediator.set_kill_switch(&SetKillSwitchRequest { kill_switch: true });
        }
        Ok(())
    }
}

// --- Assembly ---

pub type Table = Vec<(Arc<dyn Strategy>, Arc<dyn Broker>)>;

pub fn bind(strategy: &Arc<ScriptedStrategy>, broker: &Arc<MockBroker>) -> (Arc<dyn Strategy>, Arc<dyn Broker>) {
    let strategy: Arc<dyn Strategy> = strategy.clone();
    let broker: Arc<dyn Broker> = broker.clone();
    (strategy, broker)
}

pub async fn build_bot(
    notifier: &Arc<RecordingNotifier>,
    database: &Arc<CountingDatabase>,
    table: Table,
    settings: BotSettings,
) -> Result<Arc<Bot>, EngineError> {
    let notifier: Arc<dyn Notifier> = notifier.clone();
    let database: Arc<dyn Database> = database.clone();
    Bot::new(notifier, database, table, settings).await
}

pub fn every(period: Duration) -> BotSettings {
    BotSettings {
        loop_period: period,
        ..BotSettings::default()
    }
}

/// Whether `handle` points at the same broker instance as `broker`.
pub fn is_broker(handle: &Arc<dyn Broker>, broker: &Arc<MockBroker>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(handle), Arc::as_ptr(broker))
}
