//! A scripted mediator for exercising strategies without a bot.

use async_trait::async_trait;
use core_types::{MarketHours, Order, Quote};
use mediator::*;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub(crate) struct FakeMediator {
    pub hours: Mutex<Option<MarketHours>>,
    pub quotes: Mutex<Vec<Quote>>,
    pub active_orders: Mutex<Vec<Order>>,
    pub broker_orders: Mutex<HashMap<String, Order>>,
    pub updated: Mutex<Vec<Order>>,
    pub notifications: Mutex<Vec<String>>,
    pub quote_requests: AtomicUsize,
}

impl FakeMediator {
    pub fn quote_requests(&self) -> usize {
        self.quote_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Mediator for FakeMediator {
    async fn get_account(&self, _: &GetAccountRequest) -> Result<Option<GetAccountResponse>, MediatorError> {
        Ok(None)
    }

    async fn get_all_accounts(&self, _: &GetAllAccountsRequest) -> Result<GetAllAccountsResponse, MediatorError> {
        Ok(GetAllAccountsResponse::default())
    }

    async fn place_order(&self, _: &PlaceOrderRequest) -> Result<Option<PlaceOrderResponse>, MediatorError> {
        Ok(None)
    }

    async fn cancel_order(&self, _: &CancelOrderRequest) -> Result<Option<CancelOrderResponse>, MediatorError> {
        Ok(None)
    }

    async fn get_order(&self, request: &GetOrderRequest) -> Result<Option<GetOrderResponse>, MediatorError> {
        let orders = self.broker_orders.lock().unwrap();
        Ok(orders
            .get(&request.broker_order_id)
            .map(|order| GetOrderResponse { order: order.clone() }))
    }

    async fn get_market_hours(
        &self,
        _: &GetMarketHoursRequest,
    ) -> Result<Option<GetMarketHoursResponse>, MediatorError> {
        let hours = self.hours.lock().unwrap().clone();
        Ok(hours.map(|hours| GetMarketHoursResponse { hours }))
    }

    async fn get_quote(&self, request: &GetQuoteRequest) -> Result<Option<GetQuoteResponse>, MediatorError> {
        self.quote_requests.fetch_add(1, Ordering::SeqCst);
        let quotes: Vec<Quote> = self
            .quotes
            .lock()
            .unwrap()
            .iter()
            .filter(|q| request.symbols.contains(&q.symbol))
            .cloned()
            .collect();
        Ok((!quotes.is_empty()).then_some(GetQuoteResponse { quotes }))
    }

    async fn get_option_chain(
        &self,
        _: &GetOptionChainRequest,
    ) -> Result<Option<GetOptionChainResponse>, MediatorError> {
        Ok(None)
    }

    async fn send_notification(&self, request: &SendNotificationRequest) {
        self.notifications.lock().unwrap().push(request.message.clone());
    }

    fn set_kill_switch(&self, _: &SetKillSwitchRequest) {}

    fn pause_bot(&self) {}

    fn resume_bot(&self) {}

    fn get_all_strategies(&self) -> Vec<String> {
        Vec::new()
    }

    async fn create_db_strategy(&self, _: &CreateStrategyRequest) -> Result<CreateStrategyResponse, MediatorError> {
        Ok(CreateStrategyResponse { id: 1 })
    }

    async fn create_db_order(&self, _: &CreateOrderRequest) -> Result<Option<CreateOrderResponse>, MediatorError> {
        Ok(None)
    }

    async fn update_db_order(&self, request: &UpdateOrderRequest) -> Result<Option<UpdateOrderResponse>, MediatorError> {
        self.updated.lock().unwrap().push(request.order.clone());
        Ok(request.order.id.map(|id| UpdateOrderResponse { id }))
    }

    async fn read_active_orders(
        &self,
        _: &ReadActiveOrdersRequest,
    ) -> Result<Option<ReadActiveOrdersResponse>, MediatorError> {
        let orders = self.active_orders.lock().unwrap().clone();
        Ok(Some(ReadActiveOrdersResponse { orders }))
    }

    async fn read_offset_legs_by_expiration(
        &self,
        _: &ReadOffsetLegsByExpirationRequest,
    ) -> Result<Option<ReadOffsetLegsByExpirationResponse>, MediatorError> {
        Ok(None)
    }
}
