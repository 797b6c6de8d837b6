//! Request/response envelopes for every operation that crosses the mediator.
//!
//! Requests are built by the caller and borrowed by the call; responses are owned by the caller
//! once returned. None of them are mutated in transit.

use chrono::NaiveDate;
use core_types::{
    Account, MarketHours, MarketType, OptionChain, Order, OrderLeg, PutCall, Quote,
    StrategyRecord,
};
use serde::{Deserialize, Serialize};

/// A request that is routed to the broker bound to a strategy.
pub trait Routed {
    /// The routing key: the id of the strategy the request belongs to.
    fn strategy_id(&self) -> i64;
}

macro_rules! routed_by_field {
    ($($request:ty),+ $(,)?) => {
        $(impl Routed for $request {
            fn strategy_id(&self) -> i64 {
                self.strategy_id
            }
        })+
    };
}

// --- Broker envelopes ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAccountRequest {
    pub strategy_id: i64,
    /// Include working and recent orders in the snapshot.
    pub orders: bool,
    /// Include open positions in the snapshot.
    pub positions: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAccountResponse {
    pub account: Account,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAllAccountsRequest {
    #[serde(default)]
    pub orders: bool,
    #[serde(default)]
    pub positions: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAllAccountsResponse {
    pub accounts: Vec<GetAccountResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    /// The order to place. Its `strategy_id` is the routing key.
    pub order: Order,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrderResponse {
    pub broker_order_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrderRequest {
    pub strategy_id: i64,
    pub broker_order_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrderResponse {
    pub accepted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetOrderRequest {
    pub strategy_id: i64,
    pub broker_order_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetOrderResponse {
    pub order: Order,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetMarketHoursRequest {
    pub strategy_id: i64,
    pub market: MarketType,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetMarketHoursResponse {
    pub hours: MarketHours,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetQuoteRequest {
    pub strategy_id: i64,
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetQuoteResponse {
    pub quotes: Vec<Quote>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetOptionChainRequest {
    pub strategy_id: i64,
    pub symbol: String,
    /// Restrict the chain to puts or calls.
    pub contract_type: Option<PutCall>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    /// Number of strikes above and below the underlying price.
    pub strike_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetOptionChainResponse {
    pub chain: OptionChain,
}

routed_by_field!(
    GetAccountRequest,
    CancelOrderRequest,
    GetOrderRequest,
    GetMarketHoursRequest,
    GetQuoteRequest,
    GetOptionChainRequest,
);

impl Routed for PlaceOrderRequest {
    fn strategy_id(&self) -> i64 {
        self.order.strategy_id
    }
}

// --- Notifier and lifecycle envelopes ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendNotificationRequest {
    pub message: String,
}

impl SendNotificationRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetKillSwitchRequest {
    pub kill_switch: bool,
}

// --- Database envelopes ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadStrategyByNameRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadStrategyByNameResponse {
    pub strategy: Option<StrategyRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateStrategyRequest {
    pub strategy: StrategyRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateStrategyResponse {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub order: Order,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderResponse {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOrderRequest {
    /// The order to overwrite; its `id` selects the row.
    pub order: Order,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOrderResponse {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadActiveOrdersRequest {
    pub strategy_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadActiveOrdersResponse {
    pub orders: Vec<Order>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadOffsetLegsByExpirationRequest {
    pub strategy_id: i64,
    pub put_call: PutCall,
    pub expiration: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadOffsetLegsByExpirationResponse {
    pub offset_legs: Vec<OrderLeg>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::OrderType;
    use rust_decimal_macros::dec;

    #[test]
    fn place_order_routes_by_the_order_owner() {
        let order = Order::new(42, OrderType::Market, dec!(0), dec!(1), Vec::new());
        assert_eq!(PlaceOrderRequest { order }.strategy_id(), 42);
    }

    #[test]
    fn field_routed_requests_expose_their_key() {
        let request = GetQuoteRequest {
            strategy_id: 7,
            symbols: vec!["SPY".to_string()],
        };
        assert_eq!(request.strategy_id(), 7);
    }
}
