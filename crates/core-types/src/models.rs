use crate::enums::{
    AssetType, MarketType, OrderDuration, OrderInstruction, OrderSession, OrderStatus, OrderType,
    PutCall,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A persisted strategy record. The `id` is `None` until the database assigns one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyRecord {
    pub id: Option<i64>,
    pub name: String,
    pub active: bool,
}

impl StrategyRecord {
    /// A new, not yet persisted, active strategy record.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            active: true,
        }
    }
}

/// A single instrument leg of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLeg {
    pub id: Option<i64>,
    pub order_id: Option<i64>,
    pub symbol: String,
    pub asset_type: AssetType,
    pub instruction: OrderInstruction,
    pub quantity: Decimal,
    pub filled_quantity: Decimal,
    pub put_call: Option<PutCall>,
    pub strike: Option<Decimal>,
    pub expiration: Option<NaiveDate>,
}

impl OrderLeg {
    /// An equity leg with nothing filled yet.
    pub fn equity(symbol: impl Into<String>, instruction: OrderInstruction, quantity: Decimal) -> Self {
        Self {
            id: None,
            order_id: None,
            symbol: symbol.into(),
            asset_type: AssetType::Equity,
            instruction,
            quantity,
            filled_quantity: Decimal::ZERO,
            put_call: None,
            strike: None,
            expiration: None,
        }
    }

    /// An option leg with nothing filled yet.
    pub fn option(
        symbol: impl Into<String>,
        instruction: OrderInstruction,
        quantity: Decimal,
        put_call: PutCall,
        strike: Decimal,
        expiration: NaiveDate,
    ) -> Self {
        Self {
            asset_type: AssetType::Option,
            put_call: Some(put_call),
            strike: Some(strike),
            expiration: Some(expiration),
            ..Self::equity(symbol, instruction, quantity)
        }
    }
}

/// An order as the bot tracks it: owned by a strategy, optionally known to a broker
/// (`broker_order_id`) and to the database (`id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Option<i64>,
    pub strategy_id: i64,
    pub broker_order_id: Option<String>,
    pub order_type: OrderType,
    pub status: OrderStatus,
    /// Limit or net price. Ignored for market orders.
    pub price: Decimal,
    pub quantity: Decimal,
    pub duration: OrderDuration,
    pub session: OrderSession,
    pub legs: Vec<OrderLeg>,
    pub entered_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// A queued day order in the normal session.
    pub fn new(strategy_id: i64, order_type: OrderType, price: Decimal, quantity: Decimal, legs: Vec<OrderLeg>) -> Self {
        Self {
            id: None,
            strategy_id,
            broker_order_id: None,
            order_type,
            status: OrderStatus::Queued,
            price,
            quantity,
            duration: OrderDuration::Day,
            session: OrderSession::Normal,
            legs,
            entered_at: None,
            closed_at: None,
        }
    }
}

/// A holding reported by a broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub asset_type: AssetType,
    pub long_quantity: Decimal,
    pub short_quantity: Decimal,
    pub average_price: Decimal,
    pub market_value: Decimal,
}

/// A point-in-time snapshot of a brokerage account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub cash_balance: Decimal,
    pub buying_power: Decimal,
    pub liquidation_value: Decimal,
    pub positions: Vec<Position>,
    pub orders: Vec<Order>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub bid: Decimal,
    pub ask: Decimal,
    pub last: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    /// The midpoint between bid and ask, or the last price if either side is missing.
    pub fn mid(&self) -> Decimal {
        if self.bid.is_zero() || self.ask.is_zero() {
            return self.last;
        }
        (self.bid + self.ask) / Decimal::TWO
    }
}

/// Trading session for a market on a given date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketHours {
    pub market: MarketType,
    pub date: NaiveDate,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub is_open: bool,
}

impl MarketHours {
    /// Whether `at` falls inside the session.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        match (self.is_open, self.start, self.end) {
            (true, Some(start), Some(end)) => start <= at && at < end,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionContract {
    pub symbol: String,
    pub put_call: PutCall,
    pub strike: Decimal,
    pub expiration: NaiveDate,
    pub bid: Decimal,
    pub ask: Decimal,
    pub delta: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionChain {
    pub underlying: String,
    pub underlying_price: Decimal,
    pub contracts: Vec<OptionContract>,
}
