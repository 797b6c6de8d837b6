use crate::{Broker, BrokerError};
use async_trait::async_trait;
use chrono::{Datelike, NaiveTime, Utc, Weekday};
use configuration::PaperBrokerConfig;
use core_types::{
    Account, AssetType, MarketHours, OptionChain, Order, OrderLeg, OrderStatus, OrderType,
    Position, Quote,
};
use mediator::{
    CancelOrderRequest, CancelOrderResponse, GetAccountRequest, GetAccountResponse,
    GetMarketHoursRequest, GetMarketHoursResponse, GetOptionChainRequest, GetOptionChainResponse,
    GetOrderRequest, GetOrderResponse, GetQuoteRequest, GetQuoteResponse, Mediator, MediatorSlot,
    PlaceOrderRequest, PlaceOrderResponse, SendNotificationRequest,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, HashMap};
use std::sync::Weak;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Shares per option contract.
const OPTION_MULTIPLIER: Decimal = dec!(100);

fn multiplier(asset_type: AssetType) -> Decimal {
    match asset_type {
        AssetType::Option => OPTION_MULTIPLIER,
        AssetType::Equity | AssetType::Index => Decimal::ONE,
    }
}

fn normalize(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// A net holding in one symbol. Positive quantities are long, negative are short.
#[derive(Debug, Clone)]
struct Holding {
    asset_type: AssetType,
    net_quantity: Decimal,
    average_price: Decimal,
}

impl Holding {
    fn apply(&mut self, buy: bool, quantity: Decimal, price: Decimal) {
        let signed = if buy { quantity } else { -quantity };
        let held = self.net_quantity.abs();
        let adds_to_position = self.net_quantity.is_zero()
            || self.net_quantity.is_sign_positive() == signed.is_sign_positive();

        if adds_to_position {
            self.average_price = (self.average_price * held + price * quantity) / (held + quantity);
        } else if quantity > held {
            // The fill closed the position and opened one on the other side.
            self.average_price = price;
        }
        self.net_quantity += signed;
    }
}

/// Cash, holdings and the order blotter of the simulated account.
#[derive(Debug)]
struct Ledger {
    cash: Decimal,
    holdings: BTreeMap<String, Holding>,
    /// Every order ever accepted, in submission order.
    orders: Vec<Order>,
}

impl Ledger {
    /// Fills every leg of `order` at the matching entry of `prices`.
    ///
    /// The ledger is left untouched when the account cannot pay for the order.
    fn apply_fill(&mut self, order: &mut Order, prices: &[Decimal]) -> Result<(), BrokerError> {
        let cash_delta: Decimal = order
            .legs
            .iter()
            .zip(prices)
            .map(|(leg, price)| {
                let notional = *price * leg.quantity * multiplier(leg.asset_type);
                if leg.instruction.is_buy() { -notional } else { notional }
            })
            .sum();

        if (self.cash + cash_delta).is_sign_negative() {
            return Err(BrokerError::InsufficientFunds {
                required: (-cash_delta).to_string(),
                available: self.cash.to_string(),
            });
        }
        self.cash += cash_delta;

        for (leg, price) in order.legs.iter_mut().zip(prices) {
            let symbol = normalize(&leg.symbol);
            let flat = {
                let holding = self.holdings.entry(symbol.clone()).or_insert_with(|| Holding {
                    asset_type: leg.asset_type,
                    net_quantity: Decimal::ZERO,
                    average_price: Decimal::ZERO,
                });
                holding.apply(leg.instruction.is_buy(), leg.quantity, *price);
                holding.net_quantity.is_zero()
            };
            if flat {
                self.holdings.remove(&symbol);
            }
            leg.filled_quantity = leg.quantity;
        }

        order.status = OrderStatus::Filled;
        order.closed_at = Some(Utc::now());
        Ok(())
    }

    /// The order with `broker_order_id`, provided it was placed by `strategy_id`.
    fn order_mut(&mut self, strategy_id: i64, broker_order_id: &str) -> Option<&mut Order> {
        self.orders.iter_mut().find(|o| {
            o.strategy_id == strategy_id && o.broker_order_id.as_deref() == Some(broker_order_id)
        })
    }
}

#[derive(Debug, Default)]
struct MarketBook {
    quotes: HashMap<String, Quote>,
    chains: HashMap<String, OptionChain>,
}

impl MarketBook {
    fn mark(&self, symbol: &str) -> Option<Decimal> {
        self.quotes.get(symbol).map(Quote::mid)
    }
}

/// The "virtual brokerage" for paper trading.
///
/// Market orders fill immediately at the quote midpoint. Single-leg limit orders rest as
/// `WORKING` until a quote crosses their price; multi-leg net orders rest until canceled.
/// Fills are reported to the bot as notifications once a mediator has been registered.
#[derive(Debug)]
pub struct PaperBroker {
    name: String,
    account_id: String,
    session_open: NaiveTime,
    session_close: NaiveTime,
    book: RwLock<MarketBook>,
    ledger: Mutex<Ledger>,
    mediator: MediatorSlot,
}

impl PaperBroker {
    pub fn from_config(name: &str, config: &PaperBrokerConfig) -> Self {
        let now = Utc::now();
        let quotes = config
            .quotes
            .iter()
            .map(|(symbol, last)| {
                let symbol = normalize(symbol);
                let quote = Quote {
                    symbol: symbol.clone(),
                    bid: *last,
                    ask: *last,
                    last: *last,
                    timestamp: now,
                };
                (symbol, quote)
            })
            .collect();

        Self {
            name: name.to_string(),
            account_id: config.account_id.clone(),
            session_open: config.session_open,
            session_close: config.session_close,
            book: RwLock::new(MarketBook {
                quotes,
                chains: HashMap::new(),
            }),
            ledger: Mutex::new(Ledger {
                cash: config.starting_cash,
                holdings: BTreeMap::new(),
                orders: Vec::new(),
            }),
            mediator: MediatorSlot::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Publishes a new quote and fills any resting limit order it crosses.
    pub async fn set_quote(&self, quote: Quote) {
        let symbol = normalize(&quote.symbol);
        self.book
            .write()
            .await
            .quotes
            .insert(symbol.clone(), Quote { symbol, ..quote });

        for order in self.match_working_orders().await {
            self.notify_fill(&order).await;
        }
    }

    pub async fn set_option_chain(&self, chain: OptionChain) {
        let underlying = normalize(&chain.underlying);
        self.book.write().await.chains.insert(underlying, chain);
    }

    async fn match_working_orders(&self) -> Vec<Order> {
        let book = self.book.read().await;
        let mut ledger = self.ledger.lock().await;
        let mut fills = Vec::new();

        for index in 0..ledger.orders.len() {
            let candidate = &ledger.orders[index];
            if candidate.status != OrderStatus::Working
                || candidate.order_type != OrderType::Limit
                || candidate.legs.len() != 1
            {
                continue;
            }
            let leg = &candidate.legs[0];
            let Some(quote) = book.quotes.get(&normalize(&leg.symbol)) else {
                continue;
            };
            let crosses = if leg.instruction.is_buy() {
                !quote.ask.is_zero() && quote.ask <= candidate.price
            } else {
                !quote.bid.is_zero() && quote.bid >= candidate.price
            };
            if !crosses {
                continue;
            }

            let mut order = candidate.clone();
            let price = order.price;
            match ledger.apply_fill(&mut order, &[price]) {
                Ok(()) => {
                    ledger.orders[index] = order.clone();
                    fills.push(order);
                }
                Err(e) => {
                    tracing::warn!(broker = %self.name, error = %e, "Could not fill resting limit order.");
                }
            }
        }
        fills
    }

    /// Prices each leg at its quote midpoint. A leg without a quote cannot be filled.
    async fn market_prices(&self, legs: &[OrderLeg]) -> Result<Vec<Decimal>, BrokerError> {
        let book = self.book.read().await;
        legs.iter()
            .map(|leg| {
                book.mark(&normalize(&leg.symbol))
                    .ok_or_else(|| BrokerError::OrderRejected(format!("no quote for {}", leg.symbol)))
            })
            .collect()
    }

    async fn notify_fill(&self, order: &Order) {
        let Ok(mediator) = self.mediator.get() else {
            return;
        };
        let message = format!(
            "{}: order {} filled ({} leg(s), price {}).",
            self.name,
            order.broker_order_id.as_deref().unwrap_or("-"),
            order.legs.len(),
            order.price
        );
        mediator
            .send_notification(&SendNotificationRequest::new(message))
            .await;
    }
}

fn validate(order: &Order) -> Result<(), BrokerError> {
    if order.legs.is_empty() {
        return Err(BrokerError::InvalidOrder("order has no legs".to_string()));
    }
    if let Some(leg) = order.legs.iter().find(|l| l.quantity <= Decimal::ZERO) {
        return Err(BrokerError::InvalidOrder(format!(
            "leg {} has a non-positive quantity",
            leg.symbol
        )));
    }
    if order.order_type != OrderType::Market && order.price <= Decimal::ZERO {
        return Err(BrokerError::InvalidOrder(format!(
            "{} orders need a positive price",
            order.order_type
        )));
    }
    Ok(())
}

#[async_trait]
impl Broker for PaperBroker {
    fn set_mediator(&self, mediator: Weak<dyn Mediator>) {
        self.mediator.set(mediator);
    }

    async fn get_account(
        &self,
        request: &GetAccountRequest,
    ) -> Result<Option<GetAccountResponse>, BrokerError> {
        let book = self.book.read().await;
        let ledger = self.ledger.lock().await;

        let positions: Vec<Position> = ledger
            .holdings
            .iter()
            .map(|(symbol, holding)| {
                let mark = book.mark(symbol).unwrap_or(holding.average_price);
                Position {
                    symbol: symbol.clone(),
                    asset_type: holding.asset_type,
                    long_quantity: holding.net_quantity.max(Decimal::ZERO),
                    short_quantity: (-holding.net_quantity).max(Decimal::ZERO),
                    average_price: holding.average_price,
                    market_value: holding.net_quantity * mark * multiplier(holding.asset_type),
                }
            })
            .collect();
        let liquidation_value = ledger.cash + positions.iter().map(|p| p.market_value).sum::<Decimal>();

        let account = Account {
            account_id: self.account_id.clone(),
            cash_balance: ledger.cash,
            buying_power: ledger.cash,
            liquidation_value,
            positions: if request.positions { positions } else { Vec::new() },
            orders: if request.orders { ledger.orders.clone() } else { Vec::new() },
        };
        Ok(Some(GetAccountResponse { account }))
    }

    async fn place_order(
        &self,
        request: &PlaceOrderRequest,
    ) -> Result<Option<PlaceOrderResponse>, BrokerError> {
        let mut order = request.order.clone();
        validate(&order)?;

        let broker_order_id = Uuid::new_v4().to_string();
        order.broker_order_id = Some(broker_order_id.clone());
        order.entered_at = Some(Utc::now());

        let filled = if order.order_type == OrderType::Market {
            let prices = self.market_prices(&order.legs).await?;
            let mut ledger = self.ledger.lock().await;
            ledger.apply_fill(&mut order, &prices)?;
            ledger.orders.push(order.clone());
            true
        } else {
            order.status = OrderStatus::Working;
            self.ledger.lock().await.orders.push(order.clone());
            false
        };

        tracing::info!(
            broker = %self.name,
            strategy_id = order.strategy_id,
            %broker_order_id,
            status = %order.status,
            "Paper order accepted."
        );
        if filled {
            self.notify_fill(&order).await;
        }
        Ok(Some(PlaceOrderResponse { broker_order_id }))
    }

    async fn cancel_order(
        &self,
        request: &CancelOrderRequest,
    ) -> Result<Option<CancelOrderResponse>, BrokerError> {
        let mut ledger = self.ledger.lock().await;
        let Some(order) = ledger.order_mut(request.strategy_id, &request.broker_order_id) else {
            return Ok(None);
        };
        if !order.status.is_active() {
            return Ok(Some(CancelOrderResponse { accepted: false }));
        }
        order.status = OrderStatus::Canceled;
        order.closed_at = Some(Utc::now());
        Ok(Some(CancelOrderResponse { accepted: true }))
    }

    async fn get_order(
        &self,
        request: &GetOrderRequest,
    ) -> Result<Option<GetOrderResponse>, BrokerError> {
        let mut ledger = self.ledger.lock().await;
        Ok(ledger
            .order_mut(request.strategy_id, &request.broker_order_id)
            .map(|order| GetOrderResponse { order: order.clone() }))
    }

    async fn get_market_hours(
        &self,
        request: &GetMarketHoursRequest,
    ) -> Result<Option<GetMarketHoursResponse>, BrokerError> {
        let date = request.date;
        let hours = if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            MarketHours {
                market: request.market,
                date,
                start: None,
                end: None,
                is_open: false,
            }
        } else {
            MarketHours {
                market: request.market,
                date,
                start: Some(date.and_time(self.session_open).and_utc()),
                end: Some(date.and_time(self.session_close).and_utc()),
                is_open: true,
            }
        };
        Ok(Some(GetMarketHoursResponse { hours }))
    }

    async fn get_quote(
        &self,
        request: &GetQuoteRequest,
    ) -> Result<Option<GetQuoteResponse>, BrokerError> {
        let book = self.book.read().await;
        let quotes: Vec<Quote> = request
            .symbols
            .iter()
            .filter_map(|symbol| book.quotes.get(&normalize(symbol)).cloned())
            .collect();

        if quotes.is_empty() {
            return Ok(None);
        }
        Ok(Some(GetQuoteResponse { quotes }))
    }

    async fn get_option_chain(
        &self,
        request: &GetOptionChainRequest,
    ) -> Result<Option<GetOptionChainResponse>, BrokerError> {
        let book = self.book.read().await;
        let Some(chain) = book.chains.get(&normalize(&request.symbol)) else {
            return Ok(None);
        };

        let mut contracts: Vec<_> = chain
            .contracts
            .iter()
            .filter(|c| request.contract_type.is_none_or(|t| c.put_call == t))
            .filter(|c| request.from_date.is_none_or(|d| c.expiration >= d))
            .filter(|c| request.to_date.is_none_or(|d| c.expiration <= d))
            .cloned()
            .collect();

        if let Some(count) = request.strike_count {
            let count = count as usize;
            let mut strikes: Vec<Decimal> = contracts.iter().map(|c| c.strike).collect();
            strikes.sort();
            strikes.dedup();
            let underlying = chain.underlying_price;
            let mut kept: Vec<Decimal> = strikes.iter().filter(|s| **s <= underlying).rev().take(count).copied().collect();
            kept.extend(strikes.iter().filter(|s| **s > underlying).take(count));
            contracts.retain(|c| kept.contains(&c.strike));
        }

        Ok(Some(GetOptionChainResponse {
            chain: OptionChain {
                underlying: chain.underlying.clone(),
                underlying_price: chain.underlying_price,
                contracts,
            },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_types::{MarketType, OptionContract, OrderInstruction, PutCall};

    fn broker() -> PaperBroker {
        let config = PaperBrokerConfig {
            starting_cash: dec!(10000),
            quotes: HashMap::from([("spy".to_string(), dec!(500))]),
            ..PaperBrokerConfig::default()
        };
        PaperBroker::from_config("paper", &config)
    }

    fn quote(symbol: &str, bid: Decimal, ask: Decimal) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            bid,
            ask,
            last: (bid + ask) / Decimal::TWO,
            timestamp: Utc::now(),
        }
    }

    fn equity_order(order_type: OrderType, instruction: OrderInstruction, qty: Decimal, price: Decimal) -> PlaceOrderRequest {
        let legs = vec![OrderLeg::equity("SPY", instruction, qty)];
        PlaceOrderRequest {
            order: Order::new(1, order_type, price, qty, legs),
        }
    }

    async fn account(broker: &PaperBroker) -> Account {
        let request = GetAccountRequest {
            strategy_id: 1,
            orders: true,
            positions: true,
        };
        broker.get_account(&request).await.unwrap().unwrap().account
    }

    #[tokio::test]
    async fn market_order_fills_at_mid_and_moves_cash() {
        let broker = broker();
        let placed = broker
            .place_order(&equity_order(OrderType::Market, OrderInstruction::Buy, dec!(10), dec!(0)))
            .await
            .unwrap()
            .unwrap();

        let account = account(&broker).await;
        assert_eq!(account.cash_balance, dec!(5000));
        assert_eq!(account.liquidation_value, dec!(10000));
        assert_eq!(account.positions.len(), 1);
        assert_eq!(account.positions[0].long_quantity, dec!(10));
        assert_eq!(account.positions[0].average_price, dec!(500));

        let order = broker
            .get_order(&GetOrderRequest { strategy_id: 1, broker_order_id: placed.broker_order_id })
            .await
            .unwrap()
            .unwrap()
            .order;
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.legs[0].filled_quantity, dec!(10));
    }

    #[tokio::test]
    async fn orders_are_only_visible_to_the_strategy_that_placed_them() {
        let broker = broker();
        let placed = broker
            .place_order(&equity_order(OrderType::Limit, OrderInstruction::Buy, dec!(2), dec!(490)))
            .await
            .unwrap()
            .unwrap();

        let foreign = GetOrderRequest { strategy_id: 2, broker_order_id: placed.broker_order_id.clone() };
        assert!(broker.get_order(&foreign).await.unwrap().is_none());
        let cancel = CancelOrderRequest { strategy_id: 2, broker_order_id: placed.broker_order_id.clone() };
        assert!(broker.cancel_order(&cancel).await.unwrap().is_none());

        let own = GetOrderRequest { strategy_id: 1, broker_order_id: placed.broker_order_id };
        let order = broker.get_order(&own).await.unwrap().unwrap().order;
        assert_eq!(order.status, OrderStatus::Working);
    }

    #[tokio::test]
    async fn selling_the_whole_position_flattens_it() {
        let broker = broker();
        for instruction in [OrderInstruction::Buy, OrderInstruction::Sell] {
            broker
                .place_order(&equity_order(OrderType::Market, instruction, dec!(4), dec!(0)))
                .await
                .unwrap();
        }
        let account = account(&broker).await;
        assert!(account.positions.is_empty());
        assert_eq!(account.cash_balance, dec!(10000));
        assert_eq!(account.orders.len(), 2);
    }

    #[tokio::test]
    async fn market_orders_need_quotes_and_cash() {
        let broker = broker();
        let mut unknown = equity_order(OrderType::Market, OrderInstruction::Buy, dec!(1), dec!(0));
        unknown.order.legs[0].symbol = "QQQ".to_string();
        assert!(matches!(
            broker.place_order(&unknown).await,
            Err(BrokerError::OrderRejected(_))
        ));

        let too_big = equity_order(OrderType::Market, OrderInstruction::Buy, dec!(100), dec!(0));
        assert!(matches!(
            broker.place_order(&too_big).await,
            Err(BrokerError::InsufficientFunds { .. })
        ));
        assert_eq!(account(&broker).await.cash_balance, dec!(10000));
    }

    #[tokio::test]
    async fn limit_order_rests_until_a_quote_crosses() {
        let broker = broker();
        let placed = broker
            .place_order(&equity_order(OrderType::Limit, OrderInstruction::Buy, dec!(2), dec!(490)))
            .await
            .unwrap()
            .unwrap();
        let request = GetOrderRequest { strategy_id: 1, broker_order_id: placed.broker_order_id };
        let status = |r: Option<GetOrderResponse>| r.unwrap().order.status;

        assert_eq!(status(broker.get_order(&request).await.unwrap()), OrderStatus::Working);

        broker.set_quote(quote("SPY", dec!(494), dec!(495))).await;
        assert_eq!(status(broker.get_order(&request).await.unwrap()), OrderStatus::Working);

        broker.set_quote(quote("SPY", dec!(489), dec!(490))).await;
        assert_eq!(status(broker.get_order(&request).await.unwrap()), OrderStatus::Filled);
        assert_eq!(account(&broker).await.cash_balance, dec!(9020));
    }

    #[tokio::test]
    async fn cancel_only_accepts_active_orders() {
        let broker = broker();
        let working = broker
            .place_order(&equity_order(OrderType::Limit, OrderInstruction::Buy, dec!(1), dec!(400)))
            .await
            .unwrap()
            .unwrap();
        let cancel = CancelOrderRequest { strategy_id: 1, broker_order_id: working.broker_order_id };

        assert_eq!(broker.cancel_order(&cancel).await.unwrap(), Some(CancelOrderResponse { accepted: true }));
        assert_eq!(broker.cancel_order(&cancel).await.unwrap(), Some(CancelOrderResponse { accepted: false }));

        let unknown = CancelOrderRequest { strategy_id: 1, broker_order_id: "nope".to_string() };
        assert_eq!(broker.cancel_order(&unknown).await.unwrap(), None);
    }

    #[tokio::test]
    async fn market_hours_follow_the_configured_session() {
        let broker = broker();
        let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let hours = broker
            .get_market_hours(&GetMarketHoursRequest { strategy_id: 1, market: MarketType::Equity, date: monday })
            .await
            .unwrap()
            .unwrap()
            .hours;
        assert!(hours.is_open);
        assert!(hours.contains(monday.and_hms_opt(15, 0, 0).unwrap().and_utc()));
        assert!(!hours.contains(monday.and_hms_opt(22, 0, 0).unwrap().and_utc()));

        let saturday = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let hours = broker
            .get_market_hours(&GetMarketHoursRequest { strategy_id: 1, market: MarketType::Equity, date: saturday })
            .await
            .unwrap()
            .unwrap()
            .hours;
        assert!(!hours.is_open);
    }

    #[tokio::test]
    async fn quotes_are_case_insensitive_and_absent_when_unknown() {
        let broker = broker();
        let found = broker
            .get_quote(&GetQuoteRequest { strategy_id: 1, symbols: vec!["Spy".to_string(), "QQQ".to_string()] })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.quotes.len(), 1);
        assert_eq!(found.quotes[0].symbol, "SPY");

        let missing = broker
            .get_quote(&GetQuoteRequest { strategy_id: 1, symbols: vec!["QQQ".to_string()] })
            .await
            .unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn option_chain_is_filtered_by_side_and_strike_count() {
        let broker = broker();
        let expiration = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        let contract = |put_call, strike: Decimal| OptionContract {
            symbol: format!("SPY_{put_call}_{strike}"),
            put_call,
            strike,
            expiration,
            bid: dec!(1),
            ask: dec!(1.1),
            delta: None,
        };
        let contracts = [dec!(480), dec!(490), dec!(500), dec!(510), dec!(520)]
            .into_iter()
            .flat_map(|s| [contract(PutCall::Put, s), contract(PutCall::Call, s)])
            .collect();
        broker
            .set_option_chain(OptionChain { underlying: "SPY".to_string(), underlying_price: dec!(503), contracts })
            .await;

        let request = GetOptionChainRequest {
            strategy_id: 1,
            symbol: "SPY".to_string(),
            contract_type: Some(PutCall::Put),
            from_date: None,
            to_date: None,
            strike_count: Some(1),
        };
        let chain = broker.get_option_chain(&request).await.unwrap().unwrap().chain;
        let strikes: Vec<Decimal> = chain.contracts.iter().map(|c| c.strike).collect();
        assert_eq!(strikes, vec![dec!(500), dec!(510)]);
        assert!(chain.contracts.iter().all(|c| c.put_call == PutCall::Put));

        let other = GetOptionChainRequest { symbol: "QQQ".to_string(), ..request };
        assert_eq!(broker.get_option_chain(&other).await.unwrap(), None);
    }
}
