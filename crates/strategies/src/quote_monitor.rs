use crate::error::StrategyError;
use crate::identity::StrategyIdentity;
use crate::Strategy;
use async_trait::async_trait;
use chrono::Utc;
use core_types::{MarketType, Quote};
use mediator::{GetMarketHoursRequest, GetQuoteRequest, Mediator};
use serde::Deserialize;
use std::sync::Weak;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteMonitorParams {
    /// Symbols to quote on every pass.
    pub symbols: Vec<String>,
    /// Market whose session gates the monitor.
    #[serde(default = "default_market")]
    pub market: MarketType,
}

fn default_market() -> MarketType {
    MarketType::Equity
}

/// Watches a list of symbols while their market is open.
///
/// Each pass asks the bound broker for the day's session, and when the session is open,
/// fetches and logs a quote for every configured symbol.
#[derive(Debug)]
pub struct QuoteMonitor {
    identity: StrategyIdentity,
    params: QuoteMonitorParams,
    last_quotes: Mutex<Vec<Quote>>,
}

impl QuoteMonitor {
    pub fn new(name: &str, params: QuoteMonitorParams) -> Result<Self, StrategyError> {
        if params.symbols.is_empty() {
            return Err(StrategyError::InvalidParameters(format!(
                "quote monitor '{name}' needs at least one symbol"
            )));
        }
        Ok(Self {
            identity: StrategyIdentity::new(name),
            params,
            last_quotes: Mutex::new(Vec::new()),
        })
    }

    /// Quotes fetched by the most recent pass that ran while the market was open.
    pub async fn last_quotes(&self) -> Vec<Quote> {
        self.last_quotes.lock().await.clone()
    }
}

#[async_trait]
impl Strategy for QuoteMonitor {
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
        let (strategy_id, mediator) = self.identity.context()?;
        let now = Utc::now();

        let hours = mediator
            .get_market_hours(&GetMarketHoursRequest {
                strategy_id,
                market: self.params.market,
                date: now.date_naive(),
            })
            .await?;
        let open = hours.is_some_and(|r| r.hours.contains(now));
        if !open {
            tracing::debug!(strategy = %self.identity.name(), market = %self.params.market, "Market closed. Skipping pass.");
            return Ok(());
        }

        let request = GetQuoteRequest {
            strategy_id,
            symbols: self.params.symbols.clone(),
        };
        let Some(response) = mediator.get_quote(&request).await? else {
            tracing::warn!(strategy = %self.identity.name(), symbols = ?self.params.symbols, "No quotes returned.");
            return Ok(());
        };

        for quote in &response.quotes {
            tracing::info!(
                strategy = %self.identity.name(),
                symbol = %quote.symbol,
                bid = %quote.bid,
                ask = %quote.ask,
                last = %quote.last,
                "Quote."
            );
        }
        *self.last_quotes.lock().await = response.quotes;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeMediator;
    use core_types::MarketHours;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn params(symbols: &[&str]) -> QuoteMonitorParams {
        QuoteMonitorParams {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            market: MarketType::Equity,
        }
    }

    fn hours(is_open: bool) -> MarketHours {
        let now = Utc::now();
        MarketHours {
            market: MarketType::Equity,
            date: now.date_naive(),
            start: Some(now - chrono::Duration::hours(1)),
            end: Some(now + chrono::Duration::hours(1)),
            is_open,
        }
    }

    fn spy_quote() -> Quote {
        Quote {
            symbol: "SPY".to_string(),
            bid: Decimal::new(49990, 2),
            ask: Decimal::new(50010, 2),
            last: Decimal::new(500, 0),
            timestamp: Utc::now(),
        }
    }

    fn bound(fake: &Arc<FakeMediator>) -> QuoteMonitor {
        let monitor = QuoteMonitor::new("spy-watch", params(&["SPY"])).unwrap();
        let weak = Arc::downgrade(fake);
        monitor.bind(1, weak).unwrap();
        monitor
    }

    #[test]
    fn needs_symbols() {
        assert!(matches!(
            QuoteMonitor::new("empty", params(&[])),
            Err(StrategyError::InvalidParameters(_))
        ));
    }

    #[tokio::test]
    async fn fetches_quotes_while_the_market_is_open() {
        let fake = Arc::new(FakeMediator::default());
        *fake.hours.lock().unwrap() = Some(hours(true));
        fake.quotes.lock().unwrap().push(spy_quote());

        let monitor = bound(&fake);
        monitor.process_strategy().await.unwrap();

        assert_eq!(fake.quote_requests(), 1);
        let seen = monitor.last_quotes().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].symbol, "SPY");
        assert_eq!(seen[0].mid(), Decimal::new(500, 0));
    }

    #[tokio::test]
    async fn skips_when_closed_or_unknown() {
        let fake = Arc::new(FakeMediator::default());
        let monitor = bound(&fake);

        monitor.process_strategy().await.unwrap();
        *fake.hours.lock().unwrap() = Some(hours(false));
        monitor.process_strategy().await.unwrap();

        assert_eq!(fake.quote_requests(), 0);
        assert!(monitor.last_quotes().await.is_empty());
    }

    #[tokio::test]
    async fn unbound_monitor_fails() {
        let monitor = QuoteMonitor::new("spy-watch", params(&["SPY"])).unwrap();
        assert!(matches!(
            monitor.process_strategy().await,
            Err(StrategyError::Unbound(_))
        ));
    }
}
