use crate::error::StrategyError;
use crate::order_monitor::OrderMonitor;
use crate::quote_monitor::{QuoteMonitor, QuoteMonitorParams};
use crate::Strategy;
use configuration::StrategyConfig;
use core_types::StrategyKind;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Creates a new, unbound strategy instance from its configuration entry.
pub fn create_strategy(config: &StrategyConfig) -> Result<Arc<dyn Strategy>, StrategyError> {
    // The compiler will error if a new StrategyKind is added but not handled here.
    match config.kind {
        StrategyKind::QuoteMonitor => {
            let params: QuoteMonitorParams = parse_params(config)?;
            Ok(Arc::new(QuoteMonitor::new(&config.name, params)?))
        }
        StrategyKind::OrderMonitor => Ok(Arc::new(OrderMonitor::new(&config.name))),
    }
}

fn parse_params<T: DeserializeOwned>(config: &StrategyConfig) -> Result<T, StrategyError> {
    serde_json::from_value(config.params.clone()).map_err(|e| {
        StrategyError::InvalidParameters(format!("strategy '{}': {e}", config.name))
    })
}
