use crate::error::EngineError;
use broker::{Broker, create_broker};
use configuration::Config;
use std::collections::HashMap;
use std::sync::Arc;
use strategies::{Strategy, create_strategy};

/// Builds the binding table for every enabled strategy in `config`, in file order.
///
/// Each configured broker is instantiated once; strategies naming the same broker share it.
pub fn build_bindings(
    config: &Config,
) -> Result<Vec<(Arc<dyn Strategy>, Arc<dyn Broker>)>, EngineError> {
    let mut brokers: HashMap<&str, Arc<dyn Broker>> = HashMap::new();
    let mut table = Vec::new();

    for strategy_config in config.enabled_strategies() {
        let broker_config = config.broker(&strategy_config.broker).ok_or_else(|| {
            EngineError::Configuration(format!(
                "strategy '{}' references unknown broker '{}'",
                strategy_config.name, strategy_config.broker
            ))
        })?;
        let broker = brokers
            .entry(broker_config.name.as_str())
            .or_insert_with(|| create_broker(broker_config))
            .clone();

        let strategy = create_strategy(strategy_config)
            .map_err(|e| EngineError::Configuration(e.to_string()))?;
        tracing::debug!(strategy = %strategy_config.name, broker = %broker_config.name, "Binding strategy.");
        table.push((strategy, broker));
    }
    Ok(table)
}
