use database::DbError;
use std::time::Duration;
use strategies::StrategyError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to reconcile strategy '{name}' with the database: {source}")]
    Reconciliation {
        name: String,
        #[source]
        source: DbError,
    },

    #[error("Strategy '{name}' failed: {source}")]
    Strategy {
        name: String,
        #[source]
        source: StrategyError,
    },

    #[error("Strategy '{name}' did not finish within {timeout:?}")]
    StrategyTimeout { name: String, timeout: Duration },

    #[error("The run loop of this bot has already been started.")]
    AlreadyStarted,
}
