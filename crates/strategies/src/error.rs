use mediator::MediatorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Strategy received invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Strategy '{0}' has not been bound to a bot")]
    Unbound(String),

    #[error("Strategy '{name}' is already bound with id {id}")]
    AlreadyBound { name: String, id: i64 },

    #[error("Mediator call failed: {0}")]
    Mediator(#[from] MediatorError),
}
