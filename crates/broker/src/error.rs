use mediator::MediatorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("The broker rejected the order: {0}")]
    OrderRejected(String),

    #[error("Not enough buying power to execute order. Required: {required}, Available: {available}")]
    InsufficientFunds { required: String, available: String },

    #[error("The broker request failed: {0}")]
    Request(String),
}

impl From<BrokerError> for MediatorError {
    fn from(err: BrokerError) -> Self {
        MediatorError::Broker(Box::new(err))
    }
}
