//! # Broker Crate
//!
//! The [`Broker`] trait is the contract the bot uses for account, order and market-data
//! operations. A broker serves every strategy bound to it; the bot decides which broker a
//! request goes to, the broker only executes it.
//!
//! [`PaperBroker`] is an in-memory, simulated implementation used for paper trading and tests.

pub mod error;
pub mod paper;

pub use error::BrokerError;
pub use paper::PaperBroker;

use async_trait::async_trait;
use configuration::BrokerConfig;
use core_types::BrokerKind;
use mediator::{
    CancelOrderRequest, CancelOrderResponse, GetAccountRequest, GetAccountResponse,
    GetMarketHoursRequest, GetMarketHoursResponse, GetOptionChainRequest, GetOptionChainResponse,
    GetOrderRequest, GetOrderResponse, GetQuoteRequest, GetQuoteResponse, Mediator,
    PlaceOrderRequest, PlaceOrderResponse,
};
use std::sync::{Arc, Weak};

/// The generic, abstract interface for a brokerage connection.
///
/// Every operation returns `Ok(None)` when the broker has no data for the request; `Err` is
/// reserved for failed or rejected calls.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Receives the bot's back-reference when the broker is bound into it.
    fn set_mediator(&self, _mediator: Weak<dyn Mediator>) {}

    async fn get_account(
        &self,
        request: &GetAccountRequest,
    ) -> Result<Option<GetAccountResponse>, BrokerError>;

    async fn place_order(
        &self,
        request: &PlaceOrderRequest,
    ) -> Result<Option<PlaceOrderResponse>, BrokerError>;

    async fn cancel_order(
        &self,
        request: &CancelOrderRequest,
    ) -> Result<Option<CancelOrderResponse>, BrokerError>;

    async fn get_order(
        &self,
        request: &GetOrderRequest,
    ) -> Result<Option<GetOrderResponse>, BrokerError>;

    async fn get_market_hours(
        &self,
        request: &GetMarketHoursRequest,
    ) -> Result<Option<GetMarketHoursResponse>, BrokerError>;

    async fn get_quote(
        &self,
        request: &GetQuoteRequest,
    ) -> Result<Option<GetQuoteResponse>, BrokerError>;

    async fn get_option_chain(
        &self,
        request: &GetOptionChainRequest,
    ) -> Result<Option<GetOptionChainResponse>, BrokerError>;
}

/// Builds the broker described by `config`.
pub fn create_broker(config: &BrokerConfig) -> Arc<dyn Broker> {
    match config.kind {
        BrokerKind::Paper => Arc::new(PaperBroker::from_config(&config.name, &config.paper)),
    }
}
