//! # Mediator
//!
//! The contract through which strategies, brokers, the database and the notifier talk to each
//! other without knowing about one another. The bot implements [`Mediator`]; every collaborator
//! bound into the bot receives a [`MediatorSlot`] back-reference to it.
//!
//! It depends only on `core-types`.

pub mod error;
pub mod messages;
pub mod slot;

pub use error::{BoxError, MediatorError};
pub use messages::*;
pub use slot::MediatorSlot;

use async_trait::async_trait;

/// The routing facade every collaborator calls back into.
///
/// Broker-bound operations resolve the broker from the request's routing key. A request whose
/// strategy is not bound resolves to `Ok(None)`: an unknown strategy is an expected outcome,
/// not an error. Collaborator failures are returned as `Err`.
#[async_trait]
pub trait Mediator: Send + Sync {
    // --- Broker routing ---

    async fn get_account(
        &self,
        request: &GetAccountRequest,
    ) -> Result<Option<GetAccountResponse>, MediatorError>;

    /// Fetches one account snapshot per distinct bound broker.
    async fn get_all_accounts(
        &self,
        request: &GetAllAccountsRequest,
    ) -> Result<GetAllAccountsResponse, MediatorError>;

    async fn place_order(
        &self,
        request: &PlaceOrderRequest,
    ) -> Result<Option<PlaceOrderResponse>, MediatorError>;

    async fn cancel_order(
        &self,
        request: &CancelOrderRequest,
    ) -> Result<Option<CancelOrderResponse>, MediatorError>;

    async fn get_order(
        &self,
        request: &GetOrderRequest,
    ) -> Result<Option<GetOrderResponse>, MediatorError>;

    async fn get_market_hours(
        &self,
        request: &GetMarketHoursRequest,
    ) -> Result<Option<GetMarketHoursResponse>, MediatorError>;

    async fn get_quote(
        &self,
        request: &GetQuoteRequest,
    ) -> Result<Option<GetQuoteResponse>, MediatorError>;

    async fn get_option_chain(
        &self,
        request: &GetOptionChainRequest,
    ) -> Result<Option<GetOptionChainResponse>, MediatorError>;

    // --- Notification ---

    /// Fire-and-forget: delivery failures are the mediator's concern, never the caller's.
    async fn send_notification(&self, request: &SendNotificationRequest);

    // --- Lifecycle control ---

    fn set_kill_switch(&self, request: &SetKillSwitchRequest);

    fn pause_bot(&self);

    fn resume_bot(&self);

    /// Names of all bound strategies, in binding order.
    fn get_all_strategies(&self) -> Vec<String>;

    // --- Database passthrough ---

    async fn create_db_strategy(
        &self,
        request: &CreateStrategyRequest,
    ) -> Result<CreateStrategyResponse, MediatorError>;

    async fn create_db_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<Option<CreateOrderResponse>, MediatorError>;

    async fn update_db_order(
        &self,
        request: &UpdateOrderRequest,
    ) -> Result<Option<UpdateOrderResponse>, MediatorError>;

    async fn read_active_orders(
        &self,
        request: &ReadActiveOrdersRequest,
    ) -> Result<Option<ReadActiveOrdersResponse>, MediatorError>;

    async fn read_offset_legs_by_expiration(
        &self,
        request: &ReadOffsetLegsByExpirationRequest,
    ) -> Result<Option<ReadOffsetLegsByExpirationResponse>, MediatorError>;
}
