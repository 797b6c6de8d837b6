//! # Database Crate
//!
//! The bot's persistence capability: strategy records, orders and their legs.
//!
//! ## Architectural Principles
//!
//! - **Capability, not schema:** the rest of the workspace only sees the [`Database`] trait and
//!   the request/response envelopes from `mediator`. SQL stays inside this crate.
//! - **Interchangeable backends:** [`PgDatabase`] persists to PostgreSQL through a `sqlx`
//!   connection pool; [`InMemoryDatabase`] keeps everything in process memory for dry runs
//!   and tests.
//!
//! ## Public API
//!
//! - `Database`: the trait the bot depends on.
//! - `connect` / `run_migrations`: pool setup and schema migration for PostgreSQL.
//! - `PgDatabase`, `InMemoryDatabase`: the two implementations.
//! - `DbError`: the specific error types that can be returned from this crate.

pub mod connection;
pub mod error;
pub mod memory;
pub mod repository;

pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use memory::InMemoryDatabase;
pub use repository::PgDatabase;

use async_trait::async_trait;
use mediator::{
    CreateOrderRequest, CreateOrderResponse, CreateStrategyRequest, CreateStrategyResponse,
    Mediator, ReadActiveOrdersRequest, ReadActiveOrdersResponse,
    ReadOffsetLegsByExpirationRequest, ReadOffsetLegsByExpirationResponse,
    ReadStrategyByNameRequest, ReadStrategyByNameResponse, UpdateOrderRequest,
    UpdateOrderResponse,
};
use std::sync::Weak;

/// The persistence contract the bot depends on.
///
/// Reads that find nothing return `Ok(None)` (or an empty payload); only genuine storage
/// failures are errors.
#[async_trait]
pub trait Database: Send + Sync {
    /// Receives the bot's back-reference when the database is bound into it.
    /// Backends that never call back into the bot can ignore it.
    fn set_mediator(&self, _mediator: Weak<dyn Mediator>) {}

    /// Returns the lowest-id strategy record with the requested name, if any.
    async fn read_first_strategy_by_name(
        &self,
        request: &ReadStrategyByNameRequest,
    ) -> Result<ReadStrategyByNameResponse, DbError>;

    async fn create_strategy(
        &self,
        request: &CreateStrategyRequest,
    ) -> Result<CreateStrategyResponse, DbError>;

    /// Persists an order together with its legs.
    async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<Option<CreateOrderResponse>, DbError>;

    /// Overwrites the mutable fields of a persisted order and its legs' fill quantities.
    /// Returns `None` when the order has no id or no such order exists.
    async fn update_order(
        &self,
        request: &UpdateOrderRequest,
    ) -> Result<Option<UpdateOrderResponse>, DbError>;

    /// Orders of the strategy that are still in a non-terminal status, oldest first.
    async fn read_active_orders(
        &self,
        request: &ReadActiveOrdersRequest,
    ) -> Result<Option<ReadActiveOrdersResponse>, DbError>;

    /// Opening legs of the strategy's filled orders for one put/call side and expiration.
    async fn read_offset_legs_by_expiration(
        &self,
        request: &ReadOffsetLegsByExpirationRequest,
    ) -> Result<Option<ReadOffsetLegsByExpirationResponse>, DbError>;
}
