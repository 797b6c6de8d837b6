//! # Strategy Library
//!
//! This crate defines the universal [`Strategy`] trait the bot drives, and the strategies that
//! ship with it.
//!
//! ## Architectural Principles
//!
//! - **Mediated:** a strategy never holds a broker or a database. Every account, order,
//!   market-data and persistence call goes back through the bot it was bound to, addressed by
//!   the strategy's own id.
//! - **Bot Agnostic Logic:** the bot only knows the trait; it schedules `process_strategy`
//!   once per loop pass and never looks inside.
//! - **Extensibility:** adding a strategy means adding a module, implementing `Strategy`,
//!   adding a `StrategyKind` variant and a `factory` arm.
//!
//! ## Public API
//!
//! - `Strategy`: the core trait all strategies implement.
//! - `StrategyIdentity`: name, reconciled id and mediator back-reference, shared by every
//!   strategy.
//! - `create_strategy`: the factory that builds a strategy from its configuration.
//! - `QuoteMonitor`, `OrderMonitor`: the bundled strategies.

pub mod error;
pub mod factory;
pub mod identity;
pub mod order_monitor;
pub mod quote_monitor;

#[cfg(test)]
mod testing;

pub use error::StrategyError;
pub use factory::create_strategy;
pub use identity::StrategyIdentity;
pub use order_monitor::OrderMonitor;
pub use quote_monitor::{QuoteMonitor, QuoteMonitorParams};

use async_trait::async_trait;
use mediator::Mediator;
use std::sync::Weak;

/// The core trait that all trading strategies must implement.
///
/// A strategy is created unbound. The bot binds it exactly once, handing over the id it
/// reconciled against the database and a back-reference to itself, and from then on calls
/// `process_strategy` once per loop pass.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// The unique, caller-supplied name. It keys the persisted strategy record.
    fn strategy_name(&self) -> &str;

    /// The reconciled id, once bound.
    fn strategy_id(&self) -> Option<i64>;

    /// Adopts `strategy_id` as the permanent routing key and stores the mediator.
    fn bind(&self, strategy_id: i64, mediator: Weak<dyn Mediator>) -> Result<(), StrategyError>;

    /// Runs one decision cycle.
    async fn process_strategy(&self) -> Result<(), StrategyError>;
}
