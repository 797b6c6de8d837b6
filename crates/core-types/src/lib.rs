//! # Core Types
//!
//! The shared vocabulary of the bot: persisted strategy records, orders and their legs, broker
//! account snapshots and market data. Every other crate in the workspace speaks in these types.
//!
//! This crate has no knowledge of brokers, databases or the mediator; it only defines data.

pub mod enums;
pub mod error;
pub mod models;

// Re-export the core types to provide a clean public API.
pub use enums::{
    AssetType, BrokerKind, MarketType, OrderDuration, OrderInstruction, OrderSession, OrderStatus,
    OrderType, PutCall, StrategyKind,
};
pub use error::CoreError;
pub use models::{
    Account, MarketHours, OptionChain, OptionContract, Order, OrderLeg, Position, Quote,
    StrategyRecord,
};
