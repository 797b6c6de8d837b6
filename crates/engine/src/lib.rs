//! # Engine Crate
//!
//! The [`Bot`]: the mediator that ties strategies, brokers, the database and the notifier
//! together.
//!
//! - **Construction** (`Bot::new`) validates the strategy→broker table, reconciles every
//!   strategy's id against the database and registers the bot as mediator with every
//!   collaborator.
//! - **Run loop** (`Bot::process_strategies`) runs each strategy once per loop period until the
//!   kill switch is set.
//! - **Routing facade** (`impl Mediator for Bot`) sends each request to the broker bound to
//!   its strategy, and passes persistence and notification calls straight through.
//! - **Lifecycle** (`set_kill_switch`, `pause_bot`, `resume_bot`, `status`) may be driven
//!   concurrently with the loop.

pub mod bot;
pub mod error;
pub mod routing;
pub mod runner;
pub mod schedule;
pub mod state;
pub mod util;

pub use bot::{Binding, Bot, BotSettings};
pub use error::EngineError;
pub use runner::{STARTED_MESSAGE, TERMINATED_MESSAGE};
pub use schedule::time_until_next_tick;
pub use state::BotStatus;
pub use util::build_bindings;
