use crate::error::StrategyError;
use mediator::{Mediator, MediatorSlot};
use std::sync::{Arc, OnceLock, Weak};

/// The part of a strategy the bot manages: its name, the id the bot reconciled for it and the
/// back-reference to the bot.
#[derive(Debug)]
pub struct StrategyIdentity {
    name: String,
    id: OnceLock<i64>,
    mediator: MediatorSlot,
}

impl StrategyIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: OnceLock::new(),
            mediator: MediatorSlot::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Option<i64> {
        self.id.get().copied()
    }

    /// Binds the identity. The id can be set once; rebinding with the same id only refreshes
    /// the mediator.
    pub fn bind(&self, strategy_id: i64, mediator: Weak<dyn Mediator>) -> Result<(), StrategyError> {
        let bound = *self.id.get_or_init(|| strategy_id);
        if bound != strategy_id {
            return Err(StrategyError::AlreadyBound {
                name: self.name.clone(),
                id: bound,
            });
        }
        self.mediator.set(mediator);
        Ok(())
    }

    /// The id and the live mediator, or `Unbound` when the strategy is not attached to a bot.
    pub fn context(&self) -> Result<(i64, Arc<dyn Mediator>), StrategyError> {
        let id = self.id().ok_or_else(|| StrategyError::Unbound(self.name.clone()))?;
        let mediator = self.mediator.get()?;
        Ok((id, mediator))
    }
}
