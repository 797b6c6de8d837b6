use crate::error::EngineError;
use crate::state::{BotState, BotStatus};
use alerter::Notifier;
use broker::Broker;
use configuration::{BotConfig, FailurePolicy};
use core_types::StrategyRecord;
use database::{Database, DbError};
use mediator::{CreateStrategyRequest, Mediator, ReadStrategyByNameRequest};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use strategies::{Strategy, StrategyError};

/// Run-loop parameters, fixed once the bot is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotSettings {
    pub loop_period: Duration,
    /// Upper bound for one `process_strategy` call. Unbounded when `None`.
    pub strategy_timeout: Option<Duration>,
    pub failure_policy: FailurePolicy,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            loop_period: Duration::from_secs(60),
            strategy_timeout: None,
            failure_policy: FailurePolicy::Halt,
        }
    }
}

impl From<&BotConfig> for BotSettings {
    fn from(config: &BotConfig) -> Self {
        Self {
            loop_period: Duration::from_secs(config.loop_period_secs),
            strategy_timeout: config.strategy_timeout_secs.map(Duration::from_secs),
            failure_policy: config.failure_policy,
        }
    }
}

/// One row of the binding table: a reconciled strategy and the broker that serves it.
pub struct Binding {
    strategy_id: i64,
    strategy: Arc<dyn Strategy>,
    broker: Arc<dyn Broker>,
}

impl Binding {
    pub fn strategy_id(&self) -> i64 {
        self.strategy_id
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.strategy_name()
    }

    pub fn strategy(&self) -> &Arc<dyn Strategy> {
        &self.strategy
    }

    pub fn broker(&self) -> &Arc<dyn Broker> {
        &self.broker
    }
}

/// Two handles to the same broker instance.
pub(crate) fn same_broker(a: &Arc<dyn Broker>, b: &Arc<dyn Broker>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// The mediator at the centre of the system.
///
/// The bot owns the strategy→broker binding table, the lifecycle flags and the run loop, and
/// implements [`Mediator`] so that strategies and the other collaborators reach each other
/// only through it.
pub struct Bot {
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) database: Arc<dyn Database>,
    pub(crate) bindings: Vec<Binding>,
    pub(crate) settings: BotSettings,
    pub(crate) state: BotState,
}

impl Bot {
    /// Builds a bot over an ordered strategy→broker table.
    ///
    /// Strategy names must be unique and the table non-empty. Every strategy is reconciled
    /// against the database by name (read, or create when absent) and adopts the persisted id.
    /// The bot then registers itself as mediator with the database, the notifier, each distinct
    /// broker and each strategy. Any failure leaves nothing behind.
    pub async fn new(
        notifier: Arc<dyn Notifier>,
        database: Arc<dyn Database>,
        table: Vec<(Arc<dyn Strategy>, Arc<dyn Broker>)>,
        settings: BotSettings,
    ) -> Result<Arc<Self>, EngineError> {
        validate_table(&table)?;

        let mut bindings = Vec::with_capacity(table.len());
        for (strategy, broker) in table {
            let name = strategy.strategy_name().to_string();
            let strategy_id = reconcile(database.as_ref(), &name)
                .await
                .map_err(|source| EngineError::Reconciliation { name, source })?;
            bindings.push(Binding {
                strategy_id,
                strategy,
                broker,
            });
        }

        let bot = Arc::new(Self {
            notifier,
            database,
            bindings,
            settings,
            state: BotState::default(),
        });
        bot.register()?;

        tracing::info!(
            strategies = bot.bindings.len(),
            brokers = bot.distinct_brokers().len(),
            loop_period = ?bot.settings.loop_period,
            "Bot constructed."
        );
        Ok(bot)
    }

    /// Registers the bot with every collaborator. Strategy ids are checked first so that a
    /// strategy already bound elsewhere under another id leaves every collaborator untouched.
    fn register(self: &Arc<Self>) -> Result<(), EngineError> {
        for binding in &self.bindings {
            if let Some(bound) = binding.strategy.strategy_id() {
                if bound != binding.strategy_id {
                    let source = StrategyError::AlreadyBound {
                        name: binding.strategy_name().to_string(),
                        id: bound,
                    };
                    return Err(EngineError::Configuration(source.to_string()));
                }
            }
        }

        let as_mediator: Arc<dyn Mediator> = self.clone();
        let weak = Arc::downgrade(&as_mediator);

        self.database.set_mediator(weak.clone());
        self.notifier.set_mediator(weak.clone());
        for binding in self.distinct_brokers() {
            binding.broker().set_mediator(weak.clone());
        }
        for binding in &self.bindings {
            binding
                .strategy
                .bind(binding.strategy_id, weak.clone())
                .map_err(|e| EngineError::Configuration(e.to_string()))?;
        }
        Ok(())
    }

    /// The broker bound to `strategy_id`, if any strategy has that id.
    pub fn get_broker(&self, strategy_id: i64) -> Option<&Arc<dyn Broker>> {
        self.bindings
            .iter()
            .find(|b| b.strategy_id == strategy_id)
            .map(|b| &b.broker)
    }

    /// The binding table, in binding order.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// One binding per distinct broker instance, first occurrence first.
    pub(crate) fn distinct_brokers(&self) -> Vec<&Binding> {
        let mut distinct: Vec<&Binding> = Vec::new();
        for binding in &self.bindings {
            if !distinct.iter().any(|d| same_broker(&d.broker, &binding.broker)) {
                distinct.push(binding);
            }
        }
        distinct
    }

    pub fn settings(&self) -> &BotSettings {
        &self.settings
    }

    pub fn status(&self) -> BotStatus {
        self.state.status()
    }
}

fn validate_table(table: &[(Arc<dyn Strategy>, Arc<dyn Broker>)]) -> Result<(), EngineError> {
    if table.is_empty() {
        return Err(EngineError::Configuration(
            "the binding table must contain at least one strategy".to_string(),
        ));
    }
    let mut names = HashSet::new();
    for (strategy, _) in table {
        if !names.insert(strategy.strategy_name()) {
            return Err(EngineError::Configuration(format!(
                "strategy name '{}' is bound more than once",
                strategy.strategy_name()
            )));
        }
    }
    Ok(())
}

/// Read-or-create by name. Returns the id of the persisted record.
async fn reconcile(database: &dyn Database, name: &str) -> Result<i64, DbError> {
    let existing = database
        .read_first_strategy_by_name(&ReadStrategyByNameRequest {
            name: name.to_string(),
        })
        .await?;
    if let Some(id) = existing.strategy.and_then(|record| record.id) {
        tracing::debug!(strategy = %name, id, "Strategy already persisted.");
        return Ok(id);
    }

    let created = database
        .create_strategy(&CreateStrategyRequest {
            strategy: StrategyRecord::new(name),
        })
        .await?;
    tracing::info!(strategy = %name, id = created.id, "Strategy persisted.");
    Ok(created.id)
}
