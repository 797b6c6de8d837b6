use crate::error::ConfigError;
use chrono::NaiveTime;
use core_types::{BrokerKind, StrategyKind};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub brokers: Vec<BrokerConfig>,
    #[serde(default)]
    pub strategies: Vec<StrategyConfig>,
}

impl Config {
    /// Checks the cross-field rules that serde cannot express.
    ///
    /// Strategy name uniqueness is deliberately left to the bot, which rejects duplicates
    /// when the binding table is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.loop_period_secs == 0 {
            return Err(ConfigError::ValidationError(
                "bot.loop_period_secs must be greater than zero".to_string(),
            ));
        }
        if self.bot.strategy_timeout_secs == Some(0) {
            return Err(ConfigError::ValidationError(
                "bot.strategy_timeout_secs must be greater than zero when set".to_string(),
            ));
        }

        let mut broker_names = HashSet::new();
        for broker in &self.brokers {
            if !broker_names.insert(broker.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "broker '{}' is defined more than once",
                    broker.name
                )));
            }
        }

        for strategy in self.enabled_strategies() {
            if !broker_names.contains(strategy.broker.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "strategy '{}' references unknown broker '{}'",
                    strategy.name, strategy.broker
                )));
            }
        }

        if self.enabled_strategies().next().is_none() {
            return Err(ConfigError::ValidationError(
                "at least one strategy must be enabled".to_string(),
            ));
        }

        Ok(())
    }

    /// Strategies with `enabled = true`, in file order.
    pub fn enabled_strategies(&self) -> impl Iterator<Item = &StrategyConfig> {
        self.strategies.iter().filter(|s| s.enabled)
    }

    pub fn broker(&self, name: &str) -> Option<&BrokerConfig> {
        self.brokers.iter().find(|b| b.name == name)
    }
}

/// What the run loop does when a strategy's decision cycle fails or times out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the loop and return the failure to the caller.
    #[default]
    Halt,
    /// Log the failure and carry on with the next strategy.
    Continue,
}

/// Parameters of the bot's run loop.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Length of one loop period. Passes are aligned to multiples of it from loop start.
    #[serde(default = "default_loop_period_secs")]
    pub loop_period_secs: u64,
    /// Upper bound for a single strategy decision cycle. Unbounded when absent.
    #[serde(default)]
    pub strategy_timeout_secs: Option<u64>,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_loop_period_secs() -> u64 {
    60
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            loop_period_secs: default_loop_period_secs(),
            strategy_timeout_secs: None,
            failure_policy: FailurePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for daily rolling log files. Logs go to stdout only when absent.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_file_prefix() -> String {
    "looptrader.log".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
            file_prefix: default_file_prefix(),
        }
    }
}

/// Credentials for the Telegram notifier. Leaving either field empty disables it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub chat_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseBackend {
    /// PostgreSQL, reached through `DATABASE_URL`.
    Postgres,
    /// Process-local storage that is lost on exit.
    #[default]
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: DatabaseBackend,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::default(),
            max_connections: default_max_connections(),
        }
    }
}

/// The HTTP control surface.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_addr: default_bind_addr(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    /// Name strategies use to reference this broker.
    pub name: String,
    pub kind: BrokerKind,
    #[serde(default)]
    pub paper: PaperBrokerConfig,
}

/// Settings of the simulated paper-trading broker.
#[derive(Debug, Clone, Deserialize)]
pub struct PaperBrokerConfig {
    #[serde(default = "default_account_id")]
    pub account_id: String,
    #[serde(default = "default_starting_cash")]
    pub starting_cash: Decimal,
    /// Last prices to seed the quote book with, keyed by symbol.
    #[serde(default)]
    pub quotes: HashMap<String, Decimal>,
    /// Session open time, UTC.
    #[serde(default = "default_session_open")]
    pub session_open: NaiveTime,
    /// Session close time, UTC.
    #[serde(default = "default_session_close")]
    pub session_close: NaiveTime,
}

fn default_account_id() -> String {
    "PAPER".to_string()
}

fn default_starting_cash() -> Decimal {
    dec!(100000)
}

fn default_session_open() -> NaiveTime {
    NaiveTime::from_hms_opt(14, 30, 0).unwrap_or_default()
}

fn default_session_close() -> NaiveTime {
    NaiveTime::from_hms_opt(21, 0, 0).unwrap_or_default()
}

impl Default for PaperBrokerConfig {
    fn default() -> Self {
        Self {
            account_id: default_account_id(),
            starting_cash: default_starting_cash(),
            quotes: HashMap::new(),
            session_open: default_session_open(),
            session_close: default_session_close(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    /// Unique strategy name; also the key of the persisted strategy record.
    pub name: String,
    pub kind: StrategyKind,
    /// Name of the broker this strategy trades through.
    pub broker: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Strategy-specific parameters, deserialized by the strategy factory.
    #[serde(default)]
    pub params: serde_json::Value,
}

fn default_enabled() -> bool {
    true
}
