use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;
pub mod telemetry;

// Re-export the core types to provide a clean public API.
pub use settings::{
    BotConfig, BrokerConfig, Config, DatabaseBackend, DatabaseConfig, FailurePolicy,
    PaperBrokerConfig, ServerConfig, StrategyConfig, TelegramConfig, TelemetryConfig,
};
pub use telemetry::init_tracing;

/// Prefix of environment variables that override file settings,
/// e.g. `LOOPTRADER_BOT__LOOP_PERIOD_SECS=30`.
pub const ENV_PREFIX: &str = "LOOPTRADER";

/// Loads and validates the application configuration.
///
/// Reads the TOML file at `path`, layers `LOOPTRADER_*` environment variables on top, and
/// deserializes the result into our strongly-typed `Config` struct.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path.as_ref()))
        .add_source(environment())
        .build()?;

    finish(builder)
}

/// Same as [`load_config`], but reads the TOML document from a string.
pub fn load_config_from_str(toml: &str) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?;

    finish(builder)
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn finish(builder: config::Config) -> Result<Config, ConfigError> {
    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;
    Ok(config)
}
