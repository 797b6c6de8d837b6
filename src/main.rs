use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL};
use configuration::{Config, DatabaseBackend, init_tracing, load_config};
use database::{Database, InMemoryDatabase, PgDatabase, connect, run_migrations};
use engine::{Bot, BotSettings, build_bindings};
use mediator::{Mediator, SetKillSwitchRequest};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;

/// The main entry point for the looptrader bot.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; DATABASE_URL and friends may come from the environment.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => handle_run(args).await,
        Commands::Check(args) => handle_check(args),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// A strategy runner that trades through pluggable brokers.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot and run its strategies until Ctrl-C or the kill switch.
    Run(ConfigArgs),
    /// Validate the configuration and print the strategy binding table.
    Check(ConfigArgs),
}

#[derive(Parser)]
struct ConfigArgs {
    /// Path to the TOML configuration file.
    #[arg(long, short, default_value = "config.toml")]
    config: PathBuf,
}

fn read_config(args: &ConfigArgs) -> anyhow::Result<Config> {
    load_config(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))
}

// ==============================================================================
// Run Command Logic
// ==============================================================================

async fn handle_run(args: ConfigArgs) -> anyhow::Result<()> {
    let config = read_config(&args)?;
    // Dropping the guard flushes the file log, so it lives until the bot exits.
    let _log_guard = init_tracing(&config.telemetry)?;

    let database = open_database(&config).await?;
    let notifier = alerter::build_notifier(&config.telegram);
    let table = build_bindings(&config)?;
    let bot = Bot::new(notifier, database, table, BotSettings::from(&config.bot))
        .await
        .context("Failed to construct the bot")?;

    spawn_ctrl_c_handler(bot.clone());

    let server = if config.server.enabled {
        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(web_server::run_server(
            config.server.bind_addr,
            bot.clone(),
            async move {
                stopped.await.ok();
            },
        ));
        Some((stop, handle))
    } else {
        None
    };

    let result = bot.process_strategies().await;

    if let Some((stop, handle)) = server {
        stop.send(()).ok();
        match handle.await {
            Ok(Err(e)) => tracing::error!(error = %e, "Web server failed."),
            Err(e) => tracing::error!(error = %e, "Web server task panicked."),
            Ok(Ok(())) => {}
        }
    }

    result.context("The run loop stopped on a strategy failure")?;
    tracing::info!("Shutdown complete.");
    Ok(())
}

async fn open_database(config: &Config) -> anyhow::Result<Arc<dyn Database>> {
    match config.database.backend {
        DatabaseBackend::Postgres => {
            let pool = connect(&config.database)
                .await
                .context("Failed to connect to the database")?;
            run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
            tracing::info!("Connected to PostgreSQL.");
            Ok(Arc::new(PgDatabase::new(pool)))
        }
        DatabaseBackend::Memory => {
            tracing::warn!("Using the in-memory database. Nothing will survive a restart.");
            Ok(Arc::new(InMemoryDatabase::new()))
        }
    }
}

/// The first Ctrl-C sets the kill switch; the loop finishes its current pass and exits.
fn spawn_ctrl_c_handler(bot: Arc<Bot>) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Ctrl-C received. Stopping after the current pass.");
                bot.set_kill_switch(&SetKillSwitchRequest { kill_switch: true });
            }
            Err(e) => tracing::error!(error = %e, "Unable to listen for Ctrl-C."),
        }
    });
}

// ==============================================================================
// Check Command Logic
// ==============================================================================

fn handle_check(args: ConfigArgs) -> anyhow::Result<()> {
    let config = read_config(&args)?;
    // Instantiating the bindings also validates every strategy's parameters.
    let table = build_bindings(&config)?;

    let mut output = Table::new();
    output
        .load_preset(UTF8_FULL)
        .set_header(vec!["Strategy", "Kind", "Broker", "Enabled"]);
    for strategy in &config.strategies {
        output.add_row(vec![
            strategy.name.clone(),
            strategy.kind.to_string(),
            strategy.broker.clone(),
            strategy.enabled.to_string(),
        ]);
    }

    println!("{output}");
    println!(
        "Configuration OK: {} strategies bound, loop period {}s, database {:?}.",
        table.len(),
        config.bot.loop_period_secs,
        config.database.backend
    );
    Ok(())
}
