use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use leadscout_common::{Config, SourceType};
use leadscout_connectors::GateConnectorFactory;
use leadscout_engine::context::EngineContext;
use leadscout_engine::notify::Dispatcher;
use leadscout_engine::scheduler::{JobKind, Scheduler};
use leadscout_store::{migrate, MatchStore, PgMatchStore};

#[derive(Parser)]
#[command(name = "leadscout", about = "Social media lead detection pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the background scheduler (scrape + notify jobs) until ctrl-c.
    Run,
    /// Run one scrape cycle per source type, then exit.
    Scrape,
    /// Run one notify cycle, then exit.
    Notify,
    /// Register a source to monitor.
    AddSource {
        name: String,
        url: String,
        /// "facebook" or "nextdoor"
        source_type: String,
    },
    /// Register a keyword to match against post text.
    AddKeyword { text: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("leadscout=info".parse()?))
        .init();

    let cli = Cli::parse();

    info!("Leadscout starting...");

    let config = Config::from_env();
    config.log_redacted();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    // Idempotent — safe on every startup.
    migrate::migrate(&pool).await?;

    let ctx = Arc::new(EngineContext {
        store: Arc::new(PgMatchStore::new(pool)),
        connectors: Arc::new(GateConnectorFactory::from_config(&config)),
        dispatcher: Dispatcher::from_config(&config),
        config,
    });
    let scheduler = Arc::new(Scheduler::new(Arc::clone(&ctx)));

    match cli.command {
        Command::Run => run_daemon(scheduler).await,
        Command::Scrape => {
            for kind in [JobKind::FacebookScrape, JobKind::NextdoorScrape] {
                let outcome = scheduler.trigger(kind).await;
                info!(job = kind.name(), ?outcome, "Manual scrape trigger");
            }
            Ok(())
        }
        Command::Notify => {
            let outcome = scheduler.trigger(JobKind::Notify).await;
            info!(job = JobKind::Notify.name(), ?outcome, "Manual notify trigger");
            Ok(())
        }
        Command::AddSource {
            name,
            url,
            source_type,
        } => {
            let source_type = SourceType::parse(&source_type).ok_or_else(|| {
                anyhow::anyhow!("unknown source type '{source_type}' (expected facebook or nextdoor)")
            })?;
            let source = ctx.store.insert_source(&name, &url, source_type).await?;
            info!(id = %source.id, name = %source.name, "Source added");
            Ok(())
        }
        Command::AddKeyword { text } => {
            let keyword = ctx.store.insert_keyword(&text).await?;
            info!(id = %keyword.id, text = %keyword.text, "Keyword added");
            Ok(())
        }
    }
}

async fn run_daemon(scheduler: Arc<Scheduler>) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let timers = scheduler.spawn_timers(shutdown_rx);
    info!("Scheduler running; press ctrl-c to stop");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested, stopping timers");

    // Timer loops exit at the next select point; a job mid-cycle finishes
    // first, which releases its connector session.
    shutdown_tx.send(true)?;
    for timer in timers {
        timer.await?;
    }

    info!("Leadscout stopped");
    Ok(())
}
