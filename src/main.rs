//! AuroraMart - E-Commerce Platform with Demand Intelligence
//!
//! This is the main entry point for the AuroraMart backend: the HTTP API
//! server plus the operational subcommands (migrations, rule mining, model
//! inspection).

use auroramart::{
    api::{ApiServer, AppState},
    services::MinerService,
    AppConfig, PredictorService, Result, SqliteStore,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "auroramart")]
#[command(about = "E-commerce backend with loyalty, prediction, and recommendations", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Configuration file (TOML); defaults and AURORAMART_* env vars apply
    /// either way
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run migrations and start the HTTP API server
    Serve,

    /// Run database migrations and exit
    Migrate,

    /// Mine association rules from order history and replace the rule set
    MineRules,

    /// Validate the prediction model artifact and print its summary
    CheckModel,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Quiet the per-statement sqlx logging unless explicitly requested
    let filter = EnvFilter::new(format!(
        "auroramart={},tower_http=info,sqlx=warn",
        level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("AuroraMart v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve => {
            let store = SqliteStore::connect(&config.database.url).await?;
            store.run_migrations().await?;

            let predictor = PredictorService::load(&config.model.path)?;
            let addr = config.http.addr;
            let state = AppState::new(store, predictor, config);
            ApiServer::new(addr, state).serve().await?;
        }
        Commands::Migrate => {
            let store = SqliteStore::connect(&config.database.url).await?;
            store.run_migrations().await?;
            info!("migrations complete");
        }
        Commands::MineRules => {
            let store = SqliteStore::connect(&config.database.url).await?;
            store.run_migrations().await?;

            let miner = MinerService::new(store, config.mining.clone());
            let report = miner.regenerate().await?;
            info!(
                "mining complete: {} rules from {} baskets (generation {})",
                report.rules, report.baskets, report.generation
            );
        }
        Commands::CheckModel => {
            let predictor = PredictorService::load(&config.model.path)?;
            let status = predictor.status();
            println!(
                "model '{}': {} nodes, {} features, classes: {}",
                status.version,
                status.node_count,
                status.feature_count,
                status.classes.join(", ")
            );
        }
    }

    Ok(())
}
