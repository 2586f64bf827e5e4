use anyhow::Result;
use clap::{Parser, Subcommand};
use shoprec::services::snapshot::Snapshot;
use shoprec::{init_tracing, AppState, Config};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long)]
    config: Option<String>,

    /// Overrides `store.snapshot_path`.
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print recommendations for a user, retraining when the cache is stale.
    Recommend {
        #[arg(short, long)]
        user: String,
    },
    /// Record a storefront event on a user's action log.
    Record {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        product: String,
        #[arg(short, long)]
        action: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let config = Config::load(args.config.as_deref())?;
    let snapshot_path = args
        .snapshot
        .clone()
        .unwrap_or_else(|| config.store.snapshot_path.clone());

    let state = AppState::new(config, Snapshot::load(&snapshot_path)?);

    match args.command {
        Command::Recommend { user } => {
            match state.recommendation_service.get_recommendations(&user).await {
                Ok(result) => println!("{}", serde_json::to_string_pretty(&result)?),
                Err(e) => {
                    error!("Failed to get recommendations: {}", e);
                    if e.is_retryable() {
                        anyhow::bail!("recommendation request failed, retry later: {}", e);
                    }
                    anyhow::bail!("recommendation request failed: {}", e);
                }
            }
        }
        Command::Record { user, product, action } => {
            let changed = state.record_event(&user, &product, &action)?;
            info!("Recorded {} on {} for {} (changed: {})", action, product, user, changed);
        }
    }

    state.snapshot().save(&snapshot_path)?;
    Ok(())
}
