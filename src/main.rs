//! LP Portfolio CLI
//!
//! Serves the positions API, or values one wallet from the command line.

use clap::{Parser, Subcommand};
use lp_portfolio::chain::RpcReader;
use lp_portfolio::indexer::AlchemyIndexer;
use lp_portfolio::price::CoinGeckoPrices;
use lp_portfolio::server::{self, PositionsResponse};
use lp_portfolio::{Config, Error, PortfolioAggregator, PositionValuator, Result, RpcConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "lp-portfolio")]
#[command(about = "Discover and value a wallet's LP positions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve,

    /// Print the positions of one wallet
    Positions {
        /// Wallet address
        #[arg(short, long)]
        address: String,

        /// Maximum number of non-zero balances to probe
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve => {
            let addr = config.server.bind_addr;
            let aggregator = build_aggregator(&config)?;
            server::serve(aggregator, addr).await?;
        }
        Commands::Positions { address, limit } => {
            let mut aggregator = build_aggregator(&config)?;
            if let Some(limit) = limit {
                aggregator = aggregator.with_candidate_limit(limit);
            }
            let pools = aggregator.positions_for_wallet(&address).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&PositionsResponse { pools })?
            );
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Wire the real collaborators for the configured network
fn build_aggregator(config: &Config) -> Result<PortfolioAggregator> {
    let chain_id = config.network.chain_id();
    let rpc_config = RpcConfig::from_env();

    let rpc_url = rpc_config.get(chain_id).ok_or_else(|| {
        Error::Config(format!("No RPC URL configured for {}", config.network.name()))
    })?;
    let indexer_url = rpc_config.indexer_url(chain_id).ok_or_else(|| {
        Error::Config(format!(
            "Balance indexing on {} needs an Alchemy endpoint; set ALCHEMY_API_KEY",
            config.network.name()
        ))
    })?;

    tracing::info!(
        network = config.network.name(),
        chain_id,
        candidate_limit = config.candidate_limit,
        "Configured collaborators"
    );

    let reader = RpcReader::new(rpc_url, &config.rpc)?;
    let prices = CoinGeckoPrices::new(&config.price, config.network)?;
    let indexer = AlchemyIndexer::new(&indexer_url, &config.indexer)?;

    let valuator = PositionValuator::new(Arc::new(reader), Arc::new(prices));
    Ok(PortfolioAggregator::new(
        valuator,
        Arc::new(indexer),
        config.candidate_limit,
        config.request_timeout(),
    ))
}
