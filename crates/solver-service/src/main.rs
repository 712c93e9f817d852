//! Boots the configured chains, starts their listeners against the shared
//! [`solver_core::Solver`], and serves `/health` and `/cursors` until
//! signalled to stop.

mod health;
mod secrets;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use solver_chains::ChainBalanceOracle;
use solver_config::ConfigLoader;
use solver_core::SolverManager;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "solver-service", about = "Cross-chain intent solver")]
struct Args {
	/// Print the resolved configuration and exit without starting anything.
	#[arg(long)]
	validate_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let config = ConfigLoader::load_from_env().context("loading configuration from environment")?;

	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	if args.validate_only {
		println!("configuration valid: {} chain(s) configured", config.chains.len());
		return Ok(());
	}

	let (secrets, identity) = secrets::load_secrets(&config)?;

	let balances: Arc<dyn solver_types::BalanceOracle> = Arc::new(
		ChainBalanceOracle::new(&config.chains, identity.evm_address, identity.cairo_address)
			.context("constructing balance oracle")?,
	);

	let manager = Arc::new(SolverManager::new(&config, secrets, balances).await?);
	manager.start().await.context("starting solver manager")?;
	info!(chains = config.chains.len(), "solver running");

	let app = health::router(manager.clone());
	let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.health_port))
		.await
		.with_context(|| format!("binding health port {}", config.health_port))?;

	tokio::select! {
		result = axum::serve(listener, app) => {
			result.context("health server exited")?;
		}
		_ = tokio::signal::ctrl_c() => {
			info!("received shutdown signal");
		}
	}

	manager.shutdown().await.context("shutting down solver manager")?;
	Ok(())
}
