//! Environment-driven configuration loading. A chain is "configured" iff
//! its `{PREFIX}_RPC_URL` variable is set; every other per-chain variable
//! is read under the same prefix, with defaults for the tunable knobs
//! (poll interval, confirmation depth, backfill range).

use std::env;
use std::path::PathBuf;

use solver_types::{ChainConfig, ChainFamily, ChainId};
use tracing::info;

use crate::error::ConfigError;
use crate::types::ResolvedConfig;

/// `(env prefix, display name, family)` for every chain family this
/// workspace knows how to drive: one static plug-in per family —
/// Ethereum/Optimism/Arbitrum/Base all resolve to the `Evm` plug-in,
/// Starknet to `Cairo`.
const KNOWN_CHAINS: &[(&str, &str, ChainFamily)] = &[
	("ETHEREUM", "ethereum", ChainFamily::Evm),
	("OPTIMISM", "optimism", ChainFamily::Evm),
	("ARBITRUM", "arbitrum", ChainFamily::Evm),
	("BASE", "base", ChainFamily::Evm),
	("STARKNET", "starknet", ChainFamily::Cairo),
];

const DEFAULT_STATE_FILE: &str = "./data/cursor.json";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_MAX_RETRIES: u32 = 5;
const DEFAULT_HEALTH_PORT: u16 = 8080;
const DEFAULT_POLL_INTERVAL_MS: u64 = 3_000;
const DEFAULT_CONFIRMATION_BLOCKS: u64 = 2;
const DEFAULT_MAX_BLOCK_RANGE: u64 = 500;
const DEFAULT_START_BLOCK: u64 = 0;

/// Loads a [`ResolvedConfig`] from the process environment. Stateless and
/// side-effect free beyond reading `std::env` — callers own when this runs
/// (once, at startup; the result is treated as immutable thereafter).
pub struct ConfigLoader;

impl ConfigLoader {
	/// Reads every `{PREFIX}_*` and global variable this workspace consumes.
	pub fn load_from_env() -> Result<ResolvedConfig, ConfigError> {
		let mut chains = Vec::new();
		for &(prefix, name, family) in KNOWN_CHAINS {
			if let Some(chain) = Self::load_chain(prefix, name, family)? {
				chains.push(chain);
			}
		}

		if chains.is_empty() {
			return Err(ConfigError::NoChainsConfigured);
		}

		let evm_configured = chains.iter().any(|c| c.family == ChainFamily::Evm);
		let cairo_configured = chains.iter().any(|c| c.family == ChainFamily::Cairo);

		let evm_private_key = optional_env("EVM_PRIVATE_KEY");
		if evm_configured && evm_private_key.is_none() {
			return Err(ConfigError::MissingEnv("EVM_PRIVATE_KEY".into()));
		}

		let starknet_private_key = optional_env("STARKNET_PRIVATE_KEY");
		let starknet_account_address = optional_env("STARKNET_ACCOUNT_ADDRESS");
		if cairo_configured && (starknet_private_key.is_none() || starknet_account_address.is_none()) {
			return Err(ConfigError::MissingEnv(
				"STARKNET_PRIVATE_KEY and STARKNET_ACCOUNT_ADDRESS".into(),
			));
		}

		let resolved = ResolvedConfig {
			chains,
			state_file: PathBuf::from(env::var("STATE_FILE").unwrap_or_else(|_| DEFAULT_STATE_FILE.into())),
			log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.into()),
			max_retries: parse_or_default("MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
			health_port: parse_or_default("HEALTH_PORT", DEFAULT_HEALTH_PORT)?,
			allow_list: list_env("ALLOW_LIST"),
			block_list: list_env("BLOCK_LIST"),
			evm_private_key,
			starknet_private_key,
			starknet_account_address,
		};

		info!(chains = resolved.chains.len(), state_file = %resolved.state_file.display(), "configuration resolved from environment");
		Ok(resolved)
	}

	fn load_chain(
		prefix: &str,
		name: &str,
		family: ChainFamily,
	) -> Result<Option<ChainConfig>, ConfigError> {
		let Some(rpc_url) = optional_env(&format!("{prefix}_RPC_URL")) else {
			return Ok(None);
		};

		let chain_id = ChainId(require_parsed(prefix, "CHAIN_ID")?);
		let hyperlane_domain = require_parsed(prefix, "DOMAIN_ID")?;
		let settler_address = require_env(prefix, "SETTLER_ADDRESS")?;

		Ok(Some(ChainConfig {
			name: name.to_string(),
			family,
			rpc_url,
			chain_id,
			hyperlane_domain,
			settler_address,
			poll_interval_ms: parse_or_default(&format!("{prefix}_POLL_INTERVAL_MS"), DEFAULT_POLL_INTERVAL_MS)?,
			confirmation_blocks: parse_or_default(
				&format!("{prefix}_CONFIRMATION_BLOCKS"),
				DEFAULT_CONFIRMATION_BLOCKS,
			)?,
			max_block_range: parse_or_default(&format!("{prefix}_MAX_BLOCK_RANGE"), DEFAULT_MAX_BLOCK_RANGE)?,
			solver_start_block: parse_or_default(&format!("{prefix}_SOLVER_START_BLOCK"), DEFAULT_START_BLOCK)?,
			fee_token_address: optional_env(&format!("{prefix}_FEE_TOKEN_ADDRESS")),
		}))
	}
}

fn optional_env(var: &str) -> Option<String> {
	env::var(var).ok().filter(|v| !v.is_empty())
}

fn require_env(prefix: &str, suffix: &str) -> Result<String, ConfigError> {
	let var = format!("{prefix}_{suffix}");
	optional_env(&var).ok_or(ConfigError::MissingEnv(var))
}

fn require_parsed<T: std::str::FromStr>(prefix: &str, suffix: &str) -> Result<T, ConfigError>
where
	T::Err: std::fmt::Display,
{
	let var = format!("{prefix}_{suffix}");
	let raw = require_env(prefix, suffix)?;
	raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
		var,
		reason: e.to_string(),
	})
}

fn parse_or_default<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError>
where
	T::Err: std::fmt::Display,
{
	match optional_env(var) {
		None => Ok(default),
		Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
			var: var.to_string(),
			reason: e.to_string(),
		}),
	}
}

fn list_env(var: &str) -> Vec<String> {
	optional_env(var)
		.map(|raw| raw.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
		.unwrap_or_default()
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Mutex;

	// Environment variables are process-global; serialise the tests that
	// touch them so they don't race each other under `cargo test`'s
	// default multi-threaded runner.
	static ENV_LOCK: Mutex<()> = Mutex::new(());

	fn clear_all() {
		for &(prefix, ..) in KNOWN_CHAINS {
			for suffix in [
				"RPC_URL",
				"CHAIN_ID",
				"DOMAIN_ID",
				"SETTLER_ADDRESS",
				"POLL_INTERVAL_MS",
				"CONFIRMATION_BLOCKS",
				"MAX_BLOCK_RANGE",
				"SOLVER_START_BLOCK",
				"FEE_TOKEN_ADDRESS",
			] {
				unsafe { env::remove_var(format!("{prefix}_{suffix}")) };
			}
		}
		for var in [
			"STATE_FILE",
			"LOG_LEVEL",
			"MAX_RETRIES",
			"HEALTH_PORT",
			"ALLOW_LIST",
			"BLOCK_LIST",
			"EVM_PRIVATE_KEY",
			"STARKNET_PRIVATE_KEY",
			"STARKNET_ACCOUNT_ADDRESS",
		] {
			unsafe { env::remove_var(var) };
		}
	}

	#[test]
	fn no_rpc_urls_means_no_chains_configured() {
		let _guard = ENV_LOCK.lock().unwrap();
		clear_all();
		assert!(matches!(
			ConfigLoader::load_from_env(),
			Err(ConfigError::NoChainsConfigured)
		));
	}

	#[test]
	fn a_single_evm_chain_requires_its_private_key() {
		let _guard = ENV_LOCK.lock().unwrap();
		clear_all();
		unsafe {
			env::set_var("ETHEREUM_RPC_URL", "http://localhost:8545");
			env::set_var("ETHEREUM_CHAIN_ID", "1");
			env::set_var("ETHEREUM_DOMAIN_ID", "1");
			env::set_var("ETHEREUM_SETTLER_ADDRESS", "0xsettler");
		}
		assert!(matches!(
			ConfigLoader::load_from_env(),
			Err(ConfigError::MissingEnv(ref v)) if v == "EVM_PRIVATE_KEY"
		));

		unsafe { env::set_var("EVM_PRIVATE_KEY", "0xabc") };
		let cfg = ConfigLoader::load_from_env().unwrap();
		assert_eq!(cfg.chains.len(), 1);
		assert_eq!(cfg.chains[0].chain_id, ChainId(1));
		assert_eq!(cfg.chains[0].family, ChainFamily::Evm);
		assert_eq!(cfg.max_retries, DEFAULT_MAX_RETRIES);
		clear_all();
	}

	#[test]
	fn unset_tunables_fall_back_to_defaults() {
		let _guard = ENV_LOCK.lock().unwrap();
		clear_all();
		unsafe {
			env::set_var("ETHEREUM_RPC_URL", "http://localhost:8545");
			env::set_var("ETHEREUM_CHAIN_ID", "1");
			env::set_var("ETHEREUM_DOMAIN_ID", "1");
			env::set_var("ETHEREUM_SETTLER_ADDRESS", "0xsettler");
			env::set_var("EVM_PRIVATE_KEY", "0xabc");
		}
		let cfg = ConfigLoader::load_from_env().unwrap();
		assert_eq!(cfg.chains[0].poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
		assert_eq!(cfg.chains[0].confirmation_blocks, DEFAULT_CONFIRMATION_BLOCKS);
		assert_eq!(cfg.state_file, PathBuf::from(DEFAULT_STATE_FILE));
		clear_all();
	}

	#[test]
	fn allow_and_block_lists_split_on_comma_and_trim() {
		let _guard = ENV_LOCK.lock().unwrap();
		clear_all();
		unsafe {
			env::set_var("ETHEREUM_RPC_URL", "http://localhost:8545");
			env::set_var("ETHEREUM_CHAIN_ID", "1");
			env::set_var("ETHEREUM_DOMAIN_ID", "1");
			env::set_var("ETHEREUM_SETTLER_ADDRESS", "0xsettler");
			env::set_var("EVM_PRIVATE_KEY", "0xabc");
			env::set_var("ALLOW_LIST", "0xAAA, 0xBBB");
		}
		let cfg = ConfigLoader::load_from_env().unwrap();
		assert_eq!(cfg.allow_list, vec!["0xAAA".to_string(), "0xBBB".to_string()]);
		clear_all();
	}

	#[test]
	fn cairo_chain_requires_starknet_secrets() {
		let _guard = ENV_LOCK.lock().unwrap();
		clear_all();
		unsafe {
			env::set_var("STARKNET_RPC_URL", "http://localhost:5050");
			env::set_var("STARKNET_CHAIN_ID", "23448594291968334");
			env::set_var("STARKNET_DOMAIN_ID", "23448594291968334");
			env::set_var("STARKNET_SETTLER_ADDRESS", "0x1");
		}
		assert!(matches!(
			ConfigLoader::load_from_env(),
			Err(ConfigError::MissingEnv(_))
		));
		unsafe {
			env::set_var("STARKNET_PRIVATE_KEY", "0x1");
			env::set_var("STARKNET_ACCOUNT_ADDRESS", "0x2");
		}
		let cfg = ConfigLoader::load_from_env().unwrap();
		assert_eq!(cfg.chains[0].family, ChainFamily::Cairo);
		clear_all();
	}
}
