//! Standalone companion binary: load the process environment the same way
//! the solver service would and report what it resolved to, without
//! starting any listener.
//!
//! Usage: cargo run --bin validate-config

use std::process;

use solver_config::ConfigLoader;

fn main() {
	match ConfigLoader::load_from_env() {
		Ok(config) => {
			println!("configuration is valid");
			println!("chains configured: {}", config.chains.len());
			for chain in &config.chains {
				println!(
					"  - {} (chain_id={}, family={}, domain={})",
					chain.name, chain.chain_id, chain.family, chain.hyperlane_domain
				);
			}
			println!("state file: {}", config.state_file.display());
			println!("log level: {}", config.log_level);
			println!("max retries: {}", config.max_retries);
			println!("health port: {}", config.health_port);
			if !config.allow_list.is_empty() {
				println!("allow list: {} entries", config.allow_list.len());
			}
			if !config.block_list.is_empty() {
				println!("block list: {} entries", config.block_list.len());
			}
		}
		Err(e) => {
			eprintln!("configuration invalid: {e}");
			process::exit(1);
		}
	}
}
