//! # Solver Chains
//!
//! The two chain-family plug-ins — one static implementation per family,
//! selected by a match on `ChainFamily`, not a trait-object registry:
//! [`evm`] for Ethereum/Optimism/Arbitrum/Base-style EIP-7683 deployments,
//! [`cairo`] for Starknet. [`build_chain`] is the single factory that turns
//! one [`ChainConfig`] plus its signing secret into the
//! `(Listener, ChainHandler)` pair `solver-core` drives.

pub mod balance;
pub mod cairo;
pub mod error;
pub mod evm;

pub use balance::ChainBalanceOracle;

use alloy::signers::local::PrivateKeySigner;
use solver_cursor::CursorStore;
use solver_types::{ChainConfig, ChainFamily, ChainHandler, ChainId, Listener};
use starknet::core::types::Felt;
use std::collections::HashMap;
use std::sync::Arc;

pub use error::ChainError;

/// The signing material a chain's `ChainHandler` needs, chosen per family.
/// Loaded by `solver-config` from environment secrets and handed to
/// [`build_chain`] rather than read inside this crate, keeping key material
/// out of the chain plug-ins' own config parsing.
pub enum ChainSecret {
	Evm(PrivateKeySigner),
	Cairo {
		private_key: Felt,
		account_address: Felt,
	},
}

/// Builds the listener/handler pair for one configured chain: one
/// `Listener` and one `ChainHandler` per configured chain.
///
/// `chains` maps every configured chain id to its family (for decoding
/// addresses in the right shape); `domains` maps `hyperlane_domain ->
/// chain_id` for settlement routing.
pub fn build_chain(
	config: ChainConfig,
	secret: ChainSecret,
	cursor: Arc<CursorStore>,
	chains: Arc<HashMap<ChainId, ChainFamily>>,
	domains: Arc<HashMap<u32, ChainId>>,
	max_retries: u32,
) -> solver_types::Result<(Arc<dyn Listener>, Arc<dyn ChainHandler>)> {
	match (config.family, secret) {
		(ChainFamily::Evm, ChainSecret::Evm(signer)) => {
			let chain_id_to_domain: HashMap<ChainId, u32> =
				domains.iter().map(|(domain, chain)| (*chain, *domain)).collect();

			let listener = evm::EvmListener::new(config.clone(), cursor, chains, max_retries)?;
			let handler = evm::EvmChainHandler::new(config, signer, Arc::new(chain_id_to_domain))?;

			Ok((Arc::new(listener), Arc::new(handler)))
		}
		(ChainFamily::Cairo, ChainSecret::Cairo { private_key, account_address }) => {
			let chain_id_to_domain: HashMap<ChainId, u32> =
				domains.iter().map(|(domain, chain)| (*chain, *domain)).collect();

			let listener = cairo::CairoListener::new(
				config.clone(),
				cursor,
				chains,
				domains,
				max_retries,
			)?;
			let handler = cairo::CairoChainHandler::new(
				config,
				private_key,
				account_address,
				Arc::new(chain_id_to_domain),
			)?;

			Ok((Arc::new(listener), Arc::new(handler)))
		}
		(family, _) => Err(solver_types::SolverError::Config(format!(
			"secret family mismatch for a {family} chain"
		))),
	}
}
