//! The resolved, process-wide configuration. Everything the rest of the
//! workspace needs to start is collected here once, at boot, so no other
//! crate re-reads the environment.

use solver_types::ChainConfig;
use std::path::PathBuf;

/// Signing material read from the environment but not yet parsed into an
/// SDK-specific key type — that parsing happens in `solver-chains`, keeping
/// this crate free of an `alloy`/`starknet` dependency. Config loading has
/// no business knowing how a signer is constructed.
#[derive(Clone)]
pub struct ResolvedConfig {
	/// One entry per chain that had a `{PREFIX}_RPC_URL` set. A chain is
	/// "configured" solely by the presence of its RPC url.
	pub chains: Vec<ChainConfig>,
	pub state_file: PathBuf,
	pub log_level: String,
	pub max_retries: u32,
	pub health_port: u16,
	/// Lower-cased in `solver-rules::RuleContext`; kept as-typed here.
	pub allow_list: Vec<String>,
	pub block_list: Vec<String>,
	/// Hex-encoded private key (with or without `0x`), required iff at
	/// least one `Evm`-family chain is configured.
	pub evm_private_key: Option<String>,
	/// Hex-encoded Starknet private key, required iff the `Starknet` chain
	/// is configured.
	pub starknet_private_key: Option<String>,
	/// Hex-encoded Starknet account contract address, required alongside
	/// `starknet_private_key`.
	pub starknet_account_address: Option<String>,
}
