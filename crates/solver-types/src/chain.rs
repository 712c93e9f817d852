//! Chain identifiers and the static, process-wide chain configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chain identifier (the chain's own id, distinct from the messaging-layer
/// `hyperlane_domain`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl fmt::Display for ChainId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for ChainId {
	type Err = std::num::ParseIntError;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		Ok(ChainId(s.parse()?))
	}
}

/// The chain family a configured chain belongs to. Each family is a plug-in
/// conforming to `Listener` + `ChainHandler`; no runtime inheritance, just a
/// tag plus one static implementation per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
	Evm,
	Cairo,
}

impl fmt::Display for ChainFamily {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Evm => write!(f, "evm"),
			Self::Cairo => write!(f, "cairo"),
		}
	}
}

/// Read-only, process-wide configuration for a single configured chain.
/// Loaded once at start by `solver-config`; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
	pub name: String,
	pub family: ChainFamily,
	pub rpc_url: String,
	pub chain_id: ChainId,
	pub hyperlane_domain: u32,
	pub settler_address: String,
	pub poll_interval_ms: u64,
	pub confirmation_blocks: u64,
	pub max_block_range: u64,
	/// Block to resume from when the cursor has no entry yet for this
	/// chain. Read once from the deployment-state bootstrap (out of
	/// scope); the cursor itself owns every subsequent value.
	pub solver_start_block: u64,
	/// ERC20 address backing the Cairo settler's gas-payment fee token.
	/// Unused on `Evm`-family chains, where the fee is paid as native ETH
	/// via a payable call instead. `None` means the allowance check for
	/// the fee token is NOT ENFORCED on this chain, logged rather than
	/// silently assumed.
	pub fee_token_address: Option<String>,
}

impl ChainConfig {
	/// `safe_head = max(0, current_head - confirmation_blocks)`.
	pub fn safe_head(&self, current_head: u64) -> u64 {
		current_head.saturating_sub(self.confirmation_blocks)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn chain_id_parses_and_displays() {
		assert_eq!("8453".parse::<ChainId>().unwrap(), ChainId(8453));
		assert_eq!(ChainId(1).to_string(), "1");
	}

	#[test]
	fn safe_head_never_underflows() {
		let cfg = ChainConfig {
			name: "test".into(),
			family: ChainFamily::Evm,
			rpc_url: "http://localhost".into(),
			chain_id: ChainId(1),
			hyperlane_domain: 1,
			settler_address: "0x0".into(),
			poll_interval_ms: 1000,
			confirmation_blocks: 10,
			max_block_range: 500,
			solver_start_block: 0,
			fee_token_address: None,
		};

		assert_eq!(cfg.safe_head(5), 0);
		assert_eq!(cfg.safe_head(15), 5);
	}
}
