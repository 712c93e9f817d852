//! Turns the raw hex strings `solver-config` reads from the environment
//! into the SDK-specific signing material `solver-chains::build_chain`
//! needs. Config loading stays free of `alloy`/`starknet` types; this
//! binary is where they meet.

use std::collections::HashMap;

use alloy::primitives::Address as AlloyAddress;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use solver_chains::ChainSecret;
use solver_config::ResolvedConfig;
use solver_types::{ChainFamily, ChainId};
use starknet::core::types::Felt;

/// The solver's own addresses on each family, used by the balance oracle
/// even for a chain family that isn't configured.
pub struct SolverIdentity {
	pub evm_address: AlloyAddress,
	pub cairo_address: Felt,
}

/// Builds one [`ChainSecret`] per configured chain. The same EVM signer is
/// reused across every `Evm`-family chain — a single solver identity per
/// family; likewise for the Starknet account.
pub fn load_secrets(config: &ResolvedConfig) -> Result<(HashMap<ChainId, ChainSecret>, SolverIdentity)> {
	let evm_signer = config
		.evm_private_key
		.as_deref()
		.map(parse_evm_key)
		.transpose()
		.context("EVM_PRIVATE_KEY")?;

	let cairo_key = config
		.starknet_private_key
		.as_deref()
		.map(|k| Felt::from_hex(k).context("STARKNET_PRIVATE_KEY is not valid hex"))
		.transpose()?;
	let cairo_account = config
		.starknet_account_address
		.as_deref()
		.map(|a| Felt::from_hex(a).context("STARKNET_ACCOUNT_ADDRESS is not valid hex"))
		.transpose()?;

	let identity = SolverIdentity {
		evm_address: evm_signer.as_ref().map(|s| s.address()).unwrap_or(AlloyAddress::ZERO),
		cairo_address: cairo_account.unwrap_or(Felt::ZERO),
	};

	let mut secrets = HashMap::new();
	for chain in &config.chains {
		let secret = match chain.family {
			ChainFamily::Evm => {
				let signer = evm_signer
					.clone()
					.ok_or_else(|| anyhow::anyhow!("EVM_PRIVATE_KEY is required for chain {}", chain.name))?;
				ChainSecret::Evm(signer)
			}
			ChainFamily::Cairo => {
				let private_key = cairo_key
					.ok_or_else(|| anyhow::anyhow!("STARKNET_PRIVATE_KEY is required for chain {}", chain.name))?;
				let account_address = cairo_account
					.ok_or_else(|| anyhow::anyhow!("STARKNET_ACCOUNT_ADDRESS is required for chain {}", chain.name))?;
				ChainSecret::Cairo { private_key, account_address }
			}
		};
		secrets.insert(chain.chain_id, secret);
	}

	Ok((secrets, identity))
}

fn parse_evm_key(raw: &str) -> Result<PrivateKeySigner> {
	raw.parse::<PrivateKeySigner>()
		.context("EVM_PRIVATE_KEY is not a valid private key")
}
