//! EIP-7683 ABI shapes and the EVM side of intent decoding.
//!
//! The `sol!` block mirrors the settler's on-chain `ResolvedCrossChainOrder`
//! shape, decoding straight into the workspace's chain-agnostic [`Intent`]
//! instead of an intermediate JSON blob.

use alloy::primitives::{Log as PrimLog, LogData, U256 as AlloyU256};
use alloy::sol;
use alloy::sol_types::SolEvent;
use solver_types::{ChainFamily, ChainId, FillInstruction, Intent, OrderId, Output, U256};
use std::collections::HashMap;

use crate::error::{ChainError, Result};

sol! {
	struct SolOutput {
		bytes32 token;
		uint256 amount;
		bytes32 recipient;
		uint256 chainId;
	}

	struct SolFillInstruction {
		uint64 destinationChainId;
		bytes32 destinationSettler;
		bytes originData;
	}

	struct ResolvedCrossChainOrder {
		address user;
		uint256 originChainId;
		uint32 openDeadline;
		uint32 fillDeadline;
		bytes32 orderId;
		SolOutput[] maxSpent;
		SolOutput[] minReceived;
		SolFillInstruction[] fillInstructions;
	}

	event Open(bytes32 indexed orderId, ResolvedCrossChainOrder order);

	interface ISettler {
		function fill(bytes32 orderId, bytes originData, bytes fillerData) external;
		function settle(bytes32[] orderIds) external payable;
		function orderStatus(bytes32 orderId) external view returns (uint8);
		function quoteGasPayment(uint32 originDomain) external view returns (uint256);
	}

	interface IERC20 {
		function balanceOf(address account) external view returns (uint256);
		function allowance(address owner, address spender) external view returns (uint256);
		function approve(address spender, uint256 amount) external returns (bool);
	}
}

/// `Open`'s topic hash, for building log filters without re-deriving it.
pub fn open_event_signature() -> alloy::primitives::B256 {
	Open::SIGNATURE_HASH
}

/// `bytes32` → normalised address string, depending on which family the
/// value's chain belongs to: EVM keeps only the low 20 bytes, Cairo keeps
/// the full 32.
fn bytes32_to_chain_address(word: &[u8; 32], family: ChainFamily) -> String {
	match family {
		ChainFamily::Evm => format!("0x{}", hex::encode(&word[12..])),
		ChainFamily::Cairo => format!("0x{}", hex::encode(word)),
	}
}

fn sol_output_to_output(
	o: &SolOutput,
	chains: &HashMap<ChainId, ChainFamily>,
) -> Output {
	let chain_id = ChainId(o.chainId.to::<u64>());
	let family = chains.get(&chain_id).copied().unwrap_or(ChainFamily::Evm);
	Output {
		token: bytes32_to_chain_address(&o.token.0, family),
		amount: alloy_u256_to_u256(o.amount),
		recipient: bytes32_to_chain_address(&o.recipient.0, family),
		chain_id,
	}
}

fn alloy_u256_to_u256(v: AlloyU256) -> U256 {
	U256::from_be_bytes::<32>(v.to_be_bytes())
}

/// Decodes a raw `Open` log into the uniform [`Intent`]. `chains` maps every
/// configured chain id to its family so destination/recipient addresses are
/// normalised correctly.
pub fn decode_open_log(
	address: alloy::primitives::Address,
	topics: Vec<alloy::primitives::B256>,
	data: Vec<u8>,
	origin_chain_id: ChainId,
	chains: &HashMap<ChainId, ChainFamily>,
) -> Result<Intent> {
	let prim_log = PrimLog {
		address,
		data: LogData::new_unchecked(topics, data.into()),
	};

	let decoded = Open::decode_log(&prim_log, true)
		.map_err(|e| ChainError::Decode(format!("failed to decode Open event: {e}")))?;

	let order = &decoded.order;
	let order_id = OrderId(decoded.orderId.0);

	let max_spent = order
		.maxSpent
		.iter()
		.map(|o| sol_output_to_output(o, chains))
		.collect::<Vec<_>>();
	let min_received = order
		.minReceived
		.iter()
		.map(|o| sol_output_to_output(o, chains))
		.collect::<Vec<_>>();

	let fill_instructions = order
		.fillInstructions
		.iter()
		.map(|f| {
			let dest_chain = ChainId(f.destinationChainId);
			let family = chains.get(&dest_chain).copied().unwrap_or(ChainFamily::Evm);
			FillInstruction {
				destination_chain_id: dest_chain,
				destination_settler: bytes32_to_chain_address(&f.destinationSettler.0, family),
				origin_data: f.originData.to_vec(),
			}
		})
		.collect::<Vec<_>>();

	Ok(Intent {
		order_id,
		user: format!("0x{:x}", order.user),
		origin_chain_id,
		open_deadline: order.openDeadline as u64,
		fill_deadline: order.fillDeadline as u64,
		max_spent,
		min_received,
		fill_instructions,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn bytes32_to_address_keeps_low_20_bytes_for_evm() {
		let mut word = [0u8; 32];
		word[12..].copy_from_slice(&[0xAB; 20]);
		let addr = bytes32_to_chain_address(&word, ChainFamily::Evm);
		assert_eq!(addr, format!("0x{}", "ab".repeat(20)));
	}

	#[test]
	fn bytes32_to_address_keeps_full_word_for_cairo() {
		let word = [0x11u8; 32];
		let addr = bytes32_to_chain_address(&word, ChainFamily::Cairo);
		assert_eq!(addr, format!("0x{}", "11".repeat(32)));
	}
}
