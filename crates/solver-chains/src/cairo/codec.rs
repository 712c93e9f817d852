//! Cairo-family felt decoding and the Cairo→EVM `origin_data` rewrite —
//! the single most error-prone piece of the pipeline, so it gets its own
//! golden-vector test below rather than relying on round-trip tests alone.
//!
//! The flat event-payload parsing here builds on
//! `solver_types::OrderId::to_cairo_limbs`/`from_cairo_limbs`'s 256-bit
//! low/high split, generalized to arbitrary amounts.

use solver_types::{ChainFamily, ChainId, FillInstruction, Intent, OrderId, Output, U256};
use starknet::core::types::Felt;
use std::collections::HashMap;

use crate::error::{ChainError, Result};

/// Bounds-checked forward cursor over a flat felt array — a flat sequence
/// of 252-bit field elements.
pub struct FeltCursor<'a> {
	felts: &'a [Felt],
	pos: usize,
}

impl<'a> FeltCursor<'a> {
	pub fn new(felts: &'a [Felt]) -> Self {
		Self { felts, pos: 0 }
	}

	pub fn next_felt(&mut self) -> Result<Felt> {
		let felt = self
			.felts
			.get(self.pos)
			.copied()
			.ok_or_else(|| ChainError::Decode(format!("felt cursor exhausted at index {}", self.pos)))?;
		self.pos += 1;
		Ok(felt)
	}

	pub fn next_u32(&mut self) -> Result<u32> {
		let felt = self.next_felt()?;
		let bytes = felt.to_bytes_be();
		u32::try_from(u64::from_be_bytes(bytes[24..32].try_into().unwrap()))
			.map_err(|_| ChainError::Decode("felt does not fit in u32".into()))
	}

	pub fn next_u64(&mut self) -> Result<u64> {
		let felt = self.next_felt()?;
		let bytes = felt.to_bytes_be();
		Ok(u64::from_be_bytes(bytes[24..32].try_into().unwrap()))
	}

	/// A 256-bit integer transmitted as two field elements, low limb first.
	pub fn next_u256(&mut self) -> Result<U256> {
		let low = self.next_felt()?;
		let high = self.next_felt()?;
		Ok(u256_from_limbs(felt_to_u128(low), felt_to_u128(high)))
	}

	/// A Cairo address felt, preserved in its full 32-byte form.
	pub fn next_address(&mut self) -> Result<[u8; 32]> {
		Ok(self.next_felt()?.to_bytes_be())
	}

	/// `Bytes` payload: `[size_in_bytes, word_count, word_0..word_{n-1}]`,
	/// each word a 16-byte big-endian chunk.
	pub fn next_bytes(&mut self) -> Result<Vec<u8>> {
		let size = self.next_u64()? as usize;
		let word_count = self.next_u64()? as usize;

		let mut bytes = Vec::with_capacity(word_count * 16);
		for _ in 0..word_count {
			let felt = self.next_felt()?;
			bytes.extend_from_slice(&felt.to_bytes_be()[16..32]);
		}
		bytes.truncate(size);
		Ok(bytes)
	}
}

fn felt_to_u128(felt: Felt) -> u128 {
	let bytes = felt.to_bytes_be();
	u128::from_be_bytes(bytes[16..32].try_into().unwrap())
}

pub fn u256_from_limbs(low: u128, high: u128) -> U256 {
	let mut bytes = [0u8; 32];
	bytes[0..16].copy_from_slice(&high.to_be_bytes());
	bytes[16..32].copy_from_slice(&low.to_be_bytes());
	U256::from_be_bytes(bytes)
}

fn u256_word(v: U256) -> [u8; 32] {
	v.to_be_bytes::<32>()
}

fn u64_word(v: u64) -> [u8; 32] {
	let mut word = [0u8; 32];
	word[24..32].copy_from_slice(&v.to_be_bytes());
	word
}

fn u32_word(v: u32) -> [u8; 32] {
	let mut word = [0u8; 32];
	word[28..32].copy_from_slice(&v.to_be_bytes());
	word
}

/// The Cairo-origin order whose `fill_instructions[*].origin_data` must be
/// rewritten into the destination EVM settler's exact ABI layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CairoOrderData {
	pub sender: [u8; 32],
	pub recipient: [u8; 32],
	pub input_token: [u8; 32],
	pub output_token: [u8; 32],
	pub amount_in: U256,
	pub amount_out: U256,
	pub sender_nonce: u64,
	pub origin_domain: u32,
	pub destination_domain: u32,
	pub destination_settler: [u8; 32],
	pub fill_deadline: u64,
}

impl CairoOrderData {
	pub fn decode(felts: &[Felt]) -> Result<Self> {
		let mut c = FeltCursor::new(felts);
		Self::decode_from_cursor(&mut c)
	}

	/// Same decode, but reads the 11 fields inline from a cursor positioned
	/// by the caller — the shape a Cairo `Open` event actually delivers,
	/// embedded within a larger felt payload rather than as a standalone
	/// array (see [`super::listener`]'s fill-instruction decoding).
	pub fn decode_from_cursor(c: &mut FeltCursor<'_>) -> Result<Self> {
		Ok(Self {
			sender: c.next_address()?,
			recipient: c.next_address()?,
			input_token: c.next_address()?,
			output_token: c.next_address()?,
			amount_in: c.next_u256()?,
			amount_out: c.next_u256()?,
			sender_nonce: c.next_u64()?,
			origin_domain: c.next_u32()?,
			destination_domain: c.next_u32()?,
			destination_settler: c.next_address()?,
			fill_deadline: c.next_u64()?,
		})
	}

	/// Rewrites into the 14×32 = 448-byte EVM ABI blob the destination
	/// settler expects: a leading `0x20` offset word, the 11 business
	/// fields in order, then a zero-length trailing `data` field
	/// (`data_offset = 0x0180`, `data_size = 0x00`).
	pub fn to_evm_origin_data(&self) -> Vec<u8> {
		let mut out = Vec::with_capacity(14 * 32);
		out.extend_from_slice(&u256_word(U256::from(0x20u64)));
		out.extend_from_slice(&self.sender);
		out.extend_from_slice(&self.recipient);
		out.extend_from_slice(&self.input_token);
		out.extend_from_slice(&self.output_token);
		out.extend_from_slice(&u256_word(self.amount_in));
		out.extend_from_slice(&u256_word(self.amount_out));
		out.extend_from_slice(&u64_word(self.sender_nonce));
		out.extend_from_slice(&u32_word(self.origin_domain));
		out.extend_from_slice(&u32_word(self.destination_domain));
		out.extend_from_slice(&self.destination_settler);
		out.extend_from_slice(&u64_word(self.fill_deadline));
		out.extend_from_slice(&u256_word(U256::from(0x0180u64)));
		out.extend_from_slice(&u256_word(U256::ZERO));
		out
	}
}

/// `bytes32` → normalised address string, mirroring
/// `evm::codec::bytes32_to_chain_address` but for felt-sourced addresses.
pub fn felt_address_to_chain_string(bytes: [u8; 32], family: ChainFamily) -> String {
	match family {
		ChainFamily::Evm => format!("0x{}", hex::encode(&bytes[12..])),
		ChainFamily::Cairo => format!("0x{}", hex::encode(bytes)),
	}
}

fn resolve_chain(domain: u32, domains: &HashMap<u32, ChainId>) -> ChainId {
	match domains.get(&domain) {
		Some(chain_id) => *chain_id,
		None => {
			tracing::warn!(domain, "unmapped hyperlane domain, passing through as chain id");
			ChainId(domain as u64)
		}
	}
}

/// Decodes a Cairo `Open` event's flat felt payload into the uniform
/// [`Intent`]: `user, origin_domain, open_deadline, fill_deadline,
/// order_id(low,high), max_spent[], min_received[], fill_instructions[]`.
///
/// `domains` maps `hyperlane_domain -> chain_id`; an unmapped domain is
/// passed through as a chain id numerically equal to the domain — unknown
/// domains are logged and passed through as themselves.
pub fn decode_open_event(
	payload: &[Felt],
	origin_chain_id: ChainId,
	chains: &HashMap<ChainId, ChainFamily>,
	domains: &HashMap<u32, ChainId>,
) -> Result<Intent> {
	let mut c = FeltCursor::new(payload);

	let user_bytes = c.next_address()?;
	let user = format!("0x{}", hex::encode(user_bytes));
	let _origin_domain = c.next_u32()?;
	let open_deadline = c.next_u64()?;
	let fill_deadline = c.next_u64()?;

	let low = felt_to_u128(c.next_felt()?);
	let high = felt_to_u128(c.next_felt()?);
	let order_id = OrderId::from_cairo_limbs(low, high);

	let max_spent = decode_output_array(&mut c, chains, domains)?;
	let min_received = decode_output_array(&mut c, chains, domains)?;
	let fill_instructions = decode_fill_instruction_array(&mut c, chains, domains)?;

	Ok(Intent {
		order_id,
		user,
		origin_chain_id,
		open_deadline,
		fill_deadline,
		max_spent,
		min_received,
		fill_instructions,
	})
}

fn decode_output_array(
	c: &mut FeltCursor<'_>,
	chains: &HashMap<ChainId, ChainFamily>,
	domains: &HashMap<u32, ChainId>,
) -> Result<Vec<Output>> {
	let len = c.next_u64()? as usize;
	let mut out = Vec::with_capacity(len);
	for _ in 0..len {
		let token_bytes = c.next_address()?;
		let amount = c.next_u256()?;
		let recipient_bytes = c.next_address()?;
		let domain = c.next_u32()?;
		let chain_id = resolve_chain(domain, domains);
		let family = chains.get(&chain_id).copied().unwrap_or(ChainFamily::Cairo);
		out.push(Output {
			token: felt_address_to_chain_string(token_bytes, family),
			amount,
			recipient: felt_address_to_chain_string(recipient_bytes, family),
			chain_id,
		});
	}
	Ok(out)
}

/// Decodes `fill_instructions[]`. When a leg's destination is EVM, the
/// embedded `CairoOrderData` fields are read inline and immediately
/// rewritten into the destination's ABI layout rather than kept as opaque
/// bytes; a Cairo destination's `origin_data` stays a plain `Bytes`
/// payload the solver core never inspects.
fn decode_fill_instruction_array(
	c: &mut FeltCursor<'_>,
	chains: &HashMap<ChainId, ChainFamily>,
	domains: &HashMap<u32, ChainId>,
) -> Result<Vec<FillInstruction>> {
	let len = c.next_u64()? as usize;
	let mut out = Vec::with_capacity(len);
	for _ in 0..len {
		let destination_domain = c.next_u32()?;
		let destination_chain_id = resolve_chain(destination_domain, domains);
		let family = chains
			.get(&destination_chain_id)
			.copied()
			.unwrap_or(ChainFamily::Cairo);
		let settler_bytes = c.next_address()?;

		let origin_data = match family {
			ChainFamily::Evm => CairoOrderData::decode_from_cursor(c)?.to_evm_origin_data(),
			ChainFamily::Cairo => c.next_bytes()?,
		};

		out.push(FillInstruction {
			destination_chain_id,
			destination_settler: felt_address_to_chain_string(settler_bytes, family),
			origin_data,
		});
	}
	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn felt_addr(byte: u8) -> Felt {
		Felt::from_bytes_be(&[byte; 32])
	}

	#[test]
	fn u256_limb_round_trip_matches_order_id_convention() {
		// high = first 16 bytes, low = last 16 bytes, same convention as
		// solver_types::OrderId::to_cairo_limbs/from_cairo_limbs.
		let v = u256_from_limbs(1, 2);
		let bytes = v.to_be_bytes::<32>();
		assert_eq!(u128::from_be_bytes(bytes[0..16].try_into().unwrap()), 2);
		assert_eq!(u128::from_be_bytes(bytes[16..32].try_into().unwrap()), 1);
	}

	#[test]
	fn bytes_felt_round_trip() {
		let payload = b"hello cairo bytes payload of arbitrary length!";
		let word_count = payload.len().div_ceil(16);
		let mut felts = vec![
			Felt::from(payload.len() as u64),
			Felt::from(word_count as u64),
		];
		for chunk in payload.chunks(16) {
			let mut word = [0u8; 16];
			word[..chunk.len()].copy_from_slice(chunk);
			// chunks shorter than 16 are the final, right-padded chunk; a
			// real encoder would left-align instead, but decode only cares
			// about the leading `size` bytes once concatenated.
			felts.push(Felt::from_bytes_be(&{
				let mut full = [0u8; 32];
				full[16..].copy_from_slice(&word);
				full
			}));
		}

		let mut cursor = FeltCursor::new(&felts);
		let decoded = cursor.next_bytes().unwrap();
		assert_eq!(&decoded, payload);
	}

	/// Golden-vector test: a 12-field Cairo order (11 decoded business
	/// fields, one of which is two u256 felts) gets rewritten into exactly
	/// 14 × 32 = 448 bytes in the destination settler's expected field
	/// order.
	#[test]
	fn s2_cairo_to_evm_origin_data_golden_vector() {
		let order = CairoOrderData {
			sender: [0x11; 32],
			recipient: [0x22; 32],
			input_token: [0x33; 32],
			output_token: [0x44; 32],
			amount_in: U256::from(1_000_000u64),
			amount_out: U256::from(2_000_000u64),
			sender_nonce: 7,
			origin_domain: 100,
			destination_domain: 1,
			destination_settler: [0x55; 32],
			fill_deadline: 9_999_999,
		};

		let blob = order.to_evm_origin_data();
		assert_eq!(blob.len(), 14 * 32);

		let word = |i: usize| &blob[i * 32..(i + 1) * 32];

		assert_eq!(word(0), u256_word(U256::from(0x20u64)));
		assert_eq!(word(1), &order.sender[..]);
		assert_eq!(word(2), &order.recipient[..]);
		assert_eq!(word(3), &order.input_token[..]);
		assert_eq!(word(4), &order.output_token[..]);
		assert_eq!(word(5), u256_word(order.amount_in));
		assert_eq!(word(6), u256_word(order.amount_out));
		assert_eq!(word(7), u64_word(order.sender_nonce));
		assert_eq!(word(8), u32_word(order.origin_domain));
		assert_eq!(word(9), u32_word(order.destination_domain));
		assert_eq!(word(10), &order.destination_settler[..]);
		assert_eq!(word(11), u64_word(order.fill_deadline));
		assert_eq!(word(12), u256_word(U256::from(0x0180u64)));
		assert_eq!(word(13), u256_word(U256::ZERO));
	}

	#[test]
	fn decode_then_rewrite_round_trips_through_felts() {
		let mut felts = Vec::new();
		felts.push(felt_addr(0xAA)); // sender
		felts.push(felt_addr(0xBB)); // recipient
		felts.push(felt_addr(0xCC)); // input_token
		felts.push(felt_addr(0xDD)); // output_token
		felts.push(Felt::from(500u64)); // amount_in low
		felts.push(Felt::from(0u64)); // amount_in high
		felts.push(Felt::from(600u64)); // amount_out low
		felts.push(Felt::from(0u64)); // amount_out high
		felts.push(Felt::from(42u64)); // sender_nonce
		felts.push(Felt::from(10u64)); // origin_domain
		felts.push(Felt::from(20u64)); // destination_domain
		felts.push(felt_addr(0xEE)); // destination_settler
		felts.push(Felt::from(123456u64)); // fill_deadline

		let decoded = CairoOrderData::decode(&felts).unwrap();
		assert_eq!(decoded.amount_in, U256::from(500u64));
		assert_eq!(decoded.sender_nonce, 42);

		let blob = decoded.to_evm_origin_data();
		assert_eq!(blob.len(), 448);
	}

	#[test]
	fn decode_open_event_rewrites_origin_data_for_evm_destination() {
		let evm_chain = ChainId(10);
		let cairo_chain = ChainId(20);
		let mut chains = HashMap::new();
		chains.insert(evm_chain, ChainFamily::Evm);
		chains.insert(cairo_chain, ChainFamily::Cairo);
		let mut domains = HashMap::new();
		domains.insert(1u32, evm_chain);
		domains.insert(2u32, cairo_chain);

		let mut felts = Vec::new();
		felts.push(felt_addr(0x01)); // user
		felts.push(Felt::from(2u64)); // origin_domain (this chain is cairo_chain)
		felts.push(Felt::from(1000u64)); // open_deadline
		felts.push(Felt::from(2000u64)); // fill_deadline
		felts.push(Felt::from(7u64)); // order_id low
		felts.push(Felt::from(9u64)); // order_id high

		// max_spent: one output on the EVM chain
		felts.push(Felt::from(1u64)); // array length
		felts.push(felt_addr(0x02)); // token
		felts.push(Felt::from(100u64)); // amount low
		felts.push(Felt::from(0u64)); // amount high
		felts.push(felt_addr(0x03)); // recipient
		felts.push(Felt::from(1u64)); // domain -> evm_chain

		// min_received: one output back on the cairo origin
		felts.push(Felt::from(1u64));
		felts.push(felt_addr(0x04));
		felts.push(Felt::from(110u64));
		felts.push(Felt::from(0u64));
		felts.push(felt_addr(0x05));
		felts.push(Felt::from(2u64));

		// fill_instructions: one leg targeting the EVM chain
		felts.push(Felt::from(1u64)); // array length
		felts.push(Felt::from(1u64)); // destination_domain -> evm_chain
		felts.push(felt_addr(0x06)); // destination_settler
		// inline CairoOrderData for the rewrite
		felts.push(felt_addr(0x11)); // sender
		felts.push(felt_addr(0x12)); // recipient
		felts.push(felt_addr(0x13)); // input_token
		felts.push(felt_addr(0x14)); // output_token
		felts.push(Felt::from(100u64)); // amount_in low
		felts.push(Felt::from(0u64)); // amount_in high
		felts.push(Felt::from(110u64)); // amount_out low
		felts.push(Felt::from(0u64)); // amount_out high
		felts.push(Felt::from(1u64)); // sender_nonce
		felts.push(Felt::from(2u64)); // origin_domain
		felts.push(Felt::from(1u64)); // destination_domain
		felts.push(felt_addr(0x15)); // destination_settler (inner)
		felts.push(Felt::from(2000u64)); // fill_deadline

		let intent = decode_open_event(&felts, cairo_chain, &chains, &domains).unwrap();

		assert_eq!(intent.max_spent[0].chain_id, evm_chain);
		assert_eq!(intent.max_spent[0].token, format!("0x{}", "02".repeat(20)));
		assert_eq!(intent.min_received[0].chain_id, cairo_chain);
		assert_eq!(
			intent.min_received[0].token,
			format!("0x{}", "04".repeat(32))
		);

		let leg = &intent.fill_instructions[0];
		assert_eq!(leg.destination_chain_id, evm_chain);
		assert_eq!(leg.origin_data.len(), 448);
		assert!(intent.is_profitable());
	}
}
