//! The uniform, chain-agnostic intent.
//!
//! Shaped after an EIP-7683 `ResolvedCrossChainOrder`/`Output`/
//! `FillInstruction` triple, generalized so both chain families decode into
//! the same shape instead of one EVM-specific struct.

use crate::chain::ChainId;
use crate::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque 32-byte order identifier, unique per origin chain.
///
/// Also the unit the Cairo low/high-felt split and EVM bytes32
/// representations both round-trip through.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub [u8; 32]);

impl OrderId {
	pub fn from_hex(s: &str) -> crate::errors::Result<Self> {
		let s = s.strip_prefix("0x").unwrap_or(s);
		let bytes = hex::decode(s)
			.map_err(|e| crate::errors::SolverError::Decode(format!("bad order id: {e}")))?;
		let arr: [u8; 32] = bytes
			.try_into()
			.map_err(|_| crate::errors::SolverError::Decode("order id must be 32 bytes".into()))?;
		Ok(Self(arr))
	}

	/// Split into the two 128-bit field elements Cairo transmits 256-bit
	/// integers as. `high = id[0:16]`, `low = id[16:32]`.
	pub fn to_cairo_limbs(&self) -> (u128, u128) {
		let high = u128::from_be_bytes(self.0[0..16].try_into().unwrap());
		let low = u128::from_be_bytes(self.0[16..32].try_into().unwrap());
		(low, high)
	}

	/// Inverse of [`to_cairo_limbs`].
	pub fn from_cairo_limbs(low: u128, high: u128) -> Self {
		let mut bytes = [0u8; 32];
		bytes[0..16].copy_from_slice(&high.to_be_bytes());
		bytes[16..32].copy_from_slice(&low.to_be_bytes());
		Self(bytes)
	}
}

impl fmt::Display for OrderId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", hex::encode(self.0))
	}
}

impl fmt::Debug for OrderId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "OrderId({self})")
	}
}

impl FromStr for OrderId {
	type Err = crate::errors::SolverError;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		Self::from_hex(s)
	}
}

/// An output in `max_spent`/`min_received`: a token amount on a given chain,
/// destined for a given recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
	/// Normalised token address. Empty string denotes the chain's native
	/// token (see the balance rule's caveat).
	pub token: String,
	pub amount: U256,
	pub recipient: String,
	pub chain_id: ChainId,
}

/// One destination leg of an intent: which settler to call and the exact
/// opaque payload it expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillInstruction {
	pub destination_chain_id: ChainId,
	pub destination_settler: String,
	/// Passed through to the destination settler unmodified, except for
	/// the Cairo→EVM rewrite, which happens at decode
	/// time (the listener's job), never inside the solver core.
	#[serde(with = "hex_bytes")]
	pub origin_data: Vec<u8>,
}

/// The uniform cross-chain intent produced by a `Listener` and consumed by
/// the `Solver`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
	pub order_id: OrderId,
	pub user: String,
	pub origin_chain_id: ChainId,
	pub open_deadline: u64,
	pub fill_deadline: u64,
	pub max_spent: Vec<Output>,
	pub min_received: Vec<Output>,
	pub fill_instructions: Vec<FillInstruction>,
}

impl Intent {
	/// Invariant: `|fill_instructions| >= 1`.
	pub fn has_fill_instructions(&self) -> bool {
		!self.fill_instructions.is_empty()
	}

	/// The chain the solver will route the fill to: `fill_instructions[0]
	/// .destination_chain_id`.
	pub fn primary_destination(&self) -> Option<ChainId> {
		self.fill_instructions.first().map(|f| f.destination_chain_id)
	}

	/// Every chain id referenced by this intent, for the "must be a
	/// configured chain or the intent is rejected" invariant.
	pub fn referenced_chains(&self) -> Vec<ChainId> {
		let mut chains: Vec<ChainId> = self
			.max_spent
			.iter()
			.map(|o| o.chain_id)
			.chain(self.fill_instructions.iter().map(|f| f.destination_chain_id))
			.collect();
		chains.sort_by_key(|c| c.0);
		chains.dedup();
		chains
	}

	/// Default profitability requirement:
	/// `min_received[0].amount > max_spent[0].amount`.
	pub fn is_profitable(&self) -> bool {
		match (self.min_received.first(), self.max_spent.first()) {
			(Some(recv), Some(spent)) => recv.amount > spent.amount,
			_ => false,
		}
	}
}

mod hex_bytes {
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
		s.serialize_str(&format!("0x{}", hex::encode(bytes)))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
		let s = String::deserialize(d)?;
		hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn order_id_round_trips_through_cairo_limbs() {
		let mut raw = [0u8; 32];
		for (i, b) in raw.iter_mut().enumerate() {
			*b = i as u8;
		}
		let id = OrderId(raw);
		let (low, high) = id.to_cairo_limbs();
		assert_eq!(OrderId::from_cairo_limbs(low, high), id);

		// high is the first 16 bytes, low is the last 16 bytes.
		assert_eq!(high.to_be_bytes(), raw[0..16]);
		assert_eq!(low.to_be_bytes(), raw[16..32]);
	}

	#[test]
	fn order_id_hex_round_trip() {
		let s = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
		let id = OrderId::from_hex(s).unwrap();
		assert_eq!(id.to_string(), s);
	}

	#[test]
	fn profitability_requires_strictly_greater_receipt() {
		let out = |amount: u64| Output {
			token: "tok".into(),
			amount: U256::from(amount),
			recipient: "0xrecipient".into(),
			chain_id: ChainId(1),
		};

		let mut intent = Intent {
			order_id: OrderId([0u8; 32]),
			user: "0xuser".into(),
			origin_chain_id: ChainId(1),
			open_deadline: 0,
			fill_deadline: 0,
			max_spent: vec![out(100)],
			min_received: vec![out(100)],
			fill_instructions: vec![],
		};
		assert!(!intent.is_profitable());

		intent.min_received[0].amount = U256::from(101u64);
		assert!(intent.is_profitable());
	}
}
