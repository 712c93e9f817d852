//! The durable cursor map's value type.
//!
//! `CursorStore` itself — the mutex-guarded, fsync'd owner of this map —
//! lives in the `solver-cursor` crate; this type is just the serialisable
//! shape both that crate and the HTTP health endpoint share.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `chain_name -> last_fully_processed_block`, monotonic per key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CursorMap(pub HashMap<String, u64>);

impl CursorMap {
	pub fn get(&self, chain: &str) -> Option<u64> {
		self.0.get(chain).copied()
	}
}
