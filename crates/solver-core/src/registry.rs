//! Holds the one `ChainHandler` per configured chain the `Solver` dispatches
//! fills/settlements to.

use crate::error::CoreError;
use solver_types::{ChainHandler, ChainId};
use std::collections::HashMap;
use std::sync::Arc;

/// Read-only after construction — chains are fixed for the process lifetime,
/// loaded once at start and never mutated.
#[derive(Default)]
pub struct ChainRegistry {
	handlers: HashMap<ChainId, Arc<dyn ChainHandler>>,
}

impl ChainRegistry {
	pub fn new() -> Self {
		Self {
			handlers: HashMap::new(),
		}
	}

	pub fn register(&mut self, handler: Arc<dyn ChainHandler>) -> Result<(), CoreError> {
		let chain_id = handler.chain_id();
		if self.handlers.contains_key(&chain_id) {
			return Err(CoreError::Configuration(format!(
				"chain {chain_id} already registered"
			)));
		}
		self.handlers.insert(chain_id, handler);
		Ok(())
	}

	pub fn get(&self, chain_id: ChainId) -> Option<Arc<dyn ChainHandler>> {
		self.handlers.get(&chain_id).cloned()
	}
}
