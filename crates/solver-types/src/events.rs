//! Lightweight structured-logging event types.
//!
//! `SolverEvent` is **not** a durable queue, and never persisted — it exists
//! purely so the health endpoint and structured logs have a uniform shape
//! to report lifecycle transitions against.

use crate::chain::ChainId;
use crate::intent::OrderId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SolverEvent {
	Discovered {
		chain: ChainId,
		order_id: OrderId,
		block: u64,
	},
	Filled {
		chain: ChainId,
		order_id: OrderId,
		tx_hash: String,
	},
	Settled {
		chain: ChainId,
		order_id: OrderId,
		tx_hash: String,
	},
	Skipped {
		chain: ChainId,
		order_id: OrderId,
		reason: String,
		advanced: bool,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceStatus {
	Starting,
	Healthy,
	Degraded,
	Unhealthy,
	Stopping,
}
