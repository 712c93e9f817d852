//! The plug-in interfaces every chain family implements, plus the
//! `EventHandler` seam between a `Listener` and the `Solver`.

use crate::chain::ChainId;
use crate::errors::Result;
use crate::intent::Intent;
use async_trait::async_trait;

/// The listener's verdict on whether a processed intent lets its block
/// advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
	Advance,
	Skip,
}

/// Implemented by the `Solver`; called once per intent, in block order,
/// from the listener's own task — the solver callback runs on the
/// listener's own task, never a separate worker pool.
#[async_trait]
pub trait EventHandler: Send + Sync {
	async fn handle_intent(&self, intent: Intent) -> Verdict;
}

/// A running listener's shutdown handle.
#[async_trait]
pub trait ListenerHandle: Send + Sync {
	/// Cooperative shutdown; returns when the background task has observed
	/// the signal.
	async fn stop(&self);
}

/// Chain-family-specific ingester. One instance per configured chain.
#[async_trait]
pub trait Listener: Send + Sync {
	fn chain_id(&self) -> ChainId;

	fn chain_name(&self) -> &str;

	/// Spawns the backfill-then-poll background task and returns
	/// immediately.
	async fn start(
		self: std::sync::Arc<Self>,
		handler: std::sync::Arc<dyn EventHandler>,
	) -> std::sync::Arc<dyn ListenerHandle>;

	async fn last_processed_block(&self) -> u64;
}

/// `Fill` outcomes. `ERROR` is represented as `Err` rather
/// than a third variant — idiomatic for a fallible call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
	/// Chain reports the order already filled and settled.
	Complete,
	/// Fill succeeded, or the order was already filled but not settled.
	Settle,
}

/// On-chain order lifecycle, observed not owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
	Unknown,
	Opened,
	Filled,
	Settled,
}

/// Chain-family-specific executor. Exposes `fill`/`settle`/`order_status`
/// against the uniform `Intent`. Calls against the same handler are
/// serialised by its own internal mutex to avoid nonce conflicts — the
/// trait makes no promise about concurrency beyond `Send + Sync`.
#[async_trait]
pub trait ChainHandler: Send + Sync {
	fn chain_id(&self) -> ChainId;

	async fn fill(&self, intent: &Intent) -> Result<FillOutcome>;

	async fn settle(&self, intent: &Intent) -> Result<()>;

	async fn order_status(&self, intent: &Intent) -> Result<OrderStatus>;
}

/// Queried by the `solver_has_sufficient_balance` rule. Implemented by
/// whatever owns the chain's RPC client (the `ChainHandler` in practice),
/// kept as its own trait so `solver-rules` does not need to depend on
/// `solver-chains`.
#[async_trait]
pub trait BalanceOracle: Send + Sync {
	/// Balance of `token` (empty string = native token) held by the solver
	/// on `chain_id`. Returns `Ok(None)` when the chain family cannot
	/// query the native balance generically rather
	/// than silently assuming success.
	async fn get_balance(&self, chain_id: ChainId, token: &str) -> Result<Option<crate::U256>>;
}
