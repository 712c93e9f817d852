//! [`SolverManager`]: wires one [`Listener`]/[`ChainHandler`] pair per
//! configured chain around a single shared [`Solver`], and owns their
//! lifecycle via a construct-then-start-then-join shape.

use std::collections::HashMap;
use std::sync::Arc;

use solver_chains::{build_chain, ChainSecret};
use solver_config::ResolvedConfig;
use solver_cursor::CursorStore;
use solver_rules::{RuleContext, RulesEngine};
use solver_types::{BalanceOracle, ChainFamily, ChainId, Listener, ListenerHandle, SolverEvent};
use tokio::sync::{broadcast, Mutex};
use tracing::info;

use crate::error::CoreError;
use crate::lifecycle::{LifecycleManager, LifecycleState};
use crate::registry::ChainRegistry;
use crate::solver::Solver;

/// Owns every background listener task and the shared [`Solver`] they call
/// back into. One per process, a single solver identity per family.
pub struct SolverManager {
	lifecycle: LifecycleManager,
	cursor: Arc<CursorStore>,
	listeners: Vec<Arc<dyn Listener>>,
	handles: Mutex<Vec<Arc<dyn ListenerHandle>>>,
	solver: Arc<Solver>,
	events: broadcast::Sender<SolverEvent>,
}

impl SolverManager {
	/// Builds every configured chain's `(Listener, ChainHandler)` pair via
	/// [`build_chain`], loads the cursor file, and assembles the shared
	/// [`Solver`]. Does not start anything yet — call [`Self::start`] for
	/// that; construction and starting are kept separate so a caller can
	/// inspect `cursor()`/`events()` before committing.
	pub async fn new(
		config: &ResolvedConfig,
		mut secrets: HashMap<ChainId, ChainSecret>,
		balances: Arc<dyn BalanceOracle>,
	) -> Result<Self, CoreError> {
		let cursor = Arc::new(
			CursorStore::load(&config.state_file)
				.await
				.map_err(|e| CoreError::Configuration(format!("loading cursor file: {e}")))?,
		);

		let chains_by_id: Arc<HashMap<ChainId, ChainFamily>> = Arc::new(
			config
				.chains
				.iter()
				.map(|c| (c.chain_id, c.family))
				.collect(),
		);
		let domains: Arc<HashMap<u32, ChainId>> = Arc::new(
			config
				.chains
				.iter()
				.map(|c| (c.hyperlane_domain, c.chain_id))
				.collect(),
		);

		let mut registry = ChainRegistry::new();
		let mut listeners = Vec::with_capacity(config.chains.len());

		for chain_config in &config.chains {
			let secret = secrets.remove(&chain_config.chain_id).ok_or_else(|| {
				CoreError::Configuration(format!(
					"no signing secret available for configured chain {}",
					chain_config.chain_id
				))
			})?;

			let (listener, handler) = build_chain(
				chain_config.clone(),
				secret,
				cursor.clone(),
				chains_by_id.clone(),
				domains.clone(),
				config.max_retries,
			)
			.map_err(CoreError::Chain)?;

			registry.register(handler)?;
			listeners.push(listener);
		}

		let rule_ctx = RuleContext::new(balances)
			.with_allow_list(config.allow_list.clone())
			.with_block_list(config.block_list.clone());

		let (events, _) = broadcast::channel(256);
		let solver = Arc::new(Solver::new(
			registry,
			RulesEngine::default_pipeline(),
			rule_ctx,
			events.clone(),
		));

		Ok(Self {
			lifecycle: LifecycleManager::new(),
			cursor,
			listeners,
			handles: Mutex::new(Vec::new()),
			solver,
			events,
		})
	}

	/// Subscribe to the structured-logging event stream the health endpoint
	/// reads from, backing the `/health`/`/cursors` endpoints.
	pub fn subscribe_events(&self) -> broadcast::Receiver<SolverEvent> {
		self.events.subscribe()
	}

	pub fn cursor(&self) -> &Arc<CursorStore> {
		&self.cursor
	}

	pub async fn lifecycle_state(&self) -> LifecycleState {
		self.lifecycle.get_state().await
	}

	/// Starts every configured chain's listener against the shared solver as
	/// its `EventHandler`.
	pub async fn start(&self) -> Result<(), CoreError> {
		self.lifecycle.initialize().await?;

		let mut handles = self.handles.lock().await;
		for listener in &self.listeners {
			info!(chain = %listener.chain_id(), name = listener.chain_name(), "starting listener");
			let handle = listener.clone().start(self.solver.clone()).await;
			handles.push(handle);
		}
		drop(handles);

		self.lifecycle.start().await?;
		Ok(())
	}

	/// Signals every listener to stop and waits for each to observe the
	/// signal before returning.
	pub async fn shutdown(&self) -> Result<(), CoreError> {
		self.lifecycle.shutdown().await?;

		let handles = self.handles.lock().await;
		futures::future::join_all(handles.iter().map(|h| h.stop())).await;
		Ok(())
	}
}
