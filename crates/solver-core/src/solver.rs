//! The `Solver`: the single [`EventHandler`] every listener calls back into.
//! One `process_intent` contract covering routing, rule evaluation, fill,
//! and settle, rather than separate discovery/delivery/settlement services
//! coordinating with each other.

use async_trait::async_trait;
use solver_rules::{RuleContext, RulesEngine};
use solver_types::{ChainId, EventHandler, FillOutcome, Intent, SolverEvent, Verdict};
use tracing::{info, warn};

use crate::registry::ChainRegistry;

/// Routes a discovered [`Intent`] through the rules pipeline and, if
/// accepted, to fill and settle.
pub struct Solver {
	chains: ChainRegistry,
	rules: RulesEngine,
	rule_ctx: RuleContext,
	events: tokio::sync::broadcast::Sender<SolverEvent>,
}

impl Solver {
	pub fn new(
		chains: ChainRegistry,
		rules: RulesEngine,
		rule_ctx: RuleContext,
		events: tokio::sync::broadcast::Sender<SolverEvent>,
	) -> Self {
		Self {
			chains,
			rules,
			rule_ctx,
			events,
		}
	}

	fn emit(&self, event: SolverEvent) {
		// No active subscriber is not an error: SolverEvent is for
		// logging/health, not a durable queue.
		let _ = self.events.send(event);
	}

	async fn process(&self, intent: Intent) -> Verdict {
		let order_id = intent.order_id;

		let verdict = self.rules.evaluate(&intent, &self.rule_ctx).await;
		if let solver_rules::RuleVerdict::Reject { reason, permanent } = verdict {
			self.emit(SolverEvent::Skipped {
				chain: intent.origin_chain_id,
				order_id,
				reason: reason.clone(),
				advanced: permanent,
			});
			return if permanent { Verdict::Advance } else { Verdict::Skip };
		}

		let Some(destination) = intent.primary_destination() else {
			warn!(%order_id, "intent has no fill instructions, skipping");
			return Verdict::Skip;
		};

		let Some(handler) = self.chains.get(destination) else {
			warn!(%order_id, chain = %destination, "no chain handler configured for destination, skipping");
			return Verdict::Skip;
		};

		match handler.fill(&intent).await {
			Ok(FillOutcome::Complete) => {
				info!(%order_id, "order already filled and settled on-chain");
				Verdict::Advance
			}
			Ok(FillOutcome::Settle) => self.settle(&intent, destination, handler).await,
			Err(e) => {
				warn!(%order_id, error = %e, "fill failed");
				Verdict::Skip
			}
		}
	}

	async fn settle(
		&self,
		intent: &Intent,
		destination: ChainId,
		handler: std::sync::Arc<dyn solver_types::ChainHandler>,
	) -> Verdict {
		match handler.settle(intent).await {
			Ok(()) => {
				self.emit(SolverEvent::Settled {
					chain: destination,
					order_id: intent.order_id,
					tx_hash: String::new(),
				});
				Verdict::Advance
			}
			Err(e) => {
				warn!(order_id = %intent.order_id, error = %e, "settle failed");
				Verdict::Skip
			}
		}
	}
}

#[async_trait]
impl EventHandler for Solver {
	async fn handle_intent(&self, intent: Intent) -> Verdict {
		self.process(intent).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use solver_rules::RuleContext;
	use solver_types::{
		BalanceOracle, ChainHandler, FillInstruction, OrderId, OrderStatus, Output, U256,
	};
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	struct AlwaysFunded;
	#[async_trait]
	impl BalanceOracle for AlwaysFunded {
		async fn get_balance(&self, _chain_id: ChainId, _token: &str) -> solver_types::Result<Option<U256>> {
			Ok(Some(U256::MAX))
		}
	}

	struct FakeHandler {
		chain_id: ChainId,
		fill_result: FillOutcome,
		settle_calls: AtomicUsize,
	}

	#[async_trait]
	impl ChainHandler for FakeHandler {
		fn chain_id(&self) -> ChainId {
			self.chain_id
		}
		async fn fill(&self, _intent: &Intent) -> solver_types::Result<FillOutcome> {
			Ok(self.fill_result)
		}
		async fn settle(&self, _intent: &Intent) -> solver_types::Result<()> {
			self.settle_calls.fetch_add(1, Ordering::SeqCst);
			Ok(())
		}
		async fn order_status(&self, _intent: &Intent) -> solver_types::Result<OrderStatus> {
			Ok(OrderStatus::Unknown)
		}
	}

	fn sample_intent(dest: ChainId) -> Intent {
		Intent {
			order_id: OrderId([7u8; 32]),
			user: "0xuser".into(),
			origin_chain_id: ChainId(1),
			open_deadline: 0,
			fill_deadline: 0,
			max_spent: vec![Output {
				token: "".into(),
				amount: U256::from(100u64),
				recipient: "0xr".into(),
				chain_id: dest,
			}],
			min_received: vec![Output {
				token: "".into(),
				amount: U256::from(200u64),
				recipient: "0xr".into(),
				chain_id: ChainId(1),
			}],
			fill_instructions: vec![FillInstruction {
				destination_chain_id: dest,
				destination_settler: "0xsettler".into(),
				origin_data: vec![],
			}],
		}
	}

	fn solver_with(handler: Arc<FakeHandler>) -> Solver {
		let mut chains = ChainRegistry::new();
		chains.register(handler).unwrap();
		let (tx, _rx) = tokio::sync::broadcast::channel(16);
		Solver::new(
			chains,
			RulesEngine::default_pipeline(),
			RuleContext::new(Arc::new(AlwaysFunded)),
			tx,
		)
	}

	#[tokio::test]
	async fn complete_fill_advances_without_settling() {
		let dest = ChainId(10);
		let handler = Arc::new(FakeHandler {
			chain_id: dest,
			fill_result: FillOutcome::Complete,
			settle_calls: AtomicUsize::new(0),
		});
		let solver = solver_with(handler.clone());

		let verdict = solver.handle_intent(sample_intent(dest)).await;
		assert_eq!(verdict, Verdict::Advance);
		assert_eq!(handler.settle_calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn settle_fill_proceeds_to_settle_and_advances() {
		let dest = ChainId(10);
		let handler = Arc::new(FakeHandler {
			chain_id: dest,
			fill_result: FillOutcome::Settle,
			settle_calls: AtomicUsize::new(0),
		});
		let solver = solver_with(handler.clone());

		let verdict = solver.handle_intent(sample_intent(dest)).await;
		assert_eq!(verdict, Verdict::Advance);
		assert_eq!(handler.settle_calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn unprofitable_intent_is_skipped_before_touching_any_handler() {
		let dest = ChainId(10);
		let handler = Arc::new(FakeHandler {
			chain_id: dest,
			fill_result: FillOutcome::Complete,
			settle_calls: AtomicUsize::new(0),
		});
		let solver = solver_with(handler);

		let mut intent = sample_intent(dest);
		intent.min_received[0].amount = U256::from(1u64); // now unprofitable
		let verdict = solver.handle_intent(intent).await;
		assert_eq!(verdict, Verdict::Advance); // profitability reject is permanent
	}

	#[tokio::test]
	async fn missing_chain_handler_is_skipped() {
		let solver = solver_with(Arc::new(FakeHandler {
			chain_id: ChainId(999),
			fill_result: FillOutcome::Complete,
			settle_calls: AtomicUsize::new(0),
		}));

		let verdict = solver.handle_intent(sample_intent(ChainId(10))).await;
		assert_eq!(verdict, Verdict::Skip);
	}
}
