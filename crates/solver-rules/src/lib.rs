//! # Solver Rules
//!
//! The decision pipeline a discovered [`Intent`] runs through before the
//! solver commits to fulfilling it. Generalizes a validator-pipeline shape
//! (order validity, liquidity, profitability, risk) down to three checks —
//! balance sufficiency, profitability, allow/block lists — behind the same
//! "ordered rules, first rejection wins" structure.
//!
//! A [`Rule`] never decides whether its rejection is retryable: it reports
//! `permanent` and the engine's caller (`solver-core`) is the one that maps
//! a permanent rejection onto a terminal, cursor-advancing outcome and a
//! non-permanent one onto a retry-later skip.

use async_trait::async_trait;
use solver_types::{BalanceOracle, ChainId, Intent, U256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Shared read-only context every rule gets, independent of rule count or
/// order. Kept separate from `Intent` so `solver-rules` never needs to
/// depend on `solver-chains`.
pub struct RuleContext {
	pub balances: Arc<dyn BalanceOracle>,
	/// Lower-cased, `0x`-prefixed addresses. Empty means "no restriction".
	pub allow_list: Vec<String>,
	pub block_list: Vec<String>,
}

impl RuleContext {
	pub fn new(balances: Arc<dyn BalanceOracle>) -> Self {
		Self {
			balances,
			allow_list: Vec::new(),
			block_list: Vec::new(),
		}
	}

	pub fn with_allow_list(mut self, list: Vec<String>) -> Self {
		self.allow_list = list.into_iter().map(|s| s.to_lowercase()).collect();
		self
	}

	pub fn with_block_list(mut self, list: Vec<String>) -> Self {
		self.block_list = list.into_iter().map(|s| s.to_lowercase()).collect();
		self
	}
}

/// A rule's decision on one intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleVerdict {
	Accept,
	/// `permanent = true`: retrying this intent later would not change the
	/// outcome — the only rule that deterministically can't resolve itself
	/// is profitability, since it's a function of the intent's own numbers.
	/// `permanent = false`: the rejection may resolve on its own (e.g. the
	/// solver's balance is currently insufficient, or an allow/block list
	/// gets reconfigured).
	Reject { reason: String, permanent: bool },
}

impl RuleVerdict {
	pub fn is_accept(&self) -> bool {
		matches!(self, Self::Accept)
	}
}

#[async_trait]
pub trait Rule: Send + Sync {
	fn name(&self) -> &'static str;

	async fn evaluate(&self, intent: &Intent, ctx: &RuleContext) -> RuleVerdict;
}

/// Ordered pipeline of rules; stops at the first rejection.
pub struct RulesEngine {
	rules: Vec<Box<dyn Rule>>,
}

impl RulesEngine {
	pub fn new() -> Self {
		Self { rules: Vec::new() }
	}

	pub fn with_rule(mut self, rule: Box<dyn Rule>) -> Self {
		self.rules.push(rule);
		self
	}

	/// The engine every solver runs by default: balance, then
	/// profitability, then allow/block lists.
	pub fn default_pipeline() -> Self {
		Self::new()
			.with_rule(Box::new(BlockListRule))
			.with_rule(Box::new(AllowListRule))
			.with_rule(Box::new(ProfitabilityRule))
			.with_rule(Box::new(SufficientBalanceRule))
	}

	pub async fn evaluate(&self, intent: &Intent, ctx: &RuleContext) -> RuleVerdict {
		for rule in &self.rules {
			let verdict = rule.evaluate(intent, ctx).await;
			if !verdict.is_accept() {
				if let RuleVerdict::Reject { reason, permanent } = &verdict {
					warn!(
						rule = rule.name(),
						order_id = %intent.order_id,
						reason,
						permanent,
						"intent rejected"
					);
				}
				return verdict;
			}
		}
		RuleVerdict::Accept
	}
}

impl Default for RulesEngine {
	fn default() -> Self {
		Self::new()
	}
}

/// Rejects unless `min_received[0].amount > max_spent[0].amount`.
/// Deterministic on the intent's own numbers, so a rejection here is
/// permanent.
pub struct ProfitabilityRule;

#[async_trait]
impl Rule for ProfitabilityRule {
	fn name(&self) -> &'static str {
		"profitability"
	}

	async fn evaluate(&self, intent: &Intent, _ctx: &RuleContext) -> RuleVerdict {
		if intent.is_profitable() {
			RuleVerdict::Accept
		} else {
			RuleVerdict::Reject {
				reason: "min_received does not exceed max_spent".into(),
				permanent: true,
			}
		}
	}
}

/// Aggregates `max_spent` by `(chain, token)` and checks the solver holds
/// enough of each. When a chain family cannot generically report a
/// native-token balance, the `BalanceOracle` returns `Ok(None)`; that leg is
/// skipped and logged rather than silently treated as funded — "NOT
/// ENFORCED" must be visible, never silent.
pub struct SufficientBalanceRule;

#[async_trait]
impl Rule for SufficientBalanceRule {
	fn name(&self) -> &'static str {
		"solver_has_sufficient_balance"
	}

	async fn evaluate(&self, intent: &Intent, ctx: &RuleContext) -> RuleVerdict {
		let mut required: HashMap<(ChainId, String), U256> = HashMap::new();
		for out in &intent.max_spent {
			let entry = required
				.entry((out.chain_id, out.token.clone()))
				.or_insert(U256::ZERO);
			*entry = entry.saturating_add(out.amount);
		}

		for ((chain_id, token), amount) in required {
			match ctx.balances.get_balance(chain_id, &token).await {
				Ok(Some(balance)) => {
					if balance < amount {
						return RuleVerdict::Reject {
							reason: format!(
								"insufficient balance on chain {chain_id}: have {balance}, need {amount} of {}",
								if token.is_empty() { "<native>" } else { &token }
							),
							permanent: false,
						};
					}
				}
				Ok(None) => {
					warn!(
						%chain_id,
						token = if token.is_empty() { "<native>" } else { &token },
						"balance check NOT ENFORCED: chain family cannot report this balance generically"
					);
				}
				Err(e) => {
					return RuleVerdict::Reject {
						reason: format!("balance oracle error: {e}"),
						permanent: false,
					}
				}
			}
		}

		RuleVerdict::Accept
	}
}

/// Optional deny-list on the intent's user. Empty list means disabled.
pub struct BlockListRule;

#[async_trait]
impl Rule for BlockListRule {
	fn name(&self) -> &'static str {
		"block_list"
	}

	async fn evaluate(&self, intent: &Intent, ctx: &RuleContext) -> RuleVerdict {
		if ctx.block_list.contains(&intent.user.to_lowercase()) {
			RuleVerdict::Reject {
				reason: format!("user {} is block-listed", intent.user),
				permanent: false,
			}
		} else {
			RuleVerdict::Accept
		}
	}
}

/// Optional allow-list on the intent's user. Empty list means "allow
/// everyone" — it is a restriction you opt into, not a default-deny.
pub struct AllowListRule;

#[async_trait]
impl Rule for AllowListRule {
	fn name(&self) -> &'static str {
		"allow_list"
	}

	async fn evaluate(&self, intent: &Intent, ctx: &RuleContext) -> RuleVerdict {
		if ctx.allow_list.is_empty() || ctx.allow_list.contains(&intent.user.to_lowercase()) {
			RuleVerdict::Accept
		} else {
			RuleVerdict::Reject {
				reason: format!("user {} is not on the allow list", intent.user),
				permanent: false,
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use solver_types::{FillInstruction, OrderId, Output};

	struct FixedOracle(Option<U256>);

	#[async_trait]
	impl BalanceOracle for FixedOracle {
		async fn get_balance(
			&self,
			_chain_id: ChainId,
			_token: &str,
		) -> solver_types::Result<Option<U256>> {
			Ok(self.0)
		}
	}

	fn sample_intent(max_spent: u64, min_received: u64) -> Intent {
		let out = |amount: u64| Output {
			token: "tok".into(),
			amount: U256::from(amount),
			recipient: "0xrecipient".into(),
			chain_id: ChainId(10),
		};
		Intent {
			order_id: OrderId([1u8; 32]),
			user: "0xUser".into(),
			origin_chain_id: ChainId(1),
			open_deadline: 0,
			fill_deadline: 0,
			max_spent: vec![out(max_spent)],
			min_received: vec![out(min_received)],
			fill_instructions: vec![FillInstruction {
				destination_chain_id: ChainId(10),
				destination_settler: "0xsettler".into(),
				origin_data: vec![],
			}],
		}
	}

	#[tokio::test]
	async fn unprofitable_intent_is_permanently_rejected() {
		let ctx = RuleContext::new(Arc::new(FixedOracle(Some(U256::MAX))));
		let verdict = ProfitabilityRule.evaluate(&sample_intent(100, 100), &ctx).await;
		assert_eq!(
			verdict,
			RuleVerdict::Reject {
				reason: "min_received does not exceed max_spent".into(),
				permanent: true
			}
		);
	}

	#[tokio::test]
	async fn insufficient_balance_is_not_permanent() {
		let ctx = RuleContext::new(Arc::new(FixedOracle(Some(U256::from(1u64)))));
		let verdict = SufficientBalanceRule
			.evaluate(&sample_intent(100, 200), &ctx)
			.await;
		match verdict {
			RuleVerdict::Reject { permanent, .. } => assert!(!permanent),
			_ => panic!("expected rejection"),
		}
	}

	#[tokio::test]
	async fn unreported_balance_is_not_enforced_but_not_rejected() {
		let ctx = RuleContext::new(Arc::new(FixedOracle(None)));
		let verdict = SufficientBalanceRule
			.evaluate(&sample_intent(100, 200), &ctx)
			.await;
		assert!(verdict.is_accept());
	}

	#[tokio::test]
	async fn block_list_short_circuits_before_profitability() {
		let ctx = RuleContext::new(Arc::new(FixedOracle(Some(U256::MAX))))
			.with_block_list(vec!["0xuser".into()]);
		let engine = RulesEngine::default_pipeline();
		let verdict = engine.evaluate(&sample_intent(100, 100), &ctx).await;
		match verdict {
			RuleVerdict::Reject { reason, permanent } => {
				assert!(reason.contains("block-listed"));
				assert!(!permanent);
			}
			_ => panic!("expected rejection"),
		}
	}

	#[tokio::test]
	async fn allow_list_rejects_unknown_users_when_populated() {
		let ctx = RuleContext::new(Arc::new(FixedOracle(Some(U256::MAX))))
			.with_allow_list(vec!["0xsomeoneelse".into()]);
		let verdict = AllowListRule.evaluate(&sample_intent(100, 200), &ctx).await;
		assert!(!verdict.is_accept());
	}

	#[tokio::test]
	async fn full_pipeline_accepts_a_healthy_intent() {
		let ctx = RuleContext::new(Arc::new(FixedOracle(Some(U256::MAX))));
		let engine = RulesEngine::default_pipeline();
		let verdict = engine.evaluate(&sample_intent(100, 200), &ctx).await;
		assert!(verdict.is_accept());
	}
}
