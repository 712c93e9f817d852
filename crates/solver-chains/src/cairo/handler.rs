//! Cairo-family [`ChainHandler`]: `fill`/`settle`/`order_status` against the
//! Starknet settler contract, mirroring
//! [`crate::evm::handler::EvmChainHandler`]'s structure — same mutex, same
//! state-machine short-circuits — over `starknet-rs` invoke/call instead of
//! `alloy` transactions.

use async_trait::async_trait;
use solver_types::{
	ChainConfig, ChainHandler, ChainId, FillOutcome, Intent, OrderStatus, SolverError, U256,
};
use starknet::accounts::{Account, ExecutionEncoding, SingleOwnerAccount};
use starknet::core::types::{BlockId, BlockTag, Call, ExecutionResult, Felt, FunctionCall, TransactionReceipt};
use starknet::core::utils::{cairo_short_string_to_felt, get_selector_from_name};
use starknet::providers::jsonrpc::{HttpTransport, JsonRpcClient};
use starknet::providers::Provider;
use starknet::signers::{LocalWallet, SigningKey};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

type Result<T> = solver_types::Result<T>;

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Felt-encoded amount, transmitted as two felts (low, high) — the same
/// 256-bit split `cairo::codec` decodes events with.
fn u256_to_limbs(v: U256) -> (Felt, Felt) {
	let bytes = v.to_be_bytes::<32>();
	let high = u128::from_be_bytes(bytes[0..16].try_into().unwrap());
	let low = u128::from_be_bytes(bytes[16..32].try_into().unwrap());
	(Felt::from(low), Felt::from(high))
}

fn order_id_felts(intent: &Intent) -> (Felt, Felt) {
	let (low, high) = intent.order_id.to_cairo_limbs();
	(Felt::from(low), Felt::from(high))
}

fn felt_to_u128(felt: Felt) -> u128 {
	let bytes = felt.to_bytes_be();
	u128::from_be_bytes(bytes[16..32].try_into().unwrap())
}

fn u256_from_limb_felts(low: Felt, high: Felt) -> U256 {
	let mut bytes = [0u8; 32];
	bytes[0..16].copy_from_slice(&felt_to_u128(high).to_be_bytes());
	bytes[16..32].copy_from_slice(&felt_to_u128(low).to_be_bytes());
	U256::from_be_bytes(bytes)
}

/// Appends a Cairo `Bytes` argument (`size, word_count, words...`) to a
/// calldata vector, each word a 16-byte big-endian chunk.
fn push_bytes_arg(calldata: &mut Vec<Felt>, data: &[u8]) {
	let word_count = data.len().div_ceil(16);
	calldata.push(Felt::from(data.len() as u64));
	calldata.push(Felt::from(word_count as u64));
	for chunk in data.chunks(16) {
		let mut word = [0u8; 16];
		word[..chunk.len()].copy_from_slice(chunk);
		calldata.push(Felt::from_bytes_be(&{
			let mut full = [0u8; 32];
			full[16..].copy_from_slice(&word);
			full
		}));
	}
}

pub struct CairoChainHandler {
	config: ChainConfig,
	settler: Felt,
	account: SingleOwnerAccount<JsonRpcClient<HttpTransport>, LocalWallet>,
	provider: JsonRpcClient<HttpTransport>,
	/// `chain_id -> hyperlane_domain`, needed to resolve the settlement
	/// message's destination domain.
	domains: Arc<HashMap<ChainId, u32>>,
	/// ERC20 address backing the settle-gas fee token. `None` means the
	/// fee-allowance check is NOT ENFORCED for this chain.
	fee_token: Option<Felt>,
	lock: Mutex<()>,
}

impl CairoChainHandler {
	pub fn new(
		config: ChainConfig,
		private_key: Felt,
		account_address: Felt,
		domains: Arc<HashMap<ChainId, u32>>,
	) -> solver_types::Result<Self> {
		let settler = Felt::from_hex(&config.settler_address)
			.map_err(|e| SolverError::Config(format!("bad settler felt: {e}")))?;
		let url: url::Url = config
			.rpc_url
			.parse()
			.map_err(|e| SolverError::Config(format!("invalid rpc url: {e}")))?;

		let fee_token = config
			.fee_token_address
			.as_deref()
			.map(Felt::from_hex)
			.transpose()
			.map_err(|e| SolverError::Config(format!("bad fee token felt: {e}")))?;

		let read_provider = JsonRpcClient::new(HttpTransport::new(url.clone()));
		let signer = LocalWallet::from(SigningKey::from_secret_scalar(private_key));
		let account_provider = JsonRpcClient::new(HttpTransport::new(url));
		let chain_id = Felt::from(config.chain_id.0);
		let account = SingleOwnerAccount::new(
			account_provider,
			signer,
			account_address,
			chain_id,
			ExecutionEncoding::New,
		);

		Ok(Self {
			config,
			settler,
			account,
			provider: read_provider,
			domains,
			fee_token,
			lock: Mutex::new(()),
		})
	}

	/// Polls `get_transaction_receipt` until the transaction reaches a
	/// terminal execution result. No hard per-tx deadline — the process-wide
	/// shutdown signal is the upper bound, matching the EVM handler's
	/// confirmation wait.
	async fn wait_for_receipt(&self, tx_hash: Felt) -> Result<()> {
		loop {
			match self.provider.get_transaction_receipt(tx_hash).await {
				Ok(receipt) => {
					let result = match &receipt.receipt {
						TransactionReceipt::Invoke(r) => &r.execution_result,
						TransactionReceipt::L1Handler(r) => &r.execution_result,
						TransactionReceipt::Declare(r) => &r.execution_result,
						TransactionReceipt::Deploy(r) => &r.execution_result,
						TransactionReceipt::DeployAccount(r) => &r.execution_result,
					};
					return match result {
						ExecutionResult::Succeeded => Ok(()),
						ExecutionResult::Reverted { reason } => {
							Err(SolverError::HandlerError(format!("transaction reverted: {reason}")))
						}
					};
				}
				Err(_) => tokio::time::sleep(RECEIPT_POLL_INTERVAL).await,
			}
		}
	}

	async fn call_view(&self, selector: Felt, calldata: Vec<Felt>) -> Result<Vec<Felt>> {
		let call = FunctionCall {
			contract_address: self.settler,
			entry_point_selector: selector,
			calldata,
		};
		self.provider
			.call(call, BlockId::Tag(BlockTag::Latest))
			.await
			.map_err(|e| SolverError::TransientRpc(format!("starknet call failed: {e}")))
	}

	/// `UNKNOWN` is felt zero; `OPENED`/`FILLED`/`SETTLED` are short-string
	/// ASCII felts, matching the settler's `OrderStatus` Cairo enum as it
	/// serialises through `felt252`.
	async fn query_order_status(&self, order_id_low: Felt, order_id_high: Felt) -> Result<OrderStatus> {
		let selector = get_selector_from_name("order_status")
			.map_err(|e| SolverError::Decode(format!("bad selector: {e}")))?;
		let out = self.call_view(selector, vec![order_id_low, order_id_high]).await?;
		let tag = *out
			.first()
			.ok_or_else(|| SolverError::Decode("empty order_status return".into()))?;

		if tag == Felt::ZERO {
			return Ok(OrderStatus::Unknown);
		}
		if tag == cairo_short_string_to_felt("OPENED").unwrap() {
			return Ok(OrderStatus::Opened);
		}
		if tag == cairo_short_string_to_felt("FILLED").unwrap() {
			return Ok(OrderStatus::Filled);
		}
		if tag == cairo_short_string_to_felt("SETTLED").unwrap() {
			return Ok(OrderStatus::Settled);
		}
		warn!(?tag, "unrecognised order_status tag, treating as unknown");
		Ok(OrderStatus::Unknown)
	}

	async fn ensure_allowance(&self, token: Felt, needed: U256) -> Result<()> {
		let owner = self.account.address();
		let allowance_selector = get_selector_from_name("allowance")
			.map_err(|e| SolverError::Decode(format!("bad selector: {e}")))?;
		let out = self
			.call_view(allowance_selector, vec![owner, self.settler])
			.await?;
		// ERC20-on-Cairo returns a `u256` as two felts (low, high).
		let current_low = *out.first().unwrap_or(&Felt::ZERO);
		let current_high = *out.get(1).unwrap_or(&Felt::ZERO);
		let (needed_low, needed_high) = u256_to_limbs(needed);

		if current_high > needed_high || (current_high == needed_high && current_low >= needed_low) {
			return Ok(());
		}

		info!("raising Cairo token allowance to u256::MAX");
		let approve_selector = get_selector_from_name("approve")
			.map_err(|e| SolverError::Decode(format!("bad selector: {e}")))?;
		let max = Felt::from_hex("0xffffffffffffffffffffffffffffffff").unwrap();
		let call = Call {
			to: token,
			selector: approve_selector,
			calldata: vec![self.settler, max, max],
		};
		let result = self
			.account
			.execute_v3(vec![call])
			.send()
			.await
			.map_err(|e| SolverError::HandlerError(format!("approve submission failed: {e}")))?;
		info!(tx_hash = %result.transaction_hash, "approve submitted");
		Ok(())
	}
}

#[async_trait]
impl ChainHandler for CairoChainHandler {
	fn chain_id(&self) -> ChainId {
		self.config.chain_id
	}

	async fn fill(&self, intent: &Intent) -> Result<FillOutcome> {
		let _guard = self.lock.lock().await;
		let (order_id_low, order_id_high) = order_id_felts(intent);

		match self.query_order_status(order_id_low, order_id_high).await? {
			OrderStatus::Filled => return Ok(FillOutcome::Settle),
			OrderStatus::Settled => return Ok(FillOutcome::Complete),
			_ => {}
		}

		for output in intent
			.max_spent
			.iter()
			.filter(|o| o.chain_id == self.config.chain_id && !o.token.is_empty())
		{
			let token = Felt::from_hex(&output.token)
				.map_err(|e| SolverError::Decode(format!("bad token felt {}: {e}", output.token)))?;
			self.ensure_allowance(token, output.amount).await?;
		}

		let fill_instruction = intent
			.fill_instructions
			.iter()
			.find(|f| f.destination_chain_id == self.config.chain_id)
			.ok_or_else(|| SolverError::Decode("no fill instruction for this chain".into()))?;

		let fill_selector = get_selector_from_name("fill")
			.map_err(|e| SolverError::Decode(format!("bad selector: {e}")))?;

		let mut calldata = vec![order_id_low, order_id_high];
		push_bytes_arg(&mut calldata, &fill_instruction.origin_data);
		push_bytes_arg(&mut calldata, &[]); // filler_data is always empty
		let call = Call {
			to: self.settler,
			selector: fill_selector,
			calldata,
		};

		let result = self
			.account
			.execute_v3(vec![call])
			.send()
			.await
			.map_err(|e| SolverError::HandlerError(format!("fill submission failed: {e}")))?;

		self.wait_for_receipt(result.transaction_hash).await?;
		info!(order_id = %intent.order_id, tx_hash = %result.transaction_hash, "fill confirmed");
		Ok(FillOutcome::Settle)
	}

	async fn settle(&self, intent: &Intent) -> Result<()> {
		let _guard = self.lock.lock().await;
		let (order_id_low, order_id_high) = order_id_felts(intent);

		if self.query_order_status(order_id_low, order_id_high).await? != OrderStatus::Filled {
			return Err(SolverError::HandlerError(
				"order is not in FILLED state, refusing to settle".into(),
			));
		}

		let domain = *self.domains.get(&intent.origin_chain_id).ok_or_else(|| {
			SolverError::Config(format!(
				"no hyperlane domain configured for origin chain {}",
				intent.origin_chain_id
			))
		})?;

		let quote_selector = get_selector_from_name("quote_gas_payment")
			.map_err(|e| SolverError::Decode(format!("bad selector: {e}")))?;
		let out = self.call_view(quote_selector, vec![Felt::from(domain)]).await?;
		let quote_low = *out.first().unwrap_or(&Felt::ZERO);
		let quote_high = *out.get(1).unwrap_or(&Felt::ZERO);
		let quote = u256_from_limb_felts(quote_low, quote_high);

		match self.fee_token {
			Some(token) => self.ensure_allowance(token, quote).await?,
			None => warn!("fee token allowance check NOT ENFORCED: no fee token configured for this chain"),
		}

		let settle_selector = get_selector_from_name("settle")
			.map_err(|e| SolverError::Decode(format!("bad selector: {e}")))?;
		let call = Call {
			to: self.settler,
			selector: settle_selector,
			calldata: vec![Felt::from(1u64), order_id_low, order_id_high, quote_low, quote_high],
		};

		let result = self
			.account
			.execute_v3(vec![call])
			.send()
			.await
			.map_err(|e| SolverError::HandlerError(format!("settle submission failed: {e}")))?;

		self.wait_for_receipt(result.transaction_hash).await?;
		info!(order_id = %intent.order_id, tx_hash = %result.transaction_hash, "settle confirmed");
		Ok(())
	}

	async fn order_status(&self, intent: &Intent) -> Result<OrderStatus> {
		let (low, high) = order_id_felts(intent);
		self.query_order_status(low, high).await
	}
}
