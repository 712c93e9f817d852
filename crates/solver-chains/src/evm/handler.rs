//! EVM-family [`ChainHandler`]: `fill`/`settle`/`order_status` against the
//! EIP-7683 settler surface. Provider and wallet construction, and the
//! confirmation-polling shape, follow `alloy`'s own idioms rather than a
//! generic transaction-submission abstraction.

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address as AlloyAddress, Bytes as AlloyBytes, B256, U256 as AlloyU256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use solver_types::{
	ChainConfig, ChainHandler, ChainId, FillOutcome, Intent, OrderStatus, SolverError, U256,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::evm::codec::{IERC20, ISettler};

type Result<T> = solver_types::Result<T>;

pub struct EvmChainHandler {
	config: ChainConfig,
	settler: AlloyAddress,
	solver_address: AlloyAddress,
	/// `chain_id -> hyperlane_domain`, needed to quote the settlement
	/// message fee for the intent's origin chain.
	domains: Arc<HashMap<ChainId, u32>>,
	provider: DynProvider,
	/// Serialises every outbound transaction so the signer's nonce sequence
	/// matches what the chain accepts.
	lock: Mutex<()>,
}

impl EvmChainHandler {
	pub fn new(
		config: ChainConfig,
		signer: PrivateKeySigner,
		domains: Arc<HashMap<ChainId, u32>>,
	) -> solver_types::Result<Self> {
		let settler: AlloyAddress = config
			.settler_address
			.parse()
			.map_err(|e| SolverError::Config(format!("bad settler address: {e}")))?;
		let solver_address = signer.address();
		let url = config
			.rpc_url
			.parse()
			.map_err(|e| SolverError::Config(format!("invalid rpc url: {e}")))?;

		let wallet = EthereumWallet::from(signer);
		let provider = ProviderBuilder::new()
			.wallet(wallet)
			.connect_http(url)
			.erased();

		Ok(Self {
			config,
			settler,
			solver_address,
			domains,
			provider,
			lock: Mutex::new(()),
		})
	}

	fn order_id_word(intent: &Intent) -> B256 {
		B256::from(intent.order_id.0)
	}

	async fn call_view(&self, input: Vec<u8>) -> Result<Vec<u8>> {
		let tx = TransactionRequest::default()
			.to(self.settler)
			.input(AlloyBytes::from(input).into());
		self.provider
			.call(tx)
			.await
			.map(|b| b.to_vec())
			.map_err(|e| SolverError::TransientRpc(format!("eth_call failed: {e}")))
	}

	async fn query_order_status(&self, order_id: B256) -> Result<OrderStatus> {
		let call = ISettler::orderStatusCall { orderId: order_id };
		let out = self.call_view(call.abi_encode()).await?;
		let tag: u8 = u8::abi_decode(&out)
			.map_err(|e| SolverError::Decode(format!("bad orderStatus return: {e}")))?;
		Ok(match tag {
			1 => OrderStatus::Opened,
			2 => OrderStatus::Filled,
			3 => OrderStatus::Settled,
			_ => OrderStatus::Unknown,
		})
	}

	async fn ensure_allowance(&self, token: &str, needed: U256) -> Result<()> {
		let token_addr: AlloyAddress = token
			.parse()
			.map_err(|e| SolverError::Decode(format!("bad token address {token}: {e}")))?;

		let allowance_call = IERC20::allowanceCall {
			owner: self.solver_address,
			spender: self.settler,
		};
		let tx = TransactionRequest::default()
			.to(token_addr)
			.input(AlloyBytes::from(allowance_call.abi_encode()).into());
		let out = self
			.provider
			.call(tx)
			.await
			.map_err(|e| SolverError::TransientRpc(format!("allowance call failed: {e}")))?;
		let current: AlloyU256 = AlloyU256::abi_decode(&out)
			.map_err(|e| SolverError::Decode(format!("bad allowance return: {e}")))?;

		if current >= u256_to_alloy(needed) {
			return Ok(());
		}

		info!(token, "raising allowance to an effectively unbounded amount");
		let approve_call = IERC20::approveCall {
			spender: self.settler,
			amount: AlloyU256::MAX,
		};
		let tx = TransactionRequest::default()
			.to(token_addr)
			.input(AlloyBytes::from(approve_call.abi_encode()).into());
		let pending = self
			.provider
			.send_transaction(tx)
			.await
			.map_err(|e| SolverError::HandlerError(format!("approve submission failed: {e}")))?;
		let receipt = pending
			.get_receipt()
			.await
			.map_err(|e| SolverError::HandlerError(format!("approve confirmation failed: {e}")))?;
		if !receipt.status() {
			return Err(SolverError::HandlerError("approve transaction reverted".into()));
		}
		Ok(())
	}
}

fn u256_to_alloy(v: U256) -> AlloyU256 {
	AlloyU256::from_be_bytes::<32>(v.to_be_bytes())
}

#[async_trait]
impl ChainHandler for EvmChainHandler {
	fn chain_id(&self) -> ChainId {
		self.config.chain_id
	}

	async fn fill(&self, intent: &Intent) -> Result<FillOutcome> {
		let _guard = self.lock.lock().await;
		let order_id = Self::order_id_word(intent);

		match self.query_order_status(order_id).await? {
			OrderStatus::Filled => return Ok(FillOutcome::Settle),
			OrderStatus::Settled => return Ok(FillOutcome::Complete),
			_ => {}
		}

		for output in intent
			.max_spent
			.iter()
			.filter(|o| o.chain_id == self.config.chain_id && !o.token.is_empty())
		{
			self.ensure_allowance(&output.token, output.amount).await?;
		}

		let fill_instruction = intent
			.fill_instructions
			.iter()
			.find(|f| f.destination_chain_id == self.config.chain_id)
			.ok_or_else(|| SolverError::Decode("no fill instruction for this chain".into()))?;

		let call = ISettler::fillCall {
			orderId: order_id,
			originData: AlloyBytes::from(fill_instruction.origin_data.clone()),
			fillerData: AlloyBytes::new(),
		};
		let tx = TransactionRequest::default()
			.to(self.settler)
			.input(AlloyBytes::from(call.abi_encode()).into());

		let pending = self
			.provider
			.send_transaction(tx)
			.await
			.map_err(|e| SolverError::HandlerError(format!("fill submission failed: {e}")))?;
		let receipt = pending
			.get_receipt()
			.await
			.map_err(|e| SolverError::HandlerError(format!("fill confirmation failed: {e}")))?;

		if receipt.status() {
			info!(order_id = %intent.order_id, "fill confirmed");
			Ok(FillOutcome::Settle)
		} else {
			warn!(order_id = %intent.order_id, "fill transaction reverted");
			Err(SolverError::HandlerError("fill transaction reverted".into()))
		}
	}

	async fn settle(&self, intent: &Intent) -> Result<()> {
		let _guard = self.lock.lock().await;
		let order_id = Self::order_id_word(intent);

		if self.query_order_status(order_id).await? != OrderStatus::Filled {
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

		let quote_call = ISettler::quoteGasPaymentCall { originDomain: domain };
		let out = self.call_view(quote_call.abi_encode()).await?;
		let quote: AlloyU256 = AlloyU256::abi_decode(&out)
			.map_err(|e| SolverError::Decode(format!("bad quoteGasPayment return: {e}")))?;

		let settle_call = ISettler::settleCall {
			orderIds: vec![order_id],
		};
		let tx = TransactionRequest::default()
			.to(self.settler)
			.input(AlloyBytes::from(settle_call.abi_encode()).into())
			.with_value(quote);

		let pending = self
			.provider
			.send_transaction(tx)
			.await
			.map_err(|e| SolverError::HandlerError(format!("settle submission failed: {e}")))?;
		let receipt = pending
			.get_receipt()
			.await
			.map_err(|e| SolverError::HandlerError(format!("settle confirmation failed: {e}")))?;

		if receipt.status() {
			info!(order_id = %intent.order_id, "settle confirmed");
			Ok(())
		} else {
			Err(SolverError::HandlerError("settle transaction reverted".into()))
		}
	}

	async fn order_status(&self, intent: &Intent) -> Result<OrderStatus> {
		self.query_order_status(Self::order_id_word(intent)).await
	}
}
