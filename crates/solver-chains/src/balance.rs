//! [`BalanceOracle`] backing the `solver_has_sufficient_balance` rule, one
//! read-only provider per configured chain. Native-token entries (empty
//! `token`) are always reported `Ok(None)` — deliberately NOT ENFORCED
//! rather than silently treated as funded, since neither chain family here
//! exposes a generic native-balance query.

use alloy::primitives::Address as AlloyAddress;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use solver_types::{BalanceOracle, ChainConfig, ChainFamily, ChainId, SolverError, U256};
use starknet::core::types::{BlockId, BlockTag, Felt, FunctionCall};
use starknet::core::utils::get_selector_from_name;
use starknet::providers::jsonrpc::{HttpTransport, JsonRpcClient};
use starknet::providers::Provider as StarknetProvider;
use std::collections::HashMap;

use crate::evm::codec::IERC20;

enum Querier {
	Evm {
		provider: DynProvider,
		solver_address: AlloyAddress,
	},
	Cairo {
		provider: JsonRpcClient<HttpTransport>,
		account_address: Felt,
	},
}

/// One oracle shared across every chain's `RuleContext` — the balance
/// check runs once per intent, not per-chain-handler.
pub struct ChainBalanceOracle {
	queriers: HashMap<ChainId, Querier>,
}

impl ChainBalanceOracle {
	/// `solver_evm_address` is the address every `EvmChainHandler` signs
	/// with; `solver_cairo_address` the Starknet account every
	/// `CairoChainHandler` invokes from. Both are process-wide: a single
	/// solver identity per family.
	pub fn new(
		configs: &[ChainConfig],
		solver_evm_address: AlloyAddress,
		solver_cairo_address: Felt,
	) -> solver_types::Result<Self> {
		let mut queriers = HashMap::new();

		for config in configs {
			let querier = match config.family {
				ChainFamily::Evm => {
					let url = config
						.rpc_url
						.parse()
						.map_err(|e| SolverError::Config(format!("invalid rpc url: {e}")))?;
					Querier::Evm {
						provider: ProviderBuilder::new().connect_http(url).erased(),
						solver_address: solver_evm_address,
					}
				}
				ChainFamily::Cairo => {
					let url = config
						.rpc_url
						.parse()
						.map_err(|e| SolverError::Config(format!("invalid rpc url: {e}")))?;
					Querier::Cairo {
						provider: JsonRpcClient::new(HttpTransport::new(url)),
						account_address: solver_cairo_address,
					}
				}
			};
			queriers.insert(config.chain_id, querier);
		}

		Ok(Self { queriers })
	}
}

#[async_trait]
impl BalanceOracle for ChainBalanceOracle {
	async fn get_balance(&self, chain_id: ChainId, token: &str) -> solver_types::Result<Option<U256>> {
		if token.is_empty() {
			return Ok(None);
		}

		match self.queriers.get(&chain_id) {
			None => Ok(None),
			Some(Querier::Evm { provider, solver_address }) => {
				let token_addr: AlloyAddress = token
					.parse()
					.map_err(|e| SolverError::Decode(format!("bad token address {token}: {e}")))?;
				let call = IERC20::balanceOfCall { account: *solver_address };
				let tx = TransactionRequest::default()
					.to(token_addr)
					.input(alloy::primitives::Bytes::from(call.abi_encode()).into());
				let out = provider
					.call(tx)
					.await
					.map_err(|e| SolverError::TransientRpc(format!("balanceOf call failed: {e}")))?;
				let balance: alloy::primitives::U256 = alloy::primitives::U256::abi_decode(&out)
					.map_err(|e| SolverError::Decode(format!("bad balanceOf return: {e}")))?;
				Ok(Some(U256::from_be_bytes::<32>(balance.to_be_bytes())))
			}
			Some(Querier::Cairo { provider, account_address }) => {
				let token_felt = Felt::from_hex(token)
					.map_err(|e| SolverError::Decode(format!("bad token felt {token}: {e}")))?;
				let selector = get_selector_from_name("balance_of")
					.map_err(|e| SolverError::Decode(format!("bad selector: {e}")))?;
				let out = provider
					.call(
						FunctionCall {
							contract_address: token_felt,
							entry_point_selector: selector,
							calldata: vec![*account_address],
						},
						BlockId::Tag(BlockTag::Latest),
					)
					.await
					.map_err(|e| SolverError::TransientRpc(format!("balance_of call failed: {e}")))?;

				let low = felt_to_u128(*out.first().unwrap_or(&Felt::ZERO));
				let high = felt_to_u128(*out.get(1).unwrap_or(&Felt::ZERO));
				let mut bytes = [0u8; 32];
				bytes[0..16].copy_from_slice(&high.to_be_bytes());
				bytes[16..32].copy_from_slice(&low.to_be_bytes());
				Ok(Some(U256::from_be_bytes(bytes)))
			}
		}
	}
}

fn felt_to_u128(felt: Felt) -> u128 {
	let bytes = felt.to_bytes_be();
	u128::from_be_bytes(bytes[16..32].try_into().unwrap())
}
