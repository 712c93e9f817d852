//! Cairo-family [`Listener`]: backfill-then-poll over Starknet `Open`
//! events, mirroring [`crate::evm::listener::EvmListener`]'s
//! chunk/cooldown/retry algorithm against a Starknet JSON-RPC provider
//! instead of an EVM one.

use async_trait::async_trait;
use solver_cursor::CursorStore;
use solver_types::{ChainConfig, ChainFamily, ChainId, EventHandler, Listener, ListenerHandle, Verdict};
use starknet::core::types::{BlockId, EventFilter, Felt};
use starknet::providers::jsonrpc::{HttpTransport, JsonRpcClient};
use starknet::providers::Provider;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use crate::cairo::codec::decode_open_event;
use crate::error::ChainError;

const FAILED_BLOCK_COOLDOWN: Duration = Duration::from_secs(300);
const DECODE_RETRY_BACKOFF: Duration = Duration::from_millis(500);
/// Cairo's `Open` event name, hashed with Starknet's keccak-based selector
/// to match the settler's `#[event]` Cairo attribute.
const OPEN_EVENT_NAME: &str = "Open";

pub struct CairoListener {
	config: ChainConfig,
	provider: JsonRpcClient<HttpTransport>,
	settler: Felt,
	open_key: Felt,
	cursor: Arc<CursorStore>,
	chains: Arc<HashMap<ChainId, ChainFamily>>,
	domains: Arc<HashMap<u32, ChainId>>,
	max_retries: u32,
	last_processed: AtomicU64,
	failed_blocks: Mutex<HashMap<u64, Instant>>,
}

impl CairoListener {
	pub fn new(
		config: ChainConfig,
		cursor: Arc<CursorStore>,
		chains: Arc<HashMap<ChainId, ChainFamily>>,
		domains: Arc<HashMap<u32, ChainId>>,
		max_retries: u32,
	) -> crate::error::Result<Self> {
		let settler = Felt::from_hex(&config.settler_address)
			.map_err(|e| ChainError::Decode(format!("bad settler felt: {e}")))?;
		let url = config
			.rpc_url
			.parse()
			.map_err(|e| ChainError::Rpc(format!("invalid rpc url: {e}")))?;
		let provider = JsonRpcClient::new(HttpTransport::new(url));
		let open_key = starknet::core::utils::get_selector_from_name(OPEN_EVENT_NAME)
			.map_err(|e| ChainError::Decode(format!("bad event selector: {e}")))?;

		Ok(Self {
			last_processed: AtomicU64::new(0),
			config,
			provider,
			settler,
			open_key,
			cursor,
			chains,
			domains,
			max_retries,
			failed_blocks: Mutex::new(HashMap::new()),
		})
	}

	async fn fetch_events(&self, from: u64, to: u64) -> crate::error::Result<Vec<(u64, Vec<Felt>)>> {
		let filter = EventFilter {
			from_block: Some(BlockId::Number(from)),
			to_block: Some(BlockId::Number(to)),
			address: Some(self.settler),
			keys: Some(vec![vec![self.open_key]]),
		};

		let mut events = Vec::new();
		let mut continuation_token = None;
		loop {
			let page = self
				.provider
				.get_events(filter.clone(), continuation_token.clone(), 1000)
				.await
				.map_err(|e| ChainError::Rpc(format!("get_events failed: {e}")))?;

			for event in page.events {
				let block = event.block_number.unwrap_or(from);
				events.push((block, event.data));
			}

			continuation_token = page.continuation_token;
			if continuation_token.is_none() {
				break;
			}
		}
		Ok(events)
	}

	async fn decode_with_retry(&self, payload: &[Felt]) -> crate::error::Result<solver_types::Intent> {
		let mut attempt = 0;
		loop {
			let result = decode_open_event(payload, self.config.chain_id, &self.chains, &self.domains);
			match result {
				Ok(intent) => return Ok(intent),
				Err(e) if attempt < self.max_retries => {
					attempt += 1;
					warn!(attempt, error = %e, "retrying event decode");
					tokio::time::sleep(DECODE_RETRY_BACKOFF).await;
				}
				Err(e) => return Err(e),
			}
		}
	}

	/// Mirrors [`crate::evm::listener::EvmListener::run_range`] exactly,
	/// against felt payloads instead of RLP logs.
	async fn run_range(&self, handler: &Arc<dyn EventHandler>, from: u64, to: u64) -> u64 {
		let mut cursor_val = from.saturating_sub(1);
		let mut next = from;

		'outer: while next <= to {
			let chunk_to = (next + self.config.max_block_range - 1).min(to);

			let events = match self.fetch_events(next, chunk_to).await {
				Ok(events) => events,
				Err(e) => {
					warn!(chain = %self.config.name, error = %e, "transient error fetching events, stopping this tick");
					break 'outer;
				}
			};

			let mut by_block: BTreeMap<u64, Vec<Vec<Felt>>> = BTreeMap::new();
			for (block, payload) in events {
				by_block.entry(block).or_default().push(payload);
			}

			for b in next..=chunk_to {
				if let Some(failed_at) = self.failed_blocks.lock().await.get(&b) {
					if failed_at.elapsed() < FAILED_BLOCK_COOLDOWN {
						break 'outer;
					}
				}

				let payloads = by_block.remove(&b).unwrap_or_default();
				let total = payloads.len();
				let mut settled = 0usize;

				for payload in payloads {
					match self.decode_with_retry(&payload).await {
						Ok(intent) => {
							let order_id = intent.order_id;
							let verdict = handler.handle_intent(intent).await;
							if verdict == Verdict::Advance {
								settled += 1;
							} else {
								info!(chain = %self.config.name, %order_id, "listener told to not advance past this event");
							}
						}
						Err(e) => {
							warn!(chain = %self.config.name, block = b, error = %e, "event decode failed after retries");
						}
					}
				}

				if settled == total {
					cursor_val = b;
					self.failed_blocks.lock().await.remove(&b);
					next = b + 1;
				} else {
					self.failed_blocks.lock().await.insert(b, Instant::now());
					break 'outer;
				}
			}
		}

		cursor_val
	}

	async fn run(self: Arc<Self>, handler: Arc<dyn EventHandler>, mut stop_rx: mpsc::Receiver<()>) {
		let mut interval = tokio::time::interval(Duration::from_millis(self.config.poll_interval_ms));

		loop {
			tokio::select! {
				_ = interval.tick() => {
					let last = self
						.cursor
						.get_or(&self.config.name, self.config.solver_start_block)
						.await;

					let current_head = match self.provider.block_number().await {
						Ok(h) => h,
						Err(e) => {
							warn!(chain = %self.config.name, error = %e, "failed to fetch current head");
							continue;
						}
					};

					let safe_head = self.config.safe_head(current_head);
					if safe_head <= last {
						continue;
					}

					let new_last = self.run_range(&handler, last + 1, safe_head).await;
					self.last_processed.store(new_last, Ordering::SeqCst);

					if new_last > last {
						if let Err(e) = self.cursor.set(&self.config.name, new_last).await {
							tracing::error!(chain = %self.config.name, error = %e, "failed to persist cursor");
						} else {
							info!(chain = %self.config.name, from = last, to = new_last, "cursor advanced");
						}
					}
				}
				_ = stop_rx.recv() => {
					info!(chain = %self.config.name, "listener received shutdown signal");
					break;
				}
			}
		}
	}
}

struct CairoListenerHandle {
	stop_tx: mpsc::Sender<()>,
	task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

#[async_trait]
impl ListenerHandle for CairoListenerHandle {
	async fn stop(&self) {
		let _ = self.stop_tx.send(()).await;
		if let Some(task) = self.task.lock().await.take() {
			let _ = task.await;
		}
	}
}

#[async_trait]
impl Listener for CairoListener {
	fn chain_id(&self) -> ChainId {
		self.config.chain_id
	}

	fn chain_name(&self) -> &str {
		&self.config.name
	}

	async fn start(self: Arc<Self>, handler: Arc<dyn EventHandler>) -> Arc<dyn ListenerHandle> {
		let (stop_tx, stop_rx) = mpsc::channel(1);
		let listener = self.clone();
		let task = tokio::spawn(async move { listener.run(handler, stop_rx).await });

		Arc::new(CairoListenerHandle {
			stop_tx,
			task: Mutex::new(Some(task)),
		})
	}

	async fn last_processed_block(&self) -> u64 {
		self.last_processed.load(Ordering::SeqCst)
	}
}
