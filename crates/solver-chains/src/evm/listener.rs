//! EVM-family [`Listener`]: backfill-then-poll over `Open` event logs,
//! built around a `tokio::select!` over an interval and a stop channel.
//! The first tick naturally backfills anything between the persisted
//! cursor and the current safe head; later ticks pick up only new blocks.

use alloy::primitives::Address as AlloyAddress;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::Filter;
use async_trait::async_trait;
use solver_cursor::CursorStore;
use solver_types::{ChainConfig, ChainFamily, ChainId, EventHandler, Listener, ListenerHandle, Verdict};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use crate::error::ChainError;
use crate::evm::codec::{decode_open_log, open_event_signature};

const FAILED_BLOCK_COOLDOWN: Duration = Duration::from_secs(300);
const DECODE_RETRY_BACKOFF: Duration = Duration::from_millis(500);

pub struct EvmListener {
	config: ChainConfig,
	provider: DynProvider,
	settler: AlloyAddress,
	cursor: Arc<CursorStore>,
	chains: Arc<HashMap<ChainId, ChainFamily>>,
	max_retries: u32,
	last_processed: AtomicU64,
	failed_blocks: Mutex<HashMap<u64, Instant>>,
}

impl EvmListener {
	pub fn new(
		config: ChainConfig,
		cursor: Arc<CursorStore>,
		chains: Arc<HashMap<ChainId, ChainFamily>>,
		max_retries: u32,
	) -> crate::error::Result<Self> {
		let settler: AlloyAddress = config
			.settler_address
			.parse()
			.map_err(|e| ChainError::Decode(format!("bad settler address: {e}")))?;

		let url = config
			.rpc_url
			.parse()
			.map_err(|e| ChainError::Rpc(format!("invalid rpc url: {e}")))?;
		let provider = ProviderBuilder::new().connect_http(url).erased();

		Ok(Self {
			last_processed: AtomicU64::new(0),
			config,
			provider,
			settler,
			cursor,
			chains,
			max_retries,
			failed_blocks: Mutex::new(HashMap::new()),
		})
	}

	async fn fetch_logs(&self, from: u64, to: u64) -> crate::error::Result<Vec<alloy::rpc::types::Log>> {
		let filter = Filter::new()
			.address(self.settler)
			.event_signature(open_event_signature())
			.from_block(from)
			.to_block(to);

		self.provider
			.get_logs(&filter)
			.await
			.map_err(|e| ChainError::Rpc(format!("get_logs failed: {e}")))
	}

	async fn decode_with_retry(&self, log: &alloy::rpc::types::Log) -> crate::error::Result<solver_types::Intent> {
		let mut attempt = 0;
		loop {
			let result = decode_open_log(
				log.address(),
				log.topics().to_vec(),
				log.data().data.to_vec(),
				self.config.chain_id,
				&self.chains,
			);
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

	/// Processes `[from, to]` in `max_block_range` chunks, block by block in
	/// order, honouring `failed_blocks` cooldown, and returns the highest
	/// block number that may be persisted as the new cursor.
	async fn run_range(
		&self,
		handler: &Arc<dyn EventHandler>,
		from: u64,
		to: u64,
	) -> u64 {
		let mut cursor_val = from.saturating_sub(1);
		let mut next = from;

		'outer: while next <= to {
			let chunk_to = (next + self.config.max_block_range - 1).min(to);

			let logs = match self.fetch_logs(next, chunk_to).await {
				Ok(logs) => logs,
				Err(e) => {
					warn!(chain = %self.config.name, error = %e, "transient error fetching logs, stopping this tick");
					break 'outer;
				}
			};

			let mut by_block: BTreeMap<u64, Vec<alloy::rpc::types::Log>> = BTreeMap::new();
			for log in logs {
				let block = log.block_number.unwrap_or(next);
				by_block.entry(block).or_default().push(log);
			}

			for b in next..=chunk_to {
				if let Some(failed_at) = self.failed_blocks.lock().await.get(&b) {
					if failed_at.elapsed() < FAILED_BLOCK_COOLDOWN {
						break 'outer;
					}
				}

				let events = by_block.remove(&b).unwrap_or_default();
				let total = events.len();
				let mut settled = 0usize;

				for log in events {
					match self.decode_with_retry(&log).await {
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

					let current_head = match self.provider.get_block_number().await {
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

struct EvmListenerHandle {
	stop_tx: mpsc::Sender<()>,
	task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

#[async_trait]
impl ListenerHandle for EvmListenerHandle {
	async fn stop(&self) {
		let _ = self.stop_tx.send(()).await;
		if let Some(task) = self.task.lock().await.take() {
			let _ = task.await;
		}
	}
}

#[async_trait]
impl Listener for EvmListener {
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

		Arc::new(EvmListenerHandle {
			stop_tx,
			task: Mutex::new(Some(task)),
		})
	}

	async fn last_processed_block(&self) -> u64 {
		self.last_processed.load(Ordering::SeqCst)
	}
}
