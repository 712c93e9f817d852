//! # Solver Cursor
//!
//! The durable, process-local, atomically-written `chain -> last_processed_
//! block` map. The single source of truth for resume points; CursorStore
//! exclusively owns the state file and serialises all access through one
//! mutex.
//!
//! Writes go through a temp-file-then-rename pattern with an explicit
//! `fsync` before the rename, so read-after-write durability holds even
//! across a crash between `rename` and the next read.

use solver_types::CursorMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum CursorError {
	#[error("chain {0} has no cursor entry")]
	NotFound(String),

	#[error("refusing to move cursor for {chain} backward: current={current} requested={requested}")]
	Regression {
		chain: String,
		current: u64,
		requested: u64,
	},

	#[error("cursor I/O error: {0}")]
	Io(String),

	#[error("cursor file is not valid JSON: {0}")]
	Parse(String),
}

/// Durable, mutex-serialised cursor map.
pub struct CursorStore {
	path: PathBuf,
	state: Mutex<HashMap<String, u64>>,
}

impl CursorStore {
	/// Loads the cursor file at `path` if it exists, retrying transient
	/// read errors up to 3 times. A missing file is not an
	/// error: the store starts empty and chains are seeded from
	/// `solver_start_block` the first time `get` is called for them by a
	/// caller that falls back on a default.
	pub async fn load(path: impl Into<PathBuf>) -> Result<Self, CursorError> {
		let path = path.into();

		let mut last_err = None;
		for attempt in 1..=3 {
			match tokio::fs::read(&path).await {
				Ok(bytes) => {
					let map: HashMap<String, u64> = serde_json::from_slice(&bytes)
						.map_err(|e| CursorError::Parse(e.to_string()))?;
					debug!(path = %path.display(), chains = map.len(), "loaded cursor file");
					return Ok(Self {
						path,
						state: Mutex::new(map),
					});
				}
				Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
					info!(path = %path.display(), "no cursor file yet, starting empty");
					return Ok(Self {
						path,
						state: Mutex::new(HashMap::new()),
					});
				}
				Err(e) => {
					warn!(attempt, error = %e, "transient error reading cursor file");
					last_err = Some(e);
				}
			}
		}

		Err(CursorError::Io(
			last_err.map(|e| e.to_string()).unwrap_or_default(),
		))
	}

	/// Returns the persisted last-processed block; fails if the chain has
	/// no entry.
	pub async fn get(&self, chain: &str) -> Result<u64, CursorError> {
		self.state
			.lock()
			.await
			.get(chain)
			.copied()
			.ok_or_else(|| CursorError::NotFound(chain.to_string()))
	}

	/// Same as [`get`](Self::get) but falls back to `default` when the
	/// chain has no entry yet — the pattern a listener uses on first boot
	/// with `solver_start_block`.
	pub async fn get_or(&self, chain: &str, default: u64) -> u64 {
		self.state
			.lock()
			.await
			.get(chain)
			.copied()
			.unwrap_or(default)
	}

	/// Validates `block >= current[chain]`, writes the whole map to disk
	/// atomically (temp file + fsync + rename), and only then updates the
	/// in-memory cache. On a failed write the cache is left untouched so a
	/// later successful write retries from the same block.
	pub async fn set(&self, chain: &str, block: u64) -> Result<(), CursorError> {
		let mut guard = self.state.lock().await;

		if let Some(&current) = guard.get(chain) {
			if block < current {
				return Err(CursorError::Regression {
					chain: chain.to_string(),
					current,
					requested: block,
				});
			}
		}

		let mut candidate = guard.clone();
		candidate.insert(chain.to_string(), block);

		self.write_atomic(&candidate).await?;

		*guard = candidate;
		info!(chain, block, "cursor persisted");
		Ok(())
	}

	/// Read-only copy for startup and diagnostics.
	pub async fn snapshot(&self) -> CursorMap {
		CursorMap(self.state.lock().await.clone())
	}

	async fn write_atomic(&self, map: &HashMap<String, u64>) -> Result<(), CursorError> {
		let dir = self
			.path
			.parent()
			.filter(|p| !p.as_os_str().is_empty())
			.unwrap_or_else(|| Path::new("."));
		tokio::fs::create_dir_all(dir)
			.await
			.map_err(|e| CursorError::Io(e.to_string()))?;

		let mut body =
			serde_json::to_vec_pretty(map).map_err(|e| CursorError::Parse(e.to_string()))?;
		body.push(b'\n');

		let tmp_path = dir.join(format!(
			".{}.tmp",
			self.path
				.file_name()
				.and_then(|n| n.to_str())
				.unwrap_or("cursor.json")
		));

		let mut file = tokio::fs::File::create(&tmp_path)
			.await
			.map_err(|e| CursorError::Io(e.to_string()))?;
		file.write_all(&body)
			.await
			.map_err(|e| CursorError::Io(e.to_string()))?;
		file.sync_all().await.map_err(|e| CursorError::Io(e.to_string()))?;
		drop(file);

		tokio::fs::rename(&tmp_path, &self.path)
			.await
			.map_err(|e| CursorError::Io(e.to_string()))?;

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn set_then_get_round_trips() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("cursor.json");
		let store = CursorStore::load(&path).await.unwrap();

		store.set("ethereum", 100).await.unwrap();
		assert_eq!(store.get("ethereum").await.unwrap(), 100);
	}

	#[tokio::test]
	async fn set_refuses_regression() {
		let dir = tempfile::tempdir().unwrap();
		let store = CursorStore::load(dir.path().join("cursor.json")).await.unwrap();

		store.set("ethereum", 100).await.unwrap();
		let err = store.set("ethereum", 99).await.unwrap_err();
		assert!(matches!(err, CursorError::Regression { .. }));
		// Failed write must not have touched the cache.
		assert_eq!(store.get("ethereum").await.unwrap(), 100);
	}

	#[tokio::test]
	async fn reload_after_fsync_sees_latest_value() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("cursor.json");

		{
			let store = CursorStore::load(&path).await.unwrap();
			store.set("optimism", 42).await.unwrap();
		}

		let reloaded = CursorStore::load(&path).await.unwrap();
		assert_eq!(reloaded.get("optimism").await.unwrap(), 42);
	}

	#[tokio::test]
	async fn get_missing_chain_fails() {
		let dir = tempfile::tempdir().unwrap();
		let store = CursorStore::load(dir.path().join("cursor.json")).await.unwrap();
		assert!(matches!(
			store.get("arbitrum").await,
			Err(CursorError::NotFound(_))
		));
		assert_eq!(store.get_or("arbitrum", 7).await, 7);
	}

	#[tokio::test]
	async fn other_keys_are_preserved_on_round_trip() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("cursor.json");
		tokio::fs::write(&path, r#"{"base": 10, "unknown_future_key": 999}"#)
			.await
			.unwrap();

		let store = CursorStore::load(&path).await.unwrap();
		store.set("base", 11).await.unwrap();

		let snapshot = store.snapshot().await;
		assert_eq!(snapshot.get("unknown_future_key"), Some(999));
		assert_eq!(snapshot.get("base"), Some(11));
	}
}
