//! The shared error taxonomy.
//!
//! Every crate in the workspace that needs a richer error surface defines
//! its own `thiserror` enum (`ChainError`, `CursorError`, `ConfigError`,
//! `CoreError`); this one is the chain-agnostic vocabulary the data-flow
//! between `Listener`, `Solver` and `ChainHandler` is expressed in.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SolverError>;

/// Variants are deliberately coarse: each maps to a
/// documented propagation policy rather than to a specific failing call.
#[derive(Error, Debug)]
pub enum SolverError {
	/// Missing required env var, malformed address, unknown chain. Fatal
	/// before start.
	#[error("configuration error: {0}")]
	Config(String),

	/// Network, timeout, node out-of-sync. Retried inside the listener's
	/// range loop and the handler's call; never reaches the cursor.
	#[error("transient RPC error: {0}")]
	TransientRpc(String),

	/// Malformed event payload. Counts as a block failure.
	#[error("decode error: {0}")]
	Decode(String),

	/// A rule rejected the intent. Not an error from the process
	/// perspective — reported to the listener as "skip".
	#[error("rule rejected intent: {0}")]
	RuleReject(String),

	/// Order already terminal on-chain. Reported as "advance".
	#[error("handler reports terminal order: {0}")]
	HandlerReject(String),

	/// Fill or settle transaction failed. Reported as "skip"; cooldown
	/// applies.
	#[error("handler error: {0}")]
	HandlerError(String),

	/// Cursor write failure. Logged; the next successful tick retries.
	#[error("cursor error: {0}")]
	Cursor(String),
}

impl SolverError {
	/// Whether this error, surfaced from `ChainHandler`/`Listener`, should
	/// ever be retried by the caller rather than treated as a decision.
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::TransientRpc(_))
	}
}
