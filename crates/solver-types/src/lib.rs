//! # Solver Types
//!
//! Core type definitions shared across all solver components.
//!
//! This crate provides the chain-agnostic data model the rest of the
//! workspace is built around: the uniform [`Intent`] produced by a
//! [`Listener`] and consumed by the solver, the [`ChainConfig`] read once at
//! startup, the durable [`Cursor`] map, and the two plug-in interfaces
//! (`Listener`, `ChainHandler`) every chain family implements.
//!
//! ## Modules
//!
//! - **chain**: chain identifiers, families, and static configuration
//! - **intent**: the uniform cross-chain intent and its sub-structures
//! - **cursor**: the durable per-chain cursor map
//! - **events**: lightweight structured-logging event types (not a queue)
//! - **errors**: the shared error taxonomy
//! - **traits**: `Listener`, `ChainHandler`, `EventHandler`, `BalanceOracle`

pub mod chain;
pub mod cursor;
pub mod errors;
pub mod events;
pub mod intent;
pub mod traits;

pub use chain::{ChainConfig, ChainFamily, ChainId};
pub use cursor::CursorMap;
pub use errors::{Result, SolverError};
pub use events::{ServiceStatus, SolverEvent};
pub use intent::{FillInstruction, Intent, OrderId, Output};
pub use traits::{
	BalanceOracle, ChainHandler, EventHandler, FillOutcome, Listener, ListenerHandle, OrderStatus,
	Verdict,
};

/// Alias used throughout the workspace for 256-bit amounts.
pub type U256 = alloy_primitives::U256;
