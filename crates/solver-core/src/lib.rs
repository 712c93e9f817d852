//! # Solver Core
//!
//! The routing orchestrator: [`Solver`] implements `EventHandler` and runs
//! every discovered intent through the rules pipeline to fill/settle,
//! [`ChainRegistry`] holds the one `ChainHandler` per configured chain
//! `Solver` dispatches to, and [`SolverManager`] is the top-level
//! construct-start-shutdown lifecycle.

pub mod error;
pub mod lifecycle;
pub mod manager;
pub mod registry;
pub mod solver;

pub use error::CoreError;
pub use lifecycle::{LifecycleManager, LifecycleState};
pub use manager::SolverManager;
pub use registry::ChainRegistry;
pub use solver::Solver;
