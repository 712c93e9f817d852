// solver-core/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
	#[error("configuration error: {0}")]
	Configuration(String),

	#[error("lifecycle error: {0}")]
	Lifecycle(String),

	#[error(transparent)]
	Chain(#[from] solver_types::SolverError),

	#[error("shutdown error: {0}")]
	Shutdown(String),
}
