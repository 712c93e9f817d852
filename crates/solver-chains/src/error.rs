//! Chain-layer error taxonomy, mapped onto the shared [`SolverError`]
//! vocabulary at the boundary every `Listener`/`ChainHandler` call crosses.

use solver_types::SolverError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChainError>;

#[derive(Error, Debug)]
pub enum ChainError {
	#[error("rpc error: {0}")]
	Rpc(String),

	#[error("decode error: {0}")]
	Decode(String),

	#[error("handler error: {0}")]
	Handler(String),

	#[error("chain {0} is not configured")]
	UnknownChain(String),
}

impl From<ChainError> for SolverError {
	fn from(e: ChainError) -> Self {
		match e {
			ChainError::Rpc(m) => SolverError::TransientRpc(m),
			ChainError::Decode(m) => SolverError::Decode(m),
			ChainError::Handler(m) | ChainError::UnknownChain(m) => SolverError::HandlerError(m),
		}
	}
}
