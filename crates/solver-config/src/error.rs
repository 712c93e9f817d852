use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("missing required environment variable: {0}")]
	MissingEnv(String),

	#[error("invalid value for {var}: {reason}")]
	InvalidValue { var: String, reason: String },

	#[error("no chains configured: set at least one of the RPC url variables, e.g. ETHEREUM_RPC_URL")]
	NoChainsConfigured,
}
