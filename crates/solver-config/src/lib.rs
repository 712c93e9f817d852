//! # Solver Config
//!
//! Process-wide configuration, resolved once from the environment at
//! startup. No file formats, no plugin tables — every variable this
//! workspace reads is documented in [`loader::ConfigLoader`].

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use types::ResolvedConfig;
