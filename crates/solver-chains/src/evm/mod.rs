//! EVM-family chain plug-in: Ethereum, Optimism, Arbitrum, Base and other
//! EIP-7683 settler deployments share this single implementation — one
//! static implementation per family.

pub mod codec;
pub mod handler;
pub mod listener;

pub use handler::EvmChainHandler;
pub use listener::EvmListener;
