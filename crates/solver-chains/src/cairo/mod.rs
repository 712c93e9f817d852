//! Cairo/Starknet-family chain plug-in: the other static implementation
//! per family.

pub mod codec;
pub mod handler;
pub mod listener;

pub use handler::CairoChainHandler;
pub use listener::CairoListener;
