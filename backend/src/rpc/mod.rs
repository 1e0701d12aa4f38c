// Resilient multi-endpoint RPC access
pub mod client;
pub mod executor;
pub mod registry;
pub mod submit;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{AlloyChainClient, ChainClient};
pub use executor::ResilientExecutor;
pub use registry::{EndpointHandle, EndpointRegistry, EndpointSnapshot, EndpointStats};
pub use submit::TransactionSubmitter;
