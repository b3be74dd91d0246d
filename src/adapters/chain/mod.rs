//! Chain Adapters - EVM Node and Signing Layer
//!
//! Provides on-chain access via alloy-rs 0.9 for:
//! - JSON-RPC reads, simulation and raw broadcast (`ChainClient`)
//! - Local private-key signing (`TransactionSigner`)

pub mod provider;
pub mod signer;

pub use provider::RpcChainClient;
pub use signer::LocalKeySigner;
