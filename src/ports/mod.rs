//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the domain/usecases layer
//! requires from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `ChainClient`: EVM node reads, simulation and broadcast
//! - `PriceOracle` / `JsonRpcTransport`: DEX fee-token pricing
//! - `TransactionSigner`: Unlocked signing account
//! - `RunJournal`: Durable record of submitted transfers (JSONL-based)

pub mod chain_client;
pub mod journal;
pub mod price_oracle;
pub mod signer;
