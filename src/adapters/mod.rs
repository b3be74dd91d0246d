//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (blockchain RPC, HTTP, file I/O). Each
//! sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `chain`: EVM node access and local signing via alloy-rs
//! - `oracle`: DEX pricing over JSON-RPC
//! - `metrics`: Prometheus textfile export
//! - `persistence`: JSONL run journal

pub mod chain;
pub mod metrics;
pub mod oracle;
pub mod persistence;
