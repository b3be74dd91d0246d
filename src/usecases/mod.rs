//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces. Each component is a
//! self-contained step of the transfer pipeline; `FeeProxyTransfer`
//! runs them in order.
//!
//! Use cases:
//! - `GasEstimator`: Node simulation of the outer call
//! - `NonceManager`: Per-account nonce leases
//! - `TransactionBuilder`: Outer call assembly and signing
//! - `SubmissionTracker`: Broadcast and receipt polling
//! - `BalanceReconciler`: Before/after balance snapshots
//! - `FeeProxyTransfer`: The end-to-end workflow

pub mod fee_proxy_transfer;
pub mod gas_estimator;
pub mod nonce;
pub mod reconciler;
pub mod tracker;
pub mod tx_builder;

#[cfg(test)]
pub(crate) mod testing;

pub use fee_proxy_transfer::{FeeProxyTransfer, RunProgress, TransferReport, WorkflowSettings};
pub use gas_estimator::GasEstimator;
pub use nonce::{NonceLease, NonceManager};
pub use reconciler::BalanceReconciler;
pub use tracker::{BroadcastState, PendingResolution, SubmissionTracker};
pub use tx_builder::TransactionBuilder;
