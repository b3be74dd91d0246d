//! Chain Client Port - Node RPC Interface
//!
//! Defines the read and write operations the workflow needs from an
//! EVM node: chain parameters, balances, nonces, simulation, raw
//! broadcast, receipt and transaction lookup. Adapters implement it with alloy-rs.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;

use crate::domain::transaction::Receipt;

/// The node answered with a JSON-RPC error object.
///
/// Adapters return this (inside `anyhow::Error`) so callers can tell a
/// refusal (revert, nonce too low, underpriced) apart from an
/// unreachable node via `downcast_ref`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("node rejected request (code {code}): {message}")]
pub struct NodeRejection {
  /// JSON-RPC error code.
  pub code: i64,
  /// Error message from the node, including revert reasons.
  pub message: String,
}

impl NodeRejection {
  /// Extract the rejection from an adapter error, if that is what it is.
  pub fn find(err: &anyhow::Error) -> Option<&Self> {
    err.downcast_ref::<Self>()
  }
}

/// Trait for EVM node access via alloy-rs.
#[async_trait]
pub trait ChainClient: Send + Sync + 'static {
  /// Chain identifier used for replay protection.
  async fn chain_id(&self) -> anyhow::Result<u64>;

  /// Current legacy gas price in wei.
  async fn gas_price(&self) -> anyhow::Result<u128>;

  /// Native asset balance of `account` at the latest block.
  async fn native_balance(&self, account: Address) -> anyhow::Result<U256>;

  /// ERC-20 `balanceOf(account)` on `token`.
  async fn token_balance(&self, token: Address, account: Address) -> anyhow::Result<U256>;

  /// Next nonce for `account`, including pool transactions.
  async fn pending_nonce(&self, account: Address) -> anyhow::Result<u64>;

  /// Simulate a call and return the gas it would use.
  async fn estimate_gas(
    &self,
    from: Address,
    to: Address,
    payload: Bytes,
    value: U256,
  ) -> anyhow::Result<u64>;

  /// Broadcast a signed transaction.
  async fn send_raw_transaction(&self, raw: Bytes) -> anyhow::Result<TxHash>;

  /// Receipt for `tx_hash`, or `None` while it is not mined.
  async fn transaction_receipt(&self, tx_hash: TxHash) -> anyhow::Result<Option<Receipt>>;

  /// Whether the node knows `tx_hash` at all, mined or in its pool.
  async fn transaction_known(&self, tx_hash: TxHash) -> anyhow::Result<bool>;
}
