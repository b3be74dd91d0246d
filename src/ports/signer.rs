//! Signer Port - Transaction Signing Capability
//!
//! Key import and unlocking are owned by the implementor; the workflow
//! only needs the account address and a "sign into network bytes"
//! operation.

use alloy::primitives::Address;
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;

use crate::domain::transaction::SignedEnvelope;

/// Trait for an unlocked account able to sign transactions.
#[async_trait]
pub trait TransactionSigner: Send + Sync + 'static {
  /// Address transactions are sent from.
  fn address(&self) -> Address;

  /// Sign a fully populated request (nonce, gas, chain id set).
  async fn sign(&self, request: TransactionRequest) -> anyhow::Result<SignedEnvelope>;
}
