//! Local Key Signer - In-process Transaction Signing
//!
//! Implements the `TransactionSigner` port with an alloy
//! `PrivateKeySigner` wrapped in an `EthereumWallet`. The key is read
//! from an environment variable; it is never logged or written out.

use std::str::FromStr;

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::Address;
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::domain::transaction::SignedEnvelope;
use crate::ports::signer::TransactionSigner;

/// Unlocked local account.
pub struct LocalKeySigner {
    wallet: EthereumWallet,
    address: Address,
}

impl LocalKeySigner {
    /// Build from a hex private key (with or without `0x`).
    pub fn from_hex(key: &str) -> Result<Self> {
        let signer = PrivateKeySigner::from_str(key.trim()).context("Invalid private key")?;
        let address = signer.address();
        Ok(Self {
            wallet: EthereumWallet::from(signer),
            address,
        })
    }

    /// Read the hex private key from `var`.
    pub fn from_env(var: &str) -> Result<Self> {
        let key = std::env::var(var).with_context(|| format!("{var} not set"))?;
        Self::from_hex(&key)
    }
}

impl std::fmt::Debug for LocalKeySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKeySigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TransactionSigner for LocalKeySigner {
    fn address(&self) -> Address {
        self.address
    }

    #[instrument(skip_all, fields(from = %self.address, nonce = ?request.nonce))]
    async fn sign(&self, request: TransactionRequest) -> Result<SignedEnvelope> {
        let envelope = request
            .build(&self.wallet)
            .await
            .context("Failed to sign transaction")?;

        let tx_hash = *envelope.tx_hash();
        let raw = envelope.encoded_2718().into();

        debug!(%tx_hash, "Transaction signed");
        Ok(SignedEnvelope { tx_hash, raw })
    }
}
