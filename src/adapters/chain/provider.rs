//! EVM RPC Provider - alloy-rs 0.9 Connection Management
//!
//! Implements the `ChainClient` port over a JSON-RPC HTTP endpoint.
//! Optionally validates the chain id at startup and maps node error
//! responses to `NodeRejection` so use cases can tell a refusal apart
//! from an unreachable node.
//!
//! In alloy 0.9 the HTTP root provider is generic over its transport;
//! it is boxed and stored as a type-erased `dyn Provider` to keep the
//! API clean across the adapter layer.

use std::sync::Arc;

use alloy::network::ReceiptResponse;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use alloy::transports::http::{Client, Http};
use alloy::transports::{RpcError, TransportErrorKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::config::ChainConfig;
use crate::domain::contracts::IERC20;
use crate::domain::transaction::Receipt;
use crate::ports::chain_client::{ChainClient, NodeRejection};

/// Shared EVM RPC provider backed by alloy-rs 0.9.
pub struct RpcChainClient {
    /// The alloy HTTP provider (type-erased).
    provider: Arc<dyn Provider + Send + Sync>,
    /// RPC endpoint URL (for diagnostics).
    rpc_url: String,
}

impl RpcChainClient {
    /// Connect to the node and validate the chain id when configured.
    #[instrument(skip_all, fields(rpc_url = %config.rpc_url))]
    pub async fn connect(config: &ChainConfig) -> Result<Self> {
        let url = config.rpc_url.parse().context("Invalid RPC URL")?;
        let provider = RootProvider::<Http<Client>>::new_http(url).boxed();
        let provider: Arc<dyn Provider + Send + Sync> = Arc::new(provider);

        let chain_id = provider
            .get_chain_id()
            .await
            .context("Failed to query chain ID")?;

        if let Some(expected) = config.expected_chain_id {
            anyhow::ensure!(
                chain_id == expected,
                "Expected chain_id={expected}, node reports {chain_id}"
            );
        }

        info!(chain_id, "Connected to EVM RPC");

        Ok(Self {
            provider,
            rpc_url: config.rpc_url.clone(),
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }
}

/// Turn a JSON-RPC error response into `NodeRejection`, keep the rest.
fn classify(err: RpcError<TransportErrorKind>) -> anyhow::Error {
    match err.as_error_resp() {
        Some(payload) => NodeRejection {
            code: payload.code,
            message: payload.message.to_string(),
        }
        .into(),
        None => anyhow::Error::new(err),
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn chain_id(&self) -> Result<u64> {
        self.provider
            .get_chain_id()
            .await
            .map_err(classify)
            .context("eth_chainId failed")
    }

    async fn gas_price(&self) -> Result<u128> {
        self.provider
            .get_gas_price()
            .await
            .map_err(classify)
            .context("eth_gasPrice failed")
    }

    #[instrument(skip(self))]
    async fn native_balance(&self, account: Address) -> Result<U256> {
        self.provider
            .get_balance(account)
            .await
            .map_err(classify)
            .context("eth_getBalance failed")
    }

    #[instrument(skip(self))]
    async fn token_balance(&self, token: Address, account: Address) -> Result<U256> {
        let calldata = IERC20::balanceOfCall { account }.abi_encode();
        let request = TransactionRequest::default()
            .to(token)
            .input(Bytes::from(calldata).into());

        let output = self
            .provider
            .call(&request)
            .await
            .map_err(classify)
            .context("balanceOf call failed")?;

        let decoded = IERC20::balanceOfCall::abi_decode_returns(&output, true)
            .context("Failed to decode balanceOf return data")?;
        Ok(decoded.balance)
    }

    async fn pending_nonce(&self, account: Address) -> Result<u64> {
        self.provider
            .get_transaction_count(account)
            .pending()
            .await
            .map_err(classify)
            .context("eth_getTransactionCount failed")
    }

    #[instrument(skip(self, payload), fields(payload_len = payload.len()))]
    async fn estimate_gas(
        &self,
        from: Address,
        to: Address,
        payload: Bytes,
        value: U256,
    ) -> Result<u64> {
        let request = TransactionRequest::default()
            .from(from)
            .to(to)
            .value(value)
            .input(payload.into());

        let gas = self
            .provider
            .estimate_gas(&request)
            .await
            .map_err(classify)
            .context("eth_estimateGas failed")?;

        debug!(gas, "Gas estimated");
        Ok(gas)
    }

    #[instrument(skip(self, raw), fields(raw_len = raw.len()))]
    async fn send_raw_transaction(&self, raw: Bytes) -> Result<TxHash> {
        let pending = self
            .provider
            .send_raw_transaction(&raw)
            .await
            .map_err(classify)
            .context("eth_sendRawTransaction failed")?;
        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<Receipt>> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(classify)
            .context("eth_getTransactionReceipt failed")?;

        Ok(receipt.map(|r| Receipt {
            tx_hash: r.transaction_hash(),
            block_number: r.block_number(),
            gas_used: r.gas_used(),
            effective_gas_price: r.effective_gas_price(),
            success: r.status(),
        }))
    }

    async fn transaction_known(&self, tx_hash: TxHash) -> Result<bool> {
        let tx = self
            .provider
            .get_transaction_by_hash(tx_hash)
            .await
            .map_err(classify)
            .context("eth_getTransactionByHash failed")?;
        Ok(tx.is_some())
    }
}
