//! Transaction Builder - Outer Fee-proxy Call Assembly and Signing
//!
//! Wraps the inner payload in `callWithFeePreferences`, attaches the
//! nonce, gas and chain parameters, and has the signer produce the
//! raw bytes. Everything here happens before broadcast, so every
//! failure is a `BuildError` and nothing has left the process.

use alloy::network::TransactionBuilder as _;
use alloy::primitives::{Address, U256};
use alloy::rpc::types::TransactionRequest;
use tracing::{debug, instrument};

use crate::domain::errors::BuildError;
use crate::domain::transaction::{FeeProxyRequest, SignedTransaction};
use crate::ports::signer::TransactionSigner;

/// Builds signed legacy transactions addressed to the fee proxy.
#[derive(Debug, Clone, Copy)]
pub struct TransactionBuilder {
  fee_proxy: Address,
}

impl TransactionBuilder {
  pub fn new(fee_proxy: Address) -> Self {
    Self { fee_proxy }
  }

  pub fn fee_proxy(&self) -> Address {
    self.fee_proxy
  }

  /// Unsigned request for `request` with all parameters attached.
  pub fn unsigned(
    &self,
    request: &FeeProxyRequest,
    from: Address,
    nonce: u64,
    gas_limit: u64,
    gas_price: u128,
    chain_id: u64,
  ) -> Result<TransactionRequest, BuildError> {
    if gas_limit == 0 {
      return Err(BuildError::InvalidRequest("gas limit is zero".into()));
    }
    if gas_price == 0 {
      return Err(BuildError::InvalidRequest("gas price is zero".into()));
    }
    if self.fee_proxy.is_zero() {
      return Err(BuildError::InvalidRequest("fee proxy is the zero address".into()));
    }

    let input = request.encode()?;

    Ok(
      TransactionRequest::default()
        .with_from(from)
        .with_to(self.fee_proxy)
        .with_value(U256::ZERO)
        .with_input(input)
        .with_nonce(nonce)
        .with_gas_limit(gas_limit)
        .with_gas_price(gas_price)
        .with_chain_id(chain_id),
    )
  }

  /// Validate, encode and sign.
  ///
  /// # Errors
  /// - `InvalidRequest` for zero addresses, empty payload, zero gas
  /// - `MaxPaymentOverflow` when `max_payment` exceeds `uint128`
  /// - `Signer` when the signer cannot produce a signature
  #[instrument(skip(self, request, signer))]
  pub async fn build<S: TransactionSigner + ?Sized>(
    &self,
    request: &FeeProxyRequest,
    signer: &S,
    nonce: u64,
    gas_limit: u64,
    gas_price: u128,
    chain_id: u64,
  ) -> Result<SignedTransaction, BuildError> {
    let from = signer.address();
    let unsigned = self.unsigned(request, from, nonce, gas_limit, gas_price, chain_id)?;

    let envelope = signer
      .sign(unsigned)
      .await
      .map_err(|e| BuildError::Signer(format!("{e:#}")))?;

    debug!(tx_hash = %envelope.tx_hash, raw_len = envelope.raw.len(), "Transaction built");

    Ok(SignedTransaction {
      hash: envelope.tx_hash,
      raw: envelope.raw,
      from,
      to: self.fee_proxy,
      nonce,
      gas_limit,
      gas_price,
      chain_id,
    })
  }
}
