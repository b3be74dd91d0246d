//! Price Oracle Port - Native Gas to Fee Token Conversion
//!
//! The oracle answers "how many fee tokens buy this much native gas"
//! over a two-hop DEX path. The transport is its own port so the
//! JSON-RPC client can be exercised without a network.

use async_trait::async_trait;

use crate::domain::errors::OracleError;
use crate::domain::pricing::{AssetId, PricedCost};

/// Trait for fee-token pricing providers.
#[async_trait]
pub trait PriceOracle: Send + Sync + 'static {
  /// Fee-token cost of `native_units` of the native asset.
  ///
  /// `path` must be `[fee_token_id, native_asset_id]`; any other length
  /// is rejected before a request is made.
  async fn price_in_fee_token(
    &self,
    native_units: u128,
    path: &[AssetId],
  ) -> Result<PricedCost, OracleError>;
}

/// A single JSON request/response exchange with an RPC endpoint.
#[async_trait]
pub trait JsonRpcTransport: Send + Sync + 'static {
  /// POST `body` with `Content-Type: application/json` and return the
  /// raw response body.
  async fn post_json(&self, body: String) -> anyhow::Result<String>;
}
