//! Configuration Module - TOML-based Transfer Configuration
//!
//! Loads and validates configuration from `config.toml`. Endpoint
//! URLs, contract addresses, DEX asset ids and every operational
//! constant (fee buffer, gas floor, deadline) live here; nothing is
//! hardcoded in the domain layer. The signing key is read from the
//! environment variable named in `[signer]`, never from the file.

pub mod loader;

use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use anyhow::Context;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::pricing::{AssetId, FeePolicy, GasLimitPolicy, PricingPath};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Log output settings.
  #[serde(default)]
  pub logging: LoggingConfig,
  /// Chain node endpoint.
  pub chain: ChainConfig,
  /// DEX pricing oracle endpoint and retry policy.
  #[serde(default)]
  pub oracle: OracleConfig,
  /// Contract addresses and the asset ids they correspond to.
  pub assets: AssetConfig,
  /// Fee buffer and gas limit policy.
  pub fees: FeeConfig,
  /// Deadline and polling.
  #[serde(default)]
  pub workflow: WorkflowConfig,
  /// The transfer to perform.
  pub transfer: TransferConfig,
  /// Where the signing key comes from.
  #[serde(default)]
  pub signer: SignerConfig,
  /// Run journal location.
  #[serde(default)]
  pub persistence: PersistenceConfig,
  /// Prometheus textfile export.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
  /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
  #[serde(default = "default_log_level")]
  pub level: String,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
    }
  }
}

/// Chain node configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
  /// JSON-RPC endpoint of the EVM node.
  pub rpc_url: String,
  /// Refuse to run when the node reports a different chain id.
  pub expected_chain_id: Option<u64>,
}

/// Pricing oracle configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
  /// Oracle endpoint. Defaults to `chain.rpc_url`.
  pub url: Option<String>,
  /// JSON-RPC method returning amounts in for a swap path.
  #[serde(default = "default_oracle_method")]
  pub method: String,
  /// Additional attempts after the first failure.
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  /// Base delay for exponential backoff between attempts.
  #[serde(default = "default_retry_base_delay")]
  pub retry_base_delay_ms: u64,
  /// Decimal places between EVM native balances and the oracle's
  /// native asset unit.
  #[serde(default = "default_native_unit_scale")]
  pub native_unit_scale: u32,
}

impl Default for OracleConfig {
  fn default() -> Self {
    Self {
      url: None,
      method: default_oracle_method(),
      max_retries: default_max_retries(),
      retry_base_delay_ms: default_retry_base_delay(),
      native_unit_scale: default_native_unit_scale(),
    }
  }
}

/// Contract addresses and oracle asset ids.
///
/// The token address and its DEX asset id are two addressing schemes
/// for the same asset; they are correlated here, never derived.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfig {
  /// Fee proxy contract.
  pub fee_proxy: Address,
  /// ERC-20 that is transferred and pays the gas.
  pub fee_token: Address,
  /// DEX asset id of `fee_token`.
  pub fee_token_asset_id: AssetId,
  /// DEX asset id of the native gas asset.
  pub native_asset_id: AssetId,
  /// Decimals of `fee_token`, used for log formatting only.
  #[serde(default = "default_decimals")]
  pub fee_token_decimals: u8,
}

impl AssetConfig {
  /// DEX path `[fee_token, native]`.
  pub fn pricing_path(&self) -> PricingPath {
    PricingPath::new(self.fee_token_asset_id, self.native_asset_id)
  }
}

/// Fee and gas limit policy.
#[derive(Debug, Clone, Deserialize)]
pub struct FeeConfig {
  /// Multiplier applied to the oracle quote (>= 1).
  pub fee_buffer: Decimal,
  /// Absolute ceiling on `maxPayment`, fee-token base units.
  pub max_payment_cap: String,
  /// Minimum gas limit regardless of the estimate.
  pub gas_limit_floor: u64,
  /// Multiplier applied to the node's estimate (>= 1).
  #[serde(default = "default_gas_limit_multiplier")]
  pub gas_limit_multiplier: Decimal,
}

impl FeeConfig {
  pub fn max_payment_cap(&self) -> anyhow::Result<U256> {
    U256::from_str(self.max_payment_cap.trim())
      .with_context(|| format!("Invalid max_payment_cap: {}", self.max_payment_cap))
  }

  pub fn fee_policy(&self) -> anyhow::Result<FeePolicy> {
    Ok(FeePolicy::new(self.fee_buffer, self.max_payment_cap()?)?)
  }

  pub fn gas_limit_policy(&self) -> anyhow::Result<GasLimitPolicy> {
    Ok(GasLimitPolicy::new(
      self.gas_limit_floor,
      self.gas_limit_multiplier,
    )?)
  }
}

/// Workflow timing.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowConfig {
  /// Overall deadline for one run, shared by every network call.
  #[serde(default = "default_deadline")]
  pub deadline_secs: u64,
  /// Receipt polling interval.
  #[serde(default = "default_poll_interval")]
  pub poll_interval_ms: u64,
}

impl WorkflowConfig {
  pub fn deadline(&self) -> Duration {
    Duration::from_secs(self.deadline_secs)
  }

  pub fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.poll_interval_ms)
  }
}

impl Default for WorkflowConfig {
  fn default() -> Self {
    Self {
      deadline_secs: default_deadline(),
      poll_interval_ms: default_poll_interval(),
    }
  }
}

/// Transfer to perform.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferConfig {
  /// Recipient of the fee token.
  pub recipient: Address,
  /// Amount in fee-token base units.
  pub amount: String,
}

impl TransferConfig {
  pub fn amount(&self) -> anyhow::Result<U256> {
    U256::from_str(self.amount.trim())
      .with_context(|| format!("Invalid transfer amount: {}", self.amount))
  }
}

/// Signer configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SignerConfig {
  /// Environment variable holding the hex private key.
  #[serde(default = "default_key_env")]
  pub key_env: String,
}

impl Default for SignerConfig {
  fn default() -> Self {
    Self {
      key_env: default_key_env(),
    }
  }
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
  /// Directory for JSONL run journals.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
}

impl Default for PersistenceConfig {
  fn default() -> Self {
    Self {
      data_dir: default_data_dir(),
    }
  }
}

/// Metrics configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsConfig {
  /// node_exporter textfile path; metrics are not written when unset.
  pub textfile_path: Option<String>,
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_oracle_method() -> String {
  "dex_getAmountsIn".to_string()
}

fn default_max_retries() -> u32 {
  3
}

fn default_retry_base_delay() -> u64 {
  200
}

fn default_native_unit_scale() -> u32 {
  12
}

fn default_decimals() -> u8 {
  18
}

fn default_gas_limit_multiplier() -> Decimal {
  Decimal::ONE
}

fn default_deadline() -> u64 {
  60
}

fn default_poll_interval() -> u64 {
  1_000
}

fn default_key_env() -> String {
  "FEE_PROXY_SIGNER_KEY".to_string()
}

fn default_data_dir() -> String {
  "data".to_string()
}
