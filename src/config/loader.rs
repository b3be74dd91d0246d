//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::info;

use super::AppConfig;

/// Upper bound on `oracle.max_retries`.
pub const MAX_ORACLE_RETRIES: u32 = 10;

/// Upper bound on `workflow.deadline_secs` (one hour).
pub const MAX_DEADLINE_SECS: u64 = 3_600;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    fee_proxy = %config.assets.fee_proxy,
    fee_token = %config.assets.fee_token,
    fee_buffer = %config.fees.fee_buffer,
    gas_limit_floor = config.fees.gas_limit_floor,
    deadline_secs = config.workflow.deadline_secs,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content)
    .with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Non-empty endpoints
/// - Non-zero contract addresses
/// - Buffers and multipliers of at least 1
/// - A bounded retry count
/// - A bounded deadline and a poll interval shorter than it
fn validate_config(config: &AppConfig) -> Result<()> {
  // Endpoints
  anyhow::ensure!(
    !config.chain.rpc_url.trim().is_empty(),
    "chain.rpc_url must not be empty"
  );
  if let Some(url) = &config.oracle.url {
    anyhow::ensure!(!url.trim().is_empty(), "oracle.url must not be empty when set");
  }
  anyhow::ensure!(
    !config.oracle.method.trim().is_empty(),
    "oracle.method must not be empty"
  );
  anyhow::ensure!(
    config.oracle.max_retries <= MAX_ORACLE_RETRIES,
    "oracle.max_retries must be <= {MAX_ORACLE_RETRIES}, got {}",
    config.oracle.max_retries
  );
  anyhow::ensure!(
    config.oracle.native_unit_scale <= 36,
    "oracle.native_unit_scale must be <= 36, got {}",
    config.oracle.native_unit_scale
  );

  // Assets
  anyhow::ensure!(
    !config.assets.fee_proxy.is_zero(),
    "assets.fee_proxy must not be the zero address"
  );
  anyhow::ensure!(
    !config.assets.fee_token.is_zero(),
    "assets.fee_token must not be the zero address"
  );
  anyhow::ensure!(
    config.assets.fee_token_asset_id != config.assets.native_asset_id,
    "assets.fee_token_asset_id and assets.native_asset_id must differ"
  );

  // Fees
  anyhow::ensure!(
    config.fees.fee_buffer >= Decimal::ONE,
    "fees.fee_buffer must be >= 1, got {}",
    config.fees.fee_buffer
  );
  anyhow::ensure!(
    config.fees.gas_limit_multiplier >= Decimal::ONE,
    "fees.gas_limit_multiplier must be >= 1, got {}",
    config.fees.gas_limit_multiplier
  );
  anyhow::ensure!(
    config.fees.gas_limit_floor > 0,
    "fees.gas_limit_floor must be positive"
  );
  let cap = config.fees.max_payment_cap()?;
  anyhow::ensure!(!cap.is_zero(), "fees.max_payment_cap must be positive");
  anyhow::ensure!(
    cap <= alloy::primitives::U256::from(u128::MAX),
    "fees.max_payment_cap must fit uint128"
  );

  // Workflow
  anyhow::ensure!(
    config.workflow.deadline_secs > 0 && config.workflow.deadline_secs <= MAX_DEADLINE_SECS,
    "workflow.deadline_secs must be in 1..={MAX_DEADLINE_SECS}, got {}",
    config.workflow.deadline_secs
  );
  anyhow::ensure!(
    config.workflow.poll_interval_ms > 0
      && config.workflow.poll_interval_ms < config.workflow.deadline_secs.saturating_mul(1_000),
    "workflow.poll_interval_ms must be positive and shorter than the deadline"
  );

  // Transfer
  anyhow::ensure!(
    !config.transfer.recipient.is_zero(),
    "transfer.recipient must not be the zero address"
  );
  let amount = config.transfer.amount()?;
  anyhow::ensure!(!amount.is_zero(), "transfer.amount must be positive");

  anyhow::ensure!(
    !config.signer.key_env.trim().is_empty(),
    "signer.key_env must not be empty"
  );

  Ok(())
}
