//! Gas pricing math.
//!
//! Converts native gas cost into the unit the DEX oracle expects, and
//! turns an oracle quote into the `maxPayment` cap and gas limit placed
//! on the outer fee-proxy transaction. All arithmetic is integer; the
//! tunable factors are `Decimal`s applied as mantissa / 10^scale with
//! rounding up, so buffers never round a quote below itself.

use alloy::primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::{BuildError, OracleError};

/// Numeric asset identifier used by the DEX pricing RPC.
pub type AssetId = u32;

/// Two-hop trading path `[fee_token, native]` for `dex_getAmountsIn`.
///
/// The response is parsed positionally, so only two-element paths
/// are representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPath([AssetId; 2]);

impl PricingPath {
    pub fn new(fee_token: AssetId, native: AssetId) -> Self {
        Self([fee_token, native])
    }

    pub fn fee_token(&self) -> AssetId {
        self.0[0]
    }

    pub fn native(&self) -> AssetId {
        self.0[1]
    }

    pub fn as_array(&self) -> [AssetId; 2] {
        self.0
    }
}

impl TryFrom<&[AssetId]> for PricingPath {
    type Error = OracleError;

    fn try_from(path: &[AssetId]) -> Result<Self, Self::Error> {
        match *path {
            [fee_token, native] => Ok(Self::new(fee_token, native)),
            _ => Err(OracleError::InvalidPath { len: path.len() }),
        }
    }
}

/// Result of one oracle round trip. Never cached: prices float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedCost {
    /// Native gas cost in oracle units (see `native_cost_units`).
    pub native_units: u128,
    /// Fee-token amount required to cover `native_units`.
    pub fee_token_units: U256,
}

impl PricedCost {
    pub fn zero() -> Self {
        Self {
            native_units: 0,
            fee_token_units: U256::ZERO,
        }
    }
}

/// `ceil(value * factor)` for a non-negative `factor`.
fn mul_ceil(value: U256, factor: Decimal) -> U256 {
    let mantissa = U256::from(factor.mantissa().unsigned_abs());
    let denominator = U256::from(10u64).pow(U256::from(factor.scale()));
    value.saturating_mul(mantissa).div_ceil(denominator)
}

/// Native gas cost `gas_limit * gas_price` expressed in oracle units.
///
/// EVM balances carry 18 decimals while the DEX may count the native
/// asset with fewer; `unit_scale` is the decimal difference. Rounds up
/// so a non-zero cost never prices as zero.
pub fn native_cost_units(gas_limit: u64, gas_price: u128, unit_scale: u32) -> u128 {
    let wei = U256::from(gas_limit).saturating_mul(U256::from(gas_price));
    let divisor = U256::from(10u64).pow(U256::from(unit_scale));
    let units = wei.div_ceil(divisor);
    u128::try_from(units).unwrap_or(u128::MAX)
}

/// Safety margin between an oracle quote and `maxPayment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    buffer: Decimal,
    cap: U256,
}

impl FeePolicy {
    /// `buffer` must be at least 1 and `cap` non-zero.
    pub fn new(buffer: Decimal, cap: U256) -> Result<Self, BuildError> {
        if buffer < Decimal::ONE {
            return Err(BuildError::InvalidRequest(format!(
                "fee buffer must be >= 1, got {buffer}"
            )));
        }
        if cap.is_zero() {
            return Err(BuildError::InvalidRequest(
                "max payment cap must be non-zero".to_string(),
            ));
        }
        Ok(Self { buffer, cap })
    }

    pub fn buffer(&self) -> Decimal {
        self.buffer
    }

    /// Absolute ceiling on any `maxPayment`, also used while estimating.
    pub fn cap(&self) -> U256 {
        self.cap
    }

    /// `min(ceil(fee * buffer), cap)`, rejected if that is below `fee`.
    pub fn max_payment(&self, fee_token_units: U256) -> Result<U256, BuildError> {
        let buffered = mul_ceil(fee_token_units, self.buffer);
        let max_payment = buffered.min(self.cap);
        if max_payment < fee_token_units {
            return Err(BuildError::InsufficientMaxPayment {
                max_payment,
                fee: fee_token_units,
            });
        }
        Ok(max_payment)
    }
}

/// Gas limit derived from a node estimate.
///
/// Fee-proxy indirection costs more than the simulated inner call, so
/// the raw estimate is only a lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasLimitPolicy {
    floor: u64,
    multiplier: Decimal,
}

impl GasLimitPolicy {
    pub fn new(floor: u64, multiplier: Decimal) -> Result<Self, BuildError> {
        if floor == 0 {
            return Err(BuildError::InvalidRequest(
                "gas limit floor must be non-zero".to_string(),
            ));
        }
        if multiplier < Decimal::ONE {
            return Err(BuildError::InvalidRequest(format!(
                "gas limit multiplier must be >= 1, got {multiplier}"
            )));
        }
        Ok(Self { floor, multiplier })
    }

    pub fn floor(&self) -> u64 {
        self.floor
    }

    /// `max(ceil(estimate * multiplier), floor)`.
    pub fn gas_limit(&self, estimate: u64) -> u64 {
        let scaled = mul_ceil(U256::from(estimate), self.multiplier);
        u64::try_from(scaled).unwrap_or(u64::MAX).max(self.floor)
    }
}
