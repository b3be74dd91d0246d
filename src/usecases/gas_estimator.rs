//! Gas Estimator - Node-side Simulation of the Outer Call
//!
//! Asks the node how much gas the fee-proxy call would consume. The
//! result is advisory; the builder applies the floor and multiplier.
//! Failures are fatal for the run and never retried in place.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, U256};
use tracing::{debug, instrument, warn};

use crate::domain::errors::EstimationError;
use crate::ports::chain_client::{ChainClient, NodeRejection};

/// Gas estimation use case.
pub struct GasEstimator<C: ChainClient> {
  chain: Arc<C>,
}

impl<C: ChainClient> GasEstimator<C> {
  pub fn new(chain: Arc<C>) -> Self {
    Self { chain }
  }

  /// Simulate `payload` sent from `from` to `to` with `value` attached.
  ///
  /// # Errors
  /// - `Reverted` when the node answers with an error (revert, bad input)
  /// - `Unreachable` when no answer was obtained
  /// - `ZeroEstimate` when the node reports zero gas
  #[instrument(skip(self, payload), fields(payload_len = payload.len()))]
  pub async fn estimate(
    &self,
    from: Address,
    to: Address,
    payload: &Bytes,
    value: U256,
  ) -> Result<u64, EstimationError> {
    let gas = self
      .chain
      .estimate_gas(from, to, payload.clone(), value)
      .await
      .map_err(|e| match NodeRejection::find(&e) {
        Some(rejection) => {
          warn!(code = rejection.code, reason = %rejection.message, "Simulation reverted");
          EstimationError::Reverted {
            reason: rejection.message.clone(),
          }
        }
        None => EstimationError::Unreachable {
          reason: format!("{e:#}"),
        },
      })?;

    if gas == 0 {
      return Err(EstimationError::ZeroEstimate);
    }

    debug!(gas, "Gas estimate obtained");
    Ok(gas)
  }
}
