//! Balance Reconciler - Before/After Account Snapshots
//!
//! Reads the native and fee-token balances of the sending account so
//! the run can report what the transfer actually cost.

use std::sync::Arc;

use alloy::primitives::Address;
use chrono::Utc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, instrument};

use crate::domain::balance::{self, BalanceDelta, BalanceSnapshot};
use crate::domain::errors::QueryError;
use crate::ports::chain_client::ChainClient;

/// Balance snapshot use case.
pub struct BalanceReconciler<C: ChainClient> {
  chain: Arc<C>,
  fee_token: Address,
}

impl<C: ChainClient> BalanceReconciler<C> {
  pub fn new(chain: Arc<C>, fee_token: Address) -> Self {
    Self { chain, fee_token }
  }

  /// Read both balances of `account`.
  #[instrument(skip(self))]
  pub async fn snapshot(&self, account: Address) -> Result<BalanceSnapshot, QueryError> {
    let (native, fee_token) = tokio::join!(
      self.chain.native_balance(account),
      self.chain.token_balance(self.fee_token, account),
    );

    let snapshot = BalanceSnapshot {
      native: native.map_err(|e| QueryError::Native(format!("{e:#}")))?,
      fee_token: fee_token.map_err(|e| QueryError::FeeToken(format!("{e:#}")))?,
      taken_at: Utc::now(),
    };

    debug!(native = %snapshot.native, fee_token = %snapshot.fee_token, "Balance snapshot");
    Ok(snapshot)
  }

  /// `snapshot` bounded by `deadline`.
  pub async fn snapshot_within(
    &self,
    account: Address,
    deadline: Instant,
  ) -> Result<BalanceSnapshot, QueryError> {
    timeout_at(deadline, self.snapshot(account))
      .await
      .unwrap_or(Err(QueryError::Deadline))
  }

  /// Signed change from `before` to `after`.
  pub fn delta(&self, before: &BalanceSnapshot, after: &BalanceSnapshot) -> BalanceDelta {
    balance::delta(before, after)
  }
}
