//! Submission & Confirmation Tracker - Broadcast and Receipt Polling
//!
//! Broadcasts the signed bytes once and polls for the receipt until it
//! is mined or the run deadline passes. The tracker remembers whether a
//! broadcast was attempted, so a run that is cut short still reports
//! the hash that may be in the pool.
//!
//! Outcomes after an attempted broadcast are never guessed: no receipt
//! by the deadline is `ConfirmationError::Timeout`, which the workflow
//! reports as pending.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use alloy::primitives::TxHash;
use anyhow::Result;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{ConfirmationError, SubmitError};
use crate::domain::transaction::{Receipt, SignedTransaction};
use crate::ports::chain_client::{ChainClient, NodeRejection};

/// What has happened to the signed bytes so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BroadcastState {
  /// Nothing was sent.
  #[default]
  None,
  /// The send was started but no answer arrived.
  Attempted(TxHash),
  /// The node accepted the transaction into its pool.
  Accepted(TxHash),
}

/// What re-querying a hash left pending by an earlier run found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingResolution {
  /// Mined, successfully or not.
  Mined(Receipt),
  /// Neither mined nor known to the node: it never reached the pool or
  /// was evicted.
  Dropped,
  /// Known but not mined yet.
  InPool,
}

/// Per-run submission state and receipt polling.
pub struct SubmissionTracker<C: ChainClient> {
  chain: Arc<C>,
  poll_interval: Duration,
  state: Mutex<BroadcastState>,
}

impl<C: ChainClient> SubmissionTracker<C> {
  pub fn new(chain: Arc<C>, poll_interval: Duration) -> Self {
    Self {
      chain,
      poll_interval,
      state: Mutex::new(BroadcastState::None),
    }
  }

  pub fn broadcast_state(&self) -> BroadcastState {
    *self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Hash of a transaction that may have reached the pool.
  pub fn broadcast_hash(&self) -> Option<TxHash> {
    match self.broadcast_state() {
      BroadcastState::None => None,
      BroadcastState::Attempted(hash) | BroadcastState::Accepted(hash) => Some(hash),
    }
  }

  fn set_state(&self, state: BroadcastState) {
    *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
  }

  /// Broadcast `signed` once.
  ///
  /// # Errors
  /// - `Rejected` when the node refused it; nothing is in the pool
  /// - `Transport` when no answer arrived; it may be in the pool
  #[instrument(skip(self, signed), fields(tx_hash = %signed.hash, nonce = signed.nonce))]
  pub async fn submit(&self, signed: &SignedTransaction) -> Result<TxHash, SubmitError> {
    self.set_state(BroadcastState::Attempted(signed.hash));

    match self.chain.send_raw_transaction(signed.raw.clone()).await {
      Ok(returned) => {
        if returned != signed.hash {
          warn!(%returned, "Node returned a different hash than the signed envelope");
        }
        self.set_state(BroadcastState::Accepted(signed.hash));
        info!("Transaction broadcast");
        Ok(signed.hash)
      }
      Err(e) => match NodeRejection::find(&e) {
        Some(rejection) if is_already_known(&rejection.message) => {
          self.set_state(BroadcastState::Accepted(signed.hash));
          info!("Transaction already in the pool");
          Ok(signed.hash)
        }
        Some(rejection) => {
          self.set_state(BroadcastState::None);
          warn!(code = rejection.code, reason = %rejection.message, "Broadcast rejected");
          Err(SubmitError::Rejected {
            reason: rejection.message.clone(),
          })
        }
        None => {
          warn!(error = %e, "Broadcast interrupted; outcome unknown");
          Err(SubmitError::Transport {
            tx_hash: signed.hash,
            reason: format!("{e:#}"),
          })
        }
      },
    }
  }

  /// Poll for the receipt of `tx_hash` until `deadline`.
  ///
  /// A mined receipt is returned whatever its status; a revert is for
  /// the caller to interpret.
  #[instrument(skip(self))]
  pub async fn await_receipt(
    &self,
    tx_hash: TxHash,
    deadline: Instant,
  ) -> Result<Receipt, ConfirmationError> {
    let mut last_error: Option<String> = None;

    loop {
      match timeout_at(deadline, self.chain.transaction_receipt(tx_hash)).await {
        Ok(Ok(Some(receipt))) => {
          info!(
            block = ?receipt.block_number,
            gas_used = receipt.gas_used,
            success = receipt.success,
            "Receipt obtained"
          );
          return Ok(receipt);
        }
        Ok(Ok(None)) => {
          debug!("Transaction pending");
          last_error = None;
        }
        Ok(Err(e)) => {
          warn!(error = %e, "Receipt query failed; polling continues");
          last_error = Some(format!("{e:#}"));
        }
        Err(_) => break,
      }

      let next = Instant::now() + self.poll_interval;
      if next >= deadline {
        sleep_until(deadline).await;
        break;
      }
      sleep_until(next).await;
    }

    Err(match last_error {
      Some(reason) => ConfirmationError::NodeError { tx_hash, reason },
      None => ConfirmationError::Timeout { tx_hash },
    })
  }

  /// Resolve a hash left pending by an earlier run with one receipt
  /// lookup and, if unmined, one pool lookup.
  pub async fn requery(&self, tx_hash: TxHash) -> Result<PendingResolution> {
    if let Some(receipt) = self.chain.transaction_receipt(tx_hash).await? {
      return Ok(PendingResolution::Mined(receipt));
    }
    if self.chain.transaction_known(tx_hash).await? {
      Ok(PendingResolution::InPool)
    } else {
      Ok(PendingResolution::Dropped)
    }
  }
}

fn is_already_known(message: &str) -> bool {
  let message = message.to_ascii_lowercase();
  message.contains("already known") || message.contains("known transaction")
}
