//! Run Journal Port - Durable Record of Submitted Transfers
//!
//! The transaction hash is the only artifact that outlives a run. A
//! `pending` record is appended before the signed bytes are broadcast
//! and superseded by the run's final record; a hash whose latest record
//! is still `pending` must be resolved before the same transfer is sent
//! again.

use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One line of the run journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
  /// Unique run identifier (UUID v4).
  pub run_id: String,
  /// Timestamp (Unix ms).
  pub timestamp_ms: u64,
  /// Sending account.
  pub account: Address,
  /// Nonce used, when one was assigned.
  pub nonce: Option<u64>,
  /// Transaction hash, when a broadcast was attempted.
  pub tx_hash: Option<TxHash>,
  /// Outcome label: not_submitted, pending, failed, confirmed, resolved,
  /// dropped.
  pub outcome: String,
  /// Pipeline stage that failed, if any.
  pub failed_stage: Option<String>,
  /// Error message, if any.
  pub error: Option<String>,
  /// Quoted fee in fee-token base units (decimal string).
  pub quoted_fee: Option<String>,
  /// `maxPayment` placed on the request (decimal string).
  pub max_payment: Option<String>,
  /// Gas used by the mined transaction.
  pub gas_used: Option<u64>,
  /// Native balance change (decimal string, signed).
  pub native_delta: Option<String>,
  /// Fee-token balance change (decimal string, signed).
  pub fee_token_delta: Option<String>,
  /// `gas_used * effective_gas_price` from the receipt, in wei.
  pub native_cost_wei: Option<String>,
  /// Fee-token spend beyond the transferred amount (decimal string).
  pub fee_token_spent: Option<String>,
}

impl RunRecord {
  /// Record with only the identifying fields set.
  pub fn new(run_id: impl Into<String>, timestamp_ms: u64, account: Address) -> Self {
    Self {
      run_id: run_id.into(),
      timestamp_ms,
      account,
      nonce: None,
      tx_hash: None,
      outcome: String::new(),
      failed_stage: None,
      error: None,
      quoted_fee: None,
      max_payment: None,
      gas_used: None,
      native_delta: None,
      fee_token_delta: None,
      native_cost_wei: None,
      fee_token_spent: None,
    }
  }

  pub fn is_pending(&self) -> bool {
    self.outcome == "pending"
  }
}

/// Trait for run journal storage.
#[async_trait]
pub trait RunJournal: Send + Sync + 'static {
  /// Append one record.
  async fn append(&self, record: &RunRecord) -> anyhow::Result<()>;

  /// Load all records, oldest first.
  async fn load_all(&self) -> anyhow::Result<Vec<RunRecord>>;

  /// Latest record of every `account` hash that is still `pending`.
  async fn unresolved_pending(&self, account: Address) -> anyhow::Result<Vec<RunRecord>> {
    let records = self.load_all().await?;
    let mut latest: Vec<RunRecord> = Vec::new();

    for record in records.into_iter().filter(|r| r.account == account) {
      let Some(hash) = record.tx_hash else { continue };
      match latest.iter_mut().find(|r| r.tx_hash == Some(hash)) {
        Some(entry) => *entry = record,
        None => latest.push(record),
      }
    }

    latest.retain(RunRecord::is_pending);
    Ok(latest)
  }
}
