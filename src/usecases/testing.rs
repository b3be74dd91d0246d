//! In-memory `ChainClient` double for use case unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use alloy::primitives::{keccak256, Address, Bytes, TxHash, U256};
use async_trait::async_trait;

use crate::domain::transaction::Receipt;
use crate::ports::chain_client::{ChainClient, NodeRejection};

/// Scripted failure mode.
#[derive(Debug, Clone)]
pub enum Fault {
  /// Node answered with an error object.
  Reject(String),
  /// No answer.
  Down,
  /// The call never completes.
  Hang,
}

impl Fault {
  fn into_error(self) -> anyhow::Error {
    match self {
      Self::Reject(message) => NodeRejection { code: -32000, message }.into(),
      Self::Down | Self::Hang => anyhow::anyhow!("connection refused"),
    }
  }
}

/// Resolve a scripted answer, parking forever on `Fault::Hang`.
async fn answer<T>(scripted: Result<T, Fault>) -> anyhow::Result<T> {
  match scripted {
    Err(Fault::Hang) => std::future::pending().await,
    other => other.map_err(Fault::into_error),
  }
}

pub struct FakeChain {
  pub chain_id: u64,
  pub gas_price: u128,
  pub pending_nonce: Mutex<u64>,
  pub native: Mutex<U256>,
  pub token: Mutex<U256>,
  pub estimate: Mutex<Result<u64, Fault>>,
  pub send: Mutex<Result<(), Fault>>,
  /// Answers for successive receipt polls; `Ok(None)` once exhausted.
  pub receipts: Mutex<VecDeque<Result<Option<Receipt>, Fault>>>,
  /// Fail every token balance query after this many have succeeded.
  pub token_queries_before_failure: Mutex<Option<usize>>,
  pub sent: Mutex<Vec<Bytes>>,
  pub receipt_polls: Mutex<usize>,
  /// Answer for `transaction_known`.
  pub known: Mutex<Result<bool, Fault>>,
}

impl Default for FakeChain {
  fn default() -> Self {
    Self {
      chain_id: 7672,
      gas_price: 7_500_000_000_000,
      pending_nonce: Mutex::new(0),
      native: Mutex::new(U256::from(10u64).pow(U256::from(18))),
      token: Mutex::new(U256::from(1_000_000_000u64)),
      estimate: Mutex::new(Ok(48_000)),
      send: Mutex::new(Ok(())),
      receipts: Mutex::new(VecDeque::new()),
      token_queries_before_failure: Mutex::new(None),
      sent: Mutex::new(Vec::new()),
      receipt_polls: Mutex::new(0),
      known: Mutex::new(Ok(true)),
    }
  }
}

impl FakeChain {
  pub fn sent_count(&self) -> usize {
    self.sent.lock().unwrap().len()
  }
}

#[async_trait]
impl ChainClient for FakeChain {
  async fn chain_id(&self) -> anyhow::Result<u64> {
    Ok(self.chain_id)
  }

  async fn gas_price(&self) -> anyhow::Result<u128> {
    Ok(self.gas_price)
  }

  async fn native_balance(&self, _account: Address) -> anyhow::Result<U256> {
    Ok(*self.native.lock().unwrap())
  }

  async fn token_balance(&self, _token: Address, _account: Address) -> anyhow::Result<U256> {
    let mut budget = self.token_queries_before_failure.lock().unwrap();
    if let Some(remaining) = budget.as_mut() {
      if *remaining == 0 {
        return Err(Fault::Down.into_error());
      }
      *remaining -= 1;
    }
    Ok(*self.token.lock().unwrap())
  }

  async fn pending_nonce(&self, _account: Address) -> anyhow::Result<u64> {
    Ok(*self.pending_nonce.lock().unwrap())
  }

  async fn estimate_gas(
    &self,
    _from: Address,
    _to: Address,
    _payload: Bytes,
    _value: U256,
  ) -> anyhow::Result<u64> {
    let scripted = self.estimate.lock().unwrap().clone();
    answer(scripted).await
  }

  async fn send_raw_transaction(&self, raw: Bytes) -> anyhow::Result<TxHash> {
    let scripted = self.send.lock().unwrap().clone();
    answer(scripted).await?;
    let hash = keccak256(&raw);
    self.sent.lock().unwrap().push(raw);
    Ok(hash)
  }

  async fn transaction_receipt(&self, _tx_hash: TxHash) -> anyhow::Result<Option<Receipt>> {
    *self.receipt_polls.lock().unwrap() += 1;
    self
      .receipts
      .lock()
      .unwrap()
      .pop_front()
      .unwrap_or(Ok(None))
      .map_err(Fault::into_error)
  }

  async fn transaction_known(&self, _tx_hash: TxHash) -> anyhow::Result<bool> {
    let scripted = self.known.lock().unwrap().clone();
    answer(scripted).await
  }
}

/// Mined receipt for `tx_hash`.
pub fn receipt(tx_hash: TxHash, success: bool) -> Receipt {
  Receipt {
    tx_hash,
    block_number: Some(1_000),
    gas_used: 48_000,
    effective_gas_price: 7_500_000_000_000,
    success,
  }
}
