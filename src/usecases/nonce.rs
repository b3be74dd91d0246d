//! Nonce Manager - Per-account Nonce Serialisation
//!
//! Concurrent runs for the same signer must not pick the same nonce.
//! A lease holds the account's lock from acquisition until the
//! transaction is broadcast (`consume`) or abandoned (`invalidate` or
//! drop). The next nonce is `max(chain pending, last consumed + 1)`, so
//! a transaction still propagating is never overwritten.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, instrument};

use crate::ports::chain_client::ChainClient;

/// Local view of one account's nonce sequence.
#[derive(Debug, Default)]
struct AccountNonce {
  last_consumed: Option<u64>,
}

/// Hands out nonce leases, one account at a time.
#[derive(Debug, Default)]
pub struct NonceManager {
  accounts: Mutex<HashMap<Address, Arc<Mutex<AccountNonce>>>>,
}

impl NonceManager {
  pub fn new() -> Self {
    Self::default()
  }

  /// Wait for the account lock, then derive the next nonce.
  ///
  /// # Errors
  /// Returns error if the pending nonce cannot be read; the lock is
  /// released in that case.
  #[instrument(skip(self, chain))]
  pub async fn acquire<C: ChainClient>(&self, chain: &C, account: Address) -> Result<NonceLease> {
    let slot = {
      let mut accounts = self.accounts.lock().await;
      Arc::clone(accounts.entry(account).or_default())
    };

    let guard = slot.lock_owned().await;

    let pending = chain
      .pending_nonce(account)
      .await
      .context("Failed to read pending nonce")?;

    let nonce = match guard.last_consumed {
      Some(last) => pending.max(last + 1),
      None => pending,
    };

    debug!(pending, last_consumed = ?guard.last_consumed, nonce, "Nonce leased");
    Ok(NonceLease {
      guard,
      account,
      nonce,
    })
  }
}

/// Exclusive right to send one transaction with `nonce()`.
///
/// Dropping the lease without consuming it releases the lock and
/// leaves the local sequence untouched.
#[derive(Debug)]
pub struct NonceLease {
  guard: OwnedMutexGuard<AccountNonce>,
  account: Address,
  nonce: u64,
}

impl NonceLease {
  pub fn nonce(&self) -> u64 {
    self.nonce
  }

  pub fn account(&self) -> Address {
    self.account
  }

  /// The transaction was (or may have been) broadcast.
  pub fn consume(mut self) {
    self.guard.last_consumed = Some(self.nonce);
  }

  /// The node refused the nonce; re-derive from the chain next time.
  pub fn invalidate(mut self) {
    self.guard.last_consumed = None;
  }
}
