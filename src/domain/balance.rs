//! Balance snapshots and deltas.

use alloy::primitives::{I256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Native and fee-token balances of one account at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub native: U256,
    pub fee_token: U256,
    pub taken_at: DateTime<Utc>,
}

impl BalanceSnapshot {
    /// Equal balances, ignoring when they were read.
    pub fn same_balances(&self, other: &Self) -> bool {
        self.native == other.native && self.fee_token == other.fee_token
    }
}

/// Signed change between two snapshots. Derived, never stored alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDelta {
    pub native: I256,
    pub fee_token: I256,
}

impl BalanceDelta {
    /// Fee-token spend beyond `transferred`: `-fee_token - transferred`.
    /// For a fee-token transfer this is the fee actually charged.
    pub fn fee_token_spent(&self, transferred: U256) -> I256 {
        self.fee_token
            .wrapping_neg()
            .wrapping_sub(I256::from_raw(transferred))
    }
}

/// `after - before`, per balance. Pure arithmetic.
pub fn delta(before: &BalanceSnapshot, after: &BalanceSnapshot) -> BalanceDelta {
    BalanceDelta {
        native: signed_diff(after.native, before.native),
        fee_token: signed_diff(after.fee_token, before.fee_token),
    }
}

// Two's complement wrap gives the exact signed result for |diff| < 2^255.
fn signed_diff(after: U256, before: U256) -> I256 {
    I256::from_raw(after.wrapping_sub(before))
}
