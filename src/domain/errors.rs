//! Error taxonomy for the fee-proxy transfer workflow.
//!
//! Each pipeline component owns one error type. `WorkflowError` wraps
//! them with the failing stage and classifies every failure into a
//! `SubmissionOutcome`, which is what callers must consult before
//! deciding whether a transfer may be attempted again.

use std::fmt;

use alloy::primitives::{TxHash, U256};
use serde::{Deserialize, Serialize};

use super::transaction::Receipt;

/// Call descriptor could not be turned into calldata. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("invalid method signature `{signature}`: {reason}")]
    InvalidSignature { signature: String, reason: String },

    #[error("`{method}` expects {expected} arguments, got {actual}")]
    ArgumentCount {
        method: String,
        expected: usize,
        actual: usize,
    },

    #[error("argument {index} of `{method}` does not match declared type `{expected}`")]
    ArgumentMismatch {
        method: String,
        index: usize,
        expected: String,
    },

    #[error("unsupported parameter type in `{method}`: {reason}")]
    UnsupportedType { method: String, reason: String },
}

/// Node-side simulation failed. Fatal for the attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EstimationError {
    #[error("call would revert: {reason}")]
    Reverted { reason: String },

    #[error("node unreachable during estimation: {reason}")]
    Unreachable { reason: String },

    #[error("node returned a zero gas estimate")]
    ZeroEstimate,
}

/// Pricing round trip failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// Programming error: the DEX path must be `[fee_token, native]`.
    #[error("pricing path must contain exactly 2 asset ids, got {len}")]
    InvalidPath { len: usize },

    #[error("oracle transport failed: {0}")]
    Transport(String),

    #[error("malformed oracle response: {0}")]
    Malformed(String),

    #[error("oracle response has no `result.Ok[0]` amount")]
    MissingAmount,

    #[error("oracle returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("oracle failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<OracleError>,
    },
}

impl OracleError {
    /// Whether another attempt may succeed. Pricing is a side-effect free
    /// read, so every runtime failure qualifies; caller bugs do not.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidPath { .. } | Self::Exhausted { .. })
    }
}

/// Request shape or signer problem detected before broadcast.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("invalid fee proxy request: {0}")]
    InvalidRequest(String),

    #[error("max payment {max_payment} is below the quoted fee {fee}")]
    InsufficientMaxPayment { max_payment: U256, fee: U256 },

    #[error("max payment {0} does not fit uint128")]
    MaxPaymentOverflow(U256),

    #[error("signer unavailable: {0}")]
    Signer(String),

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// Broadcast failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// The node answered and refused the transaction (nonce conflict,
    /// underpriced, insufficient balance). Nothing was accepted.
    #[error("node rejected transaction: {reason}")]
    Rejected { reason: String },

    /// No answer from the node; the transaction may have reached the pool.
    #[error("broadcast of {tx_hash} interrupted: {reason}")]
    Transport { tx_hash: TxHash, reason: String },
}

/// Receipt could not be obtained. The transaction may still be mined.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfirmationError {
    #[error("no receipt for {tx_hash} before the deadline")]
    Timeout { tx_hash: TxHash },

    #[error("receipt query for {tx_hash} failed: {reason}")]
    NodeError { tx_hash: TxHash, reason: String },
}

impl ConfirmationError {
    pub fn tx_hash(&self) -> TxHash {
        match self {
            Self::Timeout { tx_hash } | Self::NodeError { tx_hash, .. } => *tx_hash,
        }
    }
}

/// Balance read failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("native balance query failed: {0}")]
    Native(String),

    #[error("fee token balance query failed: {0}")]
    FeeToken(String),

    #[error("balance query did not finish before the deadline")]
    Deadline,
}

/// Pipeline step, used to label failures and deadline expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ChainParameters,
    Snapshot,
    Encoding,
    Estimation,
    Pricing,
    NonceAcquisition,
    Build,
    Submission,
    Confirmation,
    Reconciliation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ChainParameters => "chain parameters",
            Self::Snapshot => "balance snapshot",
            Self::Encoding => "encoding",
            Self::Estimation => "gas estimation",
            Self::Pricing => "pricing",
            Self::NonceAcquisition => "nonce acquisition",
            Self::Build => "build",
            Self::Submission => "submission",
            Self::Confirmation => "confirmation",
            Self::Reconciliation => "reconciliation",
        };
        f.write_str(name)
    }
}

/// What is known about the transaction when a run ends.
///
/// `Pending` is never a failure: the hash must be re-queried before
/// anything else is sent for the same transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    NotSubmitted,
    Pending { tx_hash: TxHash },
    Failed { tx_hash: TxHash },
    Confirmed { tx_hash: TxHash },
}

impl SubmissionOutcome {
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            Self::NotSubmitted => None,
            Self::Pending { tx_hash } | Self::Failed { tx_hash } | Self::Confirmed { tx_hash } => {
                Some(*tx_hash)
            }
        }
    }

    /// Short label used in logs, metrics and the run journal.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotSubmitted => "not_submitted",
            Self::Pending { .. } => "pending",
            Self::Failed { .. } => "failed",
            Self::Confirmed { .. } => "confirmed",
        }
    }
}

/// Failure of a whole workflow run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("{stage} query failed: {reason}")]
    ChainQuery { stage: Stage, reason: String },

    #[error("pre-submission balance snapshot failed: {0}")]
    Snapshot(#[source] QueryError),

    #[error("encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    #[error("gas estimation failed: {0}")]
    Estimation(#[from] EstimationError),

    #[error("pricing failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("build failed: {0}")]
    Build(#[from] BuildError),

    #[error("submission failed: {0}")]
    Submit(#[from] SubmitError),

    #[error("confirmation failed: {0}")]
    Confirmation(#[from] ConfirmationError),

    #[error("transaction {} reverted on-chain (gas used {})", .receipt.tx_hash, .receipt.gas_used)]
    Reverted { receipt: Receipt },

    #[error("could not journal the transaction before broadcast: {reason}")]
    Journal { reason: String },

    #[error("deadline exceeded during {stage}")]
    DeadlineExceeded {
        stage: Stage,
        broadcast: Option<TxHash>,
    },
}

impl WorkflowError {
    /// Stage that produced the error.
    pub fn stage(&self) -> Stage {
        match self {
            Self::ChainQuery { stage, .. } | Self::DeadlineExceeded { stage, .. } => *stage,
            Self::Snapshot(_) => Stage::Snapshot,
            Self::Encoding(_) => Stage::Encoding,
            Self::Estimation(_) => Stage::Estimation,
            Self::Oracle(_) => Stage::Pricing,
            Self::Build(_) => Stage::Build,
            Self::Submit(_) | Self::Journal { .. } => Stage::Submission,
            Self::Confirmation(_) | Self::Reverted { .. } => Stage::Confirmation,
        }
    }

    /// Classify the failure as never-submitted, outcome-unknown, or
    /// failed on-chain.
    pub fn outcome(&self) -> SubmissionOutcome {
        match self {
            Self::Submit(SubmitError::Transport { tx_hash, .. }) => {
                SubmissionOutcome::Pending { tx_hash: *tx_hash }
            }
            Self::Confirmation(err) => SubmissionOutcome::Pending {
                tx_hash: err.tx_hash(),
            },
            Self::DeadlineExceeded {
                broadcast: Some(tx_hash),
                ..
            } => SubmissionOutcome::Pending { tx_hash: *tx_hash },
            Self::Reverted { receipt } => SubmissionOutcome::Failed {
                tx_hash: receipt.tx_hash,
            },
            _ => SubmissionOutcome::NotSubmitted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash() -> TxHash {
        TxHash::repeat_byte(0xab)
    }

    #[test]
    fn test_pre_broadcast_errors_are_not_submitted() {
        let errors = [
            WorkflowError::Encoding(EncodingError::ArgumentCount {
                method: "transfer".into(),
                expected: 2,
                actual: 1,
            }),
            WorkflowError::Estimation(EstimationError::ZeroEstimate),
            WorkflowError::Oracle(OracleError::MissingAmount),
            WorkflowError::Build(BuildError::Signer("locked".into())),
            WorkflowError::Submit(SubmitError::Rejected {
                reason: "nonce too low".into(),
            }),
            WorkflowError::DeadlineExceeded {
                stage: Stage::Pricing,
                broadcast: None,
            },
            WorkflowError::Journal {
                reason: "disk full".into(),
            },
        ];

        for err in errors {
            assert_eq!(err.outcome(), SubmissionOutcome::NotSubmitted, "{err}");
        }
    }

    #[test]
    fn test_timeout_is_pending_not_failure() {
        let err = WorkflowError::Confirmation(ConfirmationError::Timeout { tx_hash: hash() });
        assert_eq!(err.outcome(), SubmissionOutcome::Pending { tx_hash: hash() });
        assert_eq!(err.stage(), Stage::Confirmation);
    }

    #[test]
    fn test_interrupted_broadcast_is_pending() {
        let err = WorkflowError::Submit(SubmitError::Transport {
            tx_hash: hash(),
            reason: "connection reset".into(),
        });
        assert_eq!(err.outcome().label(), "pending");

        let err = WorkflowError::DeadlineExceeded {
            stage: Stage::Submission,
            broadcast: Some(hash()),
        };
        assert_eq!(err.outcome(), SubmissionOutcome::Pending { tx_hash: hash() });
    }

    #[test]
    fn test_revert_is_failed() {
        let receipt = Receipt {
            tx_hash: hash(),
            block_number: Some(10),
            gas_used: 40_000,
            effective_gas_price: 1,
            success: false,
        };
        let err = WorkflowError::Reverted { receipt };
        assert_eq!(err.outcome(), SubmissionOutcome::Failed { tx_hash: hash() });
    }

    #[test]
    fn test_oracle_retry_classification() {
        assert!(OracleError::Transport("reset".into()).is_retryable());
        assert!(OracleError::MissingAmount.is_retryable());
        assert!(!OracleError::InvalidPath { len: 3 }.is_retryable());
    }
}
