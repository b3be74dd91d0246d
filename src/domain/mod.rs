//! Domain layer - Fee-proxy transfer model and pure logic.
//!
//! Calldata encoding, fee/gas math, transaction and balance types, and
//! the error taxonomy. No I/O happens here (hexagonal architecture
//! inner ring); everything is testable in isolation.

pub mod balance;
pub mod call;
pub mod contracts;
pub mod errors;
pub mod pricing;
pub mod transaction;

// Re-export core types for convenience
pub use balance::{BalanceDelta, BalanceSnapshot};
pub use call::CallDescriptor;
pub use errors::{
    BuildError, ConfirmationError, EncodingError, EstimationError, OracleError, QueryError,
    Stage, SubmissionOutcome, SubmitError, WorkflowError,
};
pub use pricing::{AssetId, FeePolicy, GasLimitPolicy, PricedCost, PricingPath};
pub use transaction::{FeeProxyRequest, Receipt, SignedEnvelope, SignedTransaction};
