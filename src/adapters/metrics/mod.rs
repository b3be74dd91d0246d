//! Metrics Adapters
//!
//! Prometheus registry for run outcomes, gas and pricing, exported as
//! a textfile snapshot at the end of each run.

pub mod prometheus;

pub use prometheus::WorkflowMetrics;
