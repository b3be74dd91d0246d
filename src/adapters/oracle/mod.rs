//! Oracle Adapters - DEX Pricing over JSON-RPC
//!
//! - `HttpJsonRpcTransport`: reqwest POST client
//! - `DexPriceOracle`: `dex_getAmountsIn` request/response with retry

pub mod dex;
pub mod transport;

pub use dex::{DexOracleSettings, DexPriceOracle};
pub use transport::HttpJsonRpcTransport;
