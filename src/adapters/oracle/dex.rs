//! DEX Price Oracle - `dex_getAmountsIn` JSON-RPC Client
//!
//! Implements the `PriceOracle` port against the DEX pallet RPC:
//!
//! ```text
//! → {"id":1,"jsonrpc":"2.0","method":"dex_getAmountsIn","params":[348615,[3172,2]]}
//! ← {"jsonrpc":"2.0","result":{"Ok":[1,1000000000000]},"id":1}
//! ```
//!
//! `result.Ok[0]` is the fee-token amount in. Transport failures and
//! malformed envelopes are retried with exponential backoff up to
//! `max_retries` extra attempts; the quote is a pure read so retrying
//! cannot double-spend anything.

use std::time::Duration;

use alloy::primitives::U256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::config::OracleConfig;
use crate::domain::errors::OracleError;
use crate::domain::pricing::{AssetId, PricedCost, PricingPath};
use crate::ports::price_oracle::{JsonRpcTransport, PriceOracle};

/// JSON-RPC request envelope.
#[derive(Debug, Serialize)]
struct AmountsInRequest<'a> {
    id: u64,
    jsonrpc: &'static str,
    method: &'a str,
    params: (u128, [AssetId; 2]),
}

/// JSON-RPC response envelope.
#[derive(Debug, Deserialize)]
struct AmountsInResponse {
    #[allow(dead_code)]
    jsonrpc: Option<String>,
    result: Option<AmountsInResult>,
    error: Option<RpcErrorObject>,
    #[allow(dead_code)]
    id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct AmountsInResult {
    #[serde(rename = "Ok")]
    ok: Option<Vec<u128>>,
    #[serde(rename = "Err")]
    err: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Retry settings for the oracle client.
#[derive(Debug, Clone)]
pub struct DexOracleSettings {
    /// JSON-RPC method name.
    pub method: String,
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    /// Base delay between retries (exponential backoff).
    pub retry_base_delay: Duration,
}

impl From<&OracleConfig> for DexOracleSettings {
    fn from(config: &OracleConfig) -> Self {
        Self {
            method: config.method.clone(),
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }
}

impl Default for DexOracleSettings {
    fn default() -> Self {
        Self {
            method: "dex_getAmountsIn".to_string(),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(200),
        }
    }
}

/// `PriceOracle` backed by the DEX pallet RPC.
pub struct DexPriceOracle<T: JsonRpcTransport> {
    transport: T,
    settings: DexOracleSettings,
}

impl<T: JsonRpcTransport> DexPriceOracle<T> {
    pub fn new(transport: T, settings: DexOracleSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// One request/response exchange.
    async fn quote_once(&self, native_units: u128, path: PricingPath) -> Result<U256, OracleError> {
        let body = serde_json::to_string(&AmountsInRequest {
            id: 1,
            jsonrpc: "2.0",
            method: &self.settings.method,
            params: (native_units, path.as_array()),
        })
        .map_err(|e| OracleError::Malformed(format!("request serialization: {e}")))?;

        let text = self
            .transport
            .post_json(body)
            .await
            .map_err(|e| OracleError::Transport(format!("{e:#}")))?;

        parse_amounts_in(&text)
    }
}

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt - 1)`,
/// saturating instead of overflowing.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.checked_pow(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}

/// Extract `result.Ok[0]` from a response body.
fn parse_amounts_in(text: &str) -> Result<U256, OracleError> {
    let response: AmountsInResponse =
        serde_json::from_str(text).map_err(|e| OracleError::Malformed(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(OracleError::Rpc {
            code: error.code,
            message: error.message,
        });
    }

    let result = response.result.ok_or(OracleError::MissingAmount)?;
    if let Some(err) = result.err {
        return Err(OracleError::Rpc {
            code: 0,
            message: err.to_string(),
        });
    }

    result
        .ok
        .and_then(|amounts| amounts.first().copied())
        .map(U256::from)
        .ok_or(OracleError::MissingAmount)
}

#[async_trait]
impl<T: JsonRpcTransport> PriceOracle for DexPriceOracle<T> {
    #[instrument(skip(self), fields(method = %self.settings.method))]
    async fn price_in_fee_token(
        &self,
        native_units: u128,
        path: &[AssetId],
    ) -> Result<PricedCost, OracleError> {
        let path = PricingPath::try_from(path)?;

        if native_units == 0 {
            return Ok(PricedCost::zero());
        }

        let mut last_error = None;

        for attempt in 0..=self.settings.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(self.settings.retry_base_delay, attempt);
                debug!(attempt, delay_ms = delay.as_millis(), "Retrying oracle quote");
                sleep(delay).await;
            }

            match self.quote_once(native_units, path).await {
                Ok(fee_token_units) => {
                    debug!(native_units, %fee_token_units, attempt, "Oracle quote received");
                    return Ok(PricedCost {
                        native_units,
                        fee_token_units,
                    });
                }
                Err(e) if e.is_retryable() => {
                    warn!(error = %e, attempt, "Oracle quote failed");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(OracleError::Exhausted {
            attempts: self.settings.max_retries + 1,
            last: Box::new(last_error.unwrap_or(OracleError::MissingAmount)),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replays canned responses and records request bodies.
    struct ScriptedTransport {
        responses: Mutex<VecDeque<anyhow::Result<String>>>,
        requests: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<anyhow::Result<String>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JsonRpcTransport for ScriptedTransport {
        async fn post_json(&self, body: String) -> anyhow::Result<String> {
            self.requests.lock().unwrap().push(body);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow::anyhow!("no scripted response")))
        }
    }

    fn settings(max_retries: u32) -> DexOracleSettings {
        DexOracleSettings {
            max_retries,
            retry_base_delay: Duration::from_millis(1),
            ..DexOracleSettings::default()
        }
    }

    #[test]
    fn test_parse_ok_envelope() {
        let amount = parse_amounts_in(r#"{"jsonrpc":"2.0","result":{"Ok":[1,1000000000000]},"id":1}"#);
        assert_eq!(amount, Ok(U256::from(1)));
    }

    #[test]
    fn test_parse_large_amount_exactly() {
        let amount =
            parse_amounts_in(r#"{"jsonrpc":"2.0","result":{"Ok":[123456789012345678901234,5000]},"id":1}"#);
        assert_eq!(amount, Ok(U256::from(123_456_789_012_345_678_901_234u128)));
    }

    #[test]
    fn test_parse_missing_amount() {
        assert_eq!(
            parse_amounts_in(r#"{"jsonrpc":"2.0","result":{"Ok":[]},"id":1}"#),
            Err(OracleError::MissingAmount)
        );
        assert_eq!(
            parse_amounts_in(r#"{"jsonrpc":"2.0","id":1}"#),
            Err(OracleError::MissingAmount)
        );
    }

    #[test]
    fn test_parse_rpc_error_and_garbage() {
        assert!(matches!(
            parse_amounts_in(r#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"Method not found"},"id":1}"#),
            Err(OracleError::Rpc { code: -32601, .. })
        ));
        assert!(matches!(
            parse_amounts_in(r#"{"jsonrpc":"2.0","result":{"Err":"InsufficientLiquidity"},"id":1}"#),
            Err(OracleError::Rpc { .. })
        ));
        assert!(matches!(parse_amounts_in("<html>"), Err(OracleError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_request_body_shape() {
        let transport = ScriptedTransport::new(vec![Ok(
            r#"{"jsonrpc":"2.0","result":{"Ok":[777,5000]},"id":1}"#.to_string(),
        )]);
        let oracle = DexPriceOracle::new(transport, settings(0));

        let cost = oracle.price_in_fee_token(5000, &[3172, 2]).await.unwrap();
        assert_eq!(cost.fee_token_units, U256::from(777));
        assert_eq!(cost.native_units, 5000);

        let body: serde_json::Value =
            serde_json::from_str(&oracle.transport.requests()[0]).unwrap();
        assert_eq!(body["method"], "dex_getAmountsIn");
        assert_eq!(body["jsonrpc"], "2.0");
        assert_eq!(body["params"], serde_json::json!([5000, [3172, 2]]));
    }

    #[tokio::test]
    async fn test_invalid_path_makes_no_request() {
        let transport = ScriptedTransport::new(vec![]);
        let oracle = DexPriceOracle::new(transport, settings(3));

        let err = oracle.price_in_fee_token(5000, &[3172]).await.unwrap_err();
        assert_eq!(err, OracleError::InvalidPath { len: 1 });
        assert!(oracle.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_zero_input_is_zero_cost() {
        let transport = ScriptedTransport::new(vec![]);
        let oracle = DexPriceOracle::new(transport, settings(0));

        let cost = oracle.price_in_fee_token(0, &[3172, 2]).await.unwrap();
        assert_eq!(cost, PricedCost::zero());
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let transport = ScriptedTransport::new(vec![
            Err(anyhow::anyhow!("connection reset")),
            Ok("not json".to_string()),
            Ok(r#"{"jsonrpc":"2.0","result":{"Ok":[42,5000]},"id":1}"#.to_string()),
        ]);
        let oracle = DexPriceOracle::new(transport, settings(3));

        let cost = oracle.price_in_fee_token(5000, &[3172, 2]).await.unwrap();
        assert_eq!(cost.fee_token_units, U256::from(42));
        assert_eq!(oracle.transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_after_bounded_attempts() {
        let transport = ScriptedTransport::new(vec![]);
        let oracle = DexPriceOracle::new(transport, settings(2));

        let err = oracle.price_in_fee_token(5000, &[3172, 2]).await.unwrap_err();
        assert!(matches!(err, OracleError::Exhausted { attempts: 3, .. }));
        assert_eq!(oracle.transport.requests().len(), 3);
    }

    #[test]
    fn test_backoff_saturates_instead_of_overflowing() {
        let base = Duration::from_millis(200);
        assert_eq!(backoff_delay(base, 1), base);
        assert_eq!(backoff_delay(base, 3), base * 4);
        assert_eq!(backoff_delay(base, 40), base * u32::MAX);
        assert_eq!(backoff_delay(Duration::ZERO, 40), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_many_retries_with_zero_delay_do_not_panic() {
        let transport = ScriptedTransport::new(vec![]);
        let oracle = DexPriceOracle::new(
            transport,
            DexOracleSettings {
                max_retries: 40,
                retry_base_delay: Duration::ZERO,
                ..DexOracleSettings::default()
            },
        );

        let err = oracle.price_in_fee_token(5000, &[3172, 2]).await.unwrap_err();
        assert!(matches!(err, OracleError::Exhausted { attempts: 41, .. }));
        assert_eq!(oracle.transport.requests().len(), 41);
    }
}
