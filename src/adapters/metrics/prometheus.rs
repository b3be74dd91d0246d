//! Prometheus Metrics Registry - Workflow Observability
//!
//! Registers the per-run metrics and renders them in the text
//! exposition format. A one-shot run has no scrape window, so the
//! snapshot is written to a node-exporter textfile instead of served.

use std::path::Path;

use alloy::primitives::U256;
use anyhow::Context;
use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder,
};
use tracing::{debug, instrument};

/// Prometheus metrics for fee-proxy transfers.
///
/// All metrics follow the naming convention `fee_proxy_*`.
pub struct WorkflowMetrics {
    registry: Registry,
    /// Runs by final outcome label.
    pub runs_total: IntCounterVec,
    /// Failures by pipeline stage.
    pub failures_total: IntCounterVec,
    /// Gas used by mined transactions.
    pub gas_used: Histogram,
    /// Last quoted fee in fee-token base units.
    pub quoted_fee: Gauge,
    /// Last `maxPayment` placed on a request.
    pub max_payment: Gauge,
    /// Wall-clock duration of a run.
    pub run_duration_seconds: Histogram,
}

impl WorkflowMetrics {
    /// Create and register all metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let runs_total = IntCounterVec::new(
            Opts::new("fee_proxy_runs_total", "Transfer runs by outcome"),
            &["outcome"],
        )?;

        let failures_total = IntCounterVec::new(
            Opts::new("fee_proxy_failures_total", "Failed runs by pipeline stage"),
            &["stage"],
        )?;

        let gas_used = Histogram::with_opts(
            HistogramOpts::new("fee_proxy_gas_used", "Gas used by mined transfers").buckets(vec![
                21_000.0, 50_000.0, 100_000.0, 150_000.0, 250_000.0, 500_000.0, 1_000_000.0,
            ]),
        )?;

        let quoted_fee = Gauge::new(
            "fee_proxy_quoted_fee",
            "Last oracle fee quote in fee-token base units",
        )?;

        let max_payment = Gauge::new(
            "fee_proxy_max_payment",
            "Last maxPayment placed on a request",
        )?;

        let run_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("fee_proxy_run_duration_seconds", "Run wall-clock duration")
                .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        )?;

        registry.register(Box::new(runs_total.clone()))?;
        registry.register(Box::new(failures_total.clone()))?;
        registry.register(Box::new(gas_used.clone()))?;
        registry.register(Box::new(quoted_fee.clone()))?;
        registry.register(Box::new(max_payment.clone()))?;
        registry.register(Box::new(run_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            runs_total,
            failures_total,
            gas_used,
            quoted_fee,
            max_payment,
            run_duration_seconds,
        })
    }

    /// Count a finished run.
    pub fn observe_outcome(&self, outcome: &str, failed_stage: Option<&str>) {
        self.runs_total.with_label_values(&[outcome]).inc();
        if let Some(stage) = failed_stage {
            self.failures_total.with_label_values(&[stage]).inc();
        }
    }

    /// Record the pricing figures of a run.
    pub fn observe_pricing(&self, quoted_fee: U256, max_payment: U256) {
        self.quoted_fee.set(lossy_f64(quoted_fee));
        self.max_payment.set(lossy_f64(max_payment));
    }

    /// Render all metrics in the text exposition format.
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .context("Failed to encode metrics")?;
        String::from_utf8(buffer).context("Metrics output is not UTF-8")
    }

    /// Write the rendered metrics to `path`, replacing it atomically.
    #[instrument(skip(self))]
    pub async fn write_textfile(&self, path: &str) -> anyhow::Result<()> {
        let body = self.render()?;
        let target = Path::new(path);
        let tmp = target.with_extension("prom.tmp");

        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create metrics directory")?;
        }

        tokio::fs::write(&tmp, body)
            .await
            .context("Failed to write metrics textfile")?;
        tokio::fs::rename(&tmp, target)
            .await
            .context("Failed to move metrics textfile into place")?;

        debug!(path, "Metrics textfile written");
        Ok(())
    }
}

/// Gauges are `f64`; amounts above `u128::MAX` saturate.
fn lossy_f64(value: U256) -> f64 {
    u128::try_from(value).map_or(f64::MAX, |v| v as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_observations() {
        let metrics = WorkflowMetrics::new().unwrap();
        metrics.observe_outcome("confirmed", None);
        metrics.observe_outcome("not_submitted", Some("estimation"));
        metrics.observe_pricing(U256::from(1_000), U256::from(1_500));
        metrics.gas_used.observe(48_000.0);

        let text = metrics.render().unwrap();
        assert!(text.contains("fee_proxy_runs_total{outcome=\"confirmed\"} 1"));
        assert!(text.contains("fee_proxy_failures_total{stage=\"estimation\"} 1"));
        assert!(text.contains("fee_proxy_max_payment 1500"));
        assert!(text.contains("fee_proxy_gas_used_count 1"));
    }

    #[tokio::test]
    async fn test_write_textfile() {
        let dir = std::env::temp_dir().join(format!("fee-proxy-metrics-{}", uuid::Uuid::new_v4()));
        let path = dir.join("fee_proxy.prom");
        let path = path.to_string_lossy();

        let metrics = WorkflowMetrics::new().unwrap();
        metrics.observe_outcome("pending", Some("confirmation"));
        metrics.write_textfile(&path).await.unwrap();

        let written = tokio::fs::read_to_string(&*path).await.unwrap();
        assert!(written.contains("fee_proxy_runs_total{outcome=\"pending\"} 1"));
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
