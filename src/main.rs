//! Fee-proxy Transfer — Entry Point
//!
//! Runs one fee-delegated ERC-20 transfer and exits.
//!
//! Wiring sequence:
//! 1. Load config.toml (or the path given as first argument) + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Connect to the EVM node, load the signer key from env
//! 4. Create the DEX oracle client, run journal and metrics registry
//! 5. Re-query hashes left pending by earlier runs; refuse to send
//!    again while any is still in the pool or cannot be queried
//! 6. Run the transfer workflow (hash journaled before broadcast),
//!    stopping early on Ctrl-C
//! 7. Append the run record, write the metrics textfile
//! 8. Exit: 0 confirmed, 1 not submitted, 2 pending, 3 reverted

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use uuid::Uuid;

use fee_proxy_transfer::adapters::chain::{LocalKeySigner, RpcChainClient};
use fee_proxy_transfer::adapters::metrics::WorkflowMetrics;
use fee_proxy_transfer::adapters::oracle::{DexOracleSettings, DexPriceOracle, HttpJsonRpcTransport};
use fee_proxy_transfer::adapters::persistence::JsonlRunJournal;
use fee_proxy_transfer::config;
use fee_proxy_transfer::domain::{CallDescriptor, SubmissionOutcome};
use fee_proxy_transfer::ports::journal::{RunJournal, RunRecord};
use fee_proxy_transfer::ports::signer::TransactionSigner;
use fee_proxy_transfer::usecases::{
    FeeProxyTransfer, NonceManager, PendingResolution, RunProgress, WorkflowSettings,
};

const EXIT_NOT_SUBMITTED: u8 = 1;
const EXIT_PENDING: u8 = 2;
const EXIT_REVERTED: u8 = 3;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // ── 1. Load configuration ───────────────────────────────
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = config::loader::load_config(&config_path)
        .with_context(|| format!("Failed to load configuration from {config_path}"))?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .json()
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        fee_proxy = %config.assets.fee_proxy,
        fee_token = %config.assets.fee_token,
        recipient = %config.transfer.recipient,
        amount = %config.transfer.amount,
        "Starting fee-proxy transfer"
    );

    // ── 3. Node connection + signer ─────────────────────────
    let chain = Arc::new(
        RpcChainClient::connect(&config.chain)
            .await
            .context("Failed to connect to chain RPC")?,
    );
    let signer = Arc::new(
        LocalKeySigner::from_env(&config.signer.key_env).context("Failed to load signer key")?,
    );
    let account = signer.address();

    // ── 4. Oracle, journal, metrics ─────────────────────────
    let oracle_url = config
        .oracle
        .url
        .clone()
        .unwrap_or_else(|| config.chain.rpc_url.clone());
    let transport = HttpJsonRpcTransport::new(oracle_url).context("Failed to create oracle transport")?;
    let oracle = Arc::new(DexPriceOracle::new(
        transport,
        DexOracleSettings::from(&config.oracle),
    ));

    let journal = Arc::new(
        JsonlRunJournal::new(&config.persistence.data_dir)
            .await
            .context("Failed to open run journal")?,
    );
    let metrics = WorkflowMetrics::new().context("Failed to create metrics registry")?;

    let workflow = FeeProxyTransfer::new(
        chain,
        oracle,
        signer,
        Arc::new(NonceManager::new()),
        WorkflowSettings::from_config(&config)?,
    )
    .with_journal(journal.clone());

    // ── 5. Resolve earlier pending runs ─────────────────────
    let pending = journal
        .unresolved_pending(account)
        .await
        .context("Failed to read run journal")?;

    for earlier in pending {
        let Some(tx_hash) = earlier.tx_hash else { continue };
        let mut record = RunRecord::new(earlier.run_id.clone(), now_ms(), account);
        record.tx_hash = Some(tx_hash);
        record.nonce = earlier.nonce;

        match workflow.resolve_pending(tx_hash).await {
            Ok(PendingResolution::Mined(receipt)) => {
                info!(%tx_hash, success = receipt.success, "Earlier pending transfer resolved");
                record.outcome = "resolved".to_string();
                record.gas_used = Some(receipt.gas_used);
                record.native_cost_wei = Some(receipt.native_cost().to_string());
                if !receipt.success {
                    record.error = Some("reverted".to_string());
                }
                journal.append(&record).await?;
            }
            Ok(PendingResolution::Dropped) => {
                warn!(%tx_hash, nonce = ?earlier.nonce, "Earlier transfer unknown to the node; treating as dropped");
                record.outcome = "dropped".to_string();
                journal.append(&record).await?;
            }
            Ok(PendingResolution::InPool) => {
                error!(%tx_hash, "Earlier transfer still pending; not sending another");
                return Ok(ExitCode::from(EXIT_PENDING));
            }
            Err(e) => {
                error!(%tx_hash, error = %e, "Cannot re-query earlier pending transfer");
                return Ok(ExitCode::from(EXIT_PENDING));
            }
        }
    }

    // ── 6. Run the transfer ─────────────────────────────────
    let call = CallDescriptor::erc20_transfer(
        config.assets.fee_token,
        config.transfer.recipient,
        config.transfer.amount()?,
    );

    let started = Instant::now();
    let mut progress = RunProgress::new(Uuid::new_v4());
    let result = tokio::select! {
        result = workflow.execute(&call, &mut progress) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    metrics.run_duration_seconds.observe(started.elapsed().as_secs_f64());

    let Some(result) = result else {
        let record = progress.to_interrupted_record(account);
        warn!(
            run_id = %progress.run_id,
            broadcast = progress.tx_hash.is_some(),
            tx_hash = ?progress.tx_hash,
            "Interrupted; re-query the hash before retrying"
        );
        if let Err(e) = journal.append(&record).await {
            warn!(error = %e, "Failed to append run record");
        }
        metrics.observe_outcome(&record.outcome, None);
        write_metrics(&metrics, config.metrics.textfile_path.as_deref()).await;
        return Ok(match progress.tx_hash {
            Some(_) => ExitCode::from(EXIT_PENDING),
            None => ExitCode::from(EXIT_NOT_SUBMITTED),
        });
    };

    // ── 7. Journal + metrics ────────────────────────────────
    let record = progress.to_record(account, &result);
    if let Err(e) = journal.append(&record).await {
        // The hash is also in the logs; keep the exit status truthful
        warn!(error = %e, tx_hash = ?record.tx_hash, "Failed to append run record");
    }

    metrics.observe_outcome(&record.outcome, record.failed_stage.as_deref());
    if let (Some(priced), Some(max_payment)) = (progress.priced, progress.max_payment) {
        metrics.observe_pricing(priced.fee_token_units, max_payment);
    }
    if let Some(gas_used) = record.gas_used {
        metrics.gas_used.observe(gas_used as f64);
    }
    write_metrics(&metrics, config.metrics.textfile_path.as_deref()).await;

    // ── 8. Exit status ──────────────────────────────────────
    let outcome = match &result {
        Ok(report) => report.outcome(),
        Err(e) => e.outcome(),
    };
    info!(outcome = outcome.label(), tx_hash = ?outcome.tx_hash(), "Run finished");

    Ok(exit_code(outcome))
}

fn exit_code(outcome: SubmissionOutcome) -> ExitCode {
    match outcome {
        SubmissionOutcome::Confirmed { .. } => ExitCode::SUCCESS,
        SubmissionOutcome::NotSubmitted => ExitCode::from(EXIT_NOT_SUBMITTED),
        SubmissionOutcome::Pending { .. } => ExitCode::from(EXIT_PENDING),
        SubmissionOutcome::Failed { .. } => ExitCode::from(EXIT_REVERTED),
    }
}

async fn write_metrics(metrics: &WorkflowMetrics, path: Option<&str>) {
    if let Some(path) = path {
        if let Err(e) = metrics.write_textfile(path).await {
            warn!(error = %e, "Failed to write metrics textfile");
        }
    }
}

fn now_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}
