//! Fee-proxy Transfer Workflow - End-to-end Orchestration
//!
//! Runs one fee-delegated transfer as a single linear sequence:
//!
//! 1. Read chain id and gas price
//! 2. Snapshot balances (failure aborts; nothing sent yet)
//! 3. Encode the inner call
//! 4. Estimate gas on the outer call (priced at the payment cap)
//! 5. Price `gas_limit * gas_price` in the fee token via the oracle
//! 6. Derive `maxPayment`, lease a nonce, build and sign
//! 7. Journal the hash as pending, broadcast, then poll for the receipt
//! 8. Snapshot again, compute the delta and the actual cost
//!
//! One deadline bounds every network step. Once anything may have
//! reached the pool, failures are reported as pending with the hash,
//! never as "not sent".

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::utils::format_units;
use alloy::primitives::{Address, TxHash, I256, U256};
use anyhow::Result;
use tokio::time::{timeout_at, Instant};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::domain::balance::{BalanceDelta, BalanceSnapshot};
use crate::domain::call::CallDescriptor;
use crate::domain::errors::{QueryError, Stage, SubmissionOutcome, SubmitError, WorkflowError};
use crate::domain::pricing::{native_cost_units, FeePolicy, GasLimitPolicy, PricedCost, PricingPath};
use crate::domain::transaction::{FeeProxyRequest, Receipt, SignedTransaction};
use crate::ports::chain_client::ChainClient;
use crate::ports::journal::{RunJournal, RunRecord};
use crate::ports::price_oracle::PriceOracle;
use crate::ports::signer::TransactionSigner;
use crate::usecases::gas_estimator::GasEstimator;
use crate::usecases::nonce::NonceManager;
use crate::usecases::reconciler::BalanceReconciler;
use crate::usecases::tracker::{PendingResolution, SubmissionTracker};
use crate::usecases::tx_builder::TransactionBuilder;

/// Bound on the after-snapshot, which runs once the transfer is final
/// and so is not covered by the run deadline.
const RECONCILE_GRACE: Duration = Duration::from_secs(10);

/// Decimals of the native asset's wei denomination.
const NATIVE_DECIMALS: u8 = 18;

/// Operational parameters of the workflow.
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
  /// Fee proxy contract the outer call is sent to.
  pub fee_proxy: Address,
  /// ERC-20 the fee is paid in.
  pub fee_token: Address,
  /// Display decimals of the fee token (logging only).
  pub fee_token_decimals: u8,
  /// Oracle path `[fee_token_id, native_asset_id]`.
  pub pricing_path: PricingPath,
  /// Decimal places removed from wei before pricing.
  pub native_unit_scale: u32,
  pub fee_policy: FeePolicy,
  pub gas_policy: GasLimitPolicy,
  /// Overall bound on one run.
  pub deadline: Duration,
  /// Receipt polling interval.
  pub poll_interval: Duration,
}

impl WorkflowSettings {
  pub fn from_config(config: &AppConfig) -> Result<Self> {
    Ok(Self {
      fee_proxy: config.assets.fee_proxy,
      fee_token: config.assets.fee_token,
      fee_token_decimals: config.assets.fee_token_decimals,
      pricing_path: config.assets.pricing_path(),
      native_unit_scale: config.oracle.native_unit_scale,
      fee_policy: config.fees.fee_policy()?,
      gas_policy: config.fees.gas_limit_policy()?,
      deadline: config.workflow.deadline(),
      poll_interval: config.workflow.poll_interval(),
    })
  }
}

/// What a run learned before it ended, successful or not.
#[derive(Debug, Clone, Default)]
pub struct RunProgress {
  pub run_id: Uuid,
  pub gas_estimate: Option<u64>,
  pub gas_limit: Option<u64>,
  pub priced: Option<PricedCost>,
  pub max_payment: Option<U256>,
  pub nonce: Option<u64>,
  pub tx_hash: Option<TxHash>,
}

impl RunProgress {
  pub fn new(run_id: Uuid) -> Self {
    Self {
      run_id,
      ..Self::default()
    }
  }

  fn base_record(&self, account: Address) -> RunRecord {
    let timestamp_ms = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
    let mut record = RunRecord::new(self.run_id.to_string(), timestamp_ms, account);
    record.nonce = self.nonce;
    record.tx_hash = self.tx_hash;
    record.quoted_fee = self.priced.map(|p| p.fee_token_units.to_string());
    record.max_payment = self.max_payment.map(|m| m.to_string());
    record
  }

  /// Journal line written just before the signed bytes are broadcast.
  pub fn to_broadcast_record(&self, account: Address) -> RunRecord {
    let mut record = self.base_record(account);
    record.outcome = "pending".to_string();
    record
  }

  /// Journal line for a run stopped from outside: pending once a hash
  /// may have been broadcast, not submitted before that.
  pub fn to_interrupted_record(&self, account: Address) -> RunRecord {
    let mut record = self.base_record(account);
    record.outcome = match self.tx_hash {
      Some(_) => "pending",
      None => "not_submitted",
    }
    .to_string();
    record.error = Some("interrupted".to_string());
    record
  }

  /// Journal line for a finished run.
  pub fn to_record(
    &self,
    account: Address,
    result: &Result<TransferReport, WorkflowError>,
  ) -> RunRecord {
    let mut record = self.base_record(account);

    match result {
      Ok(report) => {
        record.tx_hash = Some(report.transaction.hash);
        record.outcome = report.outcome().label().to_string();
        record.gas_used = Some(report.receipt.gas_used);
        record.native_cost_wei = Some(report.native_cost().to_string());
        record.fee_token_spent = report.fee_token_spent().map(|spent| spent.to_string());
        match &report.reconciliation {
          Ok(delta) => {
            record.native_delta = Some(delta.native.to_string());
            record.fee_token_delta = Some(delta.fee_token.to_string());
          }
          Err(e) => record.error = Some(e.to_string()),
        }
      }
      Err(e) => {
        let outcome = e.outcome();
        record.tx_hash = outcome.tx_hash().or(self.tx_hash);
        record.outcome = outcome.label().to_string();
        record.failed_stage = Some(e.stage().to_string());
        record.error = Some(e.to_string());
        if let WorkflowError::Reverted { receipt } = e {
          record.gas_used = Some(receipt.gas_used);
          record.native_cost_wei = Some(receipt.native_cost().to_string());
        }
      }
    }

    record
  }
}

/// Result of a confirmed transfer.
#[derive(Debug, Clone)]
pub struct TransferReport {
  pub run_id: Uuid,
  pub gas_estimate: u64,
  pub priced: PricedCost,
  pub request: FeeProxyRequest,
  pub transaction: SignedTransaction,
  pub receipt: Receipt,
  /// Fee-token amount the inner call moves out of the account.
  pub transferred: U256,
  pub before: BalanceSnapshot,
  /// Balance change, or why it could not be measured. A failed
  /// after-snapshot does not undo the transfer.
  pub reconciliation: Result<BalanceDelta, QueryError>,
}

impl TransferReport {
  pub fn outcome(&self) -> SubmissionOutcome {
    SubmissionOutcome::Confirmed {
      tx_hash: self.transaction.hash,
    }
  }

  /// Actual gas cost from the receipt, in wei.
  pub fn native_cost(&self) -> U256 {
    self.receipt.native_cost()
  }

  /// Fee actually charged in the fee token, from the measured delta.
  pub fn fee_token_spent(&self) -> Option<I256> {
    self
      .reconciliation
      .as_ref()
      .ok()
      .map(|delta| delta.fee_token_spent(self.transferred))
  }
}

/// Fee-delegated transfer use case.
pub struct FeeProxyTransfer<C: ChainClient, O: PriceOracle, S: TransactionSigner> {
  chain: Arc<C>,
  oracle: Arc<O>,
  signer: Arc<S>,
  nonces: Arc<NonceManager>,
  journal: Option<Arc<dyn RunJournal>>,
  estimator: GasEstimator<C>,
  reconciler: BalanceReconciler<C>,
  builder: TransactionBuilder,
  settings: WorkflowSettings,
}

impl<C: ChainClient, O: PriceOracle, S: TransactionSigner> FeeProxyTransfer<C, O, S> {
  pub fn new(
    chain: Arc<C>,
    oracle: Arc<O>,
    signer: Arc<S>,
    nonces: Arc<NonceManager>,
    settings: WorkflowSettings,
  ) -> Self {
    Self {
      estimator: GasEstimator::new(Arc::clone(&chain)),
      reconciler: BalanceReconciler::new(Arc::clone(&chain), settings.fee_token),
      builder: TransactionBuilder::new(settings.fee_proxy),
      chain,
      oracle,
      signer,
      nonces,
      journal: None,
      settings,
    }
  }

  /// Record every hash as pending in `journal` before broadcasting it.
  /// A failed write aborts the run with nothing sent.
  #[must_use]
  pub fn with_journal(mut self, journal: Arc<dyn RunJournal>) -> Self {
    self.journal = Some(journal);
    self
  }

  pub fn account(&self) -> Address {
    self.signer.address()
  }

  pub fn settings(&self) -> &WorkflowSettings {
    &self.settings
  }

  /// Run one transfer with a fresh run id.
  pub async fn run(&self, call: &CallDescriptor) -> Result<TransferReport, WorkflowError> {
    let mut progress = RunProgress::new(Uuid::new_v4());
    self.execute(call, &mut progress).await
  }

  /// Run one transfer, recording intermediate results in `progress`.
  pub async fn execute(
    &self,
    call: &CallDescriptor,
    progress: &mut RunProgress,
  ) -> Result<TransferReport, WorkflowError> {
    let span = info_span!(
      "fee_proxy_transfer",
      run_id = %progress.run_id,
      account = %self.account(),
      target = %call.target(),
    );

    let result = self.pipeline(call, progress).instrument(span.clone()).await;

    let _entered = span.enter();
    match &result {
      Ok(report) => info!(tx_hash = %report.transaction.hash, "Transfer confirmed"),
      Err(e) => match e.outcome() {
        SubmissionOutcome::Pending { tx_hash } => {
          warn!(%tx_hash, stage = %e.stage(), error = %e, "Transfer outcome unknown; re-query before retrying")
        }
        outcome => error!(outcome = outcome.label(), stage = %e.stage(), error = %e, "Transfer failed"),
      },
    }

    result
  }

  async fn pipeline(
    &self,
    call: &CallDescriptor,
    progress: &mut RunProgress,
  ) -> Result<TransferReport, WorkflowError> {
    let deadline = Instant::now() + self.settings.deadline;
    let account = self.account();

    // ── 1. Chain parameters ──────────────────────────────────
    let (chain_id, gas_price) = within(deadline, Stage::ChainParameters, None, async {
      tokio::try_join!(self.chain.chain_id(), self.chain.gas_price()).map_err(|e| {
        WorkflowError::ChainQuery {
          stage: Stage::ChainParameters,
          reason: format!("{e:#}"),
        }
      })
    })
    .await?;

    // ── 2. Pre-submission snapshot ───────────────────────────
    let before = self
      .reconciler
      .snapshot_within(account, deadline)
      .await
      .map_err(|e| match e {
        QueryError::Deadline => WorkflowError::DeadlineExceeded {
          stage: Stage::Snapshot,
          broadcast: None,
        },
        other => WorkflowError::Snapshot(other),
      })?;

    // ── 3. Inner call ────────────────────────────────────────
    let inner_payload = call.encode()?;

    // ── 4. Gas estimate on the outer call ────────────────────
    let probe = FeeProxyRequest {
      paying_asset: self.settings.fee_token,
      max_payment: self.settings.fee_policy.cap(),
      target: call.target(),
      inner_payload: inner_payload.clone(),
    };
    let probe_payload = probe.encode()?;

    let gas_estimate = within(
      deadline,
      Stage::Estimation,
      None,
      self
        .estimator
        .estimate(account, self.settings.fee_proxy, &probe_payload, U256::ZERO),
    )
    .await?;
    let gas_limit = self.settings.gas_policy.gas_limit(gas_estimate);
    progress.gas_estimate = Some(gas_estimate);
    progress.gas_limit = Some(gas_limit);

    // ── 5. Price the gas in the fee token ────────────────────
    let native_units = native_cost_units(gas_limit, gas_price, self.settings.native_unit_scale);
    let path = self.settings.pricing_path.as_array();
    let priced = within(
      deadline,
      Stage::Pricing,
      None,
      self.oracle.price_in_fee_token(native_units, &path),
    )
    .await?;
    progress.priced = Some(priced);

    // ── 6. Build and sign ────────────────────────────────────
    let max_payment = self.settings.fee_policy.max_payment(priced.fee_token_units)?;
    progress.max_payment = Some(max_payment);

    info!(
      gas_estimate,
      gas_limit,
      gas_price,
      native_units,
      fee = %priced.fee_token_units,
      fee_display = %self.display(priced.fee_token_units),
      max_payment = %max_payment,
      max_payment_display = %self.display(max_payment),
      "Transfer priced"
    );

    let request = FeeProxyRequest {
      paying_asset: self.settings.fee_token,
      max_payment,
      target: call.target(),
      inner_payload,
    };

    let lease = within(deadline, Stage::NonceAcquisition, None, async {
      self
        .nonces
        .acquire(&*self.chain, account)
        .await
        .map_err(|e| WorkflowError::ChainQuery {
          stage: Stage::NonceAcquisition,
          reason: format!("{e:#}"),
        })
    })
    .await?;
    progress.nonce = Some(lease.nonce());

    // Dropping the lease on a build failure releases the nonce unused
    let signed = within(
      deadline,
      Stage::Build,
      None,
      self.builder.build(
        &request,
        &*self.signer,
        lease.nonce(),
        gas_limit,
        gas_price,
        chain_id,
      ),
    )
    .await?;

    // ── 7. Journal, broadcast and confirm ────────────────────
    progress.tx_hash = Some(signed.hash);
    if let Some(journal) = &self.journal {
      let record = progress.to_broadcast_record(account);
      let journaled = within(deadline, Stage::Submission, None, async {
        journal.append(&record).await.map_err(|e| WorkflowError::Journal {
          reason: format!("{e:#}"),
        })
      })
      .await;
      if let Err(e) = journaled {
        progress.tx_hash = None;
        return Err(e);
      }
    }

    let tracker = SubmissionTracker::new(Arc::clone(&self.chain), self.settings.poll_interval);

    let tx_hash = match timeout_at(deadline, tracker.submit(&signed)).await {
      Ok(Ok(hash)) => {
        lease.consume();
        hash
      }
      Ok(Err(e @ SubmitError::Rejected { .. })) => {
        lease.invalidate();
        return Err(e.into());
      }
      Ok(Err(e @ SubmitError::Transport { .. })) => {
        lease.consume();
        return Err(e.into());
      }
      Err(_) => {
        lease.consume();
        return Err(WorkflowError::DeadlineExceeded {
          stage: Stage::Submission,
          broadcast: tracker.broadcast_hash(),
        });
      }
    };

    let receipt = tracker.await_receipt(tx_hash, deadline).await?;
    if !receipt.success {
      return Err(WorkflowError::Reverted { receipt });
    }

    // ── 8. Reconcile ─────────────────────────────────────────
    let after_deadline = deadline.max(Instant::now() + RECONCILE_GRACE);
    let reconciliation = self
      .reconciler
      .snapshot_within(account, after_deadline)
      .await
      .map(|after| self.reconciler.delta(&before, &after));

    let native_cost = receipt.native_cost();
    let transferred = call.outflow_of(self.settings.fee_token);
    info!(
      gas_used = receipt.gas_used,
      native_cost_wei = %native_cost,
      native_cost_display = %format_units(native_cost, NATIVE_DECIMALS).unwrap_or_else(|_| native_cost.to_string()),
      native_units = native_cost_units(
        receipt.gas_used,
        receipt.effective_gas_price,
        self.settings.native_unit_scale
      ),
      "Actual gas cost"
    );

    match &reconciliation {
      Ok(delta) => info!(
        native_delta = %delta.native,
        fee_token_delta = %delta.fee_token,
        fee_token_spent = %delta.fee_token_spent(transferred),
        quoted_fee = %priced.fee_token_units,
        "Balances reconciled"
      ),
      Err(e) => warn!(error = %e, "Post-transfer snapshot failed; transfer stands"),
    }

    Ok(TransferReport {
      run_id: progress.run_id,
      gas_estimate,
      priced,
      request,
      transaction: signed,
      receipt,
      transferred,
      before,
      reconciliation,
    })
  }

  /// Re-query a hash left pending by an earlier run.
  pub async fn resolve_pending(&self, tx_hash: TxHash) -> Result<PendingResolution> {
    SubmissionTracker::new(Arc::clone(&self.chain), self.settings.poll_interval)
      .requery(tx_hash)
      .await
  }

  fn display(&self, amount: U256) -> String {
    format_units(amount, self.settings.fee_token_decimals).unwrap_or_else(|_| amount.to_string())
  }
}

/// Bound `fut` by the run deadline, tagging expiry with `stage`.
async fn within<T, E>(
  deadline: Instant,
  stage: Stage,
  broadcast: Option<TxHash>,
  fut: impl Future<Output = Result<T, E>>,
) -> Result<T, WorkflowError>
where
  WorkflowError: From<E>,
{
  match timeout_at(deadline, fut).await {
    Ok(result) => result.map_err(WorkflowError::from),
    Err(_) => Err(WorkflowError::DeadlineExceeded { stage, broadcast }),
  }
}
