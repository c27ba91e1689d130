//! Monitoring pipeline: drives one detection cycle end to end
//!
//! The cycle is a state machine. The two drift evaluators are independent
//! pure computations over immutable snapshots and run concurrently; their
//! results are joined before the decision executes. Every cycle, success
//! or failure, produces exactly one report artifact.

use crate::config::AppConfig;
use crate::decision::decide;
use crate::drift::{detect_data_drift, detect_model_drift};
use crate::error::{MonitorError, Result};
use crate::features::FeatureBuilder;
use crate::metrics::{DriftMetrics, PushgatewayClient};
use crate::model::train;
use crate::reference::ReferenceStore;
use crate::report::ReportWriter;
use crate::trigger::RetrainTrigger;
use crate::types::{CycleReport, CycleState};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Long-lived monitoring engine. One instance drives any number of
/// independent cycles against the reference store.
pub struct MonitorPipeline {
    config: AppConfig,
    store: ReferenceStore,
    report_writer: ReportWriter,
    metrics: Arc<DriftMetrics>,
    pushgateway: Option<PushgatewayClient>,
    trigger: Option<RetrainTrigger>,
}

impl MonitorPipeline {
    /// Wire up the pipeline from configuration.
    ///
    /// A missing NATS server disables retrain events rather than blocking
    /// monitoring; drift verdicts stay durable in the report store either
    /// way.
    pub async fn new(config: AppConfig) -> Self {
        let store = ReferenceStore::new(&config.paths.reference_dir);
        let report_writer = ReportWriter::new(&config.paths.report_dir);

        let pushgateway = config
            .metrics
            .pushgateway_url
            .as_deref()
            .map(|url| PushgatewayClient::new(url, &config.metrics.job));

        let trigger = match &config.trigger.nats_url {
            Some(url) => match RetrainTrigger::connect(url, &config.trigger.subject).await {
                Ok(trigger) => Some(trigger),
                Err(e) => {
                    warn!(error = %e, "Retrain trigger unavailable, continuing without it");
                    None
                }
            },
            None => None,
        };

        Self {
            config,
            store,
            report_writer,
            metrics: Arc::new(DriftMetrics::new()),
            pushgateway,
            trigger,
        }
    }

    /// Train a baseline model from a raw transaction CSV and publish it
    /// as the new reference bundle.
    pub fn train_reference<P: AsRef<Path>>(&self, raw_csv: P) -> Result<()> {
        let builder = FeatureBuilder::new();
        let raw = builder.load_csv(&raw_csv)?;
        let built = builder.build(&raw, None)?;

        let outcome = train(&self.config.trainer, &built.table)?;
        let bundle = self.store.save(&outcome, &built.table)?;

        info!(
            bundle = %bundle.display(),
            customers = built.table.row_count(),
            test_r2 = format!("{:.4}", outcome.metadata.test_r2),
            "Reference trained and published"
        );
        Ok(())
    }

    /// Run one detection cycle against a current-snapshot CSV.
    ///
    /// Evaluation errors are captured into a `CycleFailed` report instead
    /// of propagating; only a failure to persist the report itself is
    /// returned as an error.
    pub async fn run_cycle<P: AsRef<Path>>(&self, current_csv: P) -> Result<CycleReport> {
        let source = current_csv.as_ref();
        let mut report = CycleReport::begin(source.display().to_string());
        info!(cycle_id = %report.cycle_id, source = %source.display(), "Cycle started");

        let outcome = self.evaluate(source, &mut report).await;
        if let Err(e) = &outcome {
            error!(cycle_id = %report.cycle_id, error = %e, "Cycle failed");
            report.fail(e.to_string());
        }
        report.finished_at = Utc::now();

        // The report is the source of truth and lands before any
        // best-effort side effect
        if report.state != CycleState::CycleFailed {
            report.state = CycleState::Reported;
        }
        self.report_writer.write(&report)?;

        if report.state == CycleState::CycleFailed {
            return Ok(report);
        }

        if let (Some(data), Some(model), Some(decision)) =
            (&report.data_drift, &report.model_drift, &report.decision)
        {
            self.metrics
                .observe_cycle(&report.feature_verdicts, data, model, decision);
            if let Some(pushgateway) = &self.pushgateway {
                if let Err(e) = pushgateway.push(&self.metrics).await {
                    warn!(error = %e, "Metrics push failed, report remains authoritative");
                }
            }
        }

        report.state = CycleState::Done;
        if let Some(decision) = &report.decision {
            if decision.should_retrain {
                match &self.trigger {
                    Some(trigger) => match trigger.fire(report.cycle_id, decision).await {
                        Ok(()) => report.state = CycleState::RetrainTriggered,
                        Err(e) => warn!(error = %e, "Retrain event not delivered"),
                    },
                    None => {
                        info!(cycle_id = %report.cycle_id, "Retrain wanted but no trigger configured")
                    }
                }
            }
        }

        info!(cycle_id = %report.cycle_id, state = ?report.state, "Cycle finished");
        Ok(report)
    }

    /// The fallible middle of a cycle, up to the decision.
    async fn evaluate(&self, source: &Path, report: &mut CycleReport) -> Result<()> {
        let snapshot = self.store.load()?;

        let builder = FeatureBuilder::new();
        let raw = builder.load_csv(source)?;
        let known = FeatureBuilder::categories_from_schema(&snapshot.feature_schema);
        let built = builder.build(&raw, Some(&known))?;
        report.excluded_rows = built.excluded_rows;
        report.state = CycleState::FeaturesBuilt;

        let current = built.table;
        let snapshot = Arc::new(snapshot);

        let data_config = self.config.data_drift.clone();
        let data_snapshot = Arc::clone(&snapshot);
        let data_current = current.clone();
        let data_task = tokio::task::spawn_blocking(move || {
            detect_data_drift(&data_config, &data_snapshot.features, &data_current)
        });

        let model_config = self.config.model_drift.clone();
        let model_snapshot = Arc::clone(&snapshot);
        let model_task = tokio::task::spawn_blocking(move || {
            detect_model_drift(
                &model_config,
                &model_snapshot.model,
                &model_snapshot.scaler,
                &model_snapshot.features,
                &current,
            )
        });

        // Join barrier: both evaluators finish before the decision runs
        let (data_result, model_result) = tokio::join!(data_task, model_task);
        let (feature_verdicts, data_summary) =
            data_result.map_err(|e| MonitorError::Internal(format!("data-drift task: {e}")))?;
        let model_verdict = model_result
            .map_err(|e| MonitorError::Internal(format!("model-drift task: {e}")))??;

        report.feature_verdicts = feature_verdicts;
        report.data_drift = Some(data_summary);
        report.state = CycleState::DataDriftEvaluated;
        report.model_drift = Some(model_verdict);
        report.state = CycleState::ModelDriftEvaluated;

        let decision = decide(
            report.data_drift.as_ref().ok_or_else(|| {
                MonitorError::Internal("data drift summary missing after join".to_string())
            })?,
            report.model_drift.as_ref().ok_or_else(|| {
                MonitorError::Internal("model drift verdict missing after join".to_string())
            })?,
        );
        info!(
            cycle_id = %report.cycle_id,
            should_retrain = decision.should_retrain,
            triggered_by = ?decision.triggered_by,
            "Decision made"
        );
        report.decision = Some(decision);
        report.state = CycleState::Decided;
        Ok(())
    }
}
