//! Drift metrics registry and Pushgateway export
//!
//! Gauges are overwritten each cycle, counters accumulate for the process
//! lifetime. The registry renders the Prometheus text exposition format
//! itself; label keys are kept in ordered maps so the rendered payload is
//! deterministic.

use crate::error::{MonitorError, Result};
use crate::types::{DataDriftSummary, FeatureDriftVerdict, ModelDriftVerdict, RetrainingDecision};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::RwLock;
use tracing::{debug, warn};

/// Process-wide drift metrics, updated once per detection cycle.
#[derive(Debug, Default)]
pub struct DriftMetrics {
    inner: RwLock<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    /// Counter by drift_type label, incremented when the signal fires
    drift_detected_total: BTreeMap<String, u64>,
    /// p-value gauge per feature
    drift_score: BTreeMap<String, f64>,
    /// Gauges by drift_type label
    drifted_columns_count: BTreeMap<String, f64>,
    drift_share: BTreeMap<String, f64>,
    /// r2 / mae / rmse on the current snapshot
    model_performance: BTreeMap<String, f64>,
    /// r2 gauge by data_type label (reference / current)
    r2_score: BTreeMap<String, f64>,
    last_detection_timestamp: f64,
}

impl DriftMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one cycle's verdicts into the registry.
    pub fn observe_cycle(
        &self,
        feature_verdicts: &[FeatureDriftVerdict],
        data: &DataDriftSummary,
        model: &ModelDriftVerdict,
        decision: &RetrainingDecision,
    ) {
        let mut inner = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        for verdict in feature_verdicts {
            inner
                .drift_score
                .insert(verdict.feature_name.clone(), verdict.statistic_value);
        }
        inner
            .drifted_columns_count
            .insert("data".to_string(), data.drifted_feature_count as f64);
        inner
            .drift_share
            .insert("data".to_string(), data.drift_share);
        if data.dataset_drift_detected {
            *inner
                .drift_detected_total
                .entry("data".to_string())
                .or_insert(0) += 1;
        }

        if let Some(current) = &model.current {
            inner.model_performance.insert("r2".to_string(), current.r2);
            inner.model_performance.insert("mae".to_string(), current.mae);
            inner
                .model_performance
                .insert("rmse".to_string(), current.rmse);
            inner.r2_score.insert("current".to_string(), current.r2);
        }
        if let Some(reference) = &model.reference {
            inner.r2_score.insert("reference".to_string(), reference.r2);
        }
        if model.model_drift_detected {
            *inner
                .drift_detected_total
                .entry("model".to_string())
                .or_insert(0) += 1;
        }

        inner.last_detection_timestamp = Utc::now().timestamp() as f64;
        debug!(should_retrain = decision.should_retrain, "Metrics updated");
    }

    /// Render the Prometheus text exposition format.
    pub fn render(&self) -> String {
        let inner = match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut out = String::new();

        out.push_str("# HELP clv_drift_detected_total Drift detections by type\n");
        out.push_str("# TYPE clv_drift_detected_total counter\n");
        for (drift_type, count) in &inner.drift_detected_total {
            out.push_str(&format!(
                "clv_drift_detected_total{{drift_type=\"{}\"}} {}\n",
                escape_label(drift_type),
                count
            ));
        }

        out.push_str("# HELP clv_drift_score Per-feature drift test p-value\n");
        out.push_str("# TYPE clv_drift_score gauge\n");
        for (feature, value) in &inner.drift_score {
            out.push_str(&format!(
                "clv_drift_score{{feature=\"{}\"}} {}\n",
                escape_label(feature),
                value
            ));
        }

        out.push_str("# HELP clv_drifted_columns_count Features flagged as drifted\n");
        out.push_str("# TYPE clv_drifted_columns_count gauge\n");
        for (drift_type, value) in &inner.drifted_columns_count {
            out.push_str(&format!(
                "clv_drifted_columns_count{{drift_type=\"{}\"}} {}\n",
                escape_label(drift_type),
                value
            ));
        }

        out.push_str("# HELP clv_drift_share Share of drifted features\n");
        out.push_str("# TYPE clv_drift_share gauge\n");
        for (drift_type, value) in &inner.drift_share {
            out.push_str(&format!(
                "clv_drift_share{{drift_type=\"{}\"}} {}\n",
                escape_label(drift_type),
                value
            ));
        }

        out.push_str("# HELP clv_model_performance Regression error on the current snapshot\n");
        out.push_str("# TYPE clv_model_performance gauge\n");
        for (metric, value) in &inner.model_performance {
            out.push_str(&format!(
                "clv_model_performance{{metric=\"{}\"}} {}\n",
                escape_label(metric),
                value
            ));
        }

        out.push_str("# HELP clv_r2_score Model R-squared per snapshot\n");
        out.push_str("# TYPE clv_r2_score gauge\n");
        for (data_type, value) in &inner.r2_score {
            out.push_str(&format!(
                "clv_r2_score{{data_type=\"{}\"}} {}\n",
                escape_label(data_type),
                value
            ));
        }

        out.push_str("# HELP clv_drift_detection_timestamp Unix time of the last cycle\n");
        out.push_str("# TYPE clv_drift_detection_timestamp gauge\n");
        out.push_str(&format!(
            "clv_drift_detection_timestamp {}\n",
            inner.last_detection_timestamp
        ));

        out
    }
}

fn escape_label(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Pushes the rendered registry to a Prometheus Pushgateway.
///
/// Export failures are reported to the caller but must never fail the
/// cycle; the verdicts and the report are already durable by the time
/// the push runs.
#[derive(Debug, Clone)]
pub struct PushgatewayClient {
    client: reqwest::Client,
    endpoint: String,
}

impl PushgatewayClient {
    pub fn new(base_url: &str, job: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/metrics/job/{}", base_url.trim_end_matches('/'), job),
        }
    }

    pub async fn push(&self, metrics: &DriftMetrics) -> Result<()> {
        let body = metrics.render();
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "text/plain; version=0.0.4")
            .body(body)
            .send()
            .await
            .map_err(|e| MonitorError::MetricsSink(format!("push to {}: {e}", self.endpoint)))?;

        if !response.status().is_success() {
            warn!(endpoint = %self.endpoint, status = %response.status(), "Pushgateway rejected metrics");
            return Err(MonitorError::MetricsSink(format!(
                "pushgateway returned {}",
                response.status()
            )));
        }
        debug!(endpoint = %self.endpoint, "Metrics pushed");
        Ok(())
    }
}
