//! Verdict and decision records produced by one monitoring cycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of the statistical test for a single feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureDriftVerdict {
    pub feature_name: String,
    /// `ks`, `chi_square`, or `insufficient_data` when the test was skipped
    pub statistic_name: String,
    /// p-value of the two-sample test; 1.0 when skipped
    pub statistic_value: f64,
    pub is_drifted: bool,
}

/// Dataset-level aggregate over all per-feature verdicts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataDriftSummary {
    pub drifted_feature_count: usize,
    pub total_feature_count: usize,
    /// drifted / total, 0.0 for an empty schema
    pub drift_share: f64,
    /// At least one feature drifted
    pub any_feature_drifted: bool,
    /// Share of drifted features crossed the dataset-level threshold
    pub dataset_drift_detected: bool,
}

/// Regression quality of the frozen model on one snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegressionScore {
    pub r2: f64,
    pub mae: f64,
    pub rmse: f64,
}

/// How the R² degradation was compared against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    /// Relative drop against the reference R²
    Relative,
    /// Reference R² was non-positive; absolute drop compared instead
    AbsoluteFallback,
}

/// Performance-degradation verdict for the frozen model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDriftVerdict {
    pub reference: Option<RegressionScore>,
    pub current: Option<RegressionScore>,
    /// (reference_r2 - current_r2) / max(reference_r2, epsilon)
    pub relative_r2_drop: Option<f64>,
    pub comparison_mode: Option<ComparisonMode>,
    pub model_drift_detected: bool,
    /// Set when the verdict degraded instead of being computed
    pub degraded_reason: Option<String>,
}

impl ModelDriftVerdict {
    /// Verdict for a cycle that could not assert drift, with the reason
    /// recorded. Never assumes drift without ground truth.
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            reference: None,
            current: None,
            relative_r2_drop: None,
            comparison_mode: None,
            model_drift_detected: false,
            degraded_reason: Some(reason.into()),
        }
    }
}

/// Which drift signal(s) fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggeredBy {
    DataDrift,
    ModelDrift,
    Both,
    None,
}

/// Terminal artifact of a cycle; the sole signal to the external trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrainingDecision {
    pub should_retrain: bool,
    pub triggered_by: TriggeredBy,
    pub evaluated_at: DateTime<Utc>,
}

/// Cycle state machine. Any evaluator failure transitions to `CycleFailed`
/// with partial results still reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Started,
    FeaturesBuilt,
    DataDriftEvaluated,
    ModelDriftEvaluated,
    Decided,
    Reported,
    RetrainTriggered,
    Done,
    CycleFailed,
}

/// One structured record per monitoring cycle, success or failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub source_file: String,
    pub state: CycleState,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Raw rows excluded for missing entity identifiers
    pub excluded_rows: u64,
    pub feature_verdicts: Vec<FeatureDriftVerdict>,
    pub data_drift: Option<DataDriftSummary>,
    pub model_drift: Option<ModelDriftVerdict>,
    pub decision: Option<RetrainingDecision>,
    /// Causing error for a failed cycle
    pub error: Option<String>,
}

impl CycleReport {
    /// Start a fresh report for one cycle.
    pub fn begin(source_file: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            cycle_id: Uuid::new_v4(),
            source_file: source_file.into(),
            state: CycleState::Started,
            started_at: now,
            finished_at: now,
            excluded_rows: 0,
            feature_verdicts: Vec::new(),
            data_drift: None,
            model_drift: None,
            decision: None,
            error: None,
        }
    }

    /// Mark the cycle failed with the causing error captured.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.state = CycleState::CycleFailed;
        self.error = Some(error.into());
        self.finished_at = Utc::now();
    }
}
