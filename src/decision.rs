//! Retraining decision policy

use crate::types::{DataDriftSummary, ModelDriftVerdict, RetrainingDecision, TriggeredBy};
use chrono::Utc;

/// Combine the two drift verdicts into a retraining decision.
///
/// Pure and deterministic: retrain when either dataset-level data drift or
/// model drift fired, with no history lookback. Each call produces a fresh
/// immutable decision.
pub fn decide(data: &DataDriftSummary, model: &ModelDriftVerdict) -> RetrainingDecision {
    let triggered_by = match (data.dataset_drift_detected, model.model_drift_detected) {
        (true, true) => TriggeredBy::Both,
        (true, false) => TriggeredBy::DataDrift,
        (false, true) => TriggeredBy::ModelDrift,
        (false, false) => TriggeredBy::None,
    };
    RetrainingDecision {
        should_retrain: triggered_by != TriggeredBy::None,
        triggered_by,
        evaluated_at: Utc::now(),
    }
}
