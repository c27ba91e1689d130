//! Error taxonomy for the drift monitoring engine

use thiserror::Error;

/// Errors raised by the monitoring engine.
///
/// `Schema` and `ReferenceArtifactCorrupt` are fatal to a cycle. The
/// remaining conditions degrade a single verdict and are annotated in the
/// cycle report instead of aborting.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Input cannot be interpreted; no partial result is produced.
    #[error("schema error: {0}")]
    Schema(String),

    /// The reference bundle is incomplete or inconsistent; there is
    /// nothing to compare against.
    #[error("reference artifact corrupt: {0}")]
    ReferenceArtifactCorrupt(String),

    /// Ground-truth labels are missing from the current snapshot.
    #[error("labels unavailable: {0}")]
    LabelsUnavailable(String),

    /// The metrics sink rejected a push. Never fails a cycle.
    #[error("metrics sink unavailable: {0}")]
    MetricsSink(String),

    /// The retrain event could not be delivered. Never fails a cycle.
    #[error("retrain trigger failed: {0}")]
    Trigger(String),

    /// An evaluator task aborted unexpectedly.
    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MonitorError::Schema("missing column UnitPrice".to_string());
        assert!(format!("{}", err).contains("missing column UnitPrice"));

        let err = MonitorError::MetricsSink("connection refused".to_string());
        assert!(format!("{}", err).contains("connection refused"));
    }
}
