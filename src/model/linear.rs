//! Frozen linear scoring function stored in the reference bundle

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};

/// Ridge-regression model: immutable once trained. Operates on
/// standardized feature rows and predicts raw lifetime value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    weights: Vec<f64>,
    intercept: f64,
}

impl LinearModel {
    pub fn new(weights: Vec<f64>, intercept: f64) -> Self {
        Self { weights, intercept }
    }

    /// Score one standardized feature row.
    pub fn predict(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.weights.len() {
            return Err(MonitorError::Schema(format!(
                "model has {} weights, got {} features",
                self.weights.len(),
                row.len()
            )));
        }
        Ok(self
            .weights
            .iter()
            .zip(row)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept)
    }

    /// Number of features the model expects.
    pub fn feature_count(&self) -> usize {
        self.weights.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict() {
        let model = LinearModel::new(vec![2.0, -1.0], 10.0);
        assert_eq!(model.predict(&[3.0, 4.0]).unwrap(), 12.0);
    }

    #[test]
    fn test_width_mismatch() {
        let model = LinearModel::new(vec![1.0], 0.0);
        assert!(model.predict(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let model = LinearModel::new(vec![0.5, 1.5], -3.0);
        let json = serde_json::to_string(&model).unwrap();
        let restored: LinearModel = serde_json::from_str(&json).unwrap();
        assert_eq!(
            model.predict(&[1.0, 1.0]).unwrap(),
            restored.predict(&[1.0, 1.0]).unwrap()
        );
    }
}
