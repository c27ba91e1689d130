//! Standard scaler fitted at training time and frozen afterwards

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};

/// Per-feature standardization: (x - mean) / std.
///
/// Fitted once by the training pipeline and serialized into the reference
/// bundle; the detection engine only ever calls
/// [`StandardScaler::transform_row`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    /// Fit means and standard deviations over row-major training data.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let n_features = rows
            .first()
            .map(Vec::len)
            .ok_or_else(|| MonitorError::Schema("cannot fit scaler on empty data".to_string()))?;
        let n = rows.len() as f64;

        let mut means = vec![0.0; n_features];
        for row in rows {
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut means {
            *m /= n;
        }

        let mut stds = vec![0.0; n_features];
        for row in rows {
            for ((s, v), m) in stds.iter_mut().zip(row).zip(&means) {
                *s += (v - m).powi(2);
            }
        }
        for s in &mut stds {
            *s = (*s / n).sqrt();
            // Constant columns pass through unscaled
            if *s == 0.0 {
                *s = 1.0;
            }
        }

        Ok(Self { means, stds })
    }

    /// Standardize one row in place-free fashion.
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.means.len() {
            return Err(MonitorError::Schema(format!(
                "scaler fitted on {} features, got {}",
                self.means.len(),
                row.len()
            )));
        }
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }

    /// Number of features the scaler was fitted on.
    pub fn feature_count(&self) -> usize {
        self.means.len()
    }
}
