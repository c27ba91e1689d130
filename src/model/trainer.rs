//! Training pipeline: produces the frozen model + scaler for a new
//! reference snapshot

use crate::error::{MonitorError, Result};
use crate::model::{self, LinearModel, StandardScaler};
use crate::types::FeatureTable;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Training hyperparameters. Fixed iteration budget keeps a training run
/// bounded in time; the seed makes the train/test split reproducible.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainerConfig {
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default = "default_l2")]
    pub l2: f64,
}

fn default_test_fraction() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_learning_rate() -> f64 {
    0.05
}

fn default_iterations() -> usize {
    500
}

fn default_l2() -> f64 {
    1e-3
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            test_fraction: default_test_fraction(),
            seed: default_seed(),
            learning_rate: default_learning_rate(),
            iterations: default_iterations(),
            l2: default_l2(),
        }
    }
}

/// Metadata record saved alongside the model in the reference bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingMetadata {
    pub created_at: DateTime<Utc>,
    pub training_rows: usize,
    pub feature_count: usize,
    pub schema_version: u32,
    pub train_r2: f64,
    pub test_r2: f64,
}

/// Everything a training run produces.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: LinearModel,
    pub scaler: StandardScaler,
    pub metadata: TrainingMetadata,
}

/// Train a ridge regressor on a labeled feature table.
///
/// The scaler is fitted on the training split only; gradient descent runs
/// on standardized features and a standardized target, and the target
/// scaling is folded back into the weights so the stored model predicts
/// raw lifetime value from scaled features.
pub fn train(config: &TrainerConfig, table: &FeatureTable) -> Result<TrainingOutcome> {
    let labels = table.labels().ok_or_else(|| {
        MonitorError::LabelsUnavailable("training data must carry realized lifetime value".into())
    })?;
    let n = table.row_count();
    if n < 5 {
        return Err(MonitorError::Schema(format!(
            "need at least 5 rows to train, got {n}"
        )));
    }

    // Seeded shuffle, then hold out the tail as the test split
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(config.seed);
    for i in (1..n).rev() {
        let j = rng.random_range(0..=i);
        indices.swap(i, j);
    }
    let test_count = ((n as f64 * config.test_fraction).round() as usize).clamp(1, n - 1);
    let (train_idx, test_idx) = indices.split_at(n - test_count);

    let train_rows: Vec<Vec<f64>> = train_idx.iter().map(|&i| table.row(i)).collect();
    let scaler = StandardScaler::fit(&train_rows)?;

    let x_train: Vec<Vec<f64>> = train_rows
        .iter()
        .map(|r| scaler.transform_row(r))
        .collect::<Result<_>>()?;
    let y_train: Vec<f64> = train_idx.iter().map(|&i| labels[i]).collect();

    // Standardize the target for stable gradient steps
    let y_mean = y_train.iter().sum::<f64>() / y_train.len() as f64;
    let mut y_std = (y_train.iter().map(|y| (y - y_mean).powi(2)).sum::<f64>()
        / y_train.len() as f64)
        .sqrt();
    if y_std == 0.0 {
        y_std = 1.0;
    }
    let y_scaled: Vec<f64> = y_train.iter().map(|y| (y - y_mean) / y_std).collect();

    let d = scaler.feature_count();
    let mut weights = vec![0.0; d];
    let mut bias = 0.0;
    let m = x_train.len() as f64;

    for _ in 0..config.iterations {
        let mut grad_w = vec![0.0; d];
        let mut grad_b = 0.0;
        for (row, &y) in x_train.iter().zip(&y_scaled) {
            let pred: f64 =
                weights.iter().zip(row).map(|(w, x)| w * x).sum::<f64>() + bias;
            let err = pred - y;
            for (g, x) in grad_w.iter_mut().zip(row) {
                *g += err * x;
            }
            grad_b += err;
        }
        for (w, g) in weights.iter_mut().zip(&grad_w) {
            *w -= config.learning_rate * (2.0 * g / m + 2.0 * config.l2 * *w);
        }
        bias -= config.learning_rate * 2.0 * grad_b / m;
    }

    // Fold the target scaling back so predictions come out in raw units
    let raw_weights: Vec<f64> = weights.iter().map(|w| w * y_std).collect();
    let model = LinearModel::new(raw_weights, y_mean + bias * y_std);

    let evaluate = |idx: &[usize]| -> Result<f64> {
        let mut actual = Vec::with_capacity(idx.len());
        let mut predicted = Vec::with_capacity(idx.len());
        for &i in idx {
            actual.push(labels[i]);
            predicted.push(model.predict(&scaler.transform_row(&table.row(i))?)?);
        }
        Ok(model::r_squared(&actual, &predicted))
    };
    let train_r2 = evaluate(train_idx)?;
    let test_r2 = evaluate(test_idx)?;

    info!(
        rows = n,
        features = d,
        train_r2 = format!("{train_r2:.4}"),
        test_r2 = format!("{test_r2:.4}"),
        "Model trained"
    );

    Ok(TrainingOutcome {
        model,
        scaler,
        metadata: TrainingMetadata {
            created_at: Utc::now(),
            training_rows: n,
            feature_count: d,
            schema_version: 1,
            train_r2,
            test_r2,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Table whose label is an exact linear function of the features.
    fn linear_table(n: usize) -> FeatureTable {
        let mut t = FeatureTable::new(vec!["a".to_string(), "b".to_string()]);
        for i in 0..n {
            let a = (i % 17) as f64;
            let b = (i % 5) as f64 * 3.0;
            let y = 4.0 * a - 2.0 * b + 7.0;
            t.push_row(format!("c{i}"), vec![a, b], Some(y)).unwrap();
        }
        t
    }

    #[test]
    fn test_trainer_recovers_linear_relation() {
        let table = linear_table(200);
        let out = train(&TrainerConfig::default(), &table).unwrap();

        assert!(out.metadata.train_r2 > 0.99, "train r2 {}", out.metadata.train_r2);
        assert!(out.metadata.test_r2 > 0.99, "test r2 {}", out.metadata.test_r2);
        assert_eq!(out.metadata.training_rows, 200);
        assert_eq!(out.metadata.feature_count, 2);
    }

    #[test]
    fn test_trainer_is_deterministic() {
        let table = linear_table(100);
        let a = train(&TrainerConfig::default(), &table).unwrap();
        let b = train(&TrainerConfig::default(), &table).unwrap();
        assert_eq!(a.metadata.train_r2, b.metadata.train_r2);
        assert_eq!(a.metadata.test_r2, b.metadata.test_r2);
    }

    #[test]
    fn test_trainer_requires_labels() {
        let table = linear_table(50).without_labels();
        let err = train(&TrainerConfig::default(), &table);
        assert!(matches!(err, Err(MonitorError::LabelsUnavailable(_))));
    }

    #[test]
    fn test_trainer_rejects_tiny_tables() {
        let table = linear_table(3);
        assert!(train(&TrainerConfig::default(), &table).is_err());
    }
}
