//! Frozen model, scaler, and the training pipeline that produces them

pub mod linear;
pub mod scaler;
pub mod trainer;

pub use linear::LinearModel;
pub use scaler::StandardScaler;
pub use trainer::{train, TrainerConfig, TrainingMetadata, TrainingOutcome};

/// Coefficient of determination. A constant target with zero residual is a
/// perfect fit; a constant target with residual error scores zero.
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum();
    if ss_tot == 0.0 {
        return if ss_res < 1e-12 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Mean absolute error.
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).abs())
        .sum::<f64>()
        / actual.len() as f64
}

/// Root mean squared error.
pub fn root_mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    (actual
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64)
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_r_squared_perfect_fit() {
        let y = [1.0, 2.0, 3.0];
        assert!((r_squared(&y, &y) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_r_squared_mean_predictor_is_zero() {
        let y = [1.0, 2.0, 3.0];
        let p = [2.0, 2.0, 2.0];
        assert!(r_squared(&y, &p).abs() < 1e-12);
    }

    #[test]
    fn test_r_squared_constant_target() {
        let y = [5.0, 5.0, 5.0];
        assert_eq!(r_squared(&y, &y), 1.0);
        assert_eq!(r_squared(&y, &[4.0, 5.0, 6.0]), 0.0);
    }

    #[test]
    fn test_error_metrics() {
        let y = [1.0, 2.0, 3.0];
        let p = [2.0, 2.0, 2.0];
        assert!((mean_absolute_error(&y, &p) - 2.0 / 3.0).abs() < 1e-12);
        assert!((root_mean_squared_error(&y, &p) - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }
}
