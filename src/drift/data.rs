//! Data-drift evaluator: per-feature distribution comparison

use crate::drift::stats;
use crate::features::CATEGORY_PREFIX;
use crate::types::{DataDriftSummary, FeatureDriftVerdict, FeatureTable};
use serde::Deserialize;
use tracing::{debug, info};

/// Thresholds for the data-drift evaluator. Defaults match the documented
/// policy: p < 0.05 marks a feature drifted, one drifted feature raises the
/// per-feature flag, and 30% of features drifted raises the dataset-level
/// flag.
#[derive(Debug, Clone, Deserialize)]
pub struct DataDriftConfig {
    /// Significance threshold for the two-sample tests
    #[serde(default = "default_p_value_threshold")]
    pub p_value_threshold: f64,
    /// Share of drifted features that flags dataset-level drift
    #[serde(default = "default_share_threshold")]
    pub share_threshold: f64,
    /// Features with fewer samples than this on either side are skipped
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    /// Bounded compute: columns larger than this are stride-subsampled
    #[serde(default = "default_max_samples")]
    pub max_samples_per_feature: usize,
}

fn default_p_value_threshold() -> f64 {
    0.05
}

fn default_share_threshold() -> f64 {
    0.30
}

fn default_min_samples() -> usize {
    30
}

fn default_max_samples() -> usize {
    10_000
}

impl Default for DataDriftConfig {
    fn default() -> Self {
        Self {
            p_value_threshold: default_p_value_threshold(),
            share_threshold: default_share_threshold(),
            min_samples: default_min_samples(),
            max_samples_per_feature: default_max_samples(),
        }
    }
}

/// Compare reference and current feature distributions.
///
/// Pure over its inputs: neither table is mutated. A feature missing from
/// the current schema is treated as zero-occurrence rather than missing
/// data, so a country that vanished from recent data never aborts the
/// cycle.
pub fn detect_data_drift(
    config: &DataDriftConfig,
    reference: &FeatureTable,
    current: &FeatureTable,
) -> (Vec<FeatureDriftVerdict>, DataDriftSummary) {
    let mut verdicts = Vec::with_capacity(reference.schema().len());
    let zeros = vec![0.0; current.row_count()];

    for name in reference.schema() {
        let ref_col = match reference.column(name) {
            Some(col) => col,
            None => continue,
        };
        let cur_col = current.column(name).unwrap_or(&zeros);

        let ref_sample = subsample(ref_col, config.max_samples_per_feature);
        let cur_sample = subsample(cur_col, config.max_samples_per_feature);

        if ref_sample.len() < config.min_samples || cur_sample.len() < config.min_samples {
            debug!(
                feature = %name,
                reference_samples = ref_sample.len(),
                current_samples = cur_sample.len(),
                "Skipping drift test, too few samples"
            );
            verdicts.push(FeatureDriftVerdict {
                feature_name: name.clone(),
                statistic_name: "insufficient_data".to_string(),
                statistic_value: 1.0,
                is_drifted: false,
            });
            continue;
        }

        let (statistic_name, p_value) = if name.starts_with(CATEGORY_PREFIX) {
            let (_, p) = stats::chi_square_binary(&ref_sample, &cur_sample);
            ("chi_square", p)
        } else {
            let d = stats::ks_statistic(&ref_sample, &cur_sample);
            ("ks", stats::ks_p_value(d, ref_sample.len(), cur_sample.len()))
        };

        verdicts.push(FeatureDriftVerdict {
            feature_name: name.clone(),
            statistic_name: statistic_name.to_string(),
            statistic_value: p_value,
            is_drifted: p_value < config.p_value_threshold,
        });
    }

    let total = verdicts.len();
    let drifted = verdicts.iter().filter(|v| v.is_drifted).count();
    let share = if total > 0 {
        drifted as f64 / total as f64
    } else {
        0.0
    };
    let summary = DataDriftSummary {
        drifted_feature_count: drifted,
        total_feature_count: total,
        drift_share: share,
        any_feature_drifted: drifted >= 1,
        dataset_drift_detected: total > 0 && share >= config.share_threshold,
    };

    info!(
        drifted_features = drifted,
        total_features = total,
        drift_share = format!("{share:.4}"),
        dataset_drift = summary.dataset_drift_detected,
        "Data drift evaluated"
    );

    (verdicts, summary)
}

/// Deterministic stride subsample for bounded test cost.
fn subsample(values: &[f64], max: usize) -> Vec<f64> {
    if values.len() <= max {
        return values.to_vec();
    }
    let stride = values.len().div_ceil(max);
    values.iter().step_by(stride).copied().collect()
}
