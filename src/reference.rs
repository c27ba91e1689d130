//! Reference store: the immutable baseline bundle drift is measured against
//!
//! A bundle is a versioned directory holding the serialized model, the
//! fitted scaler, the ordered feature-name list, the training metadata,
//! and the reference feature table. Publishing a new bundle writes a fresh
//! directory and then atomically swaps a `LATEST` pointer file, so a
//! concurrently running detection cycle sees either the old or the new
//! reference in full, never a partial mix.

use crate::error::{MonitorError, Result};
use crate::model::{LinearModel, StandardScaler, TrainingMetadata, TrainingOutcome};
use crate::types::FeatureTable;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const MODEL_FILE: &str = "model.json";
const SCALER_FILE: &str = "scaler.json";
const FEATURES_FILE: &str = "features.json";
const METADATA_FILE: &str = "metadata.json";
const REFERENCE_DATA_FILE: &str = "reference_features.csv";
const POINTER_FILE: &str = "LATEST";

/// A fully loaded reference bundle. Read-only to the detection engine;
/// replaced wholesale by the training pipeline, never mutated in place.
#[derive(Debug, Clone)]
pub struct ReferenceSnapshot {
    pub model: LinearModel,
    pub scaler: StandardScaler,
    pub feature_schema: Vec<String>,
    pub metadata: TrainingMetadata,
    pub features: FeatureTable,
}

/// Directory-backed store of reference bundles.
#[derive(Debug, Clone)]
pub struct ReferenceStore {
    root: PathBuf,
}

impl ReferenceStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Publish a new bundle and swap the pointer to it.
    pub fn save(&self, outcome: &TrainingOutcome, features: &FeatureTable) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)?;

        let bundle_name = format!("bundle-{}", Utc::now().format("%Y%m%d_%H%M%S%f"));
        let bundle_dir = self.root.join(&bundle_name);
        fs::create_dir(&bundle_dir)?;

        fs::write(
            bundle_dir.join(MODEL_FILE),
            serde_json::to_vec_pretty(&outcome.model)?,
        )?;
        fs::write(
            bundle_dir.join(SCALER_FILE),
            serde_json::to_vec_pretty(&outcome.scaler)?,
        )?;
        fs::write(
            bundle_dir.join(FEATURES_FILE),
            serde_json::to_vec_pretty(&features.schema().to_vec())?,
        )?;
        fs::write(
            bundle_dir.join(METADATA_FILE),
            serde_json::to_vec_pretty(&outcome.metadata)?,
        )?;
        features.write_csv(bundle_dir.join(REFERENCE_DATA_FILE))?;

        // Write-new-then-swap-pointer: the rename is the commit point
        let tmp_pointer = self.root.join(format!("{POINTER_FILE}.tmp"));
        fs::write(&tmp_pointer, &bundle_name)?;
        fs::rename(&tmp_pointer, self.root.join(POINTER_FILE))?;

        info!(bundle = %bundle_dir.display(), "Reference bundle published");
        Ok(bundle_dir)
    }

    /// Load the bundle the pointer currently designates.
    ///
    /// Fails fast with `ReferenceArtifactCorrupt` when any of the pieces
    /// is missing or the feature-name list disagrees with the stored
    /// feature table.
    pub fn load(&self) -> Result<ReferenceSnapshot> {
        let pointer = self.root.join(POINTER_FILE);
        let bundle_name = fs::read_to_string(&pointer).map_err(|e| {
            MonitorError::ReferenceArtifactCorrupt(format!(
                "no reference pointer at {}: {e}",
                pointer.display()
            ))
        })?;
        let bundle_dir = self.root.join(bundle_name.trim());

        let read = |file: &str| -> Result<Vec<u8>> {
            fs::read(bundle_dir.join(file)).map_err(|e| {
                MonitorError::ReferenceArtifactCorrupt(format!(
                    "missing {file} in {}: {e}",
                    bundle_dir.display()
                ))
            })
        };
        let model: LinearModel = serde_json::from_slice(&read(MODEL_FILE)?)
            .map_err(|e| MonitorError::ReferenceArtifactCorrupt(format!("bad {MODEL_FILE}: {e}")))?;
        let scaler: StandardScaler = serde_json::from_slice(&read(SCALER_FILE)?).map_err(|e| {
            MonitorError::ReferenceArtifactCorrupt(format!("bad {SCALER_FILE}: {e}"))
        })?;
        let feature_schema: Vec<String> = serde_json::from_slice(&read(FEATURES_FILE)?)
            .map_err(|e| {
                MonitorError::ReferenceArtifactCorrupt(format!("bad {FEATURES_FILE}: {e}"))
            })?;
        let metadata: TrainingMetadata = serde_json::from_slice(&read(METADATA_FILE)?)
            .map_err(|e| {
                MonitorError::ReferenceArtifactCorrupt(format!("bad {METADATA_FILE}: {e}"))
            })?;

        let data_path = bundle_dir.join(REFERENCE_DATA_FILE);
        if !data_path.exists() {
            return Err(MonitorError::ReferenceArtifactCorrupt(format!(
                "missing {REFERENCE_DATA_FILE} in {}",
                bundle_dir.display()
            )));
        }
        let features = FeatureTable::read_csv(&data_path)?;

        if features.schema() != feature_schema.as_slice() {
            return Err(MonitorError::ReferenceArtifactCorrupt(
                "feature-name list does not match the stored feature table".to_string(),
            ));
        }
        if model.feature_count() != feature_schema.len()
            || scaler.feature_count() != feature_schema.len()
        {
            return Err(MonitorError::ReferenceArtifactCorrupt(format!(
                "model expects {} features, scaler {}, schema has {}",
                model.feature_count(),
                scaler.feature_count(),
                feature_schema.len()
            )));
        }
        if features.labels().is_none() {
            return Err(MonitorError::ReferenceArtifactCorrupt(
                "reference feature table has no realized-value labels".to_string(),
            ));
        }

        info!(
            bundle = %bundle_dir.display(),
            features = feature_schema.len(),
            rows = features.row_count(),
            "Reference bundle loaded"
        );

        Ok(ReferenceSnapshot {
            model,
            scaler,
            feature_schema,
            metadata,
            features,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{train, TrainerConfig};

    fn labeled_table(n: usize) -> FeatureTable {
        let mut t = FeatureTable::new(vec!["a".to_string(), "b".to_string()]);
        for i in 0..n {
            let a = (i % 11) as f64;
            let b = (i % 4) as f64;
            t.push_row(format!("c{i}"), vec![a, b], Some(2.0 * a + b))
                .unwrap();
        }
        t
    }

    fn outcome(table: &FeatureTable) -> TrainingOutcome {
        train(&TrainerConfig::default(), table).unwrap()
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReferenceStore::new(dir.path());
        let table = labeled_table(50);

        store.save(&outcome(&table), &table).unwrap();
        let snapshot = store.load().unwrap();

        assert_eq!(snapshot.feature_schema, table.schema());
        assert_eq!(snapshot.features.row_count(), 50);
        assert_eq!(snapshot.metadata.training_rows, 50);
    }

    #[test]
    fn test_pointer_swaps_to_newest_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReferenceStore::new(dir.path());
        let table = labeled_table(50);
        let out = outcome(&table);

        let first = store.save(&out, &table).unwrap();
        let second = store.save(&out, &table).unwrap();
        assert_ne!(first, second);

        let pointer = std::fs::read_to_string(dir.path().join(POINTER_FILE)).unwrap();
        assert_eq!(
            second.file_name().unwrap().to_str().unwrap(),
            pointer.trim()
        );
        // The old bundle stays intact for cycles still reading it
        assert!(first.join(MODEL_FILE).exists());
    }

    #[test]
    fn test_missing_piece_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReferenceStore::new(dir.path());
        let table = labeled_table(50);

        let bundle = store.save(&outcome(&table), &table).unwrap();
        std::fs::remove_file(bundle.join(SCALER_FILE)).unwrap();

        let err = store.load();
        assert!(matches!(
            err,
            Err(MonitorError::ReferenceArtifactCorrupt(_))
        ));
    }

    #[test]
    fn test_empty_store_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReferenceStore::new(dir.path());
        assert!(matches!(
            store.load(),
            Err(MonitorError::ReferenceArtifactCorrupt(_))
        ));
    }

    #[test]
    fn test_schema_mismatch_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReferenceStore::new(dir.path());
        let table = labeled_table(50);

        let bundle = store.save(&outcome(&table), &table).unwrap();
        std::fs::write(
            bundle.join(FEATURES_FILE),
            serde_json::to_vec(&vec!["a".to_string()]).unwrap(),
        )
        .unwrap();

        assert!(matches!(
            store.load(),
            Err(MonitorError::ReferenceArtifactCorrupt(_))
        ));
    }
}
