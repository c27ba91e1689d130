//! Column-major feature table shared by the reference and current snapshots

use crate::error::{MonitorError, Result};
use std::path::Path;

/// Per-entity feature table with a stable, ordered schema.
///
/// Stored column-major so the drift evaluator can hand whole feature
/// columns to the statistical tests without copying rows. Labels (realized
/// CLV) are optional: a current snapshot without ground truth simply
/// carries `None` and the model-drift verdict degrades.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    schema: Vec<String>,
    columns: Vec<Vec<f64>>,
    labels: Option<Vec<f64>>,
    customer_ids: Vec<String>,
}

impl FeatureTable {
    /// Create an empty table with the given column schema.
    pub fn new(schema: Vec<String>) -> Self {
        let columns = vec![Vec::new(); schema.len()];
        Self {
            schema,
            columns,
            labels: None,
            customer_ids: Vec::new(),
        }
    }

    /// Append one entity row. Value count must match the schema, and label
    /// presence must be consistent across all rows.
    pub fn push_row(
        &mut self,
        customer_id: String,
        values: Vec<f64>,
        label: Option<f64>,
    ) -> Result<()> {
        if values.len() != self.schema.len() {
            return Err(MonitorError::Schema(format!(
                "row for {} has {} values, schema has {} columns",
                customer_id,
                values.len(),
                self.schema.len()
            )));
        }
        match (label, &mut self.labels) {
            (Some(l), Some(labels)) => labels.push(l),
            (Some(l), labels @ None) if self.customer_ids.is_empty() => {
                *labels = Some(vec![l]);
            }
            (None, None) => {}
            _ => {
                return Err(MonitorError::Schema(
                    "label presence must be consistent across rows".to_string(),
                ));
            }
        }
        for (col, v) in self.columns.iter_mut().zip(values) {
            col.push(v);
        }
        self.customer_ids.push(customer_id);
        Ok(())
    }

    /// Ordered feature column names.
    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    /// Number of entity rows.
    pub fn row_count(&self) -> usize {
        self.customer_ids.len()
    }

    /// Values of one feature column, if present in the schema.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.schema
            .iter()
            .position(|c| c == name)
            .map(|i| self.columns[i].as_slice())
    }

    /// One entity row in schema order.
    pub fn row(&self, index: usize) -> Vec<f64> {
        self.columns.iter().map(|col| col[index]).collect()
    }

    /// Realized lifetime values, when the snapshot has ground truth.
    pub fn labels(&self) -> Option<&[f64]> {
        self.labels.as_deref()
    }

    /// Entity identifiers, one per row.
    pub fn customer_ids(&self) -> &[String] {
        &self.customer_ids
    }

    /// Same table with ground truth removed.
    pub fn without_labels(mut self) -> Self {
        self.labels = None;
        self
    }

    /// Write the table to CSV: `customer_id`, feature columns, then `clv`
    /// when labels are present.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path.as_ref())?;

        let mut header: Vec<&str> = vec!["customer_id"];
        header.extend(self.schema.iter().map(String::as_str));
        if self.labels.is_some() {
            header.push("clv");
        }
        writer.write_record(&header)?;

        for i in 0..self.row_count() {
            let mut record = vec![self.customer_ids[i].clone()];
            record.extend(self.columns.iter().map(|col| col[i].to_string()));
            if let Some(labels) = &self.labels {
                record.push(labels[i].to_string());
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read a table previously produced by [`FeatureTable::write_csv`].
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        if headers.first().map(String::as_str) != Some("customer_id") {
            return Err(MonitorError::Schema(
                "feature table csv must start with customer_id".to_string(),
            ));
        }
        let has_labels = headers.last().map(String::as_str) == Some("clv");
        let feature_end = if has_labels {
            headers.len() - 1
        } else {
            headers.len()
        };
        let schema: Vec<String> = headers[1..feature_end].to_vec();

        let mut table = Self::new(schema);
        for record in reader.records() {
            let record = record?;
            let customer_id = record
                .get(0)
                .ok_or_else(|| MonitorError::Schema("empty record".to_string()))?
                .to_string();
            let parse = |s: &str| -> Result<f64> {
                s.parse::<f64>()
                    .map_err(|e| MonitorError::Schema(format!("bad numeric value {s:?}: {e}")))
            };
            let mut values = Vec::with_capacity(feature_end - 1);
            for field in record.iter().take(feature_end).skip(1) {
                values.push(parse(field)?);
            }
            let label = if has_labels {
                Some(parse(record.get(feature_end).ok_or_else(|| {
                    MonitorError::Schema("missing clv field".to_string())
                })?)?)
            } else {
                None
            };
            table.push_row(customer_id, values, label)?;
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_column_table() -> FeatureTable {
        let mut t = FeatureTable::new(vec!["recency".to_string(), "monetary".to_string()]);
        t.push_row("a".to_string(), vec![3.0, 100.0], Some(1200.0))
            .unwrap();
        t.push_row("b".to_string(), vec![10.0, 55.5], Some(300.0))
            .unwrap();
        t
    }

    #[test]
    fn test_column_access() {
        let t = two_column_table();
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.column("monetary").unwrap(), &[100.0, 55.5]);
        assert!(t.column("unknown").is_none());
        assert_eq!(t.row(1), vec![10.0, 55.5]);
    }

    #[test]
    fn test_row_width_mismatch() {
        let mut t = FeatureTable::new(vec!["recency".to_string()]);
        let err = t.push_row("a".to_string(), vec![1.0, 2.0], None);
        assert!(err.is_err());
    }

    #[test]
    fn test_inconsistent_labels_rejected() {
        let mut t = FeatureTable::new(vec!["recency".to_string()]);
        t.push_row("a".to_string(), vec![1.0], Some(5.0)).unwrap();
        assert!(t.push_row("b".to_string(), vec![2.0], None).is_err());
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.csv");

        let t = two_column_table();
        t.write_csv(&path).unwrap();

        let loaded = FeatureTable::read_csv(&path).unwrap();
        assert_eq!(loaded.schema(), t.schema());
        assert_eq!(loaded.row_count(), 2);
        assert_eq!(loaded.column("recency").unwrap(), &[3.0, 10.0]);
        assert_eq!(loaded.labels().unwrap(), &[1200.0, 300.0]);
    }

    #[test]
    fn test_csv_round_trip_without_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.csv");

        let t = two_column_table().without_labels();
        t.write_csv(&path).unwrap();

        let loaded = FeatureTable::read_csv(&path).unwrap();
        assert!(loaded.labels().is_none());
        assert_eq!(loaded.row_count(), 2);
    }
}
