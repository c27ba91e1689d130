//! Cycle report persistence

use crate::error::Result;
use crate::types::CycleReport;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Writes one JSON report per detection cycle into the report directory.
///
/// File names carry the wall-clock timestamp; a process-wide counter
/// disambiguates cycles that land on the same second so a report is never
/// overwritten.
#[derive(Debug)]
pub struct ReportWriter {
    dir: PathBuf,
    collision_seq: AtomicU64,
}

impl ReportWriter {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            collision_seq: AtomicU64::new(0),
        }
    }

    /// Serialize the report and write it under a unique file name.
    pub fn write(&self, report: &CycleReport) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let mut path = self.dir.join(format!("drift_results_{stamp}.json"));
        while path.exists() {
            let n = self.collision_seq.fetch_add(1, Ordering::Relaxed) + 1;
            path = self.dir.join(format!("drift_results_{stamp}_{n}.json"));
        }

        fs::write(&path, serde_json::to_vec_pretty(report)?)?;
        info!(report = %path.display(), cycle_id = %report.cycle_id, "Cycle report written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CycleState;

    #[test]
    fn test_report_written_and_parseable() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());

        let mut report = CycleReport::begin("current.csv");
        report.state = CycleState::Done;
        let path = writer.write(&report).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["state"], "done");
        assert_eq!(parsed["source_file"], "current.csv");
    }

    #[test]
    fn test_same_second_reports_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());

        let report = CycleReport::begin("current.csv");
        let a = writer.write(&report).unwrap();
        let b = writer.write(&report).unwrap();
        let c = writer.write(&report).unwrap();

        assert_ne!(a, b);
        assert_ne!(b, c);
        assert!(a.exists() && b.exists() && c.exists());
    }

    #[test]
    fn test_failed_cycle_report_carries_error() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());

        let mut report = CycleReport::begin("bad.csv");
        report.fail("schema mismatch: missing column");
        let path = writer.write(&report).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed["state"], "cycle_failed");
        assert_eq!(parsed["error"], "schema mismatch: missing column");
    }
}
