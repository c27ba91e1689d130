//! Core data types for the drift monitoring engine

pub mod table;
pub mod transaction;
pub mod verdict;

pub use table::FeatureTable;
pub use transaction::RawTransaction;
pub use verdict::{
    ComparisonMode, CycleReport, CycleState, DataDriftSummary, FeatureDriftVerdict,
    ModelDriftVerdict, RegressionScore, RetrainingDecision, TriggeredBy,
};
