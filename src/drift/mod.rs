//! Drift evaluators: feature-distribution and model-performance comparison

pub mod data;
pub mod model;
pub mod stats;

pub use data::{detect_data_drift, DataDriftConfig};
pub use model::{detect_model_drift, ModelDriftConfig};
