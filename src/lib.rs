//! CLV Drift Monitor Library
//!
//! Drift evaluation and retraining decisions for a customer-lifetime-value
//! regression model. Builds per-customer RFM features from raw retail
//! transactions, compares them against a frozen reference bundle, and
//! decides whether the model needs retraining.

pub mod config;
pub mod decision;
pub mod drift;
pub mod error;
pub mod features;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod reference;
pub mod report;
pub mod trigger;
pub mod types;

pub use config::AppConfig;
pub use error::{MonitorError, Result};
pub use features::FeatureBuilder;
pub use pipeline::MonitorPipeline;
pub use reference::{ReferenceSnapshot, ReferenceStore};
pub use types::{CycleReport, RetrainingDecision};
