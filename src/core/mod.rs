//! Core feature extraction.
//!
//! This module contains:
//! - Sliding-window generation over fixed-rate signals
//! - Per-signal featurizers (accelerometer, BVP/HRV, temperature)
//! - Nearest-timestamp alignment and gap filling
//! - The schema contract and report export

pub mod accelerometer;
pub mod export;
pub mod hrv;
pub mod merge;
pub mod pipeline;
pub mod ppg;
pub mod schema;
pub mod stats;
pub mod table;
pub mod temperature;
pub mod windowing;

// Re-export commonly used types
pub use accelerometer::{extract_acc_features, AccFeatures, AxisFeatures};
pub use export::{ExportError, ExportFormat, FeatureReport, ReportBuilder, PRODUCER_NAME};
pub use merge::{merge_features, FeatureRow, HrvFeatures};
pub use pipeline::{preprocess, FeaturePipeline, PipelineError};
pub use ppg::{extract_bvp_features, PpgFeatures};
pub use schema::{validate_columns, SchemaError, FEATURE_SCHEMA_VERSION, MODEL_INPUT_COLUMNS};
pub use table::{FeatureRecord, FeatureTable};
pub use temperature::{extract_temp_features, TempFeatures};
pub use windowing::{Window, WindowError, WindowParams};
