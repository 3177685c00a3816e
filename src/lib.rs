//! Synheart Stress Features - windowed wearable-signal features for stress
//! classification.
//!
//! Converts a recording of tri-axial acceleration (ACC), blood volume pulse
//! (BVP) and skin temperature (TEMP) into one feature row per accelerometer
//! window, ready for a binary stress classifier.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    Synheart Stress Features                      │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌──────────────┐   ┌────────────────────────┐   │
//! │  │ Recording │──▶│ ACC  5s/0.25s│──▶│                        │   │
//! │  │   (CSV)   │──▶│ BVP  60s/5s  │──▶│  Nearest-time merge    │   │
//! │  │           │──▶│ TEMP 60s/0.25│──▶│  ffill → bfill → drop  │   │
//! │  └───────────┘   └──────────────┘   └────────────────────────┘   │
//! │                                                │                 │
//! │                         ┌──────────────┐       ▼                 │
//! │                         │ Extraction   │   ┌──────────────┐      │
//! │                         │    Log       │   │ Feature      │      │
//! │                         └──────────────┘   │ Report       │      │
//! │                                            └──────────────┘      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use synheart_stress_features::{config::ColumnConfig, core, recording};
//!
//! let recording = recording::load_csv("S2.csv".as_ref(), &ColumnConfig::default())?;
//! let table = core::preprocess(&recording)?;
//! for row in table.rows() {
//!     let inputs: [f64; 23] = row.model_input();
//!     println!("{:.2} {:?}", row.timestamp, inputs);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod audit;
pub mod config;
pub mod core;
pub mod recording;

// Re-export key types at crate root for convenience
pub use audit::{ExtractionLog, ExtractionStats, SharedExtractionLog};
pub use config::{ColumnConfig, Config, PipelineConfig, WindowConfig};
pub use core::{preprocess, FeaturePipeline, FeatureRow, FeatureTable, PipelineError};
pub use recording::{RawRecording, RecordingError, Signal};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
