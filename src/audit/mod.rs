//! Extraction audit trail.
//!
//! Tracks how much data each run consumed and produced, without storing
//! any signal values.

pub mod log;

pub use log::{
    create_shared_log, create_shared_log_with_persistence, ExtractionLog, ExtractionStats,
    SharedExtractionLog, SignalStats,
};
