//! Raw recording input.
//!
//! Recordings are loaded whole into memory. Each signal is cleaned on its
//! own before windowing, since signals sampled at different rates leave
//! different cells empty.

pub mod csv;
pub mod types;

pub use self::csv::{from_reader, load_csv, RecordingError};
pub use types::{RawRecording, RecordingSummary, Signal, SignalCounts};
