//! Cumulative extraction statistics.
//!
//! Counts what the pipeline consumed and produced across runs, so users can
//! see how much of their data survived windowing, PPG failures and gap
//! filling.

use crate::recording::Signal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Per-signal counters.
#[derive(Debug, Default)]
struct SignalCounters {
    samples: AtomicU64,
    windows: AtomicU64,
}

/// Extraction statistics, updated concurrently by pipeline passes.
#[derive(Debug)]
pub struct ExtractionLog {
    recordings_processed: AtomicU64,
    recordings_failed: AtomicU64,
    acc: SignalCounters,
    bvp: SignalCounters,
    temp: SignalCounters,
    /// BVP windows with at least one missing HRV feature
    bvp_windows_incomplete: AtomicU64,
    rows_emitted: AtomicU64,
    rows_dropped: AtomicU64,
    /// When these counters started accumulating
    since: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl ExtractionLog {
    pub fn new() -> Self {
        Self {
            recordings_processed: AtomicU64::new(0),
            recordings_failed: AtomicU64::new(0),
            acc: SignalCounters::default(),
            bvp: SignalCounters::default(),
            temp: SignalCounters::default(),
            bvp_windows_incomplete: AtomicU64::new(0),
            rows_emitted: AtomicU64::new(0),
            rows_dropped: AtomicU64::new(0),
            since: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a log that loads from and saves to `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            warn!("could not load previous extraction stats: {e}");
        }

        log
    }

    fn counters(&self, signal: Signal) -> &SignalCounters {
        match signal {
            Signal::Accelerometer => &self.acc,
            Signal::Bvp => &self.bvp,
            Signal::Temperature => &self.temp,
        }
    }

    /// Record the clean samples fed into one featurizer.
    pub fn record_samples(&self, signal: Signal, count: u64) {
        self.counters(signal)
            .samples
            .fetch_add(count, Ordering::Relaxed);
    }

    /// Record the windows one featurizer produced.
    pub fn record_windows(&self, signal: Signal, count: u64) {
        self.counters(signal)
            .windows
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_incomplete_bvp_windows(&self, count: u64) {
        self.bvp_windows_incomplete
            .fetch_add(count, Ordering::Relaxed);
    }

    /// Record the rows kept and dropped by a merge.
    pub fn record_rows(&self, emitted: u64, dropped: u64) {
        self.rows_emitted.fetch_add(emitted, Ordering::Relaxed);
        self.rows_dropped.fetch_add(dropped, Ordering::Relaxed);
    }

    /// Record a run that produced a feature table.
    pub fn record_success(&self) {
        self.recordings_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a run that produced no features.
    pub fn record_failure(&self) {
        self.recordings_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> ExtractionStats {
        let signal = |c: &SignalCounters| SignalStats {
            samples: c.samples.load(Ordering::Relaxed),
            windows: c.windows.load(Ordering::Relaxed),
        };
        ExtractionStats {
            recordings_processed: self.recordings_processed.load(Ordering::Relaxed),
            recordings_failed: self.recordings_failed.load(Ordering::Relaxed),
            acc: signal(&self.acc),
            bvp: signal(&self.bvp),
            temp: signal(&self.temp),
            bvp_windows_incomplete: self.bvp_windows_incomplete.load(Ordering::Relaxed),
            rows_emitted: self.rows_emitted.load(Ordering::Relaxed),
            rows_dropped: self.rows_dropped.load(Ordering::Relaxed),
            since: self.since,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Extraction Statistics (since {}):\n\
             - Recordings processed: {}\n\
             - Recordings without features: {}\n\
             - ACC samples / windows: {} / {}\n\
             - BVP samples / windows: {} / {}\n\
             - TEMP samples / windows: {} / {}\n\
             - BVP windows with missing HRV: {}\n\
             - Feature rows emitted: {}\n\
             - Feature rows dropped: {}",
            stats.since.to_rfc3339(),
            stats.recordings_processed,
            stats.recordings_failed,
            stats.acc.samples,
            stats.acc.windows,
            stats.bvp.samples,
            stats.bvp.windows,
            stats.temp.samples,
            stats.temp.windows,
            stats.bvp_windows_incomplete,
            stats.rows_emitted,
            stats.rows_dropped,
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let persisted = PersistedStats {
                stats: self.stats(),
                last_updated: Utc::now(),
            };
            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        let Some(ref path) = self.persist_path else {
            return Ok(());
        };
        if !path.exists() {
            return Ok(());
        }

        let content = std::fs::read_to_string(path)?;
        let persisted: PersistedStats =
            serde_json::from_str(&content).map_err(std::io::Error::other)?;
        let s = persisted.stats;

        self.recordings_processed
            .store(s.recordings_processed, Ordering::Relaxed);
        self.recordings_failed
            .store(s.recordings_failed, Ordering::Relaxed);
        for (counters, loaded) in [(&self.acc, s.acc), (&self.bvp, s.bvp), (&self.temp, s.temp)] {
            counters.samples.store(loaded.samples, Ordering::Relaxed);
            counters.windows.store(loaded.windows, Ordering::Relaxed);
        }
        self.bvp_windows_incomplete
            .store(s.bvp_windows_incomplete, Ordering::Relaxed);
        self.rows_emitted.store(s.rows_emitted, Ordering::Relaxed);
        self.rows_dropped.store(s.rows_dropped, Ordering::Relaxed);
        self.since = s.since;
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.recordings_processed.store(0, Ordering::Relaxed);
        self.recordings_failed.store(0, Ordering::Relaxed);
        for counters in [&self.acc, &self.bvp, &self.temp] {
            counters.samples.store(0, Ordering::Relaxed);
            counters.windows.store(0, Ordering::Relaxed);
        }
        self.bvp_windows_incomplete.store(0, Ordering::Relaxed);
        self.rows_emitted.store(0, Ordering::Relaxed);
        self.rows_dropped.store(0, Ordering::Relaxed);
    }
}

impl Default for ExtractionLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Sample and window totals of one signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalStats {
    pub samples: u64,
    pub windows: u64,
}

/// Snapshot of extraction statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub recordings_processed: u64,
    pub recordings_failed: u64,
    pub acc: SignalStats,
    pub bvp: SignalStats,
    pub temp: SignalStats,
    pub bvp_windows_incomplete: u64,
    pub rows_emitted: u64,
    pub rows_dropped: u64,
    pub since: DateTime<Utc>,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    #[serde(flatten)]
    stats: ExtractionStats,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared extraction log.
pub type SharedExtractionLog = Arc<ExtractionLog>;

pub fn create_shared_log() -> SharedExtractionLog {
    Arc::new(ExtractionLog::new())
}

pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedExtractionLog {
    Arc::new(ExtractionLog::with_persistence(path))
}
