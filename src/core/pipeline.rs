//! End-to-end feature extraction for one recording.
//!
//! clean → window and featurize each signal → align on the accelerometer
//! grid → forward fill → backward fill → drop incomplete rows.
//!
//! The three featurizer passes are independent. They run one after another,
//! or on scoped threads when the pipeline is configured as parallel; the
//! merged result is the same either way. A shared cancel flag is checked
//! between passes.

use crate::audit::SharedExtractionLog;
use crate::config::{PipelineConfig, WindowConfig};
use crate::core::accelerometer::{extract_acc_features, AccFeatures};
use crate::core::merge::{merge_features, FeatureRow};
use crate::core::ppg::{extract_bvp_features, PpgFeatures};
use crate::core::table::FeatureTable;
use crate::core::temperature::{extract_temp_features, TempFeatures};
use crate::core::windowing::{WindowError, WindowParams};
use crate::recording::{RawRecording, Signal};
use crossbeam_channel::unbounded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reasons a recording yields no feature table.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// A signal's window geometry is invalid
    InvalidWindow { signal: Signal, source: WindowError },
    /// A signal is shorter than one window
    InsufficientData {
        signal: Signal,
        samples: usize,
        required: usize,
    },
    /// Every merged row still had a missing value after filling
    UnresolvableGaps { dropped: usize },
    /// The cancel flag was raised
    Cancelled,
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::InvalidWindow { signal, source } => {
                write!(f, "invalid {signal} window configuration: {source}")
            }
            PipelineError::InsufficientData {
                signal,
                samples,
                required,
            } => write!(
                f,
                "insufficient {signal} data: {samples} samples, need at least {required}"
            ),
            PipelineError::UnresolvableGaps { dropped } => write!(
                f,
                "all {dropped} merged rows still had missing features after filling"
            ),
            PipelineError::Cancelled => write!(f, "feature extraction cancelled"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::InvalidWindow { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Output of one featurizer pass.
enum Pass {
    Acc(FeatureTable<AccFeatures>),
    Bvp(FeatureTable<PpgFeatures>),
    Temp(FeatureTable<TempFeatures>),
}

type Tables = (
    FeatureTable<AccFeatures>,
    FeatureTable<PpgFeatures>,
    FeatureTable<TempFeatures>,
);

/// Clean per-signal inputs for the featurizer passes.
struct Signals {
    acc: Vec<[f64; 3]>,
    bvp: Vec<f64>,
    temp: Vec<f64>,
}

/// Window geometry of all three signals, in samples.
#[derive(Debug, Clone, Copy)]
struct Geometry {
    acc: WindowParams,
    bvp: WindowParams,
    temp: WindowParams,
}

/// Feature extraction pipeline.
pub struct FeaturePipeline {
    config: PipelineConfig,
    log: Option<SharedExtractionLog>,
    cancel: Arc<AtomicBool>,
}

impl FeaturePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            log: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Record sample, window and row counts into `log`.
    pub fn with_log(mut self, log: SharedExtractionLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Flag that stops a running extraction at the next pass boundary.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Extract the merged feature table of one recording.
    pub fn run(&self, recording: &RawRecording) -> Result<FeatureTable<FeatureRow>, PipelineError> {
        let result = self.extract(recording);
        if let Some(ref log) = self.log {
            match &result {
                Ok(_) => log.record_success(),
                Err(PipelineError::Cancelled) => {}
                Err(_) => log.record_failure(),
            }
        }
        result
    }

    fn extract(&self, recording: &RawRecording) -> Result<FeatureTable<FeatureRow>, PipelineError> {
        let geometry = self.geometry()?;

        info!("Cleaning signals");
        let signals = Signals {
            acc: recording.clean_acc(),
            bvp: recording.clean_bvp(),
            temp: recording.clean_temp(),
        };
        debug!(
            acc = signals.acc.len(),
            bvp = signals.bvp.len(),
            temp = signals.temp.len(),
            "clean samples"
        );
        self.check_cancelled()?;

        let (acc, bvp, temp) = if self.config.parallel {
            self.featurize_parallel(&signals, geometry)?
        } else {
            self.featurize_sequential(&signals, geometry)?
        };
        self.check_cancelled()?;

        for (signal, empty, samples, params) in [
            (Signal::Accelerometer, acc.is_empty(), signals.acc.len(), geometry.acc),
            (Signal::Bvp, bvp.is_empty(), signals.bvp.len(), geometry.bvp),
            (Signal::Temperature, temp.is_empty(), signals.temp.len(), geometry.temp),
        ] {
            if empty {
                return Err(PipelineError::InsufficientData {
                    signal,
                    samples,
                    required: params.size,
                });
            }
        }

        info!("Merging feature tables");
        let merged = merge_features(&acc, &bvp, &temp);
        info!(
            filled = merged.filled,
            dropped = merged.dropped,
            "Filled missing values"
        );

        if let Some(ref log) = self.log {
            log.record_rows(merged.table.len() as u64, merged.dropped as u64);
        }
        if merged.table.is_empty() {
            return Err(PipelineError::UnresolvableGaps {
                dropped: merged.dropped,
            });
        }

        info!(rows = merged.table.len(), "Feature extraction complete");
        Ok(merged.table)
    }

    fn geometry(&self) -> Result<Geometry, PipelineError> {
        let params = |signal: Signal, window: &WindowConfig| {
            window
                .params()
                .map_err(|source| PipelineError::InvalidWindow { signal, source })
        };
        Ok(Geometry {
            acc: params(Signal::Accelerometer, &self.config.acc)?,
            bvp: params(Signal::Bvp, &self.config.bvp)?,
            temp: params(Signal::Temperature, &self.config.temp)?,
        })
    }

    fn check_cancelled(&self) -> Result<(), PipelineError> {
        if self.cancel.load(Ordering::SeqCst) {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn featurize_sequential(
        &self,
        signals: &Signals,
        geometry: Geometry,
    ) -> Result<Tables, PipelineError> {
        let acc = self.acc_pass(&signals.acc, geometry.acc);
        self.check_cancelled()?;
        let bvp = self.bvp_pass(&signals.bvp, geometry.bvp);
        self.check_cancelled()?;
        let temp = self.temp_pass(&signals.temp, geometry.temp);
        Ok((acc, bvp, temp))
    }

    fn featurize_parallel(
        &self,
        signals: &Signals,
        geometry: Geometry,
    ) -> Result<Tables, PipelineError> {
        let (sender, receiver) = unbounded();

        std::thread::scope(|scope| {
            let tx = sender.clone();
            scope.spawn(move || {
                if !self.cancel.load(Ordering::SeqCst) {
                    let _ = tx.send(Pass::Acc(self.acc_pass(&signals.acc, geometry.acc)));
                }
            });
            let tx = sender.clone();
            scope.spawn(move || {
                if !self.cancel.load(Ordering::SeqCst) {
                    let _ = tx.send(Pass::Bvp(self.bvp_pass(&signals.bvp, geometry.bvp)));
                }
            });
            let tx = sender.clone();
            scope.spawn(move || {
                if !self.cancel.load(Ordering::SeqCst) {
                    let _ = tx.send(Pass::Temp(self.temp_pass(&signals.temp, geometry.temp)));
                }
            });
        });
        drop(sender);

        let (mut acc, mut bvp, mut temp) = (None, None, None);
        for pass in receiver.iter() {
            match pass {
                Pass::Acc(table) => acc = Some(table),
                Pass::Bvp(table) => bvp = Some(table),
                Pass::Temp(table) => temp = Some(table),
            }
        }

        match (acc, bvp, temp) {
            (Some(acc), Some(bvp), Some(temp)) => Ok((acc, bvp, temp)),
            _ => Err(PipelineError::Cancelled),
        }
    }

    fn acc_pass(&self, samples: &[[f64; 3]], params: WindowParams) -> FeatureTable<AccFeatures> {
        info!("Extracting ACC features");
        let rate = self.config.acc.sampling_rate_hz;
        let table = extract_acc_features(samples, rate, params);
        self.record_pass(Signal::Accelerometer, samples.len(), table.len());
        table
    }

    fn bvp_pass(&self, samples: &[f64], params: WindowParams) -> FeatureTable<PpgFeatures> {
        info!("Extracting BVP features");
        let rate = self.config.bvp.sampling_rate_hz;
        let table = extract_bvp_features(samples, rate, params);
        self.record_pass(Signal::Bvp, samples.len(), table.len());

        let incomplete = table.rows().iter().filter(|r| !r.is_complete()).count();
        if incomplete > 0 {
            debug!(incomplete, windows = table.len(), "BVP windows with missing HRV");
        }
        if let Some(ref log) = self.log {
            log.record_incomplete_bvp_windows(incomplete as u64);
        }
        table
    }

    fn temp_pass(&self, samples: &[f64], params: WindowParams) -> FeatureTable<TempFeatures> {
        info!("Extracting TEMP features");
        let rate = self.config.temp.sampling_rate_hz;
        let table = extract_temp_features(samples, rate, params);
        self.record_pass(Signal::Temperature, samples.len(), table.len());
        table
    }

    fn record_pass(&self, signal: Signal, samples: usize, windows: usize) {
        if windows == 0 {
            warn!(%signal, samples, "signal shorter than one window");
        }
        if let Some(ref log) = self.log {
            log.record_samples(signal, samples as u64);
            log.record_windows(signal, windows as u64);
        }
    }
}

/// Run the pipeline with default sampling rates and windows.
pub fn preprocess(recording: &RawRecording) -> Result<FeatureTable<FeatureRow>, PipelineError> {
    FeaturePipeline::new(PipelineConfig::default()).run(recording)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::create_shared_log;
    use crate::core::hrv::tests::synthetic_ppg;
    use std::f64::consts::PI;

    /// A 70 s recording at the default rates with a modulated pulse.
    fn recording() -> RawRecording {
        let acc: Vec<[f64; 3]> = (0..70 * 32)
            .map(|i| {
                let t = i as f64 / 32.0;
                [(2.0 * PI * 0.5 * t).sin(), 0.1, 0.98]
            })
            .collect();
        let bvp = synthetic_ppg(64.0, 70.0, |t| 0.8 + 0.05 * (2.0 * PI * 0.1 * t).sin());
        let temp: Vec<f64> = (0..70 * 4).map(|i| 32.0 + 0.001 * i as f64).collect();
        RawRecording::from_signals(&acc, &bvp, &temp)
    }

    #[test]
    fn test_rows_follow_accelerometer_grid() {
        let table = preprocess(&recording()).unwrap();
        // (2240 - 160) / 8 + 1
        assert_eq!(table.len(), 261);
        assert_eq!(table.rows()[0].timestamp, 5.0);
        assert_eq!(table.rows()[260].timestamp, 70.0);
        for row in table.rows() {
            assert!(row.model_input().iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let rec = recording();
        let sequential = preprocess(&rec).unwrap();

        let config = PipelineConfig {
            parallel: true,
            ..PipelineConfig::default()
        };
        let parallel = FeaturePipeline::new(config).run(&rec).unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_short_bvp_is_insufficient_data() {
        let rec = RawRecording::from_signals(&[[0.0, 0.0, 1.0]; 2240], &[0.1; 3000], &[30.0; 280]);
        let err = preprocess(&rec).unwrap_err();
        assert_eq!(
            err,
            PipelineError::InsufficientData {
                signal: Signal::Bvp,
                samples: 3000,
                required: 3840,
            }
        );
    }

    #[test]
    fn test_flat_bvp_is_unresolvable() {
        let rec = RawRecording::from_signals(&[[0.0, 0.0, 1.0]; 2240], &[0.0; 4480], &[30.0; 280]);
        let log = create_shared_log();
        let err = FeaturePipeline::new(PipelineConfig::default())
            .with_log(Arc::clone(&log))
            .run(&rec)
            .unwrap_err();

        assert_eq!(err, PipelineError::UnresolvableGaps { dropped: 261 });
        let stats = log.stats();
        assert_eq!(stats.recordings_failed, 1);
        assert_eq!(stats.bvp_windows_incomplete, 3);
        assert_eq!(stats.rows_dropped, 261);
    }

    #[test]
    fn test_cancel_flag() {
        for parallel in [false, true] {
            let config = PipelineConfig {
                parallel,
                ..PipelineConfig::default()
            };
            let pipeline = FeaturePipeline::new(config);
            pipeline.cancel_flag().store(true, Ordering::SeqCst);
            assert_eq!(pipeline.run(&recording()), Err(PipelineError::Cancelled));
        }
    }

    #[test]
    fn test_invalid_window_config() {
        let mut config = PipelineConfig::default();
        config.temp.shift_secs = 0.1;
        let err = FeaturePipeline::new(config).run(&recording()).unwrap_err();
        assert_eq!(
            err,
            PipelineError::InvalidWindow {
                signal: Signal::Temperature,
                source: WindowError::ZeroShift,
            }
        );
    }

    #[test]
    fn test_log_counts() {
        let log = create_shared_log();
        FeaturePipeline::new(PipelineConfig::default())
            .with_log(Arc::clone(&log))
            .run(&recording())
            .unwrap();

        let stats = log.stats();
        assert_eq!(stats.recordings_processed, 1);
        assert_eq!(stats.acc.samples, 2240);
        assert_eq!(stats.acc.windows, 261);
        assert_eq!(stats.bvp.windows, 3);
        assert_eq!(stats.temp.windows, 41);
        assert_eq!(stats.rows_emitted, 261);
    }
}
