//! BVP (photoplethysmography) window features.
//!
//! Every window starts with all four HRV features missing. Metrics are
//! filled in order (mean HR and RMSSD, LF/HF ratio, HR standard
//! deviation); the first failure stops the chain and leaves the remaining
//! features missing. Failures never leave the window they occurred in.

use crate::core::hrv::{self, HrvError};
use crate::core::stats::sample_std_dev;
use crate::core::table::{FeatureRecord, FeatureTable};
use crate::core::windowing::WindowParams;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Minimum number of detected pulse peaks for HRV to be attempted.
pub const MIN_PEAKS: usize = 6;

/// HRV features for one window. `None` marks a missing value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PpgFeatures {
    /// Window-end time in seconds
    pub timestamp: f64,
    /// 60000 / mean inter-beat interval (bpm)
    pub mean_hr: Option<f64>,
    /// Sample standard deviation of the instantaneous heart rate (bpm)
    pub std_hr: Option<f64>,
    /// RMSSD of inter-beat intervals (ms)
    pub rmssd: Option<f64>,
    /// LF/HF spectral power ratio
    pub lf_hf_ratio: Option<f64>,
}

impl PpgFeatures {
    fn missing(timestamp: f64) -> Self {
        Self {
            timestamp,
            ..Self::default()
        }
    }

    /// True if every HRV feature is present.
    pub fn is_complete(&self) -> bool {
        self.values().iter().all(Option::is_some)
    }
}

impl FeatureRecord for PpgFeatures {
    const COLUMNS: &'static [&'static str] =
        &["bvp_mean_hr", "bvp_std_hr", "bvp_rmssd", "bvp_lf_hf_ratio"];

    fn timestamp(&self) -> f64 {
        self.timestamp
    }

    fn values(&self) -> Vec<Option<f64>> {
        vec![self.mean_hr, self.std_hr, self.rmssd, self.lf_hf_ratio]
    }
}

/// Extract HRV features from cleaned BVP samples.
///
/// Windows whose processing fails still produce a row, with the affected
/// features missing.
pub fn extract_bvp_features(
    samples: &[f64],
    sampling_rate: f64,
    params: WindowParams,
) -> FeatureTable<PpgFeatures> {
    let rows = params
        .windows(samples.len())
        .map(|window| {
            let timestamp = window.timestamp(sampling_rate);
            let mut features = PpgFeatures::missing(timestamp);
            if let Err(e) = fill_window(&mut features, window.slice(samples), sampling_rate) {
                debug!(timestamp, error = %e, "BVP window features unavailable");
            }
            features
        })
        .collect();

    FeatureTable::from_rows(rows)
}

/// Compute HRV features for one window, writing each as soon as it is known.
fn fill_window(
    features: &mut PpgFeatures,
    window: &[f64],
    sampling_rate: f64,
) -> Result<(), HrvError> {
    let cleaned = hrv::clean_ppg(window, sampling_rate)?;
    let peaks = hrv::find_pulse_peaks(&cleaned, sampling_rate)?;
    if peaks.len() < MIN_PEAKS {
        return Err(HrvError::TooFewPeaks {
            found: peaks.len(),
            required: MIN_PEAKS,
        });
    }

    let time = hrv::time_domain(&peaks, sampling_rate)?;
    features.mean_hr = time.mean_hr_bpm();
    features.rmssd = Some(time.rmssd_ms);

    features.lf_hf_ratio = Some(hrv::lf_hf_ratio(&peaks, sampling_rate)?);

    let rate = hrv::instantaneous_rate(&peaks, sampling_rate, cleaned.len())?;
    let std_hr = sample_std_dev(&rate);
    if !std_hr.is_finite() {
        return Err(HrvError::NonFinite("heart rate deviation"));
    }
    features.std_hr = Some(std_hr);

    Ok(())
}
