//! Skin temperature window features.

use crate::core::stats::{linear_slope, Summary};
use crate::core::table::{FeatureRecord, FeatureTable};
use crate::core::windowing::WindowParams;
use serde::{Deserialize, Serialize};

/// Temperature features for one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TempFeatures {
    /// Window-end time in seconds
    pub timestamp: f64,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    /// Least-squares trend in signal units per sample
    pub slope: f64,
}

impl FeatureRecord for TempFeatures {
    const COLUMNS: &'static [&'static str] =
        &["temp_mean", "temp_std", "temp_min", "temp_max", "temp_slope"];

    fn timestamp(&self) -> f64 {
        self.timestamp
    }

    fn values(&self) -> Vec<Option<f64>> {
        vec![
            Some(self.mean),
            Some(self.std),
            Some(self.min),
            Some(self.max),
            Some(self.slope),
        ]
    }
}

/// Extract temperature features from cleaned samples.
pub fn extract_temp_features(
    samples: &[f64],
    sampling_rate: f64,
    params: WindowParams,
) -> FeatureTable<TempFeatures> {
    let rows = params
        .windows(samples.len())
        .map(|window| {
            let values = window.slice(samples);
            let summary = Summary::of(values);
            TempFeatures {
                timestamp: window.timestamp(sampling_rate),
                mean: summary.mean,
                std: summary.std,
                min: summary.min,
                max: summary.max,
                slope: linear_slope(values),
            }
        })
        .collect();

    FeatureTable::from_rows(rows)
}
