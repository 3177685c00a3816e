//! Accelerometer window features.
//!
//! Per-axis mean, standard deviation, minimum and maximum, plus the mean
//! and standard deviation of the Euclidean magnitude of each sample.

use crate::core::stats::Summary;
use crate::core::table::{FeatureRecord, FeatureTable};
use crate::core::windowing::WindowParams;
use serde::{Deserialize, Serialize};

/// Summary statistics of one accelerometer axis over a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisFeatures {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl From<Summary> for AxisFeatures {
    fn from(s: Summary) -> Self {
        Self {
            mean: s.mean,
            std: s.std,
            min: s.min,
            max: s.max,
        }
    }
}

/// Accelerometer features for one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccFeatures {
    /// Window-end time in seconds
    pub timestamp: f64,
    pub x: AxisFeatures,
    pub y: AxisFeatures,
    pub z: AxisFeatures,
    /// Mean of per-sample magnitude sqrt(x² + y² + z²)
    pub mean_mag: f64,
    /// Population standard deviation of the magnitude
    pub std_mag: f64,
}

impl FeatureRecord for AccFeatures {
    const COLUMNS: &'static [&'static str] = &[
        "acc_mean_x",
        "acc_std_x",
        "acc_min_x",
        "acc_max_x",
        "acc_mean_y",
        "acc_std_y",
        "acc_min_y",
        "acc_max_y",
        "acc_mean_z",
        "acc_std_z",
        "acc_min_z",
        "acc_max_z",
        "acc_mean_mag",
        "acc_std_mag",
    ];

    fn timestamp(&self) -> f64 {
        self.timestamp
    }

    fn values(&self) -> Vec<Option<f64>> {
        [self.x, self.y, self.z]
            .iter()
            .flat_map(|a| [a.mean, a.std, a.min, a.max])
            .chain([self.mean_mag, self.std_mag])
            .map(Some)
            .collect()
    }
}

/// Extract accelerometer features from cleaned `[x, y, z]` samples.
pub fn extract_acc_features(
    samples: &[[f64; 3]],
    sampling_rate: f64,
    params: WindowParams,
) -> FeatureTable<AccFeatures> {
    let rows = params
        .windows(samples.len())
        .map(|window| {
            let mut features = compute_window(window.slice(samples));
            features.timestamp = window.timestamp(sampling_rate);
            features
        })
        .collect();

    FeatureTable::from_rows(rows)
}

/// Features of one non-empty window, with a zero timestamp.
fn compute_window(window: &[[f64; 3]]) -> AccFeatures {
    let axis = |i: usize| -> AxisFeatures {
        let values: Vec<f64> = window.iter().map(|s| s[i]).collect();
        Summary::of(&values).into()
    };

    let magnitude: Vec<f64> = window
        .iter()
        .map(|[x, y, z]| (x * x + y * y + z * z).sqrt())
        .collect();
    let mag = Summary::of(&magnitude);

    AccFeatures {
        timestamp: 0.0,
        x: axis(0),
        y: axis(1),
        z: axis(2),
        mean_mag: mag.mean,
        std_mag: mag.std,
    }
}
