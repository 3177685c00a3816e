//! In-memory wearable recordings.
//!
//! A recording is a table of sample rows shared by all signals. Signals are
//! sampled at different rates, so most cells of the slower signals are
//! missing; each signal is cleaned independently by dropping the rows where
//! any of its columns is missing.

use serde::{Deserialize, Serialize};

/// The signal channels of a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Accelerometer,
    Bvp,
    Temperature,
}

impl Signal {
    pub const ALL: [Signal; 3] = [Signal::Accelerometer, Signal::Bvp, Signal::Temperature];

    /// Short channel name as used in column prefixes.
    pub fn name(&self) -> &'static str {
        match self {
            Signal::Accelerometer => "ACC",
            Signal::Bvp => "BVP",
            Signal::Temperature => "TEMP",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A raw multi-signal recording with possibly missing cells.
///
/// All columns have the same length (one entry per table row).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecording {
    pub acc_x: Vec<Option<f64>>,
    pub acc_y: Vec<Option<f64>>,
    pub acc_z: Vec<Option<f64>>,
    pub bvp: Vec<Option<f64>>,
    pub temp: Vec<Option<f64>>,
}

impl RawRecording {
    /// Build a recording from fully present per-signal sample arrays.
    ///
    /// Shorter signals are padded with missing cells up to the longest one.
    pub fn from_signals(acc: &[[f64; 3]], bvp: &[f64], temp: &[f64]) -> Self {
        let rows = acc.len().max(bvp.len()).max(temp.len());
        let padded = |values: Vec<f64>| -> Vec<Option<f64>> {
            let mut column: Vec<Option<f64>> = values.into_iter().map(Some).collect();
            column.resize(rows, None);
            column
        };

        Self {
            acc_x: padded(acc.iter().map(|s| s[0]).collect()),
            acc_y: padded(acc.iter().map(|s| s[1]).collect()),
            acc_z: padded(acc.iter().map(|s| s[2]).collect()),
            bvp: padded(bvp.to_vec()),
            temp: padded(temp.to_vec()),
        }
    }

    /// Number of table rows.
    pub fn rows(&self) -> usize {
        self.acc_x.len()
    }

    /// Accelerometer samples from rows where all three axes are present.
    pub fn clean_acc(&self) -> Vec<[f64; 3]> {
        self.acc_x
            .iter()
            .zip(&self.acc_y)
            .zip(&self.acc_z)
            .filter_map(|((x, y), z)| Some([(*x)?, (*y)?, (*z)?]))
            .collect()
    }

    /// BVP samples from rows where BVP is present.
    pub fn clean_bvp(&self) -> Vec<f64> {
        self.bvp.iter().flatten().copied().collect()
    }

    /// Temperature samples from rows where TEMP is present.
    pub fn clean_temp(&self) -> Vec<f64> {
        self.temp.iter().flatten().copied().collect()
    }

    /// Raw and clean sample counts per signal.
    pub fn summary(&self) -> RecordingSummary {
        let present = |column: &[Option<f64>]| column.iter().filter(|v| v.is_some()).count();
        let acc_any = (0..self.rows())
            .filter(|&i| {
                [&self.acc_x, &self.acc_y, &self.acc_z]
                    .iter()
                    .any(|c| c.get(i).copied().flatten().is_some())
            })
            .count();

        RecordingSummary {
            rows: self.rows(),
            acc: SignalCounts {
                present: acc_any,
                clean: self.clean_acc().len(),
            },
            bvp: SignalCounts {
                present: present(&self.bvp),
                clean: present(&self.bvp),
            },
            temp: SignalCounts {
                present: present(&self.temp),
                clean: present(&self.temp),
            },
        }
    }
}

/// Sample counts for one signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalCounts {
    /// Rows where at least one of the signal's columns is present
    pub present: usize,
    /// Rows where every column of the signal is present
    pub clean: usize,
}

/// Per-signal sample counts of a recording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingSummary {
    pub rows: usize,
    pub acc: SignalCounts,
    pub bvp: SignalCounts,
    pub temp: SignalCounts,
}

impl RecordingSummary {
    pub fn get(&self, signal: Signal) -> SignalCounts {
        match signal {
            Signal::Accelerometer => self.acc,
            Signal::Bvp => self.bvp,
            Signal::Temperature => self.temp,
        }
    }
}

impl std::fmt::Display for RecordingSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Rows: {}", self.rows)?;
        for signal in Signal::ALL {
            let counts = self.get(signal);
            writeln!(
                f,
                "  {:<5} present: {:>9}  clean: {:>9}",
                signal.name(),
                counts.present,
                counts.clean
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_signals_pads_shorter_columns() {
        let rec = RawRecording::from_signals(&[[1.0, 2.0, 3.0]; 8], &[0.5; 4], &[30.0]);
        assert_eq!(rec.rows(), 8);
        assert_eq!(rec.bvp.len(), 8);
        assert_eq!(rec.bvp[3], Some(0.5));
        assert_eq!(rec.bvp[4], None);
        assert_eq!(rec.clean_temp(), vec![30.0]);
    }

    #[test]
    fn test_cleaning_is_per_signal() {
        let rec = RawRecording {
            acc_x: vec![Some(1.0), Some(2.0), None, Some(4.0)],
            acc_y: vec![Some(1.0), None, None, Some(4.0)],
            acc_z: vec![Some(1.0), Some(2.0), None, Some(4.0)],
            bvp: vec![None, Some(0.1), Some(0.2), None],
            temp: vec![Some(30.0), None, None, None],
        };

        // A missing ACC_y cell drops the accelerometer row but not the BVP sample
        assert_eq!(rec.clean_acc(), vec![[1.0, 1.0, 1.0], [4.0, 4.0, 4.0]]);
        assert_eq!(rec.clean_bvp(), vec![0.1, 0.2]);
        assert_eq!(rec.clean_temp(), vec![30.0]);

        let summary = rec.summary();
        assert_eq!(summary.rows, 4);
        assert_eq!(summary.acc, SignalCounts { present: 3, clean: 2 });
        assert_eq!(summary.bvp, SignalCounts { present: 2, clean: 2 });
        assert_eq!(summary.temp.clean, 1);
    }

    #[test]
    fn test_empty_recording() {
        let rec = RawRecording::default();
        assert_eq!(rec.rows(), 0);
        assert!(rec.clean_acc().is_empty());
        assert_eq!(rec.summary(), RecordingSummary::default());
    }
}
