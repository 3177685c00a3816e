//! Timestamp alignment of the per-signal feature tables.
//!
//! The accelerometer table drives the output grid. BVP and temperature rows
//! are attached by nearest timestamp, gaps left by failed BVP windows are
//! forward- then backward-filled, and any row that is still incomplete is
//! dropped.

use crate::core::accelerometer::AccFeatures;
use crate::core::ppg::PpgFeatures;
use crate::core::schema::FEATURE_COLUMNS;
use crate::core::table::{FeatureRecord, FeatureTable};
use crate::core::temperature::TempFeatures;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// For every left timestamp, the index of the right timestamp closest to it.
///
/// Both inputs must be sorted ascending. When two right rows are equally
/// close, the earlier one wins. Returns `None` everywhere if `right` is
/// empty.
pub fn nearest_indices(left: &[f64], right: &[f64]) -> Vec<Option<usize>> {
    if right.is_empty() {
        return vec![None; left.len()];
    }

    let mut j = 0;
    left.iter()
        .map(|&t| {
            while j + 1 < right.len() && (right[j + 1] - t).abs() < (right[j] - t).abs() {
                j += 1;
            }
            Some(j)
        })
        .collect()
}

/// One accelerometer-grid row after the nearest joins, before filling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignedRow {
    pub acc: AccFeatures,
    pub bvp: PpgFeatures,
    pub temp: TempFeatures,
}

impl AlignedRow {
    /// Grid timestamp (the accelerometer window end).
    pub fn timestamp(&self) -> f64 {
        self.acc.timestamp
    }
}

/// Attach the nearest BVP and temperature rows to every accelerometer row.
///
/// Yields one row per accelerometer row, or nothing if either of the other
/// tables is empty.
pub fn align(
    acc: &FeatureTable<AccFeatures>,
    bvp: &FeatureTable<PpgFeatures>,
    temp: &FeatureTable<TempFeatures>,
) -> Vec<AlignedRow> {
    if bvp.is_empty() || temp.is_empty() {
        return Vec::new();
    }

    let grid = acc.timestamps();
    let bvp_idx = nearest_indices(&grid, &bvp.timestamps());
    let temp_idx = nearest_indices(&grid, &temp.timestamps());

    acc.rows()
        .iter()
        .zip(bvp_idx.into_iter().zip(temp_idx))
        .filter_map(|(acc_row, pair)| match pair {
            (Some(b), Some(t)) => Some(AlignedRow {
                acc: *acc_row,
                bvp: bvp.rows()[b],
                temp: temp.rows()[t],
            }),
            _ => None,
        })
        .collect()
}

fn bvp_fields(row: &mut AlignedRow) -> [&mut Option<f64>; 4] {
    let bvp = &mut row.bvp;
    [
        &mut bvp.mean_hr,
        &mut bvp.std_hr,
        &mut bvp.rmssd,
        &mut bvp.lf_hf_ratio,
    ]
}

/// Propagate the last present value of each BVP feature forward.
///
/// Returns the number of values filled.
pub fn fill_forward(rows: &mut [AlignedRow]) -> usize {
    carry_values(rows.iter_mut())
}

/// Propagate the next present value of each BVP feature backward.
///
/// Returns the number of values filled.
pub fn fill_backward(rows: &mut [AlignedRow]) -> usize {
    carry_values(rows.iter_mut().rev())
}

fn carry_values<'a>(rows: impl Iterator<Item = &'a mut AlignedRow>) -> usize {
    let mut carried: [Option<f64>; 4] = [None; 4];
    let mut filled = 0;
    for row in rows {
        for (field, carry) in bvp_fields(row).into_iter().zip(carried.iter_mut()) {
            if let Some(v) = *field {
                *carry = Some(v);
            } else if carry.is_some() {
                *field = *carry;
                filled += 1;
            }
        }
    }
    filled
}

/// Heart-rate-variability features with every value present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HrvFeatures {
    pub mean_hr: f64,
    pub std_hr: f64,
    pub rmssd: f64,
    pub lf_hf_ratio: f64,
}

impl HrvFeatures {
    /// `None` if any feature of `p` is missing.
    fn from_partial(p: &PpgFeatures) -> Option<Self> {
        Some(Self {
            mean_hr: p.mean_hr?,
            std_hr: p.std_hr?,
            rmssd: p.rmssd?,
            lf_hf_ratio: p.lf_hf_ratio?,
        })
    }
}

/// A complete row of the merged feature table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub timestamp: f64,
    pub acc: AccFeatures,
    pub bvp: HrvFeatures,
    pub temp: TempFeatures,
}

impl FeatureRow {
    /// Values in classifier input order (see [`crate::core::schema::MODEL_INPUT_COLUMNS`]).
    #[rustfmt::skip]
    pub fn model_input(&self) -> [f64; 23] {
        let (a, b, t) = (&self.acc, &self.bvp, &self.temp);
        [
            a.x.mean, a.x.std, a.x.min, a.x.max,
            a.y.mean, a.y.std, a.y.min, a.y.max,
            a.z.mean, a.z.std, a.z.min, a.z.max,
            a.mean_mag, a.std_mag,
            b.mean_hr, b.rmssd, b.lf_hf_ratio, b.std_hr,
            t.mean, t.std, t.min, t.max, t.slope,
        ]
    }
}

impl FeatureRecord for FeatureRow {
    const COLUMNS: &'static [&'static str] = &FEATURE_COLUMNS;

    fn timestamp(&self) -> f64 {
        self.timestamp
    }

    fn values(&self) -> Vec<Option<f64>> {
        let mut values = self.acc.values();
        values.extend([
            Some(self.bvp.mean_hr),
            Some(self.bvp.std_hr),
            Some(self.bvp.rmssd),
            Some(self.bvp.lf_hf_ratio),
        ]);
        values.extend(self.temp.values());
        values
    }
}

/// Result of merging the three per-signal tables.
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    pub table: FeatureTable<FeatureRow>,
    /// Values filled forward or backward
    pub filled: usize,
    /// Rows dropped because a value was still missing after filling
    pub dropped: usize,
}

/// Align, fill and drop in one pass.
pub fn merge_features(
    acc: &FeatureTable<AccFeatures>,
    bvp: &FeatureTable<PpgFeatures>,
    temp: &FeatureTable<TempFeatures>,
) -> Merged {
    let mut aligned = align(acc, bvp, temp);
    let forward = fill_forward(&mut aligned);
    let backward = fill_backward(&mut aligned);
    debug!(forward, backward, "filled missing BVP features");

    let total = aligned.len();
    let rows: Vec<FeatureRow> = aligned
        .iter()
        .filter_map(|row| {
            let bvp = HrvFeatures::from_partial(&row.bvp)?;
            Some(FeatureRow {
                timestamp: row.timestamp(),
                acc: row.acc,
                bvp,
                temp: row.temp,
            })
        })
        .collect();

    Merged {
        dropped: total - rows.len(),
        filled: forward + backward,
        table: FeatureTable::from_rows(rows),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acc_at(ts: &[f64]) -> FeatureTable<AccFeatures> {
        FeatureTable::from_rows(
            ts.iter()
                .map(|&timestamp| AccFeatures {
                    timestamp,
                    ..AccFeatures::default()
                })
                .collect(),
        )
    }

    fn bvp_at(rows: &[(f64, Option<f64>)]) -> FeatureTable<PpgFeatures> {
        FeatureTable::from_rows(
            rows.iter()
                .map(|&(timestamp, v)| PpgFeatures {
                    timestamp,
                    mean_hr: v,
                    std_hr: v,
                    rmssd: v,
                    lf_hf_ratio: v,
                })
                .collect(),
        )
    }

    fn temp_at(rows: &[(f64, f64)]) -> FeatureTable<TempFeatures> {
        FeatureTable::from_rows(
            rows.iter()
                .map(|&(timestamp, mean)| TempFeatures {
                    timestamp,
                    mean,
                    ..TempFeatures::default()
                })
                .collect(),
        )
    }

    #[test]
    fn test_nearest_indices() {
        let right = [1.0, 2.0, 4.0];
        let got = nearest_indices(&[0.0, 1.4, 1.6, 3.1, 9.0], &right);
        assert_eq!(got, vec![Some(0), Some(0), Some(1), Some(2), Some(2)]);
    }

    #[test]
    fn test_nearest_tie_prefers_earlier_row() {
        let got = nearest_indices(&[1.5, 3.0], &[1.0, 2.0, 4.0]);
        assert_eq!(got, vec![Some(0), Some(1)]);
    }

    #[test]
    fn test_nearest_empty_right() {
        assert_eq!(nearest_indices(&[1.0, 2.0], &[]), vec![None, None]);
    }

    #[test]
    fn test_row_count_follows_accelerometer() {
        let acc = acc_at(&[5.0, 5.25, 5.5, 5.75, 6.0]);
        let bvp = bvp_at(&[(60.0, Some(70.0))]);
        let temp = temp_at(&[(60.0, 30.0), (60.25, 31.0)]);

        let merged = merge_features(&acc, &bvp, &temp);
        assert_eq!(merged.table.len(), 5);
        assert_eq!(merged.dropped, 0);
        assert_eq!(merged.table.timestamps(), acc.timestamps());
        assert!(merged.table.rows().iter().all(|r| r.temp.mean == 30.0));
    }

    #[test]
    fn test_attached_rows_are_nearest() {
        let acc = acc_at(&[10.0, 12.4, 12.6, 20.0]);
        let bvp = bvp_at(&[(10.0, Some(1.0)), (15.0, Some(2.0))]);
        let temp = temp_at(&[(11.0, 1.0), (14.0, 2.0)]);

        let merged = merge_features(&acc, &bvp, &temp);
        let hr: Vec<f64> = merged.table.rows().iter().map(|r| r.bvp.mean_hr).collect();
        let tm: Vec<f64> = merged.table.rows().iter().map(|r| r.temp.mean).collect();
        assert_eq!(hr, vec![1.0, 1.0, 2.0, 2.0]);
        assert_eq!(tm, vec![1.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_forward_fill_runs_before_backward_fill() {
        let acc = acc_at(&[1.0, 2.0, 3.0, 4.0]);
        let bvp = bvp_at(&[
            (1.0, None),
            (2.0, Some(70.0)),
            (3.0, None),
            (4.0, Some(80.0)),
        ]);
        let temp = temp_at(&[(1.0, 30.0)]);

        let merged = merge_features(&acc, &bvp, &temp);
        let hr: Vec<f64> = merged.table.rows().iter().map(|r| r.bvp.mean_hr).collect();
        // Row 3 takes the earlier 70 (forward), row 1 the later 70 (backward)
        assert_eq!(hr, vec![70.0, 70.0, 70.0, 80.0]);
        assert_eq!(merged.filled, 8);
    }

    #[test]
    fn test_column_missing_everywhere_drops_all_rows() {
        let acc = acc_at(&[1.0, 2.0]);
        let bvp = bvp_at(&[(1.0, None), (2.0, None)]);
        let temp = temp_at(&[(1.0, 30.0)]);

        let merged = merge_features(&acc, &bvp, &temp);
        assert!(merged.table.is_empty());
        assert_eq!(merged.dropped, 2);
    }

    #[test]
    fn test_empty_side_table_yields_nothing() {
        let acc = acc_at(&[1.0, 2.0]);
        let merged = merge_features(&acc, &FeatureTable::default(), &temp_at(&[(1.0, 30.0)]));
        assert!(merged.table.is_empty());
    }

    #[test]
    fn test_model_input_order() {
        let row = FeatureRow {
            timestamp: 1.0,
            acc: AccFeatures {
                timestamp: 1.0,
                mean_mag: 13.0,
                std_mag: 14.0,
                ..AccFeatures::default()
            },
            bvp: HrvFeatures {
                mean_hr: 15.0,
                std_hr: 18.0,
                rmssd: 16.0,
                lf_hf_ratio: 17.0,
            },
            temp: TempFeatures {
                timestamp: 1.0,
                mean: 19.0,
                std: 20.0,
                min: 21.0,
                max: 22.0,
                slope: 23.0,
            },
        };
        let input = row.model_input();
        assert_eq!(
            &input[12..],
            &[13.0, 14.0, 15.0, 16.0, 17.0, 18.0, 19.0, 20.0, 21.0, 22.0, 23.0]
        );
        assert_eq!(row.values().len(), FeatureRow::COLUMNS.len());
    }
}
