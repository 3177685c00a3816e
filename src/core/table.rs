//! Timestamped feature tables.
//!
//! Every featurizer emits one record per window, keyed by the window-end
//! timestamp. Records know their own column names so tables can be
//! exported and checked against the model schema without reflection.

use serde::{Deserialize, Serialize};

/// A per-window feature record with a fixed, ordered column set.
pub trait FeatureRecord {
    /// Column names in output order, excluding `timestamp`.
    const COLUMNS: &'static [&'static str];

    /// Window-end timestamp in seconds.
    fn timestamp(&self) -> f64;

    /// Values aligned with [`FeatureRecord::COLUMNS`]; `None` is missing.
    fn values(&self) -> Vec<Option<f64>>;
}

/// Rows of one record type, ordered by ascending timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureTable<R> {
    rows: Vec<R>,
}

impl<R: FeatureRecord> FeatureTable<R> {
    /// Wrap rows that are already in timestamp order.
    pub fn from_rows(rows: Vec<R>) -> Self {
        debug_assert!(
            rows.windows(2)
                .all(|pair| pair[0].timestamp() <= pair[1].timestamp()),
            "feature rows must be ordered by timestamp"
        );
        Self { rows }
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Timestamps of all rows, in order.
    pub fn timestamps(&self) -> Vec<f64> {
        self.rows.iter().map(FeatureRecord::timestamp).collect()
    }

    /// Header including the leading `timestamp` column.
    pub fn header() -> Vec<&'static str> {
        std::iter::once("timestamp")
            .chain(R::COLUMNS.iter().copied())
            .collect()
    }
}

impl<R> Default for FeatureTable<R> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<R> IntoIterator for FeatureTable<R> {
    type Item = R;
    type IntoIter = std::vec::IntoIter<R>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a, R> IntoIterator for &'a FeatureTable<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe(f64);

    impl FeatureRecord for Probe {
        const COLUMNS: &'static [&'static str] = &["probe"];

        fn timestamp(&self) -> f64 {
            self.0
        }

        fn values(&self) -> Vec<Option<f64>> {
            vec![Some(self.0)]
        }
    }

    #[test]
    fn test_header_starts_with_timestamp() {
        assert_eq!(FeatureTable::<Probe>::header(), vec!["timestamp", "probe"]);
    }

    #[test]
    fn test_timestamps() {
        let table = FeatureTable::from_rows(vec![Probe(1.0), Probe(2.5)]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.timestamps(), vec![1.0, 2.5]);
        assert!(!table.is_empty());
        assert!(FeatureTable::<Probe>::default().is_empty());
    }
}
