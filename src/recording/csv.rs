//! CSV recording loader.
//!
//! Signal columns are located by header name; any other columns are
//! ignored. Empty, unparseable and non-finite cells load as missing.

use crate::config::ColumnConfig;
use crate::recording::types::RawRecording;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Errors that can occur while loading a recording.
#[derive(Debug)]
pub enum RecordingError {
    Io(std::io::Error),
    Csv(csv::Error),
    /// A required signal column is not in the header
    MissingColumn(String),
}

impl std::fmt::Display for RecordingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordingError::Io(e) => write!(f, "IO error: {e}"),
            RecordingError::Csv(e) => write!(f, "CSV error: {e}"),
            RecordingError::MissingColumn(name) => {
                write!(f, "recording has no '{name}' column")
            }
        }
    }
}

impl std::error::Error for RecordingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecordingError::Io(e) => Some(e),
            RecordingError::Csv(e) => Some(e),
            RecordingError::MissingColumn(_) => None,
        }
    }
}

impl From<std::io::Error> for RecordingError {
    fn from(e: std::io::Error) -> Self {
        RecordingError::Io(e)
    }
}

impl From<csv::Error> for RecordingError {
    fn from(e: csv::Error) -> Self {
        RecordingError::Csv(e)
    }
}

/// Load a recording from a CSV file.
pub fn load_csv(path: &Path, columns: &ColumnConfig) -> Result<RawRecording, RecordingError> {
    let file = std::fs::File::open(path)?;
    let recording = from_reader(file, columns)?;
    debug!(path = %path.display(), rows = recording.rows(), "loaded recording");
    Ok(recording)
}

/// Load a recording from any CSV source with a header row.
pub fn from_reader<R: Read>(reader: R, columns: &ColumnConfig) -> Result<RawRecording, RecordingError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let index_of = |name: &str| -> Result<usize, RecordingError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| RecordingError::MissingColumn(name.to_string()))
    };
    let indices = [
        index_of(&columns.acc_x)?,
        index_of(&columns.acc_y)?,
        index_of(&columns.acc_z)?,
        index_of(&columns.bvp)?,
        index_of(&columns.temp)?,
    ];

    let mut recording = RawRecording::default();
    for record in reader.records() {
        let record = record?;
        let [x, y, z, bvp, temp] = indices.map(|i| parse_cell(record.get(i)));
        recording.acc_x.push(x);
        recording.acc_y.push(y);
        recording.acc_z.push(z);
        recording.bvp.push(bvp);
        recording.temp.push(temp);
    }

    Ok(recording)
}

fn parse_cell(cell: Option<&str>) -> Option<f64> {
    cell.and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
ACC_x,ACC_y,ACC_z,BVP,TEMP,label
1.0,2.0,3.0,0.5,31.2,0
1.5,2.5,3.5,0.6,,0
1.0,,3.0,NaN,,1
2.0,2.0,2.0,abc,,1
";

    #[test]
    fn test_missing_cells() {
        let rec = from_reader(SAMPLE.as_bytes(), &ColumnConfig::default()).unwrap();
        assert_eq!(rec.rows(), 4);
        assert_eq!(rec.acc_y[2], None);
        assert_eq!(rec.bvp, vec![Some(0.5), Some(0.6), None, None]);
        assert_eq!(rec.temp, vec![Some(31.2), None, None, None]);
        assert_eq!(rec.clean_acc().len(), 3);
    }

    #[test]
    fn test_missing_column() {
        let data = "ACC_x,ACC_y,ACC_z,BVP\n1,2,3,4\n";
        let err = from_reader(data.as_bytes(), &ColumnConfig::default()).unwrap_err();
        assert!(matches!(err, RecordingError::MissingColumn(ref c) if c == "TEMP"));
    }

    #[test]
    fn test_column_order_and_renames() {
        let columns = ColumnConfig {
            acc_x: "ax".into(),
            acc_y: "ay".into(),
            acc_z: "az".into(),
            bvp: "ppg".into(),
            temp: "skin".into(),
        };
        let data = "skin,ppg,az,ay,ax\n30,0.1,3,2,1\n";
        let rec = from_reader(data.as_bytes(), &columns).unwrap();
        assert_eq!(rec.clean_acc(), vec![[1.0, 2.0, 3.0]]);
        assert_eq!(rec.clean_bvp(), vec![0.1]);
        assert_eq!(rec.clean_temp(), vec![30.0]);
    }

    #[test]
    fn test_short_rows_are_missing_trailing_cells() {
        let data = "ACC_x,ACC_y,ACC_z,BVP,TEMP\n1,2,3\n";
        let rec = from_reader(data.as_bytes(), &ColumnConfig::default()).unwrap();
        assert_eq!(rec.bvp, vec![None]);
        assert_eq!(rec.temp, vec![None]);
    }

    #[test]
    fn test_load_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recording.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let rec = load_csv(&path, &ColumnConfig::default()).unwrap();
        assert_eq!(rec.rows(), 4);

        let missing = dir.path().join("absent.csv");
        assert!(matches!(
            load_csv(&missing, &ColumnConfig::default()),
            Err(RecordingError::Io(_))
        ));
    }
}
