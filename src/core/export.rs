//! Feature report builder and writers.
//!
//! A report wraps a merged feature table with its schema version and
//! producer metadata. Reports are written as CSV (one header plus one line
//! per row), pretty JSON (the whole report) or JSON Lines (one row object
//! per line).

use crate::core::merge::FeatureRow;
use crate::core::schema::{output_columns, FEATURE_SCHEMA_VERSION, MODEL_INPUT_COLUMNS};
use crate::core::table::{FeatureRecord, FeatureTable};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::str::FromStr;
use uuid::Uuid;

/// The name of this producer.
pub const PRODUCER_NAME: &str = "synheart-stress-features";

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    /// Name of the producing software
    pub name: String,
    /// Version of the producing software
    pub version: String,
    /// Unique instance identifier (UUID)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
}

/// A merged feature table with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureReport {
    /// Feature schema version
    pub schema_version: String,
    /// When this report was computed (RFC3339)
    pub computed_at_utc: String,
    pub producer: ReportProducer,
    /// Recording the features were extracted from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Column names, `timestamp` first
    pub columns: Vec<String>,
    /// Classifier inputs in model order
    pub model_input_columns: Vec<String>,
    /// Row values aligned with `columns`
    pub rows: Vec<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<HashMap<String, serde_json::Value>>,
}

/// Output formats for feature reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Jsonl,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Jsonl => "jsonl",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "jsonl" | "ndjson" => Ok(ExportFormat::Jsonl),
            other => Err(format!("unknown export format '{other}' (csv, json, jsonl)")),
        }
    }
}

/// Errors that can occur while writing or reading reports.
#[derive(Debug)]
pub enum ExportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Io(e) => write!(f, "IO error: {e}"),
            ExportError::Csv(e) => write!(f, "CSV error: {e}"),
            ExportError::Json(e) => write!(f, "JSON error: {e}"),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Io(e) => Some(e),
            ExportError::Csv(e) => Some(e),
            ExportError::Json(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ExportError {
    fn from(e: std::io::Error) -> Self {
        ExportError::Io(e)
    }
}

impl From<csv::Error> for ExportError {
    fn from(e: csv::Error) -> Self {
        ExportError::Csv(e)
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(e: serde_json::Error) -> Self {
        ExportError::Json(e)
    }
}

/// Builder for feature reports.
pub struct ReportBuilder {
    instance_id: Uuid,
    source: Option<String>,
}

impl ReportBuilder {
    /// Create a new builder with a unique instance ID.
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            source: None,
        }
    }

    /// Name the recording the features came from.
    pub fn with_source(mut self, source: String) -> Self {
        self.source = Some(source);
        self
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Build a report from a merged feature table.
    pub fn build(&self, table: &FeatureTable<FeatureRow>) -> FeatureReport {
        let rows: Vec<Vec<f64>> = table
            .rows()
            .iter()
            .map(|row| {
                std::iter::once(row.timestamp())
                    .chain(row.values().into_iter().flatten())
                    .collect()
            })
            .collect();

        let mut meta = HashMap::new();
        meta.insert("row_count".to_string(), serde_json::Value::from(table.len()));
        if let (Some(first), Some(last)) = (table.rows().first(), table.rows().last()) {
            meta.insert("first_timestamp".to_string(), serde_json::Value::from(first.timestamp));
            meta.insert("last_timestamp".to_string(), serde_json::Value::from(last.timestamp));
        }

        FeatureReport {
            schema_version: FEATURE_SCHEMA_VERSION.to_string(),
            computed_at_utc: Utc::now().to_rfc3339(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                instance_id: Some(self.instance_id.to_string()),
            },
            source: self.source.clone(),
            columns: output_columns().into_iter().map(String::from).collect(),
            model_input_columns: MODEL_INPUT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows,
            meta: Some(meta),
        }
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Write a report in the given format.
pub fn write_report<W: Write>(
    report: &FeatureReport,
    format: ExportFormat,
    writer: W,
) -> Result<(), ExportError> {
    match format {
        ExportFormat::Csv => write_csv(report, writer),
        ExportFormat::Json => write_json(report, writer),
        ExportFormat::Jsonl => write_jsonl(report, writer),
    }
}

/// Header row followed by one line per feature row.
pub fn write_csv<W: Write>(report: &FeatureReport, writer: W) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(&report.columns)?;
    for row in &report.rows {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

/// The whole report as pretty-printed JSON.
pub fn write_json<W: Write>(report: &FeatureReport, mut writer: W) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    Ok(())
}

/// One JSON object per feature row, keyed by column name.
pub fn write_jsonl<W: Write>(report: &FeatureReport, mut writer: W) -> Result<(), ExportError> {
    for row in &report.rows {
        let object: serde_json::Map<String, serde_json::Value> = report
            .columns
            .iter()
            .cloned()
            .zip(row.iter().map(|&v| serde_json::Value::from(v)))
            .collect();
        serde_json::to_writer(&mut writer, &object)?;
        writeln!(writer)?;
    }
    Ok(())
}

/// Read just the header row of a feature CSV.
pub fn read_csv_header<R: Read>(reader: R) -> Result<Vec<String>, ExportError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    Ok(reader.headers()?.iter().map(String::from).collect())
}
