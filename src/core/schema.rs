//! Versioned column contract between feature extraction and the classifier.
//!
//! The classifier and its scaler were fit on a fixed, ordered list of
//! feature names. Extracted tables may carry more columns (such as
//! `timestamp`) but must contain every model input.

/// The current feature schema version.
pub const FEATURE_SCHEMA_VERSION: &str = "1.0";

/// Feature columns of a merged row, grouped by signal, excluding `timestamp`.
pub const FEATURE_COLUMNS: [&str; 23] = [
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
    "bvp_mean_hr",
    "bvp_std_hr",
    "bvp_rmssd",
    "bvp_lf_hf_ratio",
    "temp_mean",
    "temp_std",
    "temp_min",
    "temp_max",
    "temp_slope",
];

/// Classifier inputs, in the order the model expects them.
pub const MODEL_INPUT_COLUMNS: [&str; 23] = [
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
    "bvp_mean_hr",
    "bvp_rmssd",
    "bvp_lf_hf_ratio",
    "bvp_std_hr",
    "temp_mean",
    "temp_std",
    "temp_min",
    "temp_max",
    "temp_slope",
];

/// Full output header: `timestamp` followed by [`FEATURE_COLUMNS`].
pub fn output_columns() -> Vec<&'static str> {
    std::iter::once("timestamp")
        .chain(FEATURE_COLUMNS.iter().copied())
        .collect()
}

/// Errors from checking a column set against the model inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Model inputs absent from the checked columns
    MissingColumns(Vec<String>),
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaError::MissingColumns(names) => {
                write!(f, "missing model input columns: {}", names.join(", "))
            }
        }
    }
}

impl std::error::Error for SchemaError {}

/// Check that `columns` contains every model input.
///
/// Extra columns are accepted; every missing input is reported.
pub fn validate_columns<S: AsRef<str>>(columns: &[S]) -> Result<(), SchemaError> {
    let missing: Vec<String> = MODEL_INPUT_COLUMNS
        .iter()
        .filter(|name| !columns.iter().any(|c| c.as_ref() == **name))
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::MissingColumns(missing))
    }
}
