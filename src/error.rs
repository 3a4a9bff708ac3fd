use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the import, scaling and surface pipelines.
///
/// Per-row extraction problems never show up here: a missing or
/// unparseable cell is simply "no value" for that row.
#[derive(Error, Debug)]
pub enum HistoError {
    #[error("The file you selected is empty: {0}")]
    EmptyInput(String),

    #[error("The data in the file was invalid: {0}")]
    MalformedInput(String),

    #[error("No columns that could be used for RPM were found!")]
    MissingRequiredChannel,

    #[error("No columns that could be used for a pressure ratio were found! Select a custom Y-axis PID instead.")]
    MissingRatioChannel,

    #[error("Scale error: {0}")]
    ScaleValidation(String),

    #[error("Invalid scale file {path:?}: {reason}")]
    ScaleFileFormat { path: PathBuf, reason: String },

    #[error("The file is {size} bytes which is over the {threshold} byte limit; it must be confirmed before processing.")]
    LargeFile { size: u64, threshold: u64 },

    #[error("Unknown PID: {0}")]
    UnknownPid(String),

    #[error("Triangulation failed: {0}")]
    Triangulation(String),

    #[error("Processing was cancelled")]
    Cancelled,

    #[error("Background job '{0}' stopped unexpectedly")]
    JobFailed(String),

    #[error("Unsupported file format: .{0}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel error: {0}")]
    Excel(String),

    #[error("Custom PID name file error: {0}")]
    Xml(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HistoError {
    /// Errors after which the session can keep going with a fallback
    /// (default scales, a user-chosen Y-axis PID).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            HistoError::MissingRatioChannel
                | HistoError::ScaleValidation(_)
                | HistoError::ScaleFileFormat { .. }
                | HistoError::LargeFile { .. }
                | HistoError::Cancelled
        )
    }
}

impl From<quick_xml::DeError> for HistoError {
    fn from(e: quick_xml::DeError) -> Self {
        HistoError::Xml(e.to_string())
    }
}

impl From<calamine::Error> for HistoError {
    fn from(e: calamine::Error) -> Self {
        HistoError::Excel(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HistoError>;
