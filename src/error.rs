use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AkiError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required column '{column}' in {source_name}")]
    MissingColumn { column: String, source_name: String },

    #[error("Invalid value '{value}' in column '{column}' at row {row} of {source_name}")]
    InvalidValue {
        source_name: String,
        column: String,
        row: usize,
        value: String,
    },

    #[error("Hours out of order for patient {patient}: {current} follows {previous}")]
    UnorderedHours {
        patient: String,
        previous: f64,
        current: f64,
    },

    #[error("Failed to process patient file {path:?}: {source}")]
    PatientFile {
        path: PathBuf,
        #[source]
        source: Box<AkiError>,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type AkiResult<T> = Result<T, AkiError>;
