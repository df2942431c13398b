//! Calculator error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispersionError {
    #[error("Input has no '{column}' column")]
    MissingColumn { column: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<refdisp_common::errors::AppError> for DispersionError {
    fn from(e: refdisp_common::errors::AppError) -> Self {
        DispersionError::Config(e.to_string())
    }
}
