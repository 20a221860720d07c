//! Import error types

use sea_orm::DbErr;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed row in {file}: {source}")]
    Csv {
        file: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid row in {file}, record {record}: {message}")]
    InvalidRow {
        file: &'static str,
        record: u64,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}
