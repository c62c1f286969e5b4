//! Error types for the collaborator boundary and the calculators.

use thiserror::Error;

/// Failure of the review source (the backing record store).
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read review store {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse review store {path}: {message}")]
    Parse { path: String, message: String },

    #[error("review store unavailable: {0}")]
    Unavailable(String),
}

/// Failure of the parameter store (named configuration values).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access parameter file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parameter file {path} is not a JSON object of strings: {message}")]
    Format { path: String, message: String },

    #[error("parameter {name} is not a JSON list: {message}")]
    NotAList { name: String, message: String },
}

/// Failure inside a single calculator. Reported under that stat's name only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatError {
    #[error("window start {start} is after window end {end}")]
    InvertedWindow { start: String, end: String },

    #[error("no query window was supplied")]
    MissingWindow,

    #[error("failed to serialize review {review_hash}: {message}")]
    Serialize {
        review_hash: String,
        message: String,
    },

    #[error("calculator panicked: {0}")]
    Panicked(String),
}
