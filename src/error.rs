//! Error handling for case discovery, log parsing and dataset assembly.
//!
//! Provides a single error enum with enough context (paths, stream names,
//! year ranges) for a notebook or CLI user to see what could not be found.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),

    #[error("Invalid {name}: {reason}")]
    InvalidInput { name: String, reason: String },

    #[error("Output root is not a directory: {path}")]
    MissingRoot { path: PathBuf },

    #[error("No known {component}.log files")]
    UnknownComponent { component: String },

    #[error("Do not know how to find dates in {component}.log")]
    UnsupportedLogComponent { component: String },

    #[error("Failed to parse log {path} at line {line}: {reason}")]
    LogParse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Unknown stream: {stream}")]
    UnknownStream { stream: String },

    #[error(
        "Can not find requested variables in stream {stream} between {start_year:04} and {end_year:04}"
    )]
    NoData {
        stream: String,
        start_year: i32,
        end_year: i32,
    },

    #[error("{key} exists in dst and src and dst values mismatch")]
    EncodingMismatch { key: String },

    #[error("Variable not found in dataset: {name}")]
    MissingVariable { name: String },

    #[error("Dimension mismatch for {name}: {reason}")]
    DimensionMismatch { name: String, reason: String },

    #[error("Calendar error: {message}")]
    Calendar { message: String },

    #[error("Unit error: {message}")]
    Units { message: String },

    #[error("Cannot convert from '{from}' to '{to}'")]
    IncompatibleUnits { from: String, to: String },

    #[error("No dataset reader configured (build with the `netcdf` feature or call with_reader)")]
    NoReader,

    #[error("Failed to read dataset {path}: {reason}")]
    Reader { path: PathBuf, reason: String },

    #[error("Scheduler submission failed for {script}: {reason}")]
    Scheduler { script: String, reason: String },

    #[error("xmlquery failed in {caseroot}: {reason}")]
    Cime { caseroot: PathBuf, reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl CaseError {
    /// Create an invalid input error
    pub fn invalid_input(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a calendar error
    pub fn calendar(message: impl Into<String>) -> Self {
        Self::Calendar {
            message: message.into(),
        }
    }

    /// Create a unit error
    pub fn units(message: impl Into<String>) -> Self {
        Self::Units {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn missing_variable(name: impl Into<String>) -> Self {
        Self::MissingVariable { name: name.into() }
    }

    pub fn dimension_mismatch(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DimensionMismatch {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CaseError>;
