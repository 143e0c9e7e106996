//! CESM Case Tools Library
//!
//! A Rust library for finding and assembling the output of CESM model runs.
//!
//! This library provides tools for:
//! - Discovering logs, history files and time-series files of a case across
//!   run, archive and campaign directories
//! - Bucketing component logs by model date and counting solver warnings
//! - Stitching time-series and history NetCDF files into one dataset with
//!   mid-interval time coordinates
//! - Checking which years have been reshaped to time series
//! - Converting variables between units
//! - Naming plot artifacts and writing their metadata
//! - Submitting time-series reshaping jobs to a batch scheduler

pub mod calendar;
pub mod case;
pub mod cime;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod error;
pub mod models;
pub mod plot;
pub mod report;
pub mod submit;
pub mod units;
pub mod utils;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use case::{Case, Coverage, DataSource, DatasetRequest, LogDate, YearCoverage};
pub use config::{CaseConfig, OnMissingRoot};
pub use dataset::{Dataset, DatasetReader, MemoryReader, Variable};
pub use error::{CaseError, Result};
pub use models::{LogComponent, StringOrList};
