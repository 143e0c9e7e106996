//! Command-line argument definitions
//!
//! This module defines the clap-derived argument structure for each
//! subcommand, along with validation and log-level helpers.

use crate::config::OnMissingRoot;
use crate::constants::{DEFAULT_CO2CALC_MAX_IT, DEFAULT_END_YEAR, DEFAULT_START_YEAR};
use crate::error::{CaseError, Result};
use crate::models::LogComponent;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the CESM case tools
///
/// Finds the logs and NetCDF output of CESM cases, assembles datasets that
/// span time-series and history files, and submits time-series reshaping jobs.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cesm-case-tools",
    version,
    about = "Inspect and reshape the output of CESM cases",
    long_about = "Discovers the log and NetCDF output of one or more CESM cases across run, \
                  archive and campaign directories. Buckets component logs by model date, \
                  stitches time-series and history files into one dataset, checks which years \
                  have been converted to time series and submits the conversion jobs."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// JSON configuration file, read instead of the per-user one
    #[arg(
        long = "config",
        value_name = "FILE",
        global = true,
        help = "Configuration file (defaults to the per-user config.json)"
    )]
    pub config_file: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// List the log, history and time-series files of a case
    Files(FilesArgs),
    /// Bucket a component log by model date and count solver warnings
    Logs(LogsArgs),
    /// Assemble variables of one stream across time-series and history files
    Dataset(DatasetArgs),
    /// Check which years have time series for everything in history
    Compare(CompareArgs),
    /// Submit time-series reshaping jobs to the batch scheduler
    Submit(SubmitArgs),
    /// Print the output roots of CIME case directories
    OutputRoots(OutputRootsArgs),
}

/// Which case to open and where to look for it
#[derive(Debug, Clone, ClapArgs)]
pub struct CaseArgs {
    /// One or more case names
    #[arg(value_name = "CASE", required = true, help = "Case name(s)")]
    pub casenames: Vec<String>,

    /// Output roots to search; derived from the configured paths when absent
    #[arg(
        short = 'r',
        long = "root",
        value_name = "DIR",
        help = "Output root to search (repeatable)"
    )]
    pub roots: Vec<PathBuf>,

    /// Fail instead of skipping roots that do not exist
    #[arg(
        long = "strict-roots",
        help = "Fail when an output root is not a directory"
    )]
    pub strict_roots: bool,
}

impl CaseArgs {
    pub fn on_missing_root(&self) -> Option<OnMissingRoot> {
        self.strict_roots.then_some(OnMissingRoot::Error)
    }
}

/// Arguments for the files command
#[derive(Debug, Clone, ClapArgs)]
pub struct FilesArgs {
    #[command(flatten)]
    pub case: CaseArgs,

    /// Only list this stream
    #[arg(short = 's', long = "stream", value_name = "STREAM", help = "Stream to list, e.g. pop.h")]
    pub stream: Option<String>,

    /// Only list files covering this year
    #[arg(short = 'y', long = "year", value_name = "YEAR", help = "Model year to select")]
    pub year: Option<i32>,
}

/// Arguments for the logs command
#[derive(Debug, Clone, ClapArgs)]
pub struct LogsArgs {
    #[command(flatten)]
    pub case: CaseArgs,

    /// Log component to read
    #[arg(
        short = 'm',
        long = "component",
        value_name = "COMPONENT",
        default_value = "cesm",
        help = "Log component (cesm or cpl)"
    )]
    pub component: LogComponent,

    /// Count co2calc warnings up to this iteration
    #[arg(
        long = "max-it",
        value_name = "N",
        default_value_t = DEFAULT_CO2CALC_MAX_IT,
        help = "Highest co2calc iteration to count"
    )]
    pub max_it: usize,

    /// Count lines containing this text instead of co2calc warnings
    #[arg(long = "grep", value_name = "TEXT", help = "Count lines containing TEXT per model date")]
    pub grep: Option<String>,

    /// Write the per-date table to a CSV or Parquet file
    #[arg(short = 'o', long = "output", value_name = "FILE", help = "Report file (.csv or .parquet)")]
    pub output: Option<PathBuf>,
}

impl LogsArgs {
    pub fn validate(&self) -> Result<()> {
        if self.max_it == 0 && self.grep.is_none() {
            return Err(CaseError::invalid_input("max-it", "must be at least 1"));
        }
        Ok(())
    }
}

/// Arguments for the dataset command
#[derive(Debug, Clone, ClapArgs)]
pub struct DatasetArgs {
    #[command(flatten)]
    pub case: CaseArgs,

    #[arg(short = 's', long = "stream", value_name = "STREAM", help = "Stream, e.g. pop.h")]
    pub stream: String,

    #[arg(
        short = 'n',
        long = "var",
        value_name = "NAME",
        required = true,
        help = "Variable to load (repeatable)"
    )]
    pub varnames: Vec<String>,

    #[arg(long = "start-year", value_name = "YEAR", default_value_t = DEFAULT_START_YEAR)]
    pub start_year: i32,

    #[arg(long = "end-year", value_name = "YEAR", default_value_t = DEFAULT_END_YEAR)]
    pub end_year: i32,

    /// Extra variables kept alongside the requested ones when present
    #[arg(long = "keep", value_name = "NAME", help = "Extra variable to keep (repeatable)")]
    pub keep: Vec<String>,

    /// Convert every requested variable to these units
    #[arg(long = "units", value_name = "UNITS", help = "Target units, e.g. 'mmol/m^3'")]
    pub units: Option<String>,

    /// Scale factor applied before converting, e.g. `g/mol`
    #[arg(long = "scale", value_name = "UNITS", requires = "units")]
    pub units_scalef: Option<String>,
}

impl DatasetArgs {
    pub fn validate(&self) -> Result<()> {
        if self.start_year > self.end_year {
            return Err(CaseError::invalid_input(
                "years",
                format!("start year {} is after end year {}", self.start_year, self.end_year),
            ));
        }
        Ok(())
    }
}

/// Arguments for the compare command
#[derive(Debug, Clone, ClapArgs)]
pub struct CompareArgs {
    #[command(flatten)]
    pub case: CaseArgs,

    /// Streams to check; every configured stream when absent
    #[arg(short = 's', long = "stream", value_name = "STREAM", help = "Stream to check (repeatable)")]
    pub streams: Vec<String>,

    #[arg(long = "start-year", value_name = "YEAR", default_value_t = DEFAULT_START_YEAR)]
    pub start_year: i32,

    #[arg(long = "end-year", value_name = "YEAR", default_value_t = DEFAULT_END_YEAR)]
    pub end_year: i32,

    #[arg(short = 'o', long = "output", value_name = "FILE", help = "Report file (.csv or .parquet)")]
    pub output: Option<PathBuf>,
}

/// Arguments for the submit command
#[derive(Debug, Clone, ClapArgs)]
pub struct SubmitArgs {
    /// Years to reshape
    #[arg(value_name = "YEAR", required = true, help = "Model year(s) to submit")]
    pub years: Vec<i32>,

    /// Case suffix passed to every script
    #[arg(short = 'c', long = "case", value_name = "SUFFIX", help = "Case suffix, e.g. 004")]
    pub case_suffix: Option<String>,

    /// Scripts to submit for each year; the standard set when absent
    #[arg(long = "script", value_name = "SCRIPT", help = "Batch script (repeatable)")]
    pub scripts: Vec<String>,

    #[arg(long = "dry-run", help = "Show what would be submitted without submitting")]
    pub dry_run: bool,

    #[arg(long = "no-mail", help = "Pass --mail-type=NONE to the scheduler")]
    pub no_mail: bool,

    #[arg(long = "workdir", value_name = "DIR", help = "Directory to submit from")]
    pub workdir: Option<PathBuf>,
}

/// Arguments for the output-roots command
#[derive(Debug, Clone, ClapArgs)]
pub struct OutputRootsArgs {
    #[arg(value_name = "CASEROOT", required = true, help = "CIME case directory (repeatable)")]
    pub caseroots: Vec<PathBuf>,
}

impl Args {
    /// Get the appropriate log level based on verbosity settings
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Progress bars are hidden in quiet mode
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}
