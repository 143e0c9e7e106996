//! Configuration management and validation.
//!
//! Provides the settings a `Case` is built with: the stream table, how to
//! treat output roots that do not exist, the variables kept alongside
//! requested ones, multi-file open options, filesystem layout for deriving
//! output roots, and the batch scheduler used for job submission.
//!
//! Settings are layered: built-in defaults, then the user config file
//! (`{config_dir}/cesm-case-tools/config.json`), then an explicit file, then
//! command-line flags.

use crate::constants::{
    APP_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_ARCHIVE_DIRNAME, DEFAULT_SCHEDULER,
    DEFAULT_SCRATCH_ROOT, DEFAULT_VARS_TO_KEEP, LOGS_DIR_NAME,
};
use crate::dataset::OpenOptions;
use crate::error::{CaseError, Result};
use crate::models::{Component, StreamTable};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What to do with an output root that is not an existing directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnMissingRoot {
    /// Drop the root with a warning
    #[default]
    Skip,
    /// Fail case construction with `MissingRoot`
    Error,
}

/// Batch scheduler settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Executable used to submit jobs
    pub command: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_SCHEDULER.to_string(),
        }
    }
}

/// Filesystem layout used to derive candidate output roots for a case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Root of the scratch filesystem
    pub scratch_root: PathBuf,

    /// User directory under `scratch_root`
    pub user: String,

    /// Short-term archive directory under `{scratch_root}/{user}`
    pub archive_dirname: String,

    /// Root holding time-series output per case, if any
    pub campaign_root: Option<PathBuf>,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            scratch_root: PathBuf::from(DEFAULT_SCRATCH_ROOT),
            user: std::env::var("USER").unwrap_or_else(|_| "unknown".to_string()),
            archive_dirname: DEFAULT_ARCHIVE_DIRNAME.to_string(),
            campaign_root: None,
        }
    }
}

impl PathConfig {
    /// `{scratch_root}/{user}/{case}/run`
    pub fn rundir(&self, case: &str) -> PathBuf {
        self.scratch_root.join(&self.user).join(case).join("run")
    }

    /// `{scratch_root}/{user}/{archive_dirname}/{case}`
    pub fn archive_root(&self, case: &str) -> PathBuf {
        self.scratch_root
            .join(&self.user)
            .join(&self.archive_dirname)
            .join(case)
    }

    pub fn archive_hist_dir(&self, case: &str, comp: Component) -> PathBuf {
        self.archive_root(case).join(comp.dir_name()).join("hist")
    }

    pub fn archive_log_dir(&self, case: &str) -> PathBuf {
        self.archive_root(case).join(LOGS_DIR_NAME)
    }

    /// Run directory, archive root and (when configured) campaign directory
    pub fn output_roots(&self, case: &str) -> Vec<PathBuf> {
        let mut roots = vec![self.rundir(case), self.archive_root(case)];
        if let Some(campaign) = &self.campaign_root {
            roots.push(campaign.join(case));
        }
        roots
    }
}

/// Settings for discovering and assembling case output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseConfig {
    /// Handling of output roots that are not directories
    pub on_missing_root: OnMissingRoot,

    /// Known streams and their component / frequency
    pub streams: StreamTable,

    /// Filesystem layout
    pub paths: PathConfig,

    /// Variables kept alongside the requested ones when assembling datasets
    pub vars_to_keep: Vec<String>,

    /// Multi-file open options
    pub open: OpenOptions,

    /// Batch scheduler
    pub scheduler: SchedulerConfig,
}

impl Default for CaseConfig {
    fn default() -> Self {
        Self {
            on_missing_root: OnMissingRoot::default(),
            streams: StreamTable::default(),
            paths: PathConfig::default(),
            vars_to_keep: DEFAULT_VARS_TO_KEEP.iter().map(|v| v.to_string()).collect(),
            open: OpenOptions::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl CaseConfig {
    /// Read a JSON config file; absent keys take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Location of the per-user config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// The per-user config file if it exists, built-in defaults otherwise
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// `path` when given, otherwise the per-user file or defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::load_default(),
        }
    }

    /// Check settings that serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.streams.is_empty() {
            return Err(CaseError::configuration("stream table is empty"));
        }
        if self.vars_to_keep.iter().any(|v| v.trim().is_empty()) {
            return Err(CaseError::configuration("vars_to_keep contains an empty name"));
        }
        if self.open.max_parallel == 0 {
            return Err(CaseError::configuration("open.max_parallel must be at least 1"));
        }
        if self.scheduler.command.trim().is_empty() {
            return Err(CaseError::configuration("scheduler.command is empty"));
        }
        Ok(())
    }

    pub fn with_on_missing_root(mut self, on_missing_root: OnMissingRoot) -> Self {
        self.on_missing_root = on_missing_root;
        self
    }

    pub fn with_streams(mut self, streams: StreamTable) -> Self {
        self.streams = streams;
        self
    }

    pub fn with_vars_to_keep(mut self, vars_to_keep: Vec<String>) -> Self {
        self.vars_to_keep = vars_to_keep;
        self
    }

    pub fn with_open_options(mut self, open: OpenOptions) -> Self {
        self.open = open;
        self
    }

    pub fn with_paths(mut self, paths: PathConfig) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_scheduler(mut self, command: impl Into<String>) -> Self {
        self.scheduler.command = command.into();
        self
    }
}
