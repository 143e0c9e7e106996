//! Access to the log and NetCDF output of a CESM case.
//!
//! A `Case` is built from one or more case names and the directories to
//! search for their output. File listings are computed once at construction;
//! parsed logs and assembled datasets are computed on first request and
//! cached for the lifetime of the `Case`.

pub mod discovery;
pub mod filename;
pub mod logs;
pub mod query;

#[cfg(test)]
pub mod tests;

pub use self::discovery::CaseFiles;
pub use self::filename::{DateSpan, DateToken, OutputFile};
pub use self::logs::{LogContents, LogDate, ModelDay};
pub use self::query::{Coverage, DataSource, DatasetRequest, YearCoverage};

use crate::config::CaseConfig;
use crate::dataset::{Dataset, DatasetReader};
use crate::error::{CaseError, Result};
use crate::models::{LogComponent, StreamTable, StringOrList};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Output of one model run, possibly spread over several case names and
/// output roots
pub struct Case {
    casenames: Vec<String>,
    output_roots: Vec<PathBuf>,
    config: CaseConfig,
    files: CaseFiles,
    reader: Option<Arc<dyn DatasetReader>>,
    log_contents: HashMap<LogComponent, LogContents>,
    datasets: HashMap<DatasetRequest, Dataset>,
    dataset_src: BTreeMap<(String, i32, String), DataSource>,
}

impl fmt::Debug for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Case")
            .field("casenames", &self.casenames)
            .field("output_roots", &self.output_roots)
            .field("files", &self.files)
            .field("has_reader", &self.reader.is_some())
            .field("cached_logs", &self.log_contents.keys().collect::<Vec<_>>())
            .field("cached_datasets", &self.datasets.len())
            .finish()
    }
}

impl Case {
    /// Discover the output of `casenames` under `output_roots`.
    ///
    /// Roots that are not directories are skipped or rejected according to
    /// `config.on_missing_root`.
    pub fn new(
        casenames: impl Into<StringOrList>,
        output_roots: impl Into<StringOrList>,
        config: CaseConfig,
    ) -> Result<Self> {
        config.validate()?;
        let casenames = casenames.into().into_vec("casenames")?;
        let roots = output_roots.into().into_paths("output_roots")?;
        let output_roots = discovery::resolve_roots(roots, config.on_missing_root)?;

        let files = CaseFiles::discover(&casenames, &output_roots, &config.streams)?;
        info!(
            "Case {}: {} output roots, {} history and {} time series files",
            casenames.join(","),
            output_roots.len(),
            files.history.values().map(Vec::len).sum::<usize>(),
            files.timeseries.values().map(Vec::len).sum::<usize>()
        );

        Ok(Self {
            casenames,
            output_roots,
            config,
            files,
            reader: default_reader(),
            log_contents: HashMap::new(),
            datasets: HashMap::new(),
            dataset_src: BTreeMap::new(),
        })
    }

    /// Discover `casenames` under the roots derived from `config.paths`
    pub fn from_config_paths(casenames: impl Into<StringOrList>, config: CaseConfig) -> Result<Self> {
        let casenames = casenames.into().into_vec("casenames")?;
        let roots: Vec<PathBuf> = casenames
            .iter()
            .flat_map(|case| config.paths.output_roots(case))
            .collect();
        Self::new(casenames, roots, config)
    }

    /// Use `reader` to open NetCDF files
    pub fn with_reader(mut self, reader: Arc<dyn DatasetReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn casenames(&self) -> &[String] {
        &self.casenames
    }

    /// Output roots that exist, in the order given
    pub fn output_roots(&self) -> &[PathBuf] {
        &self.output_roots
    }

    pub fn config(&self) -> &CaseConfig {
        &self.config
    }

    pub fn streams(&self) -> &StreamTable {
        &self.config.streams
    }

    pub fn files(&self) -> &CaseFiles {
        &self.files
    }

    pub fn log_files(&self, component: LogComponent) -> &[PathBuf] {
        self.files
            .logs
            .get(&component)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn history_filenames(&self, stream: &str) -> Result<&[PathBuf]> {
        self.config.streams.get(stream)?;
        Ok(self
            .files
            .history
            .get(stream)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    pub fn timeseries_filenames(&self, stream: &str) -> Result<&[PathBuf]> {
        self.config.streams.get(stream)?;
        Ok(self
            .files
            .timeseries
            .get(stream)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    pub(crate) fn reader(&self) -> Result<Arc<dyn DatasetReader>> {
        self.reader.clone().ok_or(CaseError::NoReader)
    }

    /// Parse the logs of `component` into date buckets.
    ///
    /// Results are cached; a second call returns the cached contents without
    /// touching the files again.
    pub fn read_log(&mut self, component: &str) -> Result<&LogContents> {
        let component: LogComponent = component.parse()?;
        if !self.log_contents.contains_key(&component) {
            let contents = self.parse_logs(component)?;
            self.log_contents.insert(component, contents);
        }
        self.log_contents
            .get(&component)
            .ok_or_else(|| CaseError::UnknownComponent {
                component: component.to_string(),
            })
    }

    fn parse_logs(&self, component: LogComponent) -> Result<LogContents> {
        let paths = self
            .files
            .logs
            .get(&component)
            .ok_or_else(|| CaseError::UnknownComponent {
                component: component.to_string(),
            })?;
        let marker = component.date_marker()?;

        let mut contents = LogContents::new();
        for path in paths {
            let buckets = logs::parse_log_file(path, marker)?;
            logs::merge_log_buckets(&mut contents, path, buckets);
        }
        debug!(
            "Parsed {} {} logs into {} dates",
            paths.len(),
            component,
            contents.len()
        );
        Ok(contents)
    }

    /// Cached log contents of `component`, if already parsed
    pub fn log_contents(&self, component: LogComponent) -> Option<&LogContents> {
        self.log_contents.get(&component)
    }

    /// Per date, counts of MARBL carbonate-chemistry warnings at iterations
    /// `1..=max_it` in the most recent `cesm` log
    pub fn co2calc_warning_counts(&mut self, max_it: usize) -> Result<BTreeMap<LogDate, Vec<usize>>> {
        let contents = self.read_log(LogComponent::Cesm.name())?;
        Ok(logs::co2calc_warning_counts(contents, max_it))
    }

    /// Per date, lines containing `needle` in the most recent log of `component`
    pub fn count_matching_lines(
        &mut self,
        component: &str,
        needle: &str,
    ) -> Result<BTreeMap<LogDate, usize>> {
        let contents = self.read_log(component)?;
        Ok(logs::count_matching_lines(contents, needle))
    }

    /// Classify `path` against every case name of this case
    pub(crate) fn classify(&self, path: &Path, stream: &str) -> Option<OutputFile> {
        let name = path.file_name()?.to_str()?;
        self.casenames
            .iter()
            .find_map(|case| OutputFile::classify(name, case, stream))
    }
}

#[cfg(feature = "netcdf")]
fn default_reader() -> Option<Arc<dyn DatasetReader>> {
    Some(Arc::new(crate::dataset::NetcdfReader::new()))
}

#[cfg(not(feature = "netcdf"))]
fn default_reader() -> Option<Arc<dyn DatasetReader>> {
    None
}
