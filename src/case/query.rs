//! Queries over discovered files and dataset assembly

use super::Case;
use super::filename::OutputFile;
use crate::calendar::{CalendarDate, TimeUnits, num2date};
use crate::constants::{
    DATASET_ENCODING_KEYS, DEFAULT_END_YEAR, DEFAULT_START_YEAR, TIME_BOUNDS_NAMES, TIME_NAME,
};
use crate::dataset::{
    Dataset, OpenOptions, VariableData, concat, copy_encoding, merge, open_dataset,
    open_mfdataset, propagate_encoding, propagate_time_encoding, time_set_mid, variable_calendar,
};
use crate::error::{CaseError, Result};
use crate::models::StringOrList;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where the data of one (stream, year, variable) came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DataSource {
    #[serde(rename = "time series")]
    TimeSeries,
    #[serde(rename = "hist")]
    History,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::TimeSeries => f.write_str("time series"),
            DataSource::History => f.write_str("hist"),
        }
    }
}

/// Whether the time-series files of a year hold everything the history
/// files do
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Coverage {
    NoTimeSeries,
    NoHistory,
    Same,
    DatasetsDiffer { missing: Vec<String> },
}

impl fmt::Display for Coverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coverage::NoTimeSeries => f.write_str("no time series"),
            Coverage::NoHistory => f.write_str("no history"),
            Coverage::Same => f.write_str("same"),
            Coverage::DatasetsDiffer { missing } => {
                write!(f, "datasets differ (missing: {})", missing.join(", "))
            }
        }
    }
}

/// Coverage of every checked stream for one year
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearCoverage {
    pub year: i32,
    pub streams: BTreeMap<String, Coverage>,
}

impl YearCoverage {
    /// True when no stream is missing time series and at least one stream
    /// had history files to check against
    pub fn complete(&self) -> bool {
        let checked = self
            .streams
            .values()
            .filter(|c| !matches!(c, Coverage::NoHistory))
            .count();
        checked > 0 && self.streams.values().all(|c| matches!(c, Coverage::Same | Coverage::NoHistory))
    }

    pub fn has_timeseries(&self) -> bool {
        !self.streams.values().any(|c| matches!(c, Coverage::NoTimeSeries))
    }
}

/// Parameters of `Case::gen_dataset`; doubles as the cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetRequest {
    pub varnames: Vec<String>,
    pub stream: String,
    /// Kept in addition to the configured `vars_to_keep`
    pub extra_vars_to_keep: Vec<String>,
    pub start_year: i32,
    pub end_year: i32,
    pub quiet: bool,
}

impl DatasetRequest {
    pub fn new(varnames: impl Into<StringOrList>, stream: impl Into<String>) -> Result<Self> {
        Ok(Self {
            varnames: varnames.into().into_vec("varnames")?,
            stream: stream.into(),
            extra_vars_to_keep: Vec::new(),
            start_year: DEFAULT_START_YEAR,
            end_year: DEFAULT_END_YEAR,
            quiet: false,
        })
    }

    pub fn years(mut self, start_year: i32, end_year: i32) -> Self {
        self.start_year = start_year;
        self.end_year = end_year;
        self
    }

    pub fn keep(mut self, vars_to_keep: impl Into<StringOrList>) -> Result<Self> {
        self.extra_vars_to_keep = vars_to_keep.into().into_vec("vars_to_keep")?;
        Ok(self)
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }
}

/// Requested names plus the keep-variables that `ds` actually has
fn selection(ds: &Dataset, requested: &[String], keep: &[String]) -> Vec<String> {
    let mut names = requested.to_vec();
    for name in keep {
        if ds.contains(name) && !names.contains(name) {
            names.push(name.clone());
        } else if !ds.contains(name) {
            debug!("Keep-variable {} not in dataset, skipping", name);
        }
    }
    names
}

fn select_with_keep(ds: &Dataset, requested: &[String], keep: &[String]) -> Result<Dataset> {
    ds.select(&selection(ds, requested, keep))
}

/// One edge of the time bounds as a calendar date
fn bound_edge(ds: &Dataset, row: usize, col: usize) -> Result<CalendarDate> {
    let time = ds.get(TIME_NAME)?;
    let tb_name = time
        .attr_str("bounds")
        .ok_or_else(|| CaseError::missing_variable(format!("{} bounds", TIME_NAME)))?;
    let tb = ds.get(tb_name)?;
    match &tb.data {
        VariableData::Time(dates) => dates
            .get([row, col].as_slice())
            .copied()
            .ok_or_else(|| CaseError::dimension_mismatch(tb_name, "bounds index out of range")),
        VariableData::Numeric(values) => {
            let value = values
                .get([row, col].as_slice())
                .copied()
                .ok_or_else(|| CaseError::dimension_mismatch(tb_name, "bounds index out of range"))?;
            let units = tb
                .attr_str("units")
                .or_else(|| time.attr_str("units"))
                .ok_or_else(|| CaseError::calendar(format!("{} has no units", tb_name)))?;
            num2date(value, &TimeUnits::parse(units)?, variable_calendar(time)?)
        }
    }
}

fn last_upper_bound(ds: &Dataset) -> Result<CalendarDate> {
    let n = ds
        .size(TIME_NAME)
        .filter(|&n| n > 0)
        .ok_or_else(|| CaseError::dimension_mismatch(TIME_NAME, "empty time axis"))?;
    bound_edge(ds, n - 1, 1)
}

fn push_unique(files: &mut Vec<PathBuf>, new: Vec<PathBuf>) {
    for file in new {
        if !files.contains(&file) {
            files.push(file);
        }
    }
}

impl Case {
    /// Time-series files of `stream` whose variable is one of `varnames`
    /// (any variable when `None`) and whose span covers `year`
    pub fn timeseries_files(
        &self,
        year: i32,
        stream: &str,
        varnames: Option<&[String]>,
    ) -> Result<Vec<PathBuf>> {
        let files = self.timeseries_filenames(stream)?;
        let covers = |path: &Path, wanted: Option<&String>| match self.classify(path, stream) {
            Some(OutputFile::TimeSeries { variable, span }) => {
                span.covers(year) && wanted.is_none_or(|w| *w == variable)
            }
            _ => false,
        };

        let mut matched = Vec::new();
        match varnames {
            Some(varnames) => {
                for var in varnames {
                    matched.extend(files.iter().filter(|path| covers(path, Some(var))).cloned());
                }
            }
            None => matched.extend(files.iter().filter(|path| covers(path, None)).cloned()),
        }
        Ok(matched)
    }

    /// True if any time-series file of `stream` covers `year`
    pub fn check_for_year_in_timeseries_files(&self, year: i32, stream: &str) -> Result<bool> {
        Ok(!self.timeseries_files(year, stream, None)?.is_empty())
    }

    /// History files of `stream` dated in `year`
    pub fn history_files(&self, year: i32, stream: &str) -> Result<Vec<PathBuf>> {
        Ok(self
            .history_filenames(stream)?
            .iter()
            .filter(|path| {
                matches!(self.classify(path, stream), Some(OutputFile::History(date)) if date.year == year)
            })
            .cloned()
            .collect())
    }

    /// Where the data for `(stream, year, varname)` came from in earlier
    /// `gen_dataset` calls
    pub fn dataset_source(&self, stream: &str, year: i32, varname: &str) -> Option<DataSource> {
        let source = self
            .dataset_src
            .get(&(stream.to_string(), year, varname.to_string()))
            .copied();
        if source.is_none() {
            debug!(
                "No dataset containing {} from year {:04} has been returned from {}",
                varname, year, stream
            );
        }
        source
    }

    fn record_source(&mut self, stream: &str, year: i32, varname: &str, source: DataSource) {
        self.dataset_src
            .insert((stream.to_string(), year, varname.to_string()), source);
    }

    /// Assemble `request.varnames` from `request.stream` over the requested
    /// years.
    ///
    /// Time-series files are used where they exist; history files fill in
    /// the years after the last time-series time bound. The time coordinate
    /// of the result is set to the midpoints of its bounds. Results are
    /// cached per request.
    pub async fn gen_dataset(&mut self, request: &DatasetRequest) -> Result<Dataset> {
        if let Some(ds) = self.datasets.get(request) {
            debug!("Returning cached dataset for {:?}", request.varnames);
            return Ok(ds.copy(false));
        }
        if request.start_year > request.end_year {
            return Err(CaseError::invalid_input(
                "years",
                format!("start year {} after end year {}", request.start_year, request.end_year),
            ));
        }
        let stream = request.stream.as_str();
        self.config.streams.get(stream)?;
        let reader = self.reader()?;
        let opts: OpenOptions = self.config.open.clone();

        let mut keep = self.config.vars_to_keep.clone();
        push_unique_names(&mut keep, &request.extra_vars_to_keep);

        // time series, one dataset per variable
        let mut ts_per_var = Vec::new();
        for varname in &request.varnames {
            let wanted = std::slice::from_ref(varname);
            let mut files = Vec::new();
            for year in request.start_year..=request.end_year {
                let found = self.timeseries_files(year, stream, Some(wanted))?;
                if !found.is_empty() {
                    self.record_source(stream, year, varname, DataSource::TimeSeries);
                    push_unique(&mut files, found);
                }
            }
            if files.is_empty() {
                continue;
            }
            debug!("Opening {} time series files for {}", files.len(), varname);
            let dsmf = open_mfdataset(reader.clone(), &files, &opts).await?;
            let mut dsmf = select_with_keep(&dsmf, wanted, &keep)?;
            let ds0 = open_dataset(reader.as_ref(), &files[0], &opts)?;
            propagate_encoding(&select_with_keep(&ds0, wanted, &keep)?, &mut dsmf, TIME_NAME)?;
            ts_per_var.push(dsmf);
        }

        let mut hist_start_year = request.start_year;
        let ds_timeseries = match ts_per_var.first() {
            Some(first) => {
                let mut merged = merge(&ts_per_var)?;
                copy_encoding(&first.encoding, &mut merged.encoding, DATASET_ENCODING_KEYS, true)?;
                hist_start_year = last_upper_bound(&merged)?.year;
                Some(merged)
            }
            None => None,
        };

        // history files for the years time series do not cover
        let mut hist_files = Vec::new();
        for year in hist_start_year..=request.end_year {
            let found = self.history_files(year, stream)?;
            if !found.is_empty() {
                for varname in &request.varnames {
                    self.record_source(stream, year, varname, DataSource::History);
                }
                push_unique(&mut hist_files, found);
            }
        }
        let ds_history = if hist_files.is_empty() {
            None
        } else {
            debug!("Opening {} history files", hist_files.len());
            let dsmf = open_mfdataset(reader.clone(), &hist_files, &opts).await?;
            let mut dsmf = select_with_keep(&dsmf, &request.varnames, &keep)?;
            let ds0 = open_dataset(reader.as_ref(), &hist_files[0], &opts)?;
            propagate_encoding(
                &select_with_keep(&ds0, &request.varnames, &keep)?,
                &mut dsmf,
                TIME_NAME,
            )?;
            Some(dsmf)
        };

        let ds = match (ds_timeseries, ds_history) {
            (Some(ts), Some(hist)) => {
                info!(
                    "Time series ends at {}, history files begin at {}",
                    last_upper_bound(&ts)?,
                    bound_edge(&hist, 0, 0)?
                );
                let mut ds = concat(&[ts.clone(), hist.clone()], TIME_NAME)?;
                for src in [&ts, &hist] {
                    propagate_time_encoding(src, &mut ds, TIME_NAME)?;
                }
                ds
            }
            (Some(ts), None) => ts,
            (None, Some(hist)) => {
                info!("{}: found all data from history only", stream);
                hist
            }
            (None, None) => {
                return Err(CaseError::NoData {
                    stream: stream.to_string(),
                    start_year: request.start_year,
                    end_year: request.end_year,
                });
            }
        };

        if let Some(missing) = request.varnames.iter().find(|name| !ds.contains(name)) {
            return Err(CaseError::missing_variable(missing.as_str()));
        }

        let ds = time_set_mid(&ds, TIME_NAME, false)?;
        if !request.quiet {
            info!(
                "Datasets contain a total of {} time samples",
                ds.size(TIME_NAME).unwrap_or(0)
            );
            if let Ok(last) = last_upper_bound(&ds) {
                info!("Last average written at {}", last);
            }
        }

        self.datasets.insert(request.clone(), ds.copy(false));
        Ok(ds)
    }

    /// Check that every time-dependent history variable of `stream` in
    /// `year` also has a time-series file
    pub async fn compare_timeseries_and_history(&self, stream: &str, year: i32) -> Result<Coverage> {
        if self.timeseries_files(year, stream, None)?.is_empty() {
            return Ok(Coverage::NoTimeSeries);
        }
        let history = self.history_files(year, stream)?;
        if history.is_empty() {
            return Ok(Coverage::NoHistory);
        }

        let ds_hist = open_mfdataset(self.reader()?, &history, &self.config.open).await?;
        let mut missing = Vec::new();
        for name in ds_hist.data_vars() {
            let has_time = ds_hist.variable(name).is_some_and(|v| v.has_dim(TIME_NAME));
            if !has_time || TIME_BOUNDS_NAMES.contains(&name) {
                continue;
            }
            let wanted = [name.to_string()];
            if self.timeseries_files(year, stream, Some(&wanted))?.is_empty() {
                debug!("No time series files for {} in year {:04}", name, year);
                missing.push(name.to_string());
            }
        }

        Ok(if missing.is_empty() {
            Coverage::Same
        } else {
            Coverage::DatasetsDiffer { missing }
        })
    }

    /// Compare time series with history files year by year, stopping after
    /// the first year in which some stream has no time series at all
    pub async fn compare_years(
        &self,
        streams: &[String],
        years: impl IntoIterator<Item = i32>,
    ) -> Result<Vec<YearCoverage>> {
        let mut results = Vec::new();
        for year in years {
            let mut coverage = YearCoverage {
                year,
                streams: BTreeMap::new(),
            };
            for stream in streams {
                let result = self.compare_timeseries_and_history(stream, year).await?;
                let stop = result == Coverage::NoTimeSeries;
                coverage.streams.insert(stream.clone(), result);
                if stop {
                    break;
                }
            }
            let has_timeseries = coverage.has_timeseries();
            results.push(coverage);
            if !has_timeseries {
                info!("Could not find time series for year {:04}", year);
                break;
            }
        }
        Ok(results)
    }
}

fn push_unique_names(names: &mut Vec<String>, extra: &[String]) {
    for name in extra {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }
}
