//! File discovery for CESM case output
//!
//! Output may sit in any of these places under an output root:
//! ```text
//! {root}/
//!   cesm.log.*  ocn.log.*  cpl.log.*           (run directory)
//!   {case}.{stream}.{date}.nc                  (run directory)
//!   logs/{component}.log.*[.gz]                (short-term archive)
//!   {comp}/hist/{case}.{stream}.{date}.nc      (short-term archive)
//!   {comp}/proc/tseries/{freq}/{case}.{stream}.{var}.{range}.nc
//! ```

use super::filename::OutputFile;
use crate::config::OnMissingRoot;
use crate::constants::{HIST_DIR_NAME, LOGS_DIR_NAME, NETCDF_EXTENSION, TSERIES_DIR_PARTS};
use crate::error::{CaseError, Result};
use crate::models::{LogComponent, StreamTable};
use glob::Pattern;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Keep the roots that are directories, applying `policy` to the others
pub fn resolve_roots(roots: Vec<PathBuf>, policy: OnMissingRoot) -> Result<Vec<PathBuf>> {
    let mut resolved = Vec::with_capacity(roots.len());
    for root in roots {
        if root.is_dir() {
            resolved.push(root);
            continue;
        }
        match policy {
            OnMissingRoot::Skip => warn!("Skipping output root {}: not a directory", root.display()),
            OnMissingRoot::Error => return Err(CaseError::MissingRoot { path: root }),
        }
    }
    Ok(resolved)
}

/// Files in `dir` matching `pattern`; `dir` is escaped, `pattern` is not
fn glob_in(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let full = format!("{}/{}", Pattern::escape(&dir.to_string_lossy()), pattern);
    let mut found = Vec::new();
    for entry in glob::glob(&full)? {
        match entry {
            Ok(path) if path.is_file() => found.push(path),
            Ok(_) => {}
            Err(e) => warn!("Unreadable path while searching {}: {}", dir.display(), e),
        }
    }
    Ok(found)
}

fn sort_dedup(files: &mut Vec<PathBuf>) {
    files.sort();
    files.dedup();
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

/// Every file found for a case, grouped by log component or stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseFiles {
    pub logs: BTreeMap<LogComponent, Vec<PathBuf>>,
    pub history: BTreeMap<String, Vec<PathBuf>>,
    pub timeseries: BTreeMap<String, Vec<PathBuf>>,
}

impl CaseFiles {
    /// Search `roots` for the logs and NetCDF output of `cases`
    pub fn discover(cases: &[String], roots: &[PathBuf], streams: &StreamTable) -> Result<Self> {
        let mut files = Self {
            logs: find_log_files(roots)?,
            ..Self::default()
        };

        for (stream, meta) in streams.iter() {
            let mut history = Vec::new();
            let mut timeseries = Vec::new();
            let nc_pattern = |case: &str| {
                format!(
                    "{}.{}.*.{}",
                    Pattern::escape(case),
                    Pattern::escape(stream),
                    NETCDF_EXTENSION
                )
            };

            for case in cases {
                let pattern = nc_pattern(case);
                let is_history = |path: &PathBuf| {
                    file_name(path)
                        .and_then(|name| OutputFile::classify(name, case, stream))
                        .is_some_and(|f| f.is_history())
                };
                let is_timeseries = |path: &PathBuf| {
                    file_name(path)
                        .and_then(|name| OutputFile::classify(name, case, stream))
                        .is_some_and(|f| f.is_timeseries())
                };

                for root in roots {
                    debug!("Checking {} for {} files", root.display(), stream);
                    let comp_dir = root.join(meta.comp.dir_name());

                    history.extend(glob_in(root, &pattern)?.into_iter().filter(is_history));
                    history.extend(
                        glob_in(&comp_dir.join(HIST_DIR_NAME), &pattern)?
                            .into_iter()
                            .filter(is_history),
                    );

                    let tseries_dir = TSERIES_DIR_PARTS
                        .iter()
                        .fold(comp_dir.clone(), |dir, part| dir.join(part))
                        .join(meta.freq.dir_name());
                    timeseries.extend(
                        glob_in(&tseries_dir, &pattern)?
                            .into_iter()
                            .filter(is_timeseries),
                    );
                }
            }

            sort_dedup(&mut history);
            sort_dedup(&mut timeseries);
            debug!(
                "Stream {}: {} history files, {} time series files",
                stream,
                history.len(),
                timeseries.len()
            );
            files.history.insert(stream.to_string(), history);
            files.timeseries.insert(stream.to_string(), timeseries);
        }

        Ok(files)
    }
}

/// `{component}.log.*` in each root and in `{root}/logs`
pub fn find_log_files(roots: &[PathBuf]) -> Result<BTreeMap<LogComponent, Vec<PathBuf>>> {
    let mut logs = BTreeMap::new();
    for component in LogComponent::ALL {
        let pattern = format!("{}.log.*", component.name());
        let mut files = Vec::new();
        for root in roots {
            files.extend(glob_in(root, &pattern)?);
            files.extend(glob_in(&root.join(LOGS_DIR_NAME), &pattern)?);
        }
        sort_dedup(&mut files);
        debug!("Found {} {} log files", files.len(), component);
        logs.insert(component, files);
    }
    Ok(logs)
}
