//! Opening datasets from files, one at a time or as a multi-file dataset

use super::{Dataset, concat, decode_times};
use crate::constants::TIME_NAME;
use crate::error::{CaseError, Result};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task;
use tracing::debug;

/// Source of datasets keyed by file path.
///
/// Implementations return variables as stored in the file: numeric time
/// values with their `units` / `calendar` attributes. Decoding happens in
/// [`open_dataset`].
pub trait DatasetReader: Send + Sync {
    fn open(&self, path: &Path) -> Result<Dataset>;
}

/// Options for opening datasets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenOptions {
    /// Decode CF time offsets into calendar dates
    pub decode_times: bool,
    /// Open the files of a multi-file dataset concurrently
    pub parallel: bool,
    /// Maximum number of files opened at once when `parallel` is set
    pub max_parallel: usize,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            decode_times: true,
            parallel: true,
            max_parallel: num_cpus::get(),
        }
    }
}

/// Open one file and apply the decoding requested in `opts`
pub fn open_dataset(reader: &dyn DatasetReader, path: &Path, opts: &OpenOptions) -> Result<Dataset> {
    let ds = reader.open(path)?;
    if opts.decode_times {
        decode_times(&ds)
    } else {
        Ok(ds)
    }
}

/// Open `paths` and concatenate them along `time`, in the order given.
///
/// With `opts.parallel` the files are opened on the blocking thread pool,
/// at most `opts.max_parallel` at a time; the result order does not depend
/// on which file finishes first.
pub async fn open_mfdataset(
    reader: Arc<dyn DatasetReader>,
    paths: &[PathBuf],
    opts: &OpenOptions,
) -> Result<Dataset> {
    if paths.is_empty() {
        return Err(CaseError::invalid_input("paths", "no files to open"));
    }

    let datasets = if opts.parallel && paths.len() > 1 {
        let limit = opts.max_parallel.max(1).min(paths.len());
        debug!("Opening {} files with up to {} concurrent readers", paths.len(), limit);

        let results: Vec<Result<Dataset>> = stream::iter(paths.iter().cloned())
            .map(|path| {
                let reader = Arc::clone(&reader);
                let opts = opts.clone();
                async move {
                    let task_path = path.clone();
                    task::spawn_blocking(move || open_dataset(reader.as_ref(), &task_path, &opts))
                        .await
                        .map_err(|e| CaseError::Reader {
                            path,
                            reason: format!("reader task failed: {}", e),
                        })?
                }
            })
            .buffered(limit)
            .collect()
            .await;
        results.into_iter().collect::<Result<Vec<_>>>()?
    } else {
        paths
            .iter()
            .map(|path| open_dataset(reader.as_ref(), path, opts))
            .collect::<Result<Vec<_>>>()?
    };

    debug!("Concatenating {} datasets along {}", datasets.len(), TIME_NAME);
    concat(&datasets, TIME_NAME)
}
