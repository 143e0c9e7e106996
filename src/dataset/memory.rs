//! Reader serving datasets from memory

use super::{Dataset, DatasetReader};
use crate::error::{CaseError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Datasets registered under file paths.
///
/// Used when the data is produced in-process, and to exercise discovery and
/// assembly against empty placeholder files.
#[derive(Debug, Default)]
pub struct MemoryReader {
    datasets: HashMap<PathBuf, Dataset>,
    opened: AtomicUsize,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, dataset: Dataset) {
        self.datasets.insert(path.into(), dataset);
    }

    pub fn with_dataset(mut self, path: impl Into<PathBuf>, dataset: Dataset) -> Self {
        self.insert(path, dataset);
        self
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Number of successful `open` calls so far
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::Relaxed)
    }
}

impl DatasetReader for MemoryReader {
    fn open(&self, path: &Path) -> Result<Dataset> {
        let dataset = self.datasets.get(path).ok_or_else(|| CaseError::Reader {
            path: path.to_path_buf(),
            reason: "no dataset registered for this path".to_string(),
        })?;
        self.opened.fetch_add(1, Ordering::Relaxed);
        Ok(dataset.clone())
    }
}
