//! Run-log reading and date bucketing
//!
//! CESM logs interleave model output with periodic date stamps. Lines are
//! assigned to the model day they were written during: everything before the
//! first stamp belongs to the day before it, and each stamp opens the bucket
//! of its own date.

use crate::constants::{CO2CALC_WARNING_PREFIX, GZIP_EXTENSION, LOG_DATE_TOKEN_LEN};
use crate::error::{CaseError, Result};
use flate2::read::GzDecoder;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A model day parsed from a `YYYYMMDD` stamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModelDay {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl ModelDay {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }

    /// Parse an 8-character `YYYYMMDD` stamp
    pub fn parse_stamp(stamp: &str) -> Option<Self> {
        if stamp.len() != LOG_DATE_TOKEN_LEN || !stamp.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let year = stamp[..4].parse().ok()?;
        let month = stamp[4..6].parse().ok()?;
        let day = stamp[6..8].parse().ok()?;
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return None;
        }
        Some(Self { year, month, day })
    }
}

impl fmt::Display for ModelDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Key of a log bucket.
///
/// Ordering puts `First` before every dated bucket and file-named buckets of
/// logs without any stamp last.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogDate {
    /// Lines written before the first stamp of a run starting on day 1
    First,
    Day(ModelDay),
    /// Whole contents of a log with no date stamps, keyed by file name
    Unknown(String),
}

impl LogDate {
    /// Label of the lines preceding the first stamp `first_stamp`
    pub fn before(first_stamp: ModelDay) -> Self {
        if first_stamp.day > 1 {
            LogDate::Day(ModelDay {
                day: first_stamp.day - 1,
                ..first_stamp
            })
        } else {
            LogDate::First
        }
    }
}

impl fmt::Display for LogDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogDate::First => f.write_str("first"),
            LogDate::Day(day) => write!(f, "{}", day),
            LogDate::Unknown(name) => f.write_str(name),
        }
    }
}

impl Serialize for LogDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Lines of one log file grouped by date
pub type LogBuckets = BTreeMap<LogDate, Vec<String>>;

/// Lines of all logs of a component: date, then source file
pub type LogContents = BTreeMap<LogDate, BTreeMap<PathBuf, Vec<String>>>;

/// True for archived (gzip-compressed) logs
pub fn is_compressed(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == GZIP_EXTENSION)
}

/// Read a log file into lines, decompressing `.gz` files.
/// Invalid UTF-8 is replaced rather than rejected.
pub fn read_log_lines(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)?;
    let mut bytes = Vec::new();
    if is_compressed(path) {
        GzDecoder::new(BufReader::new(file)).read_to_end(&mut bytes)?;
    } else {
        BufReader::new(file).read_to_end(&mut bytes)?;
    }

    let mut lines: Vec<String> = bytes
        .split(|&b| b == b'\n')
        .map(|line| {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            String::from_utf8_lossy(line).into_owned()
        })
        .collect();
    // a trailing newline does not start another line
    if bytes.ends_with(b"\n") {
        lines.pop();
    }
    Ok(lines)
}

/// Date stamp following `marker` on `line`, if the line carries one
fn find_stamp(line: &str, marker: &str) -> Option<String> {
    let (_, rest) = line.split_once(marker)?;
    Some(rest.trim_start().chars().take(LOG_DATE_TOKEN_LEN).collect())
}

/// Partition the lines of one log by date.
///
/// With stamps on lines `i1 < i2 < … < iN` carrying dates `d1 … dN`, lines
/// `[0, i1)` go to the day before `d1` (`First` when `d1` is day 1),
/// `[ik, ik+1)` to `dk`, and `[iN, EOF)` to `dN` unless the log is
/// compressed: archived logs end with a stamp whose day was never run.
/// Repeated stamps of one date extend the same bucket. A log without any
/// stamp becomes a single `Unknown` bucket named after the file.
pub fn bucket_log_lines(
    lines: Vec<String>,
    marker: &str,
    path: &Path,
    compressed: bool,
) -> Result<LogBuckets> {
    let mut stamps: Vec<(usize, ModelDay)> = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        if let Some(token) = find_stamp(line, marker) {
            let day = ModelDay::parse_stamp(&token).ok_or_else(|| CaseError::LogParse {
                path: path.to_path_buf(),
                line: index + 1,
                reason: format!("'{}' is not a YYYYMMDD date", token),
            })?;
            stamps.push((index, day));
        }
    }

    let mut buckets = LogBuckets::new();
    let Some(&(_, first_day)) = stamps.first() else {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        debug!("No date stamps in {}", path.display());
        buckets.insert(LogDate::Unknown(name), lines);
        return Ok(buckets);
    };

    // (start line, label) for every bucket, the leading one included
    let mut starts = Vec::with_capacity(stamps.len() + 1);
    starts.push((0, LogDate::before(first_day)));
    starts.extend(stamps.iter().map(|&(index, day)| (index, LogDate::Day(day))));

    let mut lines = lines.into_iter();
    for (n, (start, label)) in starts.iter().enumerate() {
        let end = match starts.get(n + 1) {
            Some((next, _)) => *next,
            None if compressed => break,
            None => usize::MAX,
        };
        let chunk: Vec<String> = lines.by_ref().take(end - start).collect();
        buckets.entry(label.clone()).or_default().extend(chunk);
    }
    Ok(buckets)
}

/// Read and bucket one log file
pub fn parse_log_file(path: &Path, marker: &str) -> Result<LogBuckets> {
    let lines = read_log_lines(path)?;
    debug!("Read {} lines from {}", lines.len(), path.display());
    bucket_log_lines(lines, marker, path, is_compressed(path))
}

/// Fold the buckets of one file into the component-wide contents
pub fn merge_log_buckets(contents: &mut LogContents, path: &Path, buckets: LogBuckets) {
    for (date, lines) in buckets {
        contents
            .entry(date)
            .or_default()
            .entry(path.to_path_buf())
            .or_default()
            .extend(lines);
    }
}

/// Lines of the most recent log (the last path in sort order) for each date
pub fn most_recent(contents: &LogContents) -> impl Iterator<Item = (&LogDate, &[String])> {
    contents.iter().filter_map(|(date, logs)| {
        logs.iter()
            .next_back()
            .map(|(_, lines)| (date, lines.as_slice()))
    })
}

/// Per date, the number of lines of the most recent log containing `needle`
pub fn count_matching_lines(contents: &LogContents, needle: &str) -> BTreeMap<LogDate, usize> {
    most_recent(contents)
        .map(|(date, lines)| {
            let count = lines.iter().filter(|line| line.contains(needle)).count();
            (date.clone(), count)
        })
        .collect()
}

/// Per date, counts of carbonate-chemistry solver warnings for iterations
/// `1..=max_it`
pub fn co2calc_warning_counts(contents: &LogContents, max_it: usize) -> BTreeMap<LogDate, Vec<usize>> {
    let needles: Vec<String> = (1..=max_it)
        .map(|it| format!("{}{}", CO2CALC_WARNING_PREFIX, it))
        .collect();
    most_recent(contents)
        .map(|(date, lines)| {
            let counts = needles
                .iter()
                .map(|needle| lines.iter().filter(|line| line.contains(needle.as_str())).count())
                .collect();
            (date.clone(), counts)
        })
        .collect()
}
