//! Tabular summaries of parsed logs and time-series coverage
//!
//! Summaries are polars `DataFrame`s so they can be printed, filtered or
//! written out as CSV or Parquet.

use crate::case::{Coverage, LogContents, LogDate, YearCoverage};
use crate::error::{CaseError, Result};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// One row per date: `date`, then `it_1 ... it_{max_it}`
pub fn warning_counts_frame(counts: &BTreeMap<LogDate, Vec<usize>>, max_it: usize) -> Result<DataFrame> {
    let dates: Vec<String> = counts.keys().map(LogDate::to_string).collect();
    let mut columns = vec![Column::new("date".into(), dates)];
    for it in 0..max_it {
        let values: Vec<u64> = counts
            .values()
            .map(|row| row.get(it).copied().unwrap_or(0) as u64)
            .collect();
        columns.push(Column::new(format!("it_{}", it + 1).into(), values));
    }
    Ok(DataFrame::new(columns)?)
}

/// One row per (date, log file): `date`, `log`, `lines`
pub fn log_coverage_frame(contents: &LogContents) -> Result<DataFrame> {
    let mut dates = Vec::new();
    let mut logs = Vec::new();
    let mut lines = Vec::new();
    for (date, per_file) in contents {
        for (path, file_lines) in per_file {
            dates.push(date.to_string());
            logs.push(
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
            );
            lines.push(file_lines.len() as u64);
        }
    }
    Ok(DataFrame::new(vec![
        Column::new("date".into(), dates),
        Column::new("log".into(), logs),
        Column::new("lines".into(), lines),
    ])?)
}

/// One row per (year, stream): `year`, `stream`, `status`, `missing`
pub fn coverage_frame(results: &[YearCoverage]) -> Result<DataFrame> {
    let mut years = Vec::new();
    let mut streams = Vec::new();
    let mut statuses = Vec::new();
    let mut missing = Vec::new();
    for result in results {
        for (stream, coverage) in &result.streams {
            years.push(result.year);
            streams.push(stream.clone());
            let (status, vars) = match coverage {
                Coverage::DatasetsDiffer { missing } => ("datasets differ".to_string(), missing.join(",")),
                other => (other.to_string(), String::new()),
            };
            statuses.push(status);
            missing.push(vars);
        }
    }
    Ok(DataFrame::new(vec![
        Column::new("year".into(), years),
        Column::new("stream".into(), streams),
        Column::new("status".into(), statuses),
        Column::new("missing".into(), missing),
    ])?)
}

/// Write `df` as CSV or Parquet, chosen by the extension of `path`
pub fn write_frame(df: &mut DataFrame, path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("csv") => {
            let mut file = File::create(path)?;
            CsvWriter::new(&mut file).include_header(true).finish(df)?;
        }
        Some("parquet") => {
            let file = File::create(path)?;
            ParquetWriter::new(file).finish(df)?;
        }
        _ => {
            return Err(CaseError::invalid_input(
                "report path",
                format!("{} must end in .csv or .parquet", path.display()),
            ));
        }
    }
    debug!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::ModelDay;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn sample_counts() -> BTreeMap<LogDate, Vec<usize>> {
        let mut counts = BTreeMap::new();
        counts.insert(LogDate::First, vec![0, 0]);
        counts.insert(LogDate::Day(ModelDay::new(1, 1, 2)), vec![3, 1]);
        counts
    }

    #[test]
    fn test_warning_counts_frame() {
        let df = warning_counts_frame(&sample_counts(), 3).unwrap();
        assert_eq!(df.shape(), (2, 4));
        let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["date", "it_1", "it_2", "it_3"]);

        let it_1 = df.column("it_1").unwrap().u64().unwrap();
        assert_eq!(it_1.get(1), Some(3));
        // iterations past the counted range are zero
        let it_3 = df.column("it_3").unwrap().u64().unwrap();
        assert_eq!(it_3.get(1), Some(0));
        let dates = df.column("date").unwrap().str().unwrap();
        assert_eq!(dates.get(0), Some("first"));
        assert_eq!(dates.get(1), Some("0001-01-02"));
    }

    #[test]
    fn test_log_coverage_frame() {
        let mut contents = LogContents::new();
        let day = LogDate::Day(ModelDay::new(1, 1, 2));
        for (name, n) in [("cesm.log.1.gz", 2), ("cesm.log.2", 5)] {
            contents
                .entry(day.clone())
                .or_default()
                .insert(PathBuf::from("/run").join(name), vec![String::new(); n]);
        }
        let df = log_coverage_frame(&contents).unwrap();
        assert_eq!(df.height(), 2);
        let lines = df.column("lines").unwrap().u64().unwrap();
        assert_eq!(lines.get(1), Some(5));
        let logs = df.column("log").unwrap().str().unwrap();
        assert_eq!(logs.get(0), Some("cesm.log.1.gz"));
    }

    #[test]
    fn test_coverage_frame() {
        let mut streams = BTreeMap::new();
        streams.insert("pop.h".to_string(), Coverage::Same);
        streams.insert(
            "cice.h".to_string(),
            Coverage::DatasetsDiffer {
                missing: vec!["aice".to_string(), "hi".to_string()],
            },
        );
        let df = coverage_frame(&[YearCoverage { year: 3, streams }]).unwrap();
        assert_eq!(df.height(), 2);
        let missing = df.column("missing").unwrap().str().unwrap();
        assert_eq!(missing.get(0), Some("aice,hi"));
        let status = df.column("status").unwrap().str().unwrap();
        assert_eq!(status.get(1), Some("same"));
    }

    #[test]
    fn test_write_frame_formats() {
        let temp_dir = TempDir::new().unwrap();
        let mut df = warning_counts_frame(&sample_counts(), 2).unwrap();

        let csv = temp_dir.path().join("counts.csv");
        write_frame(&mut df, &csv).unwrap();
        let text = std::fs::read_to_string(&csv).unwrap();
        assert!(text.starts_with("date,it_1,it_2"));
        assert!(text.contains("0001-01-02,3,1"));

        let parquet = temp_dir.path().join("counts.parquet");
        write_frame(&mut df, &parquet).unwrap();
        let back = ParquetReader::new(File::open(&parquet).unwrap()).finish().unwrap();
        assert_eq!(back.shape(), df.shape());

        assert!(matches!(
            write_frame(&mut df, &temp_dir.path().join("counts.txt")),
            Err(CaseError::InvalidInput { .. })
        ));
    }
}
