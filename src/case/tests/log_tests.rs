//! Log bucketing tests

use crate::case::logs::{self, LogDate, ModelDay};
use crate::case::Case;
use crate::config::CaseConfig;
use crate::constants::{CESM_DATE_MARKER, CO2CALC_WARNING_PREFIX};
use crate::error::CaseError;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn stamp_line(stamp: &str) -> String {
    format!(" tStamp_write: {}   {}       0 wall clock = 2024-01-01 00:00:00", CESM_DATE_MARKER, stamp)
}

/// 25 lines with stamps on lines 5, 12 and 20
fn sample_lines() -> Vec<String> {
    let mut lines: Vec<String> = (0..25).map(|i| format!("line {}", i)).collect();
    lines[5] = stamp_line("00010102");
    lines[12] = stamp_line("00010103");
    lines[20] = stamp_line("00010104");
    lines
}

fn write_plain(path: &Path, lines: &[String]) -> PathBuf {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, lines.join("\n") + "\n").unwrap();
    path.to_path_buf()
}

fn write_gz(path: &Path, lines: &[String]) -> PathBuf {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let file = fs::File::create(path).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all((lines.join("\n") + "\n").as_bytes()).unwrap();
    encoder.finish().unwrap();
    path.to_path_buf()
}

fn day(month: u32, day: u32) -> LogDate {
    LogDate::Day(ModelDay::new(1, month, day))
}

#[test]
fn test_bucket_boundaries() {
    let buckets = logs::bucket_log_lines(
        sample_lines(),
        CESM_DATE_MARKER,
        Path::new("cesm.log.1"),
        false,
    )
    .unwrap();

    let sizes: Vec<(LogDate, usize)> = buckets.iter().map(|(k, v)| (k.clone(), v.len())).collect();
    assert_eq!(
        sizes,
        vec![(day(1, 1), 5), (day(1, 2), 7), (day(1, 3), 8), (day(1, 4), 5)]
    );
    // each dated bucket opens with its stamp
    assert!(buckets[&day(1, 3)][0].contains("00010103"));
    assert_eq!(buckets[&day(1, 1)][0], "line 0");
}

#[test]
fn test_compressed_log_drops_last_bucket() {
    let buckets = logs::bucket_log_lines(
        sample_lines(),
        CESM_DATE_MARKER,
        Path::new("cesm.log.1.gz"),
        true,
    )
    .unwrap();
    assert_eq!(buckets.len(), 3);
    assert!(!buckets.contains_key(&day(1, 4)));
    assert_eq!(buckets.values().map(Vec::len).sum::<usize>(), 20);
}

#[test]
fn test_first_label_and_empty_leading_bucket() {
    let lines = vec![stamp_line("00010101"), "a".to_string(), stamp_line("00010102")];
    let buckets =
        logs::bucket_log_lines(lines, CESM_DATE_MARKER, Path::new("cesm.log.1"), false).unwrap();

    // one marker more than buckets minus one, the leading bucket kept empty
    assert_eq!(buckets.len(), 3);
    assert!(buckets[&LogDate::First].is_empty());
    assert_eq!(buckets[&day(1, 1)].len(), 2);
    assert_eq!(buckets[&day(1, 2)].len(), 1);
    assert_eq!(buckets.keys().next(), Some(&LogDate::First));
}

#[test]
fn test_repeated_stamp_extends_bucket() {
    let lines = vec![
        stamp_line("00010102"),
        "a".to_string(),
        stamp_line("00010102"),
        "b".to_string(),
        stamp_line("00010103"),
    ];
    let buckets =
        logs::bucket_log_lines(lines, CESM_DATE_MARKER, Path::new("cesm.log.1"), false).unwrap();
    assert_eq!(buckets[&day(1, 2)].len(), 4);
    assert_eq!(buckets[&day(1, 2)][3], "b");
}

#[test]
fn test_log_without_stamps() {
    let lines = vec!["hello".to_string(), "world".to_string()];
    let buckets = logs::bucket_log_lines(
        lines,
        CESM_DATE_MARKER,
        Path::new("/run/cesm.log.1234"),
        false,
    )
    .unwrap();
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[&LogDate::Unknown("cesm.log.1234".to_string())].len(), 2);
}

#[test]
fn test_malformed_stamp_is_an_error() {
    let lines = vec!["x".to_string(), format!("{} 0001-1-2", CESM_DATE_MARKER)];
    let err = logs::bucket_log_lines(lines, CESM_DATE_MARKER, Path::new("cesm.log.1"), false)
        .unwrap_err();
    match err {
        CaseError::LogParse { line, .. } => assert_eq!(line, 2),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_read_log_lines_handles_gzip_and_crlf() {
    let temp_dir = TempDir::new().unwrap();
    let plain = temp_dir.path().join("cpl.log.1");
    fs::write(&plain, "a\r\nb\r\n").unwrap();
    assert_eq!(logs::read_log_lines(&plain).unwrap(), vec!["a", "b"]);

    let gz = write_gz(
        &temp_dir.path().join("cpl.log.2.gz"),
        &["x".to_string(), "y".to_string()],
    );
    assert_eq!(logs::read_log_lines(&gz).unwrap(), vec!["x", "y"]);
}

#[test]
fn test_read_log_through_case() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let archived = write_gz(&root.join("logs").join("cesm.log.100.gz"), &sample_lines());
    let current = write_plain(&root.join("cesm.log.200"), &sample_lines());

    let mut case = Case::new("c1", root.display().to_string(), CaseConfig::default()).unwrap();
    let contents = case.read_log("cesm").unwrap();

    assert_eq!(contents.len(), 4);
    assert_eq!(contents[&day(1, 2)].len(), 2);
    assert_eq!(contents[&day(1, 4)].len(), 1);
    assert!(contents[&day(1, 4)].contains_key(&current));
    assert!(!contents[&day(1, 4)].contains_key(&archived));

    // a second read comes from the cache even if the files are gone
    fs::remove_file(&current).unwrap();
    assert_eq!(case.read_log("cesm").unwrap().len(), 4);
    assert!(case.log_contents(crate::models::LogComponent::Cesm).is_some());
}

#[test]
fn test_read_log_components() {
    let temp_dir = TempDir::new().unwrap();
    let mut case =
        Case::new("c1", temp_dir.path().display().to_string(), CaseConfig::default()).unwrap();

    assert!(case.read_log("cpl").unwrap().is_empty());
    assert!(matches!(
        case.read_log("ocn"),
        Err(CaseError::UnsupportedLogComponent { .. })
    ));
    assert!(matches!(
        case.read_log("atm"),
        Err(CaseError::UnknownComponent { .. })
    ));
}

#[test]
fn test_co2calc_warning_counts_use_most_recent_log() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let warning = |it: usize| format!("{}{}", CO2CALC_WARNING_PREFIX, it);

    let older = vec![
        stamp_line("00010102"),
        warning(1),
        warning(1),
        warning(1),
    ];
    let newer = vec![
        stamp_line("00010102"),
        warning(1),
        warning(2),
        warning(2),
        stamp_line("00010103"),
        warning(3),
    ];
    write_plain(&root.join("cesm.log.100"), &older);
    write_plain(&root.join("cesm.log.200"), &newer);

    let mut case = Case::new("c1", root.display().to_string(), CaseConfig::default()).unwrap();
    let counts = case.co2calc_warning_counts(4).unwrap();

    assert_eq!(counts[&day(1, 2)], vec![1, 2, 0, 0]);
    assert_eq!(counts[&day(1, 3)], vec![0, 0, 1, 0]);
    // the leading buckets of both logs are empty
    assert_eq!(counts[&day(1, 1)], vec![0, 0, 0, 0]);

    let matched = case.count_matching_lines("cesm", "it = 2").unwrap();
    assert_eq!(matched[&day(1, 2)], 2);
}
