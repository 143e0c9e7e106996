//! Dataset assembly and coverage tests

use super::{write_monthly_history, write_monthly_timeseries};
use crate::calendar::CalendarDate;
use crate::case::{Case, Coverage, DataSource, DatasetRequest};
use crate::config::CaseConfig;
use crate::dataset::{DatasetReader, MemoryReader};
use crate::error::CaseError;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn case_with(root: &Path, reader: &Arc<MemoryReader>) -> Case {
    let dyn_reader: Arc<dyn DatasetReader> = reader.clone();
    Case::new("c1", root.display().to_string(), CaseConfig::default())
        .unwrap()
        .with_reader(dyn_reader)
}

fn time_at(ds: &crate::dataset::Dataset, index: usize) -> CalendarDate {
    ds.get("time").unwrap().data.as_time().unwrap()[[index].as_slice()]
}

fn value_at(ds: &crate::dataset::Dataset, name: &str, index: usize) -> f64 {
    ds.get(name).unwrap().data.as_numeric().unwrap()[[index].as_slice()]
}

#[test]
fn test_file_queries() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let mut reader = MemoryReader::new();
    write_monthly_timeseries(&mut reader, root, "c1", "TEMP", 1, 2);
    write_monthly_timeseries(&mut reader, root, "c1", "SALT", 3, 4);
    write_monthly_history(&mut reader, root, "c1", 5..=5, &["TEMP"]);
    let case = case_with(root, &Arc::new(reader));

    assert_eq!(case.timeseries_files(1, "pop.h", None).unwrap().len(), 1);
    assert_eq!(case.timeseries_files(3, "pop.h", None).unwrap().len(), 1);
    let temp = ["TEMP".to_string()];
    assert!(case.timeseries_files(3, "pop.h", Some(&temp)).unwrap().is_empty());
    assert_eq!(case.timeseries_files(2, "pop.h", Some(&temp)).unwrap().len(), 1);

    assert!(case.check_for_year_in_timeseries_files(4, "pop.h").unwrap());
    assert!(!case.check_for_year_in_timeseries_files(5, "pop.h").unwrap());

    assert_eq!(case.history_files(5, "pop.h").unwrap().len(), 12);
    assert!(case.history_files(4, "pop.h").unwrap().is_empty());
    assert!(case.history_files(5, "pop.h.nday1").unwrap().is_empty());
}

#[tokio::test]
async fn test_gen_dataset_from_history() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let mut reader = MemoryReader::new();
    write_monthly_history(&mut reader, root, "c1", 1..=3, &["TEMP", "SALT"]);
    let reader = Arc::new(reader);
    let mut case = case_with(root, &reader);

    let request = DatasetRequest::new("TEMP", "pop.h").unwrap().years(1, 3);
    let ds = case.gen_dataset(&request).await.unwrap();

    assert_eq!(ds.size("time"), Some(36));
    assert!(ds.contains("TEMP"));
    assert!(ds.contains("time_bound"));
    assert!(ds.contains("TAREA"));
    assert!(!ds.contains("SALT"));
    assert!(ds.encoding.contains_key("unlimited_dims"));

    // time sits at the middle of each month
    assert_eq!(time_at(&ds, 0), CalendarDate::new(1, 1, 16).with_time(12, 0, 0));
    assert_eq!(time_at(&ds, 1), CalendarDate::new(1, 2, 15));
    assert_eq!(value_at(&ds, "TEMP", 35), 312.0);

    let time = ds.get("time").unwrap();
    assert_eq!(time.attr_str("bounds"), Some("time_bound"));
    assert_eq!(
        time.encoding.get("calendar").and_then(|v| v.as_str()),
        Some("noleap")
    );

    assert_eq!(case.dataset_source("pop.h", 2, "TEMP"), Some(DataSource::History));
    assert_eq!(case.dataset_source("pop.h", 2, "SALT"), None);
    assert_eq!(case.dataset_source("pop.h", 4, "TEMP"), None);
}

#[tokio::test]
async fn test_gen_dataset_stitches_timeseries_and_history() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let mut reader = MemoryReader::new();
    write_monthly_timeseries(&mut reader, root, "c1", "TEMP", 1, 2);
    write_monthly_history(&mut reader, root, "c1", 1..=4, &["TEMP"]);
    let reader = Arc::new(reader);
    let mut case = case_with(root, &reader);

    let request = DatasetRequest::new("TEMP", "pop.h").unwrap().years(1, 4);
    let ds = case.gen_dataset(&request).await.unwrap();

    // two years of time series, then history from the year the series ends
    assert_eq!(ds.size("time"), Some(48));
    assert_eq!(value_at(&ds, "TEMP", 0), 101.0);
    assert_eq!(value_at(&ds, "TEMP", 23), 212.0);
    assert_eq!(value_at(&ds, "TEMP", 24), 301.0);
    assert!(time_at(&ds, 23) < time_at(&ds, 24));
    assert_eq!(time_at(&ds, 24), CalendarDate::new(3, 1, 16).with_time(12, 0, 0));

    assert_eq!(case.dataset_source("pop.h", 1, "TEMP"), Some(DataSource::TimeSeries));
    assert_eq!(case.dataset_source("pop.h", 3, "TEMP"), Some(DataSource::History));
}

#[tokio::test]
async fn test_gen_dataset_rejects_variable_missing_from_timeseries() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let mut reader = MemoryReader::new();
    write_monthly_timeseries(&mut reader, root, "c1", "TEMP", 1, 2);
    write_monthly_history(&mut reader, root, "c1", 1..=4, &["TEMP", "SALT"]);
    let reader = Arc::new(reader);
    let mut case = case_with(root, &reader);

    // SALT only exists in the history part, so it cannot be stitched
    let both = DatasetRequest::new(vec!["TEMP", "SALT"], "pop.h").unwrap().years(1, 4);
    match case.gen_dataset(&both).await {
        Err(CaseError::MissingVariable { name }) => assert_eq!(name, "SALT"),
        other => panic!("expected MissingVariable, got {:?}", other.map(|_| ())),
    }

    // a time series that ends before the requested years has no history to fill in
    let mut reader = MemoryReader::new();
    let other_dir = TempDir::new().unwrap();
    write_monthly_timeseries(&mut reader, other_dir.path(), "c1", "TEMP", 1, 2);
    let reader = Arc::new(reader);
    let mut case = case_with(other_dir.path(), &reader);
    let request = DatasetRequest::new(vec!["TEMP", "SALT"], "pop.h").unwrap().years(1, 2);
    assert!(matches!(
        case.gen_dataset(&request).await,
        Err(CaseError::MissingVariable { .. })
    ));
}

#[tokio::test]
async fn test_gen_dataset_caches_results() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let mut reader = MemoryReader::new();
    write_monthly_history(&mut reader, root, "c1", 1..=1, &["TEMP"]);
    let reader = Arc::new(reader);
    let mut case = case_with(root, &reader);

    let request = DatasetRequest::new("TEMP", "pop.h").unwrap().years(1, 1).quiet(true);
    let first = case.gen_dataset(&request).await.unwrap();
    let opened = reader.open_count();
    assert!(opened > 0);

    let second = case.gen_dataset(&request).await.unwrap();
    assert_eq!(reader.open_count(), opened);
    assert!(
        first
            .get("TEMP")
            .unwrap()
            .data
            .shares_storage(&second.get("TEMP").unwrap().data)
    );
}

#[tokio::test]
async fn test_gen_dataset_keep_variables() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let mut reader = MemoryReader::new();
    write_monthly_history(&mut reader, root, "c1", 1..=1, &["TEMP", "SALT"]);
    let reader = Arc::new(reader);
    let mut case = case_with(root, &reader);

    let request = DatasetRequest::new("TEMP", "pop.h")
        .unwrap()
        .years(1, 1)
        .keep(vec!["SALT", "NOT_THERE"])
        .unwrap();
    let ds = case.gen_dataset(&request).await.unwrap();
    assert!(ds.contains("SALT"));
    assert!(!ds.contains("NOT_THERE"));
}

#[tokio::test]
async fn test_gen_dataset_errors() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let mut reader = MemoryReader::new();
    write_monthly_history(&mut reader, root, "c1", 1..=1, &["TEMP"]);
    let reader = Arc::new(reader);
    let mut case = case_with(root, &reader);

    let missing_years = DatasetRequest::new("TEMP", "pop.h").unwrap().years(10, 12);
    assert!(matches!(
        case.gen_dataset(&missing_years).await,
        Err(CaseError::NoData { start_year: 10, end_year: 12, .. })
    ));

    let reversed = DatasetRequest::new("TEMP", "pop.h").unwrap().years(3, 1);
    assert!(matches!(
        case.gen_dataset(&reversed).await,
        Err(CaseError::InvalidInput { .. })
    ));

    let bad_stream = DatasetRequest::new("TEMP", "pop.h.bogus").unwrap();
    assert!(matches!(
        case.gen_dataset(&bad_stream).await,
        Err(CaseError::UnknownStream { .. })
    ));

    let absent_var = DatasetRequest::new("NOPE", "pop.h").unwrap().years(1, 1);
    assert!(matches!(
        case.gen_dataset(&absent_var).await,
        Err(CaseError::MissingVariable { .. })
    ));

    assert!(DatasetRequest::new(Vec::<String>::new(), "pop.h").is_err());
}

#[cfg(not(feature = "netcdf"))]
#[tokio::test]
async fn test_gen_dataset_without_reader() {
    let temp_dir = TempDir::new().unwrap();
    let mut case =
        Case::new("c1", temp_dir.path().display().to_string(), CaseConfig::default()).unwrap();
    let request = DatasetRequest::new("TEMP", "pop.h").unwrap();
    assert!(matches!(
        case.gen_dataset(&request).await,
        Err(CaseError::NoReader)
    ));
}

#[tokio::test]
async fn test_compare_timeseries_and_history() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let mut reader = MemoryReader::new();
    write_monthly_history(&mut reader, root, "c1", 1..=2, &["TEMP", "SALT"]);
    write_monthly_timeseries(&mut reader, root, "c1", "TEMP", 1, 3);
    write_monthly_timeseries(&mut reader, root, "c1", "SALT", 1, 1);
    let case = case_with(root, &Arc::new(reader));

    assert_eq!(
        case.compare_timeseries_and_history("pop.h", 1).await.unwrap(),
        Coverage::Same
    );
    assert_eq!(
        case.compare_timeseries_and_history("pop.h", 2).await.unwrap(),
        Coverage::DatasetsDiffer {
            missing: vec!["SALT".to_string()]
        }
    );
    assert_eq!(
        case.compare_timeseries_and_history("pop.h", 3).await.unwrap(),
        Coverage::NoHistory
    );
    assert_eq!(
        case.compare_timeseries_and_history("pop.h", 4).await.unwrap(),
        Coverage::NoTimeSeries
    );
}

#[tokio::test]
async fn test_compare_years_stops_without_timeseries() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let mut reader = MemoryReader::new();
    write_monthly_history(&mut reader, root, "c1", 1..=3, &["TEMP"]);
    write_monthly_timeseries(&mut reader, root, "c1", "TEMP", 1, 2);
    let case = case_with(root, &Arc::new(reader));

    let streams = vec!["pop.h".to_string()];
    let results = case.compare_years(&streams, 1..=10).await.unwrap();

    assert_eq!(results.len(), 3);
    assert!(results[0].complete());
    assert!(results[1].complete());
    assert!(!results[2].has_timeseries());
    assert_eq!(results[2].streams["pop.h"], Coverage::NoTimeSeries);
}
