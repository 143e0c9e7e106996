//! File discovery tests

use super::touch;
use crate::case::Case;
use crate::config::{CaseConfig, OnMissingRoot};
use crate::error::CaseError;
use crate::models::LogComponent;
use tempfile::TempDir;

#[test]
fn test_discovers_all_layouts() {
    let temp_dir = TempDir::new().unwrap();
    let run = temp_dir.path().join("run");
    let archive = temp_dir.path().join("archive");

    touch(&run.join("cesm.log.1234.250101-000000"));
    touch(&run.join("c1.pop.h.0003-01.nc"));
    touch(&archive.join("logs").join("cesm.log.1000.241231-000000.gz"));
    touch(&archive.join("logs").join("cpl.log.1000.241231-000000.gz"));
    touch(&archive.join("ocn").join("hist").join("c1.pop.h.0001-01.nc"));
    touch(&archive.join("ocn").join("hist").join("c1.pop.h.nday1.0001-01-01.nc"));
    touch(&archive.join("ice").join("hist").join("c1.cice.h.0001-01.nc"));
    touch(
        &archive
            .join("ocn/proc/tseries/month_1")
            .join("c1.pop.h.TEMP.000101-000212.nc"),
    );
    touch(
        &archive
            .join("ocn/proc/tseries/day_1")
            .join("c1.pop.h.nday1.SST.00010101-00021231.nc"),
    );

    let case = Case::new("c1", vec![&run, &archive].iter().map(|p| p.display().to_string()).collect::<Vec<_>>(), CaseConfig::default()).unwrap();

    assert_eq!(case.log_files(LogComponent::Cesm).len(), 2);
    assert_eq!(case.log_files(LogComponent::Cpl).len(), 1);
    assert!(case.log_files(LogComponent::Ocn).is_empty());

    let pop_h = case.history_filenames("pop.h").unwrap();
    assert_eq!(pop_h.len(), 2);
    assert!(pop_h.iter().all(|p| !p.to_string_lossy().contains("nday1")));

    assert_eq!(case.history_filenames("pop.h.nday1").unwrap().len(), 1);
    assert_eq!(case.history_filenames("cice.h").unwrap().len(), 1);
    assert!(case.history_filenames("cice.h1").unwrap().is_empty());

    assert_eq!(case.timeseries_filenames("pop.h").unwrap().len(), 1);
    assert_eq!(case.timeseries_filenames("pop.h.nday1").unwrap().len(), 1);
}

#[test]
fn test_listings_are_sorted_and_deduplicated() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("run");
    for month in [3, 1, 2] {
        touch(&root.join(format!("c1.pop.h.0001-{:02}.nc", month)));
    }
    let root_str = root.display().to_string();

    // the same root twice must not duplicate files
    let case = Case::new("c1", vec![root_str.clone(), root_str], CaseConfig::default()).unwrap();
    let files = case.history_filenames("pop.h").unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["c1.pop.h.0001-01.nc", "c1.pop.h.0001-02.nc", "c1.pop.h.0001-03.nc"]
    );
}

#[test]
fn test_missing_roots() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("does-not-exist").display().to_string();

    let case = Case::new("c1", missing.as_str(), CaseConfig::default()).unwrap();
    assert!(case.output_roots().is_empty());
    assert!(case.history_filenames("pop.h").unwrap().is_empty());

    let strict = CaseConfig::default().with_on_missing_root(OnMissingRoot::Error);
    assert!(matches!(
        Case::new("c1", missing.as_str(), strict),
        Err(CaseError::MissingRoot { .. })
    ));
}

#[test]
fn test_glob_metacharacters_are_literal() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("run[1]");
    touch(&root.join("c[1].pop.h.0001-01.nc"));
    touch(&root.join("c1.pop.h.0001-01.nc"));

    let case = Case::new("c[1]", root.display().to_string(), CaseConfig::default()).unwrap();
    let files = case.history_filenames("pop.h").unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("c[1].pop.h.0001-01.nc"));
}

#[test]
fn test_invalid_inputs() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().display().to_string();

    assert!(matches!(
        Case::new(Vec::<String>::new(), root.as_str(), CaseConfig::default()),
        Err(CaseError::InvalidInput { .. })
    ));
    assert!(matches!(
        Case::new("", root.as_str(), CaseConfig::default()),
        Err(CaseError::InvalidInput { .. })
    ));

    let case = Case::new("c1", root.as_str(), CaseConfig::default()).unwrap();
    assert!(matches!(
        case.history_filenames("pop.h.ecosys.nday1"),
        Err(CaseError::UnknownStream { .. })
    ));
}

#[test]
fn test_multiple_case_names() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("run");
    touch(&root.join("c1.pop.h.0001-01.nc"));
    touch(&root.join("c2.pop.h.0002-01.nc"));
    touch(&root.join("c3.pop.h.0003-01.nc"));

    let case = Case::new(vec!["c1", "c2"], root.display().to_string(), CaseConfig::default()).unwrap();
    assert_eq!(case.history_filenames("pop.h").unwrap().len(), 2);
    assert_eq!(case.history_files(2, "pop.h").unwrap().len(), 1);
    assert!(case.history_files(3, "pop.h").unwrap().is_empty());
}

#[test]
fn test_empty_output_roots_give_empty_listings() {
    let case = Case::new("c1", Vec::<String>::new(), CaseConfig::default()).unwrap();
    assert!(case.output_roots().is_empty());
    assert!(case.log_files(LogComponent::Cesm).is_empty());
    assert!(case.history_filenames("pop.h").unwrap().is_empty());
    assert!(case.timeseries_filenames("pop.h").unwrap().is_empty());

    // an empty case name is still rejected
    assert!(matches!(
        Case::new("", Vec::<String>::new(), CaseConfig::default()),
        Err(CaseError::InvalidInput { .. })
    ));
}
