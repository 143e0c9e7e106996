//! Shared fixtures for integration tests
//!
//! A `CaseFixture` lays out the scratch tree of one case (run directory and
//! short-term archive) in a temporary directory. NetCDF files are empty
//! placeholders whose contents live in a `MemoryReader`.

#![allow(dead_code)]

use cesm_case_tools::config::PathConfig;
use cesm_case_tools::constants::CO2CALC_WARNING_PREFIX;
use cesm_case_tools::{CaseConfig, Dataset, MemoryReader, Variable};
use ndarray::Array2;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const CASE: &str = "g.e22.TL319_t13.G1850ECOIAF_JRA_HR.4p2z.001";

const MONTH_END: [f64; 13] = [
    0.0, 31.0, 59.0, 90.0, 120.0, 151.0, 181.0, 212.0, 243.0, 273.0, 304.0, 334.0, 365.0,
];

pub struct CaseFixture {
    pub temp_dir: TempDir,
    pub paths: PathConfig,
    pub reader: MemoryReader,
}

impl CaseFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let paths = PathConfig {
            scratch_root: temp_dir.path().join("scratch"),
            user: "tester".to_string(),
            archive_dirname: "archive".to_string(),
            campaign_root: Some(temp_dir.path().join("campaign")),
        };
        fs::create_dir_all(paths.rundir(CASE)).unwrap();
        fs::create_dir_all(paths.archive_root(CASE)).unwrap();
        Self {
            temp_dir,
            paths,
            reader: MemoryReader::new(),
        }
    }

    pub fn config(&self) -> CaseConfig {
        CaseConfig::default().with_paths(self.paths.clone())
    }

    pub fn rundir(&self) -> PathBuf {
        self.paths.rundir(CASE)
    }

    pub fn archive_root(&self) -> PathBuf {
        self.paths.archive_root(CASE)
    }

    pub fn campaign_dir(&self) -> PathBuf {
        self.paths.campaign_root.as_ref().unwrap().join(CASE)
    }

    /// Monthly `pop.h` history files for every month of `year`, in the archive
    pub fn add_history_year(&mut self, year: i32, vars: &[&str]) {
        let dir = self.archive_root().join("ocn").join("hist");
        for month in 1..=12 {
            let path = touch(&dir.join(format!("{}.pop.h.{:04}-{:02}.nc", CASE, year, month)));
            self.reader.insert(path, monthly_dataset(&[(year, month)], vars));
        }
    }

    /// One `pop.h` time-series file of `var` spanning whole years, in the
    /// campaign directory
    pub fn add_timeseries(&mut self, var: &str, start_year: i32, end_year: i32) -> PathBuf {
        let path = touch(
            &self
                .campaign_dir()
                .join("ocn")
                .join("proc")
                .join("tseries")
                .join("month_1")
                .join(format!("{}.pop.h.{}.{:04}01-{:04}12.nc", CASE, var, start_year, end_year)),
        );
        let months: Vec<(i32, usize)> = (start_year..=end_year)
            .flat_map(|y| (1..=12).map(move |m| (y, m)))
            .collect();
        self.reader.insert(path.clone(), monthly_dataset(&months, &[var]));
        path
    }

    /// A `cesm.log` in the run directory
    pub fn add_cesm_log(&self, stamp: &str, lines: &[String]) -> PathBuf {
        let path = self.rundir().join(format!("cesm.log.{}", stamp));
        fs::write(&path, lines.join("\n")).unwrap();
        path
    }
}

pub fn touch(path: &Path) -> PathBuf {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"").unwrap();
    path.to_path_buf()
}

/// Monthly data, CESM style: time at the end of each month with
/// `time_bound` holding the month edges; each value is `year * 100 + month`
pub fn monthly_dataset(months: &[(i32, usize)], vars: &[&str]) -> Dataset {
    let edges: Vec<(f64, f64)> = months
        .iter()
        .map(|&(y, m)| {
            let base = (y - 1) as f64 * 365.0;
            (base + MONTH_END[m - 1], base + MONTH_END[m])
        })
        .collect();
    let bounds = Array2::from_shape_vec(
        (months.len(), 2),
        edges.iter().flat_map(|e| [e.0, e.1]).collect(),
    )
    .unwrap()
    .into_dyn();

    let mut ds = Dataset::new()
        .with_coord(
            "time",
            Variable::from_vec("time", edges.iter().map(|e| e.1).collect())
                .with_attr("bounds", "time_bound")
                .with_attr("units", "days since 0001-01-01 00:00:00")
                .with_attr("calendar", "noleap"),
        )
        .unwrap()
        .with_variable("time_bound", Variable::new(&["time", "d2"], bounds).unwrap())
        .unwrap();

    for var in vars {
        let values = months
            .iter()
            .map(|&(y, m)| y as f64 * 100.0 + m as f64)
            .collect();
        ds.insert(var, Variable::from_vec("time", values).with_attr("units", "degC"))
            .unwrap();
    }
    ds
}

/// `cesm.log` lines for `days` consecutive model days of January, year 1,
/// with `warnings[i]` co2calc warnings at iteration 1 during day `i`
pub fn cesm_log_lines(warnings: &[usize]) -> Vec<String> {
    let mut lines = vec!["(seq_comm_setcomm) init ID".to_string()];
    for (i, &count) in warnings.iter().enumerate() {
        for _ in 0..count {
            lines.push(format!("{}1 x1,f = 1.0, 2.0", CO2CALC_WARNING_PREFIX));
        }
        lines.push(format!(
            " tStamp_write: model date =   000101{:02}       0 wall clock",
            i + 2
        ));
    }
    lines
}
