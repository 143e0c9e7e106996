//! Tests for case discovery, log parsing and dataset assembly
//!
//! Each test lays out a mock output tree in a temporary directory. NetCDF
//! files are empty placeholders; their contents are served by a
//! `MemoryReader` keyed by the same paths.

pub mod discovery_tests;
pub mod log_tests;
pub mod query_tests;

use crate::dataset::{Dataset, MemoryReader, Variable};
use ndarray::Array2;
use std::fs;
use std::path::{Path, PathBuf};

const CUM_DAYS: [f64; 13] = [
    0.0, 31.0, 59.0, 90.0, 120.0, 151.0, 181.0, 212.0, 243.0, 273.0, 304.0, 334.0, 365.0,
];

/// Create an empty file, and its parent directories
pub fn touch(path: &Path) -> PathBuf {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"").unwrap();
    path.to_path_buf()
}

/// `(lower, upper)` edges of month `month` of `year` in noleap days since 0001-01-01
pub fn month_edges(year: i32, month: usize) -> (f64, f64) {
    let base = (year - 1) as f64 * 365.0;
    (base + CUM_DAYS[month - 1], base + CUM_DAYS[month])
}

/// Monthly dataset over the given `(year, month)` list, CESM style: time at
/// the upper bound, `time_bound` as the bounds variable, one value per month
/// for each of `vars`, plus a static `TAREA`
pub fn monthly_dataset(months: &[(i32, usize)], vars: &[&str]) -> Dataset {
    let edges: Vec<(f64, f64)> = months.iter().map(|&(y, m)| month_edges(y, m)).collect();
    let time: Vec<f64> = edges.iter().map(|e| e.1).collect();
    let bounds: Vec<f64> = edges.iter().flat_map(|e| [e.0, e.1]).collect();
    let bounds = Array2::from_shape_vec((months.len(), 2), bounds)
        .unwrap()
        .into_dyn();

    let mut ds = Dataset::new()
        .with_coord(
            "time",
            Variable::from_vec("time", time)
                .with_attr("bounds", "time_bound")
                .with_attr("units", "days since 0001-01-01 00:00:00")
                .with_attr("calendar", "noleap")
                .with_encoding("dtype", "float64"),
        )
        .unwrap()
        .with_variable(
            "time_bound",
            Variable::new(&["time", "d2"], bounds).unwrap(),
        )
        .unwrap()
        .with_variable("TAREA", Variable::from_vec("nlat", vec![1.0, 2.0]))
        .unwrap();
    ds.encoding
        .insert("unlimited_dims".to_string(), vec!["time".to_string()].into());

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

/// History file `{root}/ocn/hist/{case}.pop.h.{YYYY-MM}.nc` for every month
/// of `years`, registered with `reader`
pub fn write_monthly_history(
    reader: &mut MemoryReader,
    root: &Path,
    case: &str,
    years: std::ops::RangeInclusive<i32>,
    vars: &[&str],
) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for year in years {
        for month in 1..=12 {
            let path = root
                .join("ocn")
                .join("hist")
                .join(format!("{}.pop.h.{:04}-{:02}.nc", case, year, month));
            touch(&path);
            reader.insert(path.clone(), monthly_dataset(&[(year, month)], vars));
            files.push(path);
        }
    }
    files
}

/// Time-series file
/// `{root}/ocn/proc/tseries/month_1/{case}.pop.h.{var}.{YYYY01}-{YYYY12}.nc`
/// registered with `reader`
pub fn write_monthly_timeseries(
    reader: &mut MemoryReader,
    root: &Path,
    case: &str,
    var: &str,
    start_year: i32,
    end_year: i32,
) -> PathBuf {
    let path = root
        .join("ocn")
        .join("proc")
        .join("tseries")
        .join("month_1")
        .join(format!(
            "{}.pop.h.{}.{:04}01-{:04}12.nc",
            case, var, start_year, end_year
        ));
    touch(&path);
    let months: Vec<(i32, usize)> = (start_year..=end_year)
        .flat_map(|y| (1..=12).map(move |m| (y, m)))
        .collect();
    reader.insert(path.clone(), monthly_dataset(&months, &[var]));
    path
}
