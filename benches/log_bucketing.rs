//! Benchmarks for splitting component logs by model date.
//!
//! Run with: `cargo bench --bench log_bucketing`

use cesm_case_tools::case::logs::{bucket_log_lines, co2calc_warning_counts, merge_log_buckets};
use cesm_case_tools::constants::{CESM_DATE_MARKER, CO2CALC_WARNING_PREFIX};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::path::Path;

/// A `cesm.log` of `days` model days with `lines_per_day` lines each,
/// every tenth line a co2calc warning
fn synthetic_log(days: usize, lines_per_day: usize) -> Vec<String> {
    let mut lines = Vec::with_capacity(days * (lines_per_day + 1));
    for d in 0..days {
        for i in 0..lines_per_day {
            if i % 10 == 0 {
                lines.push(format!("{}{} x1,f = 1.0, 2.0", CO2CALC_WARNING_PREFIX, i % 4 + 1));
            } else {
                lines.push(format!("(marbl_interface) step {} of day {}", i, d));
            }
        }
        let year = d / 365 + 1;
        let day_of_year = d % 365;
        lines.push(format!(
            " tStamp_write: model date =   {:04}{:02}{:02}       0 wall clock",
            year,
            day_of_year / 28 % 12 + 1,
            day_of_year % 28 + 1
        ));
    }
    lines
}

fn bench_bucket_log_lines(c: &mut Criterion) {
    let mut group = c.benchmark_group("bucket_log_lines");
    let path = Path::new("cesm.log.0101-000000");

    for days in [30, 365, 1460] {
        let lines = synthetic_log(days, 200);
        group.bench_with_input(BenchmarkId::new("days", days), &lines, |b, lines| {
            b.iter(|| bucket_log_lines(black_box(lines.clone()), CESM_DATE_MARKER, path, false))
        });
    }

    group.finish();
}

fn bench_warning_counts(c: &mut Criterion) {
    let path = Path::new("cesm.log.0101-000000");
    let buckets = bucket_log_lines(synthetic_log(365, 200), CESM_DATE_MARKER, path, false)
        .expect("synthetic log has valid stamps");
    let mut contents = Default::default();
    merge_log_buckets(&mut contents, path, buckets);

    c.bench_function("co2calc_warning_counts_365_days", |b| {
        b.iter(|| co2calc_warning_counts(black_box(&contents), 4))
    });
}

criterion_group!(benches, bench_bucket_log_lines, bench_warning_counts);
criterion_main!(benches);
