//! Command implementations for the CESM case tools CLI
//!
//! Each subcommand opens what it needs through the library, prints a
//! human-readable summary to stdout and optionally writes a report file.

use crate::case::{Case, DataSource, DatasetRequest, YearCoverage};
use crate::cime::output_roots_from_caseroot;
use crate::cli::args::{
    Args, CaseArgs, Commands, CompareArgs, DatasetArgs, FilesArgs, LogsArgs, OutputRootsArgs,
    SubmitArgs,
};
use crate::config::CaseConfig;
use crate::dataset::Dataset;
use crate::models::LogComponent;
use crate::report;
use crate::submit::{SubmitPlan, SubmitSummary};
use crate::units::conv_units;
use crate::utils::round_sig;
use anyhow::{Context, Result};
use colored::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main command runner
///
/// Sets up logging, loads the layered configuration and dispatches to the
/// selected subcommand.
pub async fn run(args: Args) -> Result<()> {
    setup_logging(&args)?;
    debug!("Command line arguments: {:?}", args);

    let config = load_configuration(&args)?;

    match &args.command {
        Some(Commands::Files(cmd)) => run_files(cmd, &config),
        Some(Commands::Logs(cmd)) => run_logs(cmd, &config),
        Some(Commands::Dataset(cmd)) => run_dataset(cmd, &config).await,
        Some(Commands::Compare(cmd)) => run_compare(cmd, &config).await,
        Some(Commands::Submit(cmd)) => run_submit(cmd, &config, args.show_progress()).await,
        Some(Commands::OutputRoots(cmd)) => run_output_roots(cmd).await,
        None => Ok(()),
    }
}

/// Set up structured logging based on CLI arguments
fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cesm_case_tools={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
            .context("Failed to install log subscriber")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .context("Failed to install log subscriber")?;
    }

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Load configuration using the layered approach (defaults -> file)
///
/// Per-command flags are applied on top when the case is opened.
fn load_configuration(args: &Args) -> Result<CaseConfig> {
    let config_file = match &args.config_file {
        Some(path) => Some(path.clone()),
        None => CaseConfig::default_path().filter(|path| path.is_file()),
    };

    match &config_file {
        Some(path) => info!("Using config file: {}", path.display()),
        None => info!("No config file found, using defaults"),
    }

    let config = CaseConfig::load(config_file.as_deref()).with_context(|| match &config_file {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Invalid default configuration".to_string(),
    })?;
    debug!("Loaded configuration: {:?}", config);
    Ok(config)
}

fn open_case(args: &CaseArgs, config: &CaseConfig) -> Result<Case> {
    let mut config = config.clone();
    if let Some(policy) = args.on_missing_root() {
        config = config.with_on_missing_root(policy);
    }

    let casenames = args.casenames.clone();
    let case = if args.roots.is_empty() {
        Case::from_config_paths(casenames, config)
    } else {
        Case::new(casenames, args.roots.clone(), config)
    };
    case.with_context(|| format!("Failed to open case {}", args.casenames.join(",")))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_file_list(label: &str, files: &[PathBuf]) {
    println!("  {} ({})", label.bright_white().bold(), files.len());
    for path in files {
        println!("    {}", path.display());
    }
}

fn run_files(args: &FilesArgs, config: &CaseConfig) -> Result<()> {
    let case = open_case(&args.case, config)?;

    println!("{}", format!("Case {}", case.casenames().join(", ")).bright_green().bold());
    for root in case.output_roots() {
        println!("  root {}", root.display().to_string().bright_black());
    }

    if args.stream.is_none() && args.year.is_none() {
        for component in LogComponent::ALL {
            let logs = case.log_files(component);
            if !logs.is_empty() {
                print_file_list(&format!("{} logs", component), logs);
            }
        }
    }

    let streams: Vec<String> = match &args.stream {
        Some(stream) => vec![stream.clone()],
        None => case.streams().names().map(str::to_string).collect(),
    };

    for stream in &streams {
        let (history, timeseries) = match args.year {
            Some(year) => (
                case.history_files(year, stream)?,
                case.timeseries_files(year, stream, None)?,
            ),
            None => (
                case.history_filenames(stream)?.to_vec(),
                case.timeseries_filenames(stream)?.to_vec(),
            ),
        };
        if history.is_empty() && timeseries.is_empty() && args.stream.is_none() {
            continue;
        }
        println!("{}", stream.bright_cyan().bold());
        print_file_list("history", &history);
        print_file_list("time series", &timeseries);
    }
    Ok(())
}

fn run_logs(args: &LogsArgs, config: &CaseConfig) -> Result<()> {
    args.validate()?;
    let mut case = open_case(&args.case, config)?;
    let component = args.component.name();

    let contents = case
        .read_log(component)
        .with_context(|| format!("Failed to read {} logs", component))?;
    println!(
        "{}",
        format!("{} log: {} model dates", component, contents.len())
            .bright_green()
            .bold()
    );
    let mut coverage = report::log_coverage_frame(contents)?;

    if let Some(needle) = &args.grep {
        let counts = case.count_matching_lines(component, needle)?;
        println!("Lines containing {:?}:", needle);
        for (date, count) in &counts {
            println!("  {}  {}", date.to_string().bright_cyan(), count);
        }
        if let Some(output) = &args.output {
            write_report(&mut coverage, output)?;
        }
        return Ok(());
    }

    if args.component != LogComponent::Cesm {
        for (date, per_file) in case.read_log(component)? {
            let lines: usize = per_file.values().map(Vec::len).sum();
            println!("  {}  {} lines in {} file(s)", date.to_string().bright_cyan(), lines, per_file.len());
        }
        if let Some(output) = &args.output {
            write_report(&mut coverage, output)?;
        }
        return Ok(());
    }

    let counts = case.co2calc_warning_counts(args.max_it)?;
    let header: Vec<String> = (1..=args.max_it).map(|it| format!("it={}", it)).collect();
    println!("co2calc warnings per model date ({})", header.join(" "));
    for (date, row) in &counts {
        let cells: Vec<String> = row.iter().map(|n| format!("{:>5}", n)).collect();
        let line = format!("  {}  {}", date, cells.join(" "));
        if row.iter().any(|&n| n > 0) {
            println!("{}", line.yellow());
        } else {
            println!("{}", line);
        }
    }

    if let Some(output) = &args.output {
        let mut df = report::warning_counts_frame(&counts, args.max_it)?;
        write_report(&mut df, output)?;
    }
    Ok(())
}

fn print_dataset_summary(ds: &Dataset) {
    let dims: Vec<String> = ds
        .dims()
        .iter()
        .map(|(name, size)| format!("{}: {}", name, size))
        .collect();
    println!("  dimensions ({})", dims.join(", "));
    for name in ds.data_vars() {
        let Ok(var) = ds.get(name) else { continue };
        let units = var.attr_str("units").unwrap_or("");
        let range = var
            .data
            .as_numeric()
            .filter(|values| !values.is_empty())
            .map(|values| {
                let (lo, hi) = values
                    .iter()
                    .filter(|v| v.is_finite())
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
                format!("[{}, {}]", round_sig(lo, 4), round_sig(hi, 4))
            })
            .unwrap_or_default();
        println!(
            "  {:<16} ({}) {} {}",
            name.bright_cyan(),
            var.dims.join(", "),
            range,
            units.bright_black()
        );
    }
    if let Some(times) = ds.variable("time").and_then(|t| t.data.as_time()) {
        if let (Some(first), Some(last)) = (times.iter().next(), times.iter().last()) {
            println!("  time {} .. {}", first, last);
        }
    }
}

async fn run_dataset(args: &DatasetArgs, config: &CaseConfig) -> Result<()> {
    args.validate()?;
    let mut case = open_case(&args.case, config)?;

    let mut request = DatasetRequest::new(args.varnames.clone(), args.stream.clone())?
        .years(args.start_year, args.end_year);
    if !args.keep.is_empty() {
        request = request.keep(args.keep.clone()).context("Invalid --keep list")?;
    }

    let mut ds = case.gen_dataset(&request).await.with_context(|| {
        format!(
            "Failed to assemble {} from {} for years {:04}-{:04}",
            args.varnames.join(","),
            args.stream,
            args.start_year,
            args.end_year
        )
    })?;

    if let Some(units) = &args.units {
        for name in &args.varnames {
            let converted = conv_units(ds.get(name)?, units, args.units_scalef.as_deref())
                .with_context(|| format!("Failed to convert {} to {}", name, units))?;
            *ds.get_mut(name)? = converted;
        }
    }

    println!(
        "{}",
        format!("{} {:04}-{:04}", args.stream, args.start_year, args.end_year)
            .bright_green()
            .bold()
    );
    print_dataset_summary(&ds);

    // contiguous runs of years by where their data came from
    let mut runs: Vec<(DataSource, i32, i32)> = Vec::new();
    for year in args.start_year..=args.end_year {
        let Some(source) = case.dataset_source(&args.stream, year, &args.varnames[0]) else {
            continue;
        };
        match runs.last_mut() {
            Some((last_source, _, end)) if *last_source == source && *end == year - 1 => *end = year,
            _ => runs.push((source, year, year)),
        }
    }
    for (source, first, last) in &runs {
        println!("  {:04}-{:04} from {}", first, last, source);
    }
    Ok(())
}

fn print_coverage(results: &[YearCoverage]) {
    for result in results {
        let year = format!("{:04}", result.year);
        let year = if result.complete() {
            year.bright_green()
        } else {
            year.bright_red()
        };
        println!("{}", year.bold());
        for (stream, coverage) in &result.streams {
            println!("  {:<10} {}", stream.bright_cyan(), coverage);
        }
    }
}

async fn run_compare(args: &CompareArgs, config: &CaseConfig) -> Result<()> {
    if args.start_year > args.end_year {
        anyhow::bail!(
            "start year {} is after end year {}",
            args.start_year,
            args.end_year
        );
    }
    let case = open_case(&args.case, config)?;
    let streams: Vec<String> = if args.streams.is_empty() {
        case.streams().names().map(str::to_string).collect()
    } else {
        args.streams.clone()
    };

    let results = case
        .compare_years(&streams, args.start_year..=args.end_year)
        .await
        .context("Failed to compare time series with history")?;
    print_coverage(&results);

    if let Some(last) = results.last().filter(|r| !r.has_timeseries()) {
        println!(
            "{}",
            format!("Time series stop before year {:04}", last.year).yellow()
        );
    }

    if let Some(output) = &args.output {
        let mut df = report::coverage_frame(&results)?;
        write_report(&mut df, output)?;
    }
    Ok(())
}

fn print_submit_summary(summary: &SubmitSummary) {
    if summary.dry_run > 0 {
        println!("{}", format!("Dry run: {} job(s) not submitted", summary.dry_run).yellow());
    }
    if summary.submitted > 0 {
        println!("{}", format!("Submitted {} job(s)", summary.submitted).bright_green());
    }
    for failed in &summary.failed {
        println!(
            "{} {} {:04}: {}",
            "failed".bright_red().bold(),
            failed.script,
            failed.year,
            failed.reason
        );
    }
}

async fn run_submit(args: &SubmitArgs, config: &CaseConfig, show_progress: bool) -> Result<()> {
    let mut plan = SubmitPlan::new(args.years.clone())?
        .with_scheduler(config.scheduler.command.clone())
        .with_mail(!args.no_mail)
        .with_dry_run(args.dry_run)
        .with_progress(show_progress && !args.dry_run);
    if let Some(case_suffix) = &args.case_suffix {
        plan = plan.with_case_suffix(case_suffix.clone());
    }
    if !args.scripts.is_empty() {
        plan = plan.with_scripts(args.scripts.clone())?;
    }
    if let Some(workdir) = &args.workdir {
        plan = plan.with_workdir(workdir.clone());
    }

    if args.dry_run {
        for submission in plan.submissions() {
            println!("{} {}", plan.scheduler, submission.args.join(" "));
        }
    }

    let summary = plan.run().await?;
    print_submit_summary(&summary);
    if !summary.all_succeeded() {
        anyhow::bail!("{} submission(s) failed", summary.failed.len());
    }
    Ok(())
}

async fn run_output_roots(args: &OutputRootsArgs) -> Result<()> {
    let roots = output_roots_from_caseroot(args.caseroots.clone())
        .await
        .context("Failed to query case directories")?;
    for root in roots {
        println!("{}", root.display());
    }
    Ok(())
}

fn write_report(df: &mut polars::prelude::DataFrame, path: &Path) -> Result<()> {
    report::write_frame(df, path)
        .with_context(|| format!("Failed to write report {}", path.display()))?;
    println!("Wrote {}", file_name(path).bright_white());
    Ok(())
}
