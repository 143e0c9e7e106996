//! Batch submission of time-series reshaping jobs
//!
//! Each `(year, script)` pair becomes one scheduler call:
//! ```text
//! sbatch --dependency=singleton [--mail-type=NONE] {script} {case} {YYYY}
//! ```
//! `--dependency=singleton` keeps at most one job per job name running, so
//! jobs of the same script never overlap on temporary files.

use crate::constants::{DEFAULT_CASE_SUFFIX, DEFAULT_SCHEDULER, DEFAULT_SCRIPTS};
use crate::error::{CaseError, Result};
use chrono::{DateTime, Local};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{info, warn};

/// One scheduler call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub script: String,
    pub year: i32,
    pub args: Vec<String>,
}

/// A submission that could not be made
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedSubmission {
    pub script: String,
    pub year: i32,
    pub reason: String,
}

/// Outcome of [`SubmitPlan::run`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubmitSummary {
    pub submitted: usize,
    pub dry_run: usize,
    pub failed: Vec<FailedSubmission>,
    pub started_at: Option<DateTime<Local>>,
}

impl SubmitSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Years and scripts to submit, and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitPlan {
    pub years: Vec<i32>,
    pub case_suffix: String,
    pub scripts: Vec<String>,
    pub scheduler: String,
    pub mail: bool,
    pub dry_run: bool,
    /// Directory the scheduler runs in; the current directory when unset
    pub workdir: Option<PathBuf>,
    pub show_progress: bool,
}

impl SubmitPlan {
    pub fn new(years: Vec<i32>) -> Result<Self> {
        if years.is_empty() {
            return Err(CaseError::invalid_input("years", "no years given"));
        }
        if let Some(year) = years.iter().find(|&&y| !(0..=9999).contains(&y)) {
            return Err(CaseError::invalid_input(
                "years",
                format!("{} does not fit in four digits", year),
            ));
        }
        Ok(Self {
            years,
            case_suffix: DEFAULT_CASE_SUFFIX.to_string(),
            scripts: DEFAULT_SCRIPTS.iter().map(|s| s.to_string()).collect(),
            scheduler: DEFAULT_SCHEDULER.to_string(),
            mail: true,
            dry_run: false,
            workdir: None,
            show_progress: false,
        })
    }

    pub fn with_case_suffix(mut self, case_suffix: impl Into<String>) -> Self {
        self.case_suffix = case_suffix.into();
        self
    }

    pub fn with_scripts(mut self, scripts: Vec<String>) -> Result<Self> {
        if scripts.is_empty() {
            return Err(CaseError::invalid_input("scripts", "no scripts given"));
        }
        self.scripts = scripts;
        Ok(self)
    }

    pub fn with_scheduler(mut self, scheduler: impl Into<String>) -> Self {
        self.scheduler = scheduler.into();
        self
    }

    pub fn with_mail(mut self, mail: bool) -> Self {
        self.mail = mail;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Every scheduler call, years outermost
    pub fn submissions(&self) -> Vec<Submission> {
        let mut submissions = Vec::with_capacity(self.years.len() * self.scripts.len());
        for &year in &self.years {
            for script in &self.scripts {
                let mut args = vec!["--dependency=singleton".to_string()];
                if !self.mail {
                    args.push("--mail-type=NONE".to_string());
                }
                args.extend([script.clone(), self.case_suffix.clone(), format!("{:04}", year)]);
                submissions.push(Submission {
                    script: script.clone(),
                    year,
                    args,
                });
            }
        }
        submissions
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }

    /// Submit every job in order, one at a time.
    ///
    /// A failed submission is logged and recorded; the remaining jobs are
    /// still submitted.
    pub async fn run(&self) -> Result<SubmitSummary> {
        let submissions = self.submissions();
        let mut summary = SubmitSummary {
            started_at: Some(Local::now()),
            ..SubmitSummary::default()
        };
        let pb = self.progress_bar(submissions.len());

        for submission in &submissions {
            let year = format!("{:04}", submission.year);
            pb.set_message(format!("{} {}", submission.script, year));
            info!(
                "Submitting {} for year {} of {}...",
                submission.script, year, self.case_suffix
            );

            if self.dry_run {
                summary.dry_run += 1;
                pb.inc(1);
                continue;
            }

            match self.submit(submission).await {
                Ok(()) => summary.submitted += 1,
                Err(e) => {
                    warn!("{}", e);
                    summary.failed.push(FailedSubmission {
                        script: submission.script.clone(),
                        year: submission.year,
                        reason: e.to_string(),
                    });
                }
            }
            pb.inc(1);
        }

        pb.finish_with_message(format!(
            "{} submitted, {} failed",
            summary.submitted,
            summary.failed.len()
        ));
        Ok(summary)
    }

    async fn submit(&self, submission: &Submission) -> Result<()> {
        let mut command = Command::new(&self.scheduler);
        command.args(&submission.args);
        if let Some(workdir) = &self.workdir {
            command.current_dir(workdir);
        }

        let output = command.output().await.map_err(|e| CaseError::Scheduler {
            script: submission.script.clone(),
            reason: format!("could not run {}: {}", self.scheduler, e),
        })?;
        if !output.status.success() {
            return Err(CaseError::Scheduler {
                script: submission.script.clone(),
                reason: format!(
                    "{} exited with {}: {}",
                    self.scheduler,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(())
    }
}
