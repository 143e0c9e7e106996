//! Structured parsing of CESM output file names
//!
//! Output files are named `{case}.{stream}.{tail}.nc`. After the known case
//! and stream prefixes are stripped, the tail is either a single date token
//! (a history file) or `{variable}.{date-range}` (a time-series file).

use crate::constants::NETCDF_EXTENSION;
use std::fmt;

/// A date token from a history file name: `YYYY`, `YYYY-MM`, `YYYY-MM-DD` or
/// `YYYY-MM-DD-SSSSS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateToken {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub seconds: Option<u32>,
}

impl DateToken {
    pub fn parse(token: &str) -> Option<Self> {
        let parts: Vec<&str> = token.split('-').collect();
        let widths = [4, 2, 2, 5];
        if parts.is_empty() || parts.len() > widths.len() {
            return None;
        }
        for (part, width) in parts.iter().zip(widths) {
            if part.len() != width || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
        }

        let year = parts[0].parse().ok()?;
        let month = parts.get(1).map(|m| m.parse()).transpose().ok()?;
        let day = parts.get(2).map(|d| d.parse()).transpose().ok()?;
        let seconds = parts.get(3).map(|s| s.parse()).transpose().ok()?;
        if month.is_some_and(|m: u32| !(1..=12).contains(&m))
            || day.is_some_and(|d: u32| !(1..=31).contains(&d))
            || seconds.is_some_and(|s: u32| s >= 86_400)
        {
            return None;
        }
        Some(Self {
            year,
            month,
            day,
            seconds,
        })
    }
}

impl fmt::Display for DateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        if let Some(month) = self.month {
            write!(f, "-{:02}", month)?;
        }
        if let Some(day) = self.day {
            write!(f, "-{:02}", day)?;
        }
        if let Some(seconds) = self.seconds {
            write!(f, "-{:05}", seconds)?;
        }
        Ok(())
    }
}

/// Inclusive year span of a time-series file, from `YYYY[MM[DD]]-YYYY[MM[DD]]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateSpan {
    pub start_year: i32,
    pub end_year: i32,
}

impl DateSpan {
    pub fn parse(token: &str) -> Option<Self> {
        let (start, end) = token.split_once('-')?;
        if start.len() != end.len() || ![4, 6, 8].contains(&start.len()) {
            return None;
        }
        if !start.bytes().chain(end.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }
        let start_year: i32 = start[..4].parse().ok()?;
        let end_year: i32 = end[..4].parse().ok()?;
        if end_year < start_year {
            return None;
        }
        Some(Self {
            start_year,
            end_year,
        })
    }

    pub fn covers(&self, year: i32) -> bool {
        (self.start_year..=self.end_year).contains(&year)
    }
}

/// What a file name says about its contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFile {
    History(DateToken),
    TimeSeries { variable: String, span: DateSpan },
}

impl OutputFile {
    /// Classify `{case}.{stream}.{tail}.nc`; `None` when the name belongs to
    /// another case, another stream or does not follow the convention
    pub fn classify(file_name: &str, case: &str, stream: &str) -> Option<Self> {
        let tail = file_name
            .strip_prefix(case)?
            .strip_prefix('.')?
            .strip_prefix(stream)?
            .strip_prefix('.')?
            .strip_suffix(NETCDF_EXTENSION)?
            .strip_suffix('.')?;
        Self::parse_tail(tail)
    }

    pub fn parse_tail(tail: &str) -> Option<Self> {
        let parts: Vec<&str> = tail.split('.').collect();
        match parts.as_slice() {
            [date] => DateToken::parse(date).map(OutputFile::History),
            [variable, range] if !variable.is_empty() => {
                DateSpan::parse(range).map(|span| OutputFile::TimeSeries {
                    variable: variable.to_string(),
                    span,
                })
            }
            _ => None,
        }
    }

    pub fn is_history(&self) -> bool {
        matches!(self, OutputFile::History(_))
    }

    pub fn is_timeseries(&self) -> bool {
        matches!(self, OutputFile::TimeSeries { .. })
    }
}
