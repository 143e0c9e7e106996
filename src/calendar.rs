//! CF calendars and time-unit encoding.
//!
//! Model time axes are stored as numeric offsets (`days since 0001-01-01`)
//! in non-standard calendars such as `noleap`. This module converts between
//! those offsets and calendar dates without going through `chrono`, which only
//! knows the proleptic Gregorian calendar.

use crate::error::{CaseError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MICROS_PER_SECOND: i64 = 1_000_000;
const SECONDS_PER_DAY: i64 = 86_400;
const MICROS_PER_DAY: i64 = SECONDS_PER_DAY * MICROS_PER_SECOND;

const CUM_DAYS_NOLEAP: [u32; 13] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334, 365];
const CUM_DAYS_LEAP: [u32; 13] = [0, 31, 60, 91, 121, 152, 182, 213, 244, 274, 305, 335, 366];

/// CF calendar attribute values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Calendar {
    /// `noleap` / `365_day`
    NoLeap,
    /// `all_leap` / `366_day`
    AllLeap,
    /// `360_day`
    Day360,
    /// `proleptic_gregorian`
    ProlepticGregorian,
    /// `standard` / `gregorian`, evaluated as proleptic Gregorian
    Standard,
}

impl Calendar {
    pub fn name(&self) -> &'static str {
        match self {
            Calendar::NoLeap => "noleap",
            Calendar::AllLeap => "all_leap",
            Calendar::Day360 => "360_day",
            Calendar::ProlepticGregorian => "proleptic_gregorian",
            Calendar::Standard => "standard",
        }
    }

    pub fn days_in_month(&self, year: i32, month: u32) -> Result<u32> {
        if !(1..=12).contains(&month) {
            return Err(CaseError::calendar(format!("month {} out of range", month)));
        }
        let m = month as usize;
        Ok(match self {
            Calendar::NoLeap => CUM_DAYS_NOLEAP[m] - CUM_DAYS_NOLEAP[m - 1],
            Calendar::AllLeap => CUM_DAYS_LEAP[m] - CUM_DAYS_LEAP[m - 1],
            Calendar::Day360 => 30,
            Calendar::ProlepticGregorian | Calendar::Standard => {
                if is_gregorian_leap(year) {
                    CUM_DAYS_LEAP[m] - CUM_DAYS_LEAP[m - 1]
                } else {
                    CUM_DAYS_NOLEAP[m] - CUM_DAYS_NOLEAP[m - 1]
                }
            }
        })
    }

    /// Days elapsed since the calendar's own epoch
    fn day_number(&self, year: i32, month: u32, day: u32) -> Result<i64> {
        if day == 0 || day > self.days_in_month(year, month)? {
            return Err(CaseError::calendar(format!(
                "{:04}-{:02}-{:02} is not a valid {} date",
                year,
                month,
                day,
                self.name()
            )));
        }
        let y = year as i64;
        let m = month as usize;
        let d = day as i64 - 1;
        Ok(match self {
            Calendar::NoLeap => y * 365 + CUM_DAYS_NOLEAP[m - 1] as i64 + d,
            Calendar::AllLeap => y * 366 + CUM_DAYS_LEAP[m - 1] as i64 + d,
            Calendar::Day360 => y * 360 + (m as i64 - 1) * 30 + d,
            Calendar::ProlepticGregorian | Calendar::Standard => {
                let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
                    CaseError::calendar(format!("{:04}-{:02}-{:02} out of range", year, month, day))
                })?;
                date.num_days_from_ce() as i64
            }
        })
    }

    fn from_day_number(&self, n: i64) -> Result<(i32, u32, u32)> {
        let fixed_year = |days_per_year: i64, cum: &[u32; 13]| {
            let year = n.div_euclid(days_per_year);
            let doy = n.rem_euclid(days_per_year) as u32;
            let month = (1..=12).rev().find(|&m| cum[m - 1] <= doy).unwrap_or(1);
            (year as i32, month as u32, doy - cum[month - 1] + 1)
        };
        Ok(match self {
            Calendar::NoLeap => fixed_year(365, &CUM_DAYS_NOLEAP),
            Calendar::AllLeap => fixed_year(366, &CUM_DAYS_LEAP),
            Calendar::Day360 => {
                let year = n.div_euclid(360);
                let doy = n.rem_euclid(360);
                (year as i32, (doy / 30 + 1) as u32, (doy % 30 + 1) as u32)
            }
            Calendar::ProlepticGregorian | Calendar::Standard => {
                let days = i32::try_from(n)
                    .map_err(|_| CaseError::calendar(format!("day number {} out of range", n)))?;
                let date = NaiveDate::from_num_days_from_ce_opt(days).ok_or_else(|| {
                    CaseError::calendar(format!("day number {} out of range", n))
                })?;
                (date.year(), date.month(), date.day())
            }
        })
    }
}

fn is_gregorian_leap(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Calendar {
    type Err = CaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "noleap" | "365_day" => Ok(Calendar::NoLeap),
            "all_leap" | "366_day" => Ok(Calendar::AllLeap),
            "360_day" => Ok(Calendar::Day360),
            "proleptic_gregorian" => Ok(Calendar::ProlepticGregorian),
            "standard" | "gregorian" => Ok(Calendar::Standard),
            other => Err(CaseError::calendar(format!("unsupported calendar '{}'", other))),
        }
    }
}

/// A date in an arbitrary CF calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CalendarDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub microsecond: u32,
}

impl CalendarDate {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour: 0,
            minute: 0,
            second: 0,
            microsecond: 0,
        }
    }

    pub fn with_time(mut self, hour: u32, minute: u32, second: u32) -> Self {
        self.hour = hour;
        self.minute = minute;
        self.second = second;
        self
    }

    fn abs_micros(&self, calendar: Calendar) -> Result<i64> {
        if self.hour > 23 || self.minute > 59 || self.second > 59 || self.microsecond >= 1_000_000 {
            return Err(CaseError::calendar(format!("invalid time of day in {}", self)));
        }
        let days = calendar.day_number(self.year, self.month, self.day)?;
        let seconds = self.hour as i64 * 3600 + self.minute as i64 * 60 + self.second as i64;
        Ok(days * MICROS_PER_DAY + seconds * MICROS_PER_SECOND + self.microsecond as i64)
    }

    fn from_abs_micros(micros: i64, calendar: Calendar) -> Result<Self> {
        let days = micros.div_euclid(MICROS_PER_DAY);
        let rem = micros.rem_euclid(MICROS_PER_DAY);
        let (year, month, day) = calendar.from_day_number(days)?;
        let seconds = rem / MICROS_PER_SECOND;
        Ok(Self {
            year,
            month,
            day,
            hour: (seconds / 3600) as u32,
            minute: (seconds % 3600 / 60) as u32,
            second: (seconds % 60) as u32,
            microsecond: (rem % MICROS_PER_SECOND) as u32,
        })
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )?;
        if self.microsecond > 0 {
            write!(f, ".{:06}", self.microsecond)?;
        }
        Ok(())
    }
}

/// Unit of a CF time offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl TimeUnit {
    fn micros(&self) -> i64 {
        match self {
            TimeUnit::Days => MICROS_PER_DAY,
            TimeUnit::Hours => 3600 * MICROS_PER_SECOND,
            TimeUnit::Minutes => 60 * MICROS_PER_SECOND,
            TimeUnit::Seconds => MICROS_PER_SECOND,
        }
    }
}

/// Parsed `"<unit> since <reference date>"` string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUnits {
    pub unit: TimeUnit,
    pub reference: CalendarDate,
}

impl TimeUnits {
    pub fn parse(units: &str) -> Result<Self> {
        let (unit, reference) = units
            .split_once(" since ")
            .ok_or_else(|| CaseError::calendar(format!("'{}' is not a time unit", units)))?;

        let unit = match unit.trim().to_ascii_lowercase().as_str() {
            "days" | "day" | "d" => TimeUnit::Days,
            "hours" | "hour" | "hr" | "h" => TimeUnit::Hours,
            "minutes" | "minute" | "min" => TimeUnit::Minutes,
            "seconds" | "second" | "sec" | "s" => TimeUnit::Seconds,
            other => {
                return Err(CaseError::calendar(format!(
                    "unsupported time unit '{}'",
                    other
                )));
            }
        };

        Ok(Self {
            unit,
            reference: parse_reference_date(reference.trim())?,
        })
    }

    /// True when `units` looks like a CF time-offset unit string
    pub fn is_time_units(units: &str) -> bool {
        units.contains(" since ")
    }
}

fn parse_reference_date(text: &str) -> Result<CalendarDate> {
    let invalid = || CaseError::calendar(format!("invalid reference date '{}'", text));

    let mut parts = text.splitn(2, |c| c == ' ' || c == 'T');
    let date_part = parts.next().ok_or_else(invalid)?;
    let time_part = parts
        .next()
        .and_then(|rest| rest.split_whitespace().next())
        .map(|t| t.trim_end_matches('Z'));

    let ymd: Vec<&str> = date_part.split('-').collect();
    if ymd.len() != 3 {
        return Err(invalid());
    }
    let year: i32 = ymd[0].parse().map_err(|_| invalid())?;
    let month: u32 = ymd[1].parse().map_err(|_| invalid())?;
    let day: u32 = ymd[2].parse().map_err(|_| invalid())?;
    let mut date = CalendarDate::new(year, month, day);

    if let Some(time) = time_part {
        let hms: Vec<&str> = time.split(':').collect();
        date.hour = hms.first().map_or(Ok(0), |h| h.parse()).map_err(|_| invalid())?;
        date.minute = hms.get(1).map_or(Ok(0), |m| m.parse()).map_err(|_| invalid())?;
        if let Some(sec) = hms.get(2) {
            let seconds: f64 = sec.parse().map_err(|_| invalid())?;
            date.second = seconds.trunc() as u32;
            date.microsecond = (seconds.fract() * 1e6).round() as u32;
        }
    }
    Ok(date)
}

/// Encode `date` as an offset in `units`
pub fn date2num(date: &CalendarDate, units: &TimeUnits, calendar: Calendar) -> Result<f64> {
    let offset = date.abs_micros(calendar)? - units.reference.abs_micros(calendar)?;
    let per_unit = units.unit.micros();
    let whole = offset.div_euclid(per_unit);
    let rem = offset.rem_euclid(per_unit);
    Ok(whole as f64 + rem as f64 / per_unit as f64)
}

/// Decode an offset in `units` to a calendar date
pub fn num2date(value: f64, units: &TimeUnits, calendar: Calendar) -> Result<CalendarDate> {
    if !value.is_finite() {
        return Err(CaseError::calendar(format!("cannot decode time value {}", value)));
    }
    let out_of_range = || CaseError::calendar(format!("time value {} is out of range", value));
    let per_unit = units.unit.micros();
    let whole = value.floor();
    if whole.abs() >= i64::MAX as f64 {
        return Err(out_of_range());
    }
    let frac = ((value - whole) * per_unit as f64).round() as i64;
    let reference = units.reference.abs_micros(calendar)?;
    let micros = (whole as i64)
        .checked_mul(per_unit)
        .and_then(|offset| offset.checked_add(frac))
        .and_then(|offset| offset.checked_add(reference))
        .ok_or_else(out_of_range)?;
    CalendarDate::from_abs_micros(micros, calendar)
}
