//! Core data structures shared across the crate.
//!
//! Defines model components, log components, output streams and the
//! string-or-list input type accepted by every public entry point.

use crate::constants::{CESM_DATE_MARKER, CPL_DATE_MARKER};
use crate::error::{CaseError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Model component owning an output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Ocn,
    Ice,
    Atm,
    Lnd,
}

impl Component {
    /// Directory name used in the archive layout (`{root}/{comp}/hist`)
    pub fn dir_name(&self) -> &'static str {
        match self {
            Component::Ocn => "ocn",
            Component::Ice => "ice",
            Component::Atm => "atm",
            Component::Lnd => "lnd",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for Component {
    type Err = CaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ocn" => Ok(Component::Ocn),
            "ice" => Ok(Component::Ice),
            "atm" => Ok(Component::Atm),
            "lnd" => Ok(Component::Lnd),
            other => Err(CaseError::configuration(format!(
                "unknown model component '{}'",
                other
            ))),
        }
    }
}

/// Output frequency of a stream; doubles as the time-series subdirectory name
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Frequency {
    #[serde(rename = "day_1")]
    Daily,
    #[serde(rename = "month_1")]
    Monthly,
    #[serde(rename = "year_1")]
    Yearly,
}

impl Frequency {
    pub fn dir_name(&self) -> &'static str {
        match self {
            Frequency::Daily => "day_1",
            Frequency::Monthly => "month_1",
            Frequency::Yearly => "year_1",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for Frequency {
    type Err = CaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "day_1" => Ok(Frequency::Daily),
            "month_1" => Ok(Frequency::Monthly),
            "year_1" => Ok(Frequency::Yearly),
            other => Err(CaseError::configuration(format!(
                "unknown output frequency '{}'",
                other
            ))),
        }
    }
}

/// Fixed metadata of one output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMetadata {
    pub comp: Component,
    pub freq: Frequency,
}

/// Mapping from stream name (e.g. `pop.h.nday1`) to its metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamTable(BTreeMap<String, StreamMetadata>);

impl Default for StreamTable {
    fn default() -> Self {
        use Component::{Ice, Ocn};
        use Frequency::{Daily, Monthly, Yearly};

        let streams = [
            ("pop.h", Ocn, Monthly),
            ("pop.h.nday1", Ocn, Daily),
            ("pop.h.nyear1", Ocn, Yearly),
            ("cice.h", Ice, Monthly),
            ("cice.h1", Ice, Daily),
        ]
        .into_iter()
        .map(|(name, comp, freq)| (name.to_string(), StreamMetadata { comp, freq }))
        .collect();
        Self(streams)
    }
}

impl StreamTable {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, stream: impl Into<String>, metadata: StreamMetadata) {
        self.0.insert(stream.into(), metadata);
    }

    /// Metadata for `stream`; unknown streams are a programming error
    pub fn get(&self, stream: &str) -> Result<&StreamMetadata> {
        self.0.get(stream).ok_or_else(|| CaseError::UnknownStream {
            stream: stream.to_string(),
        })
    }

    pub fn contains(&self, stream: &str) -> bool {
        self.0.contains_key(stream)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StreamMetadata)> {
        self.0.iter().map(|(name, metadata)| (name.as_str(), metadata))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Log components tracked by discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogComponent {
    /// Driver log, `cesm.log.*`
    Cesm,
    /// Ocean log, `ocn.log.*`
    Ocn,
    /// Coupler log, `cpl.log.*`
    Cpl,
}

impl LogComponent {
    pub const ALL: [LogComponent; 3] = [LogComponent::Cesm, LogComponent::Ocn, LogComponent::Cpl];

    pub fn name(&self) -> &'static str {
        match self {
            LogComponent::Cesm => "cesm",
            LogComponent::Ocn => "ocn",
            LogComponent::Cpl => "cpl",
        }
    }

    /// Substring that precedes the `YYYYMMDD` stamp in this component's log
    pub fn date_marker(&self) -> Result<&'static str> {
        match self {
            LogComponent::Cesm => Ok(CESM_DATE_MARKER),
            LogComponent::Cpl => Ok(CPL_DATE_MARKER),
            LogComponent::Ocn => Err(CaseError::UnsupportedLogComponent {
                component: self.name().to_string(),
            }),
        }
    }
}

impl fmt::Display for LogComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LogComponent {
    type Err = CaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cesm" => Ok(LogComponent::Cesm),
            "ocn" => Ok(LogComponent::Ocn),
            "cpl" => Ok(LogComponent::Cpl),
            other => Err(CaseError::UnknownComponent {
                component: other.to_string(),
            }),
        }
    }
}

/// A single string or a list of strings
///
/// Case names, output roots and variable names may all be given either way.
/// Empty entries are rejected when the list is materialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    /// Normalize to a list, rejecting an empty list or empty entries
    pub fn into_vec(self, name: &str) -> Result<Vec<String>> {
        let values = self.into_vec_or_empty(name)?;
        if values.is_empty() {
            return Err(CaseError::invalid_input(name, "no values given"));
        }
        Ok(values)
    }

    /// Normalize to a possibly empty list, rejecting empty entries
    pub fn into_vec_or_empty(self, name: &str) -> Result<Vec<String>> {
        let values = match self {
            StringOrList::One(value) => vec![value],
            StringOrList::Many(values) => values,
        };
        if values.iter().any(|value| value.trim().is_empty()) {
            return Err(CaseError::invalid_input(
                name,
                format!("{:?} contains an empty value", values),
            ));
        }
        Ok(values)
    }

    /// Normalize to paths; an empty list gives no paths
    pub fn into_paths(self, name: &str) -> Result<Vec<PathBuf>> {
        Ok(self
            .into_vec_or_empty(name)?
            .into_iter()
            .map(PathBuf::from)
            .collect())
    }
}

impl From<&str> for StringOrList {
    fn from(value: &str) -> Self {
        StringOrList::One(value.to_string())
    }
}

impl From<String> for StringOrList {
    fn from(value: String) -> Self {
        StringOrList::One(value)
    }
}

impl From<&String> for StringOrList {
    fn from(value: &String) -> Self {
        StringOrList::One(value.clone())
    }
}

impl From<PathBuf> for StringOrList {
    fn from(value: PathBuf) -> Self {
        StringOrList::One(value.to_string_lossy().into_owned())
    }
}

impl From<&std::path::Path> for StringOrList {
    fn from(value: &std::path::Path) -> Self {
        StringOrList::One(value.to_string_lossy().into_owned())
    }
}

impl From<Vec<String>> for StringOrList {
    fn from(values: Vec<String>) -> Self {
        StringOrList::Many(values)
    }
}

impl From<Vec<&str>> for StringOrList {
    fn from(values: Vec<&str>) -> Self {
        StringOrList::Many(values.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for StringOrList {
    fn from(values: &[&str]) -> Self {
        StringOrList::Many(values.iter().map(|v| v.to_string()).collect())
    }
}

impl From<Vec<PathBuf>> for StringOrList {
    fn from(values: Vec<PathBuf>) -> Self {
        StringOrList::Many(
            values
                .into_iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
        )
    }
}

impl TryFrom<&serde_json::Value> for StringOrList {
    type Error = CaseError;

    fn try_from(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::String(s) => Ok(StringOrList::One(s.clone())),
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        CaseError::invalid_input(
                            "value",
                            format!("{} is not a string or list", value),
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()
                .map(StringOrList::Many),
            other => Err(CaseError::invalid_input(
                "value",
                format!("{} is not a string or list", other),
            )),
        }
    }
}
