//! In-memory labelled datasets.
//!
//! A small NetCDF-shaped data model: named variables over named dimensions,
//! with attributes, encoding hints and an optional chunking hint per variable.
//! Array storage is reference counted so shallow copies share data with the
//! dataset they were copied from.

pub mod memory;
#[cfg(feature = "netcdf")]
pub mod netcdf;
pub mod ops;
pub mod reader;

pub use memory::MemoryReader;
#[cfg(feature = "netcdf")]
pub use self::netcdf::NetcdfReader;
pub use ops::{
    concat, copy_encoding, decode_times, merge, propagate_encoding, propagate_time_encoding,
    repl_coord, time_set_mid, time_year_plus_frac, variable_calendar,
};
pub use reader::{DatasetReader, OpenOptions, open_dataset, open_mfdataset};

use crate::calendar::CalendarDate;
use crate::error::{CaseError, Result};
use ndarray::{ArcArray, Array, IxDyn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Attribute or encoding value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// Explicit "no value", e.g. `_FillValue = None`
    Null,
    Int(i64),
    Float(f64),
    Str(String),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    Strs(Vec<String>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => f.write_str("None"),
            AttrValue::Int(v) => write!(f, "{}", v),
            AttrValue::Float(v) => write!(f, "{}", v),
            AttrValue::Str(v) => f.write_str(v),
            AttrValue::Ints(v) => write!(f, "{:?}", v),
            AttrValue::Floats(v) => write!(f, "{:?}", v),
            AttrValue::Strs(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(value: Vec<String>) -> Self {
        AttrValue::Strs(value)
    }
}

/// Ordered attribute / encoding map
pub type Attrs = BTreeMap<String, AttrValue>;

/// Variable values: plain numbers or decoded calendar dates
#[derive(Debug, Clone, PartialEq)]
pub enum VariableData {
    Numeric(ArcArray<f64, IxDyn>),
    Time(ArcArray<CalendarDate, IxDyn>),
}

impl VariableData {
    pub fn shape(&self) -> &[usize] {
        match self {
            VariableData::Numeric(a) => a.shape(),
            VariableData::Time(a) => a.shape(),
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_time(&self) -> bool {
        matches!(self, VariableData::Time(_))
    }

    pub fn as_numeric(&self) -> Option<&ArcArray<f64, IxDyn>> {
        match self {
            VariableData::Numeric(a) => Some(a),
            VariableData::Time(_) => None,
        }
    }

    pub fn as_time(&self) -> Option<&ArcArray<CalendarDate, IxDyn>> {
        match self {
            VariableData::Time(a) => Some(a),
            VariableData::Numeric(_) => None,
        }
    }

    /// True when both values point at the same underlying buffer
    pub fn shares_storage(&self, other: &VariableData) -> bool {
        match (self, other) {
            (VariableData::Numeric(a), VariableData::Numeric(b)) => a.as_ptr() == b.as_ptr(),
            (VariableData::Time(a), VariableData::Time(b)) => a.as_ptr() == b.as_ptr(),
            _ => false,
        }
    }

    fn deep_copy(&self) -> Self {
        match self {
            VariableData::Numeric(a) => VariableData::Numeric(a.to_owned().into_shared()),
            VariableData::Time(a) => VariableData::Time(a.to_owned().into_shared()),
        }
    }
}

impl From<Array<f64, IxDyn>> for VariableData {
    fn from(array: Array<f64, IxDyn>) -> Self {
        VariableData::Numeric(array.into_shared())
    }
}

impl From<Array<CalendarDate, IxDyn>> for VariableData {
    fn from(array: Array<CalendarDate, IxDyn>) -> Self {
        VariableData::Time(array.into_shared())
    }
}

/// One named array with its dimensions and metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub dims: Vec<String>,
    pub data: VariableData,
    pub attrs: Attrs,
    pub encoding: Attrs,
    /// Chunk length per dimension, when the variable is chunked
    pub chunks: Option<Vec<usize>>,
}

impl Variable {
    pub fn new(dims: &[&str], data: impl Into<VariableData>) -> Result<Self> {
        let data = data.into();
        if dims.len() != data.ndim() {
            return Err(CaseError::dimension_mismatch(
                dims.join(","),
                format!("{} dimension names for {}-d data", dims.len(), data.ndim()),
            ));
        }
        Ok(Self {
            dims: dims.iter().map(|d| d.to_string()).collect(),
            data,
            attrs: Attrs::new(),
            encoding: Attrs::new(),
            chunks: None,
        })
    }

    /// 1-d numeric variable along `dim`
    pub fn from_vec(dim: &str, values: Vec<f64>) -> Self {
        Self {
            dims: vec![dim.to_string()],
            data: Array::from_vec(values).into_dyn().into(),
            attrs: Attrs::new(),
            encoding: Attrs::new(),
            chunks: None,
        }
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    pub fn with_encoding(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.encoding.insert(key.to_string(), value.into());
        self
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(AttrValue::as_str)
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    pub fn has_dim(&self, dim: &str) -> bool {
        self.axis_of(dim).is_some()
    }

    /// Copy of this variable with new data; attributes, encoding and chunks kept
    pub fn copy_with_data(&self, data: VariableData) -> Result<Self> {
        if data.shape() != self.shape() {
            return Err(CaseError::dimension_mismatch(
                self.dims.join(","),
                format!("replacement shape {:?} != {:?}", data.shape(), self.shape()),
            ));
        }
        Ok(Self {
            dims: self.dims.clone(),
            data,
            attrs: self.attrs.clone(),
            encoding: self.encoding.clone(),
            chunks: self.chunks.clone(),
        })
    }

    pub fn copy(&self, deep: bool) -> Self {
        let mut out = self.clone();
        if deep {
            out.data = self.data.deep_copy();
        }
        out
    }
}

/// A collection of variables sharing named dimensions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    variables: BTreeMap<String, Variable>,
    coord_names: BTreeSet<String>,
    pub attrs: Attrs,
    pub encoding: Attrs,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a data variable, checking dimension lengths
    pub fn insert(&mut self, name: &str, variable: Variable) -> Result<()> {
        let dims = self.dims_excluding(name);
        for (dim, &len) in variable.dims.iter().zip(variable.shape()) {
            if let Some(&existing) = dims.get(dim) {
                if existing != len {
                    return Err(CaseError::dimension_mismatch(
                        name,
                        format!("dimension {} has length {} but dataset has {}", dim, len, existing),
                    ));
                }
            }
        }
        self.variables.insert(name.to_string(), variable);
        Ok(())
    }

    /// Add or replace a coordinate variable
    pub fn insert_coord(&mut self, name: &str, variable: Variable) -> Result<()> {
        self.insert(name, variable)?;
        self.coord_names.insert(name.to_string());
        Ok(())
    }

    pub fn with_variable(mut self, name: &str, variable: Variable) -> Result<Self> {
        self.insert(name, variable)?;
        Ok(self)
    }

    pub fn with_coord(mut self, name: &str, variable: Variable) -> Result<Self> {
        self.insert_coord(name, variable)?;
        Ok(self)
    }

    pub fn remove(&mut self, name: &str) -> Option<Variable> {
        self.coord_names.remove(name);
        self.variables.remove(name)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// Variable lookup that fails with `MissingVariable`
    pub fn get(&self, name: &str) -> Result<&Variable> {
        self.variables
            .get(name)
            .ok_or_else(|| CaseError::missing_variable(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Variable> {
        self.variables
            .get_mut(name)
            .ok_or_else(|| CaseError::missing_variable(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn is_coord(&self, name: &str) -> bool {
        self.coord_names.contains(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    /// Names of non-coordinate variables
    pub fn data_vars(&self) -> impl Iterator<Item = &str> {
        self.variables
            .keys()
            .filter(|name| !self.coord_names.contains(*name))
            .map(String::as_str)
    }

    pub fn coords(&self) -> impl Iterator<Item = &str> {
        self.coord_names.iter().map(String::as_str)
    }

    /// Dimension lengths across all variables
    pub fn dims(&self) -> BTreeMap<String, usize> {
        self.dims_excluding("")
    }

    fn dims_excluding(&self, skip: &str) -> BTreeMap<String, usize> {
        let mut dims = BTreeMap::new();
        for (name, variable) in &self.variables {
            if name == skip {
                continue;
            }
            for (dim, &len) in variable.dims.iter().zip(variable.shape()) {
                dims.entry(dim.clone()).or_insert(len);
            }
        }
        dims
    }

    pub fn size(&self, dim: &str) -> Option<usize> {
        self.dims().get(dim).copied()
    }

    /// Name of the bounds variable attached to `coord`, if any
    pub fn bounds_name(&self, coord: &str) -> Option<String> {
        self.variable(coord)
            .and_then(|v| v.attr_str("bounds"))
            .map(str::to_string)
    }

    /// Subset holding `names` (which must exist), the coordinates of their
    /// dimensions and the bounds variables of those coordinates
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let mut keep: BTreeSet<String> = BTreeSet::new();
        for name in names {
            let variable = self.get(name.as_ref())?;
            keep.insert(name.as_ref().to_string());
            for dim in &variable.dims {
                if self.contains(dim) {
                    keep.insert(dim.clone());
                    if let Some(bounds) = self.bounds_name(dim) {
                        if self.contains(&bounds) {
                            keep.insert(bounds);
                        }
                    }
                }
            }
        }
        Ok(Self {
            variables: self
                .variables
                .iter()
                .filter(|(name, _)| keep.contains(*name))
                .map(|(name, v)| (name.clone(), v.clone()))
                .collect(),
            coord_names: self
                .coord_names
                .iter()
                .filter(|name| keep.contains(*name))
                .cloned()
                .collect(),
            attrs: self.attrs.clone(),
            encoding: self.encoding.clone(),
        })
    }

    /// Shallow copies share array storage; deep copies own new buffers
    pub fn copy(&self, deep: bool) -> Self {
        Self {
            variables: self
                .variables
                .iter()
                .map(|(name, v)| (name.clone(), v.copy(deep)))
                .collect(),
            coord_names: self.coord_names.clone(),
            attrs: self.attrs.clone(),
            encoding: self.encoding.clone(),
        }
    }

    /// Record a chunk length along `dim` on every variable that has it
    pub fn chunk(mut self, dim: &str, size: usize) -> Self {
        for variable in self.variables.values_mut() {
            if let Some(axis) = variable.axis_of(dim) {
                let mut chunks = variable
                    .chunks
                    .clone()
                    .unwrap_or_else(|| variable.shape().to_vec());
                chunks[axis] = size.min(variable.shape()[axis]).max(1);
                variable.chunks = Some(chunks);
            }
        }
        self
    }

    /// Chunking hints by variable
    pub fn chunks(&self) -> BTreeMap<&str, Option<&Vec<usize>>> {
        self.variables
            .iter()
            .map(|(name, v)| (name.as_str(), v.chunks.as_ref()))
            .collect()
    }
}
