//! NetCDF file reader (requires the system netCDF library)

use super::{AttrValue, Attrs, Dataset, DatasetReader, Variable};
use crate::error::{CaseError, Result};
use ndarray::{Array, IxDyn};
use ::netcdf::AttributeValue;
use ::netcdf::types::{FloatType, IntType, NcVariableType};
use std::path::Path;
use tracing::debug;

/// Reads every numeric variable of a NetCDF file as `f64`.
///
/// Values equal to `_FillValue` become NaN. The on-disk type and fill value of
/// each variable are kept in its encoding as `dtype` and `_FillValue`. Names
/// of unlimited dimensions are recorded under the `unlimited_dims` dataset
/// encoding key.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetcdfReader;

impl NetcdfReader {
    pub fn new() -> Self {
        Self
    }
}

fn convert_attr(value: AttributeValue) -> AttrValue {
    match value {
        AttributeValue::Str(s) => AttrValue::Str(s),
        AttributeValue::Strs(s) => AttrValue::Strs(s),
        AttributeValue::Short(v) => AttrValue::Int(v as i64),
        AttributeValue::Int(v) => AttrValue::Int(v as i64),
        AttributeValue::Longlong(v) => AttrValue::Int(v),
        AttributeValue::Ints(v) => AttrValue::Ints(v.into_iter().map(i64::from).collect()),
        AttributeValue::Float(v) => AttrValue::Float(v as f64),
        AttributeValue::Double(v) => AttrValue::Float(v),
        AttributeValue::Floats(v) => AttrValue::Floats(v.into_iter().map(f64::from).collect()),
        AttributeValue::Doubles(v) => AttrValue::Floats(v),
        other => {
            debug!("Ignoring attribute value of unsupported type: {:?}", other);
            AttrValue::Null
        }
    }
}

/// Storage type name as recorded under the `dtype` encoding key
fn dtype_name(vartype: &NcVariableType) -> &'static str {
    match vartype {
        NcVariableType::Int(IntType::I8) => "int8",
        NcVariableType::Int(IntType::U8) => "uint8",
        NcVariableType::Int(IntType::I16) => "int16",
        NcVariableType::Int(IntType::U16) => "uint16",
        NcVariableType::Int(IntType::I32) => "int32",
        NcVariableType::Int(IntType::U32) => "uint32",
        NcVariableType::Int(IntType::I64) => "int64",
        NcVariableType::Int(IntType::U64) => "uint64",
        NcVariableType::Float(FloatType::F32) => "float32",
        NcVariableType::Float(FloatType::F64) => "float64",
        NcVariableType::Char => "S1",
        NcVariableType::String => "str",
        _ => "object",
    }
}

fn fill_value(attrs: &Attrs) -> Option<f64> {
    match attrs.get("_FillValue")? {
        AttrValue::Float(v) => Some(*v),
        AttrValue::Int(v) => Some(*v as f64),
        _ => None,
    }
}

impl DatasetReader for NetcdfReader {
    fn open(&self, path: &Path) -> Result<Dataset> {
        let file = ::netcdf::open(path)?;
        let mut ds = Dataset::new();

        for attr in file.attributes() {
            ds.attrs.insert(attr.name().to_string(), convert_attr(attr.value()?));
        }
        let unlimited: Vec<String> = file
            .dimensions()
            .filter(|dim| dim.is_unlimited())
            .map(|dim| dim.name())
            .collect();
        if !unlimited.is_empty() {
            ds.encoding
                .insert("unlimited_dims".to_string(), AttrValue::Strs(unlimited));
        }

        for var in file.variables() {
            let name = var.name();
            let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
            let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

            let mut attrs = Attrs::new();
            for attr in var.attributes() {
                attrs.insert(attr.name().to_string(), convert_attr(attr.value()?));
            }

            let mut values = match var.get_values::<f64, _>(..) {
                Ok(values) => values,
                Err(e) => {
                    debug!("Skipping non-numeric variable {} in {}: {}", name, path.display(), e);
                    continue;
                }
            };
            if let Some(fill) = fill_value(&attrs) {
                values
                    .iter_mut()
                    .filter(|v| **v == fill)
                    .for_each(|v| *v = f64::NAN);
            }

            let array = Array::from_shape_vec(IxDyn(&shape), values).map_err(|e| CaseError::Reader {
                path: path.to_path_buf(),
                reason: format!("{}: {}", name, e),
            })?;

            let mut encoding = Attrs::new();
            encoding.insert("dtype".to_string(), AttrValue::from(dtype_name(&var.vartype())));
            if let Some(fill) = attrs.remove("_FillValue") {
                encoding.insert("_FillValue".to_string(), fill);
            }
            let dim_refs: Vec<&str> = dims.iter().map(String::as_str).collect();
            let mut variable = Variable::new(&dim_refs, array)?;
            variable.attrs = attrs;
            variable.encoding = encoding;

            // a variable named after its only dimension is a coordinate
            if dims.len() == 1 && dims[0] == name {
                ds.insert_coord(&name, variable)?;
            } else {
                ds.insert(&name, variable)?;
            }
        }

        debug!("Read {} variables from {}", ds.variable_names().count(), path.display());
        Ok(ds)
    }
}
