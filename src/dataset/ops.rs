//! Dataset transformations used when stitching time-series and history output

use super::{AttrValue, Attrs, Dataset, Variable, VariableData};
use crate::calendar::{Calendar, CalendarDate, TimeUnits, date2num, num2date};
use crate::constants::{
    DATASET_ENCODING_KEYS, DEFAULT_CALENDAR, MIDPOINT_TIME_UNITS, TIME_ENCODING_KEYS,
};
use crate::error::{CaseError, Result};
use ndarray::{Array, Array1, ArrayView, Axis, IxDyn};
use tracing::debug;

/// Concatenate datasets along `dim`.
///
/// Variables of the first dataset that carry `dim` are joined across all
/// inputs; the rest are taken from the first dataset unchanged. Every
/// variable carrying `dim` must be present in all inputs. Attributes,
/// variable encoding and chunk hints come from the first dataset. The
/// dataset-level encoding is not carried over.
pub fn concat(datasets: &[Dataset], dim: &str) -> Result<Dataset> {
    let (first, rest) = datasets
        .split_first()
        .ok_or_else(|| CaseError::invalid_input("datasets", "nothing to concatenate"))?;

    for ds in rest {
        if let Some((name, _)) = ds
            .variables()
            .find(|(name, variable)| variable.has_dim(dim) && !first.contains(name))
        {
            return Err(CaseError::missing_variable(name));
        }
    }

    let mut out = Dataset::new();
    out.attrs = first.attrs.clone();

    for (name, variable) in first.variables() {
        let joined = match variable.axis_of(dim) {
            Some(axis) if !rest.is_empty() => {
                let mut parts = vec![&variable.data];
                for ds in rest {
                    let other = ds.get(name)?;
                    if other.dims != variable.dims {
                        return Err(CaseError::dimension_mismatch(
                            name,
                            format!("dims {:?} vs {:?}", other.dims, variable.dims),
                        ));
                    }
                    parts.push(&other.data);
                }
                let mut joined = variable.clone();
                joined.data = concat_data(&parts, axis, name)?;
                joined
            }
            _ => variable.clone(),
        };
        if first.is_coord(name) {
            out.insert_coord(name, joined)?;
        } else {
            out.insert(name, joined)?;
        }
    }
    Ok(out)
}

fn concat_data(parts: &[&VariableData], axis: usize, name: &str) -> Result<VariableData> {
    let type_mismatch = || CaseError::dimension_mismatch(name, "mixed numeric and time values");
    let shape_err = |e: ndarray::ShapeError| CaseError::dimension_mismatch(name, e.to_string());

    match parts[0] {
        VariableData::Numeric(_) => {
            let views = parts
                .iter()
                .map(|p| p.as_numeric().map(|a| a.view()).ok_or_else(type_mismatch))
                .collect::<Result<Vec<ArrayView<f64, IxDyn>>>>()?;
            let joined = ndarray::concatenate(Axis(axis), &views).map_err(shape_err)?;
            Ok(VariableData::Numeric(joined.into_shared()))
        }
        VariableData::Time(_) => {
            let views = parts
                .iter()
                .map(|p| p.as_time().map(|a| a.view()).ok_or_else(type_mismatch))
                .collect::<Result<Vec<ArrayView<CalendarDate, IxDyn>>>>()?;
            let joined = ndarray::concatenate(Axis(axis), &views).map_err(shape_err)?;
            Ok(VariableData::Time(joined.into_shared()))
        }
    }
}

/// Union of the variables of `datasets`; for duplicate names the first wins.
/// Attributes come from the first dataset, dataset-level encoding is dropped.
pub fn merge(datasets: &[Dataset]) -> Result<Dataset> {
    let mut out = Dataset::new();
    if let Some(first) = datasets.first() {
        out.attrs = first.attrs.clone();
    }
    for ds in datasets {
        for (name, variable) in ds.variables() {
            if out.contains(name) {
                continue;
            }
            if ds.is_coord(name) {
                out.insert_coord(name, variable.clone())?;
            } else {
                out.insert(name, variable.clone())?;
            }
        }
    }
    Ok(out)
}

/// Copy `keys` present in `src` into `dst`.
///
/// With `abort_on_mismatch`, a key already in `dst` is left alone when the
/// values agree and is an `EncodingMismatch` error when they differ.
pub fn copy_encoding(
    src: &Attrs,
    dst: &mut Attrs,
    keys: &[&str],
    abort_on_mismatch: bool,
) -> Result<()> {
    for key in keys {
        let Some(value) = src.get(*key) else {
            continue;
        };
        match dst.get(*key) {
            Some(existing) if abort_on_mismatch => {
                if existing != value {
                    return Err(CaseError::EncodingMismatch {
                        key: key.to_string(),
                    });
                }
            }
            _ => {
                dst.insert(key.to_string(), value.clone());
            }
        }
    }
    Ok(())
}

/// Copy the dataset-level and time-variable encoding of `src` into `dst`
pub fn propagate_encoding(src: &Dataset, dst: &mut Dataset, time_name: &str) -> Result<()> {
    copy_encoding(&src.encoding, &mut dst.encoding, DATASET_ENCODING_KEYS, true)?;
    propagate_time_encoding(src, dst, time_name)
}

/// Copy only the time-variable encoding of `src` into `dst`
pub fn propagate_time_encoding(src: &Dataset, dst: &mut Dataset, time_name: &str) -> Result<()> {
    if let (Some(src_time), true) = (src.variable(time_name), dst.contains(time_name)) {
        let dst_time = dst.get_mut(time_name)?;
        copy_encoding(&src_time.encoding, &mut dst_time.encoding, TIME_ENCODING_KEYS, true)?;
    }
    Ok(())
}

/// Calendar of a time variable, from its attributes or encoding
pub fn variable_calendar(variable: &Variable) -> Result<Calendar> {
    variable
        .attrs
        .get("calendar")
        .or_else(|| variable.encoding.get("calendar"))
        .and_then(AttrValue::as_str)
        .unwrap_or(DEFAULT_CALENDAR)
        .parse()
}

/// Units string of a time variable, from its attributes or encoding
fn variable_time_units(variable: &Variable) -> Option<&str> {
    variable
        .attrs
        .get("units")
        .or_else(|| variable.encoding.get("units"))
        .and_then(AttrValue::as_str)
        .filter(|units| TimeUnits::is_time_units(units))
}

/// Copy of `ds` with `time_name` set to the midpoints of its bounds.
///
/// Without a `bounds` attribute the copy is returned unmodified. Decoded
/// bounds are averaged as `days since 0001-01-01` offsets in the dataset
/// calendar and decoded back. The time variable keeps its attributes,
/// encoding and chunk hints; the other variables share storage with `ds`
/// unless `deep` is set.
pub fn time_set_mid(ds: &Dataset, time_name: &str, deep: bool) -> Result<Dataset> {
    let mut out = ds.copy(deep);

    let time = ds.get(time_name)?;
    let Some(tb_name) = time.attr_str("bounds") else {
        debug!("{} has no bounds attribute, leaving values unchanged", time_name);
        return Ok(out);
    };
    let tb = ds.get(tb_name)?;
    let bounds_axis = tb
        .dims
        .iter()
        .position(|d| d != time_name)
        .ok_or_else(|| CaseError::dimension_mismatch(tb_name, "bounds have no vertex dimension"))?;

    let mid = match &tb.data {
        VariableData::Numeric(values) => VariableData::Numeric(
            values
                .mean_axis(Axis(bounds_axis))
                .ok_or_else(|| CaseError::dimension_mismatch(tb_name, "empty bounds"))?
                .into_shared(),
        ),
        VariableData::Time(dates) => {
            let calendar = variable_calendar(time)?;
            let units = TimeUnits::parse(MIDPOINT_TIME_UNITS)?;
            let mut mids = Vec::with_capacity(time.data.len());
            for lane in dates.lanes(Axis(bounds_axis)) {
                let sum = lane
                    .iter()
                    .map(|date| date2num(date, &units, calendar))
                    .sum::<Result<f64>>()?;
                mids.push(num2date(sum / lane.len() as f64, &units, calendar)?);
            }
            let mut shape = dates.shape().to_vec();
            shape.remove(bounds_axis);
            let array = Array::from_shape_vec(IxDyn(&shape), mids)
                .map_err(|e| CaseError::dimension_mismatch(tb_name, e.to_string()))?;
            VariableData::Time(array.into_shared())
        }
    };

    let replaced = time.copy_with_data(mid)?;
    *out.get_mut(time_name)? = replaced;
    Ok(out)
}

/// Copy of `ds2` with coordinate `coordname` (and its bounds) taken from `ds1`.
///
/// The old bounds variable of `ds2`, if any, is dropped. Everything else is a
/// shallow copy of `ds2`.
pub fn repl_coord(coordname: &str, ds1: &Dataset, ds2: &Dataset) -> Result<Dataset> {
    let mut out = ds2.copy(false);
    if let Some(old_bounds) = ds2.bounds_name(coordname) {
        out.remove(&old_bounds);
    }
    out.remove(coordname);

    out.insert_coord(coordname, ds1.get(coordname)?.clone())?;
    if let Some(new_bounds) = ds1.bounds_name(coordname) {
        out.insert(&new_bounds, ds1.get(&new_bounds)?.clone())?;
    }
    Ok(out)
}

/// Time values as year plus fraction of year (`days since 0000-01-01` in the
/// `noleap` calendar divided by 365)
pub fn time_year_plus_frac(ds: &Dataset, time_name: &str) -> Result<Array1<f64>> {
    let time = ds.get(time_name)?;
    let dates: Vec<CalendarDate> = match &time.data {
        VariableData::Time(dates) => dates.iter().copied().collect(),
        VariableData::Numeric(values) => {
            let units = time
                .attr_str("units")
                .ok_or_else(|| CaseError::calendar(format!("{} has no units", time_name)))?;
            let units = TimeUnits::parse(units)?;
            let calendar: Calendar = time
                .attr_str("calendar")
                .ok_or_else(|| CaseError::calendar(format!("{} has no calendar", time_name)))?
                .parse()?;
            values
                .iter()
                .map(|&v| num2date(v, &units, calendar))
                .collect::<Result<_>>()?
        }
    };

    let year0 = TimeUnits::parse("days since 0000-01-01")?;
    dates
        .iter()
        .map(|date| date2num(date, &year0, Calendar::NoLeap).map(|days| days / 365.0))
        .collect()
}

/// Decode numeric variables whose `units` are CF time offsets.
///
/// `units` and `calendar` move from the attributes to the encoding so they
/// can be restored on write. Bounds variables are decoded with the units of
/// the coordinate that names them.
pub fn decode_times(ds: &Dataset) -> Result<Dataset> {
    let mut out = ds.copy(false);

    let mut bounds_parent = std::collections::BTreeMap::new();
    for (name, variable) in ds.variables() {
        if let Some(bounds) = variable.attr_str("bounds") {
            bounds_parent.insert(bounds.to_string(), name.to_string());
        }
    }

    for (name, variable) in ds.variables() {
        let VariableData::Numeric(values) = &variable.data else {
            continue;
        };
        let source = match bounds_parent.get(name) {
            Some(parent) if variable_time_units(variable).is_none() => ds.get(parent)?,
            _ => variable,
        };
        let Some(units_str) = variable_time_units(source) else {
            continue;
        };
        let units = TimeUnits::parse(units_str)?;
        let calendar = variable_calendar(source)?;
        let dates = values
            .iter()
            .map(|&v| num2date(v, &units, calendar))
            .collect::<Result<Vec<_>>>()?;
        let array = Array::from_shape_vec(IxDyn(values.shape()), dates)
            .map_err(|e| CaseError::dimension_mismatch(name, e.to_string()))?;

        let mut decoded = variable.copy_with_data(VariableData::Time(array.into_shared()))?;
        for key in ["units", "calendar"] {
            if let Some(value) = decoded.attrs.remove(key) {
                decoded.encoding.insert(key.to_string(), value);
            }
        }
        if !decoded.encoding.contains_key("calendar") {
            decoded
                .encoding
                .insert("calendar".to_string(), AttrValue::from(calendar.name()));
        }
        if !decoded.encoding.contains_key("units") {
            decoded
                .encoding
                .insert("units".to_string(), AttrValue::from(units_str));
        }
        *out.get_mut(name)? = decoded;
    }
    Ok(out)
}
