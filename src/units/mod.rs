//! Unit strings and unit conversion
//!
//! CESM writes units such as `gC/m^2/s`, `meq/m^3` or `years` that a
//! standard unit grammar does not accept. [`clean_units`] rewrites those
//! tokens; [`parser`] and [`registry`] turn the result into SI factors.

pub mod parser;
pub mod registry;

pub use self::parser::{Quantity, parse};

use crate::dataset::{Variable, VariableData};
use crate::error::{CaseError, Result};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Delimiters of a unit string; kept in the output
static UNIT_DELIMITERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"( |\(|\)|\^|\*|/|-[0-9]+|[0-9]+)").expect("unit delimiter pattern is valid")
});

/// Whole-token replacements applied by [`clean_units`]
const REPLACEMENTS: &[(&str, &str)] = &[
    ("unitless", "1"),
    ("years", "common_years"),
    ("yr", "common_year"),
    ("meq", "mmol"),
    ("neq", "nmol"),
    ("gC", "g"),
    ("gN", "g"),
];

fn replace_token(token: &str) -> &str {
    REPLACEMENTS
        .iter()
        .find(|(from, _)| *from == token)
        .map_or(token, |(_, to)| *to)
}

/// Replace troublesome unit tokens with ones the parser accepts.
///
/// Only whole tokens between delimiters are replaced, so `degC` survives
/// while the `gC` in `gC/m^2` does not.
pub fn clean_units(units: &str) -> String {
    let mut cleaned = String::with_capacity(units.len());
    let mut last = 0;
    for delimiter in UNIT_DELIMITERS.find_iter(units) {
        cleaned.push_str(replace_token(&units[last..delimiter.start()]));
        cleaned.push_str(delimiter.as_str());
        last = delimiter.end();
    }
    cleaned.push_str(replace_token(&units[last..]));
    cleaned
}

/// Linear map from values in one unit to values in another
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Converter {
    pub scale: f64,
    pub shift: f64,
}

impl Converter {
    /// Conversion from `units_in` (times `units_scalef`, if given) to
    /// `units_out`; all three strings are cleaned first
    pub fn new(units_in: &str, units_out: &str, units_scalef: Option<&str>) -> Result<Self> {
        let mut from = parse(&clean_units(units_in))?;
        if let Some(scalef) = units_scalef {
            from = from.mul(parse(&clean_units(scalef))?);
        }
        let to = parse(&clean_units(units_out))?;

        if from.dims != to.dims {
            let from_name = match units_scalef {
                Some(scalef) => format!("{} * {}", units_in, scalef),
                None => units_in.to_string(),
            };
            debug!("Dimensions {} and {} differ", from.dims, to.dims);
            return Err(CaseError::IncompatibleUnits {
                from: from_name,
                to: units_out.to_string(),
            });
        }

        Ok(Self {
            scale: from.factor / to.factor,
            shift: (from.offset - to.offset) / to.factor,
        })
    }

    pub fn apply(&self, value: f64) -> f64 {
        value * self.scale + self.shift
    }
}

/// Convert `values` from `units_in` to `units_out`
pub fn conv_units_values(
    values: &[f64],
    units_in: &str,
    units_out: &str,
    units_scalef: Option<&str>,
) -> Result<Vec<f64>> {
    let converter = Converter::new(units_in, units_out, units_scalef)?;
    Ok(values.iter().map(|&v| converter.apply(v)).collect())
}

/// Copy of `variable` with values converted to `units_out`.
///
/// Attributes, encoding and chunking are kept; only the `units` attribute
/// changes.
pub fn conv_units(variable: &Variable, units_out: &str, units_scalef: Option<&str>) -> Result<Variable> {
    let units_in = variable
        .attr_str("units")
        .ok_or_else(|| CaseError::units("variable has no units attribute"))?;
    let values = match &variable.data {
        VariableData::Numeric(values) => values,
        VariableData::Time(_) => {
            return Err(CaseError::units("cannot convert the units of decoded times"));
        }
    };

    let converter = Converter::new(units_in, units_out, units_scalef)?;
    let converted = values.mapv(|v| converter.apply(v));
    let mut out = variable.copy_with_data(VariableData::Numeric(converted.into_shared()))?;
    out.attrs.insert("units".to_string(), units_out.into());
    Ok(out)
}
