//! Unit definitions
//!
//! Every unit is a scale factor and an offset relative to SI base units,
//! plus its exponents over the seven base dimensions. Mass is based on the
//! kilogram, so `g` carries a factor of `1e-3`.

use std::fmt;

/// Number of SI base dimensions
pub const BASE_DIMS: usize = 7;

const DIM_NAMES: [&str; BASE_DIMS] = ["m", "kg", "s", "K", "mol", "A", "cd"];

/// Exponents over `m kg s K mol A cd`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Dims(pub [i32; BASE_DIMS]);

impl Dims {
    pub const NONE: Dims = Dims([0; BASE_DIMS]);

    const fn base(index: usize) -> Dims {
        let mut exps = [0; BASE_DIMS];
        exps[index] = 1;
        Dims(exps)
    }

    /// `m^l kg^m s^t K^k mol^n`
    const fn of(l: i32, m: i32, t: i32, k: i32, n: i32) -> Dims {
        Dims([l, m, t, k, n, 0, 0])
    }

    pub fn mul(self, other: Dims) -> Dims {
        let mut exps = self.0;
        for (e, o) in exps.iter_mut().zip(other.0) {
            *e += o;
        }
        Dims(exps)
    }

    pub fn powi(self, n: i32) -> Dims {
        Dims(self.0.map(|e| e * n))
    }

    pub fn is_dimensionless(&self) -> bool {
        self.0.iter().all(|&e| e == 0)
    }
}

impl fmt::Display for Dims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return f.write_str("dimensionless");
        }
        let parts: Vec<String> = DIM_NAMES
            .iter()
            .zip(self.0)
            .filter(|(_, e)| *e != 0)
            .map(|(name, e)| if e == 1 { name.to_string() } else { format!("{}^{}", name, e) })
            .collect();
        f.write_str(&parts.join(" "))
    }
}

/// A named unit in SI terms: `si = value * factor + offset`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitDef {
    pub factor: f64,
    pub dims: Dims,
    pub offset: f64,
}

impl UnitDef {
    const fn new(factor: f64, dims: Dims) -> Self {
        Self {
            factor,
            dims,
            offset: 0.0,
        }
    }

    const fn offset(factor: f64, dims: Dims, offset: f64) -> Self {
        Self {
            factor,
            dims,
            offset,
        }
    }

    pub fn has_offset(&self) -> bool {
        self.offset != 0.0
    }
}

const LENGTH: Dims = Dims::base(0);
const MASS: Dims = Dims::base(1);
const TIME: Dims = Dims::base(2);
const TEMPERATURE: Dims = Dims::base(3);
const AMOUNT: Dims = Dims::base(4);
const CURRENT: Dims = Dims::base(5);
const LUMINOSITY: Dims = Dims::base(6);

const FORCE: Dims = Dims::of(1, 1, -2, 0, 0);
const PRESSURE: Dims = Dims::of(-1, 1, -2, 0, 0);
const ENERGY: Dims = Dims::of(2, 1, -2, 0, 0);
const POWER: Dims = Dims::of(2, 1, -3, 0, 0);
const VOLUME: Dims = Dims::of(3, 0, 0, 0, 0);
const FLOW: Dims = Dims::of(3, 0, -1, 0, 0);
const CONCENTRATION: Dims = Dims::of(-3, 0, 0, 0, 1);
const FREQUENCY: Dims = Dims::of(0, 0, -1, 0, 0);

const DAY: f64 = 86_400.0;

/// Units accepted by the parser; the first name is canonical
const UNITS: &[(&[&str], UnitDef)] = &[
    // dimensionless
    (&["percent", "%"], UnitDef::new(1e-2, Dims::NONE)),
    (&["ppm"], UnitDef::new(1e-6, Dims::NONE)),
    (&["ppb"], UnitDef::new(1e-9, Dims::NONE)),
    (&["radian", "rad"], UnitDef::new(1.0, Dims::NONE)),
    (
        &["degree", "deg"],
        UnitDef::new(std::f64::consts::PI / 180.0, Dims::NONE),
    ),
    // base
    (&["meter", "m", "metre"], UnitDef::new(1.0, LENGTH)),
    (&["gram", "g"], UnitDef::new(1e-3, MASS)),
    (&["second", "s", "sec"], UnitDef::new(1.0, TIME)),
    (&["kelvin", "K", "degK"], UnitDef::new(1.0, TEMPERATURE)),
    (&["mole", "mol"], UnitDef::new(1.0, AMOUNT)),
    (&["ampere", "A"], UnitDef::new(1.0, CURRENT)),
    (&["candela", "cd"], UnitDef::new(1.0, LUMINOSITY)),
    // mass, length
    (&["tonne", "t"], UnitDef::new(1e3, MASS)),
    (&["angstrom"], UnitDef::new(1e-10, LENGTH)),
    // time
    (&["minute", "min"], UnitDef::new(60.0, TIME)),
    (&["hour", "h", "hr"], UnitDef::new(3_600.0, TIME)),
    (&["day", "d"], UnitDef::new(DAY, TIME)),
    (&["week"], UnitDef::new(7.0 * DAY, TIME)),
    (&["common_year"], UnitDef::new(365.0 * DAY, TIME)),
    (&["year", "a"], UnitDef::new(365.25 * DAY, TIME)),
    // temperature with offsets
    (
        &["degC", "celsius", "degree_Celsius", "deg_C"],
        UnitDef::offset(1.0, TEMPERATURE, 273.15),
    ),
    (
        &["degF", "fahrenheit", "degree_Fahrenheit", "deg_F"],
        UnitDef::offset(5.0 / 9.0, TEMPERATURE, 273.15 - 32.0 * 5.0 / 9.0),
    ),
    // derived
    (&["newton", "N"], UnitDef::new(1.0, FORCE)),
    (&["dyne", "dyn"], UnitDef::new(1e-5, FORCE)),
    (&["pascal", "Pa"], UnitDef::new(1.0, PRESSURE)),
    (&["bar"], UnitDef::new(1e5, PRESSURE)),
    (&["atmosphere", "atm"], UnitDef::new(101_325.0, PRESSURE)),
    (&["joule", "J"], UnitDef::new(1.0, ENERGY)),
    (&["erg"], UnitDef::new(1e-7, ENERGY)),
    (&["watt", "W"], UnitDef::new(1.0, POWER)),
    (&["liter", "L", "l", "litre"], UnitDef::new(1e-3, VOLUME)),
    (&["sverdrup", "Sv"], UnitDef::new(1e6, FLOW)),
    (&["molar", "M"], UnitDef::new(1e3, CONCENTRATION)),
    (&["hertz", "Hz"], UnitDef::new(1.0, FREQUENCY)),
];

/// SI prefixes, long names first so `milli` wins over `m`
const PREFIXES: &[(&str, f64)] = &[
    ("yotta", 1e24),
    ("zetta", 1e21),
    ("exa", 1e18),
    ("peta", 1e15),
    ("tera", 1e12),
    ("giga", 1e9),
    ("mega", 1e6),
    ("kilo", 1e3),
    ("hecto", 1e2),
    ("deka", 1e1),
    ("deci", 1e-1),
    ("centi", 1e-2),
    ("milli", 1e-3),
    ("micro", 1e-6),
    ("nano", 1e-9),
    ("pico", 1e-12),
    ("femto", 1e-15),
    ("atto", 1e-18),
    ("zepto", 1e-21),
    ("yocto", 1e-24),
    ("da", 1e1),
    ("Y", 1e24),
    ("Z", 1e21),
    ("E", 1e18),
    ("P", 1e15),
    ("T", 1e12),
    ("G", 1e9),
    ("M", 1e6),
    ("k", 1e3),
    ("h", 1e2),
    ("d", 1e-1),
    ("c", 1e-2),
    ("m", 1e-3),
    ("u", 1e-6),
    ("µ", 1e-6),
    ("n", 1e-9),
    ("p", 1e-12),
    ("f", 1e-15),
    ("a", 1e-18),
    ("z", 1e-21),
    ("y", 1e-24),
];

fn exact(name: &str) -> Option<UnitDef> {
    UNITS
        .iter()
        .find(|(names, _)| names.contains(&name))
        .map(|(_, def)| *def)
}

fn prefixed(name: &str) -> Option<UnitDef> {
    PREFIXES.iter().find_map(|(prefix, scale)| {
        let base = exact(name.strip_prefix(prefix)?)?;
        // offset scales do not take prefixes
        (!base.has_offset()).then(|| UnitDef::new(base.factor * scale, base.dims))
    })
}

/// Resolve a unit name: exact match, then prefix + unit, then the same for
/// a plural with its trailing `s` removed
pub fn lookup(name: &str) -> Option<UnitDef> {
    exact(name).or_else(|| prefixed(name)).or_else(|| {
        let singular = name.strip_suffix('s').filter(|s| !s.is_empty())?;
        exact(singular).or_else(|| prefixed(singular))
    })
}
