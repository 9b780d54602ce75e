//! Unit normalization and dimension-aware conversion.

mod expr;
mod table;

pub use expr::{Component, FactorUnit, UnitShape};

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use table::UNITS;

/// Physical (or pseudo-physical) quantity kind used to gate conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Weight,
    Volume,
    Distance,
    Energy,
    Time,
    Power,
    Pressure,
    Area,
    Temperature,
    Currency,
    Count,
    Percentage,
    Year,
}

impl Dimension {
    pub fn label(self) -> &'static str {
        match self {
            Dimension::Weight => "weight",
            Dimension::Volume => "volume",
            Dimension::Distance => "distance",
            Dimension::Energy => "energy",
            Dimension::Time => "time",
            Dimension::Power => "power",
            Dimension::Pressure => "pressure",
            Dimension::Area => "area",
            Dimension::Temperature => "temperature",
            Dimension::Currency => "currency",
            Dimension::Count => "count",
            Dimension::Percentage => "percentage",
            Dimension::Year => "year",
        }
    }

    /// The unit every value of this dimension is routed through during conversion.
    pub fn base_unit(self) -> Option<Unit> {
        let symbol = match self {
            Dimension::Weight => "kg",
            Dimension::Volume => "L",
            Dimension::Distance => "m",
            Dimension::Energy => "J",
            Dimension::Time => "s",
            Dimension::Power => "W",
            Dimension::Pressure => "Pa",
            Dimension::Area => "m²",
            Dimension::Temperature => "K",
            Dimension::Currency => "USD",
            Dimension::Count => "unit",
            Dimension::Percentage => "%",
            Dimension::Year => return None,
        };
        UNITS.iter().find(|u| u.symbol == symbol)
    }

    /// Dimensions that can act as the "usage" half of a count×usage factor.
    pub fn is_usage(self) -> bool {
        matches!(self, Dimension::Distance | Dimension::Time | Dimension::Energy)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A catalogued unit: `base = value * scale + offset`.
///
/// `offset` is zero for everything except temperature scales.
#[derive(Debug, PartialEq)]
pub struct UnitDef {
    pub symbol: &'static str,
    pub dimension: Dimension,
    scale: f64,
    offset: f64,
    aliases: &'static [&'static str],
}

pub type Unit = &'static UnitDef;

impl UnitDef {
    pub(crate) const fn linear(
        symbol: &'static str,
        dimension: Dimension,
        scale: f64,
        aliases: &'static [&'static str],
    ) -> Self {
        Self {
            symbol,
            dimension,
            scale,
            offset: 0.0,
            aliases,
        }
    }

    pub(crate) const fn affine(
        symbol: &'static str,
        dimension: Dimension,
        scale: f64,
        offset: f64,
        aliases: &'static [&'static str],
    ) -> Self {
        Self {
            symbol,
            dimension,
            scale,
            offset,
            aliases,
        }
    }

    fn to_base(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }

    fn from_base(&self, base: f64) -> f64 {
        (base - self.offset) / self.scale
    }

    pub fn is_affine(&self) -> bool {
        self.offset != 0.0
    }
}

/// Result of [`convert`]. `converted == false` means `value` is the untouched input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    pub value: f64,
    pub converted: bool,
}

impl Conversion {
    fn unconverted(value: f64) -> Self {
        Self {
            value,
            converted: false,
        }
    }
}

static ALIAS_INDEX: LazyLock<HashMap<String, usize>> = LazyLock::new(|| {
    let mut index = HashMap::new();
    for (i, unit) in UNITS.iter().enumerate() {
        index.entry(canonical_key(unit.symbol)).or_insert(i);
        for alias in unit.aliases {
            index.entry(canonical_key(alias)).or_insert(i);
        }
    }
    index
});

fn canonical_key(raw: &str) -> String {
    let mut key = raw
        .trim()
        .trim_end_matches('.')
        .to_lowercase()
        .replace('³', "3")
        .replace('²', "2")
        .replace('^', "")
        .replace('㎞', "km")
        .replace('ℓ', "l")
        .replace('㎏', "kg");
    if key.contains(char::is_whitespace) {
        key = key.split_whitespace().collect::<Vec<_>>().join(" ");
    }
    key
}

/// Resolve a unit spelling (symbol, alias, plural, locale alias) to its catalogued unit.
pub fn normalize(raw: &str) -> Option<Unit> {
    let key = canonical_key(raw);
    if key.is_empty() {
        return None;
    }
    if let Some(&i) = ALIAS_INDEX.get(&key) {
        return Some(&UNITS[i]);
    }
    // Plurals not listed explicitly ("kms", "hrs", "inches").
    let singular = key
        .strip_suffix("es")
        .filter(|s| s.len() > 2)
        .and_then(|s| ALIAS_INDEX.get(s))
        .or_else(|| {
            key.strip_suffix('s')
                .filter(|s| s.len() > 1)
                .and_then(|s| ALIAS_INDEX.get(s))
        });
    singular.map(|&i| &UNITS[i])
}

pub fn dimension_of(raw: &str) -> Option<Dimension> {
    normalize(raw).map(|u| u.dimension)
}

/// Convert between two unit spellings.
///
/// Unknown units or mismatched dimensions return the input unchanged with
/// `converted == false`.
pub fn convert(value: f64, from: &str, to: &str) -> Conversion {
    match (normalize(from), normalize(to)) {
        (Some(from), Some(to)) => convert_units(value, from, to),
        _ => Conversion::unconverted(value),
    }
}

pub fn convert_units(value: f64, from: Unit, to: Unit) -> Conversion {
    if from.dimension != to.dimension {
        return Conversion::unconverted(value);
    }
    if std::ptr::eq(from, to) {
        return Conversion {
            value,
            converted: true,
        };
    }
    Conversion {
        value: to.from_base(from.to_base(value)),
        converted: true,
    }
}

/// Whether two unit expressions name the same unit without any numeric conversion.
///
/// Compound expressions ("kg/tonne-km" vs "kg/t-km") are compared component-wise.
pub fn are_units_equivalent(a: &str, b: &str) -> bool {
    if canonical_key(a) == canonical_key(b) {
        return true;
    }
    match (normalize(a), normalize(b)) {
        (Some(x), Some(y)) => return std::ptr::eq(x, y),
        (None, None) => {}
        _ => return false,
    }
    let (fa, fb) = (FactorUnit::parse(a), FactorUnit::parse(b));
    if fa.denominator.is_empty() || fa.denominator.len() != fb.denominator.len() {
        return false;
    }
    let same_component = |x: Option<Unit>, y: Option<Unit>, rx: &str, ry: &str| match (x, y) {
        (Some(x), Some(y)) => std::ptr::eq(x, y),
        _ => canonical_key(rx) == canonical_key(ry),
    };
    same_component(fa.numerator_unit, fb.numerator_unit, &fa.numerator, &fb.numerator)
        && fa
            .denominator
            .iter()
            .zip(&fb.denominator)
            .all(|(x, y)| same_component(x.unit, y.unit, &x.raw, &y.raw))
}
