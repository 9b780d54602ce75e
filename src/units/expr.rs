use super::{Dimension, Unit, normalize};

/// Compact catalog spellings that pack two components into one token.
const PACKED: &[(&str, &str, &str)] = &[
    ("tkm", "tonne", "km"),
    ("tonkm", "tonne", "km"),
    ("pkm", "passenger", "km"),
    ("vkm", "vehicle", "km"),
];

const EMISSION_SUFFIXES: &[&str] = &["co2e", "co2-eq", "co2eq", "co2", "ghg", "ch4", "n2o"];

/// One denominator component of a factor unit, e.g. `tonne` in `kg/tonne-km`.
#[derive(Debug, Clone)]
pub struct Component {
    pub raw: String,
    pub unit: Option<Unit>,
}

impl Component {
    fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            unit: normalize(raw),
        }
    }

    pub fn dimension(&self) -> Option<Dimension> {
        self.unit.map(|u| u.dimension)
    }
}

/// What the denominator of a factor unit asks the caller to supply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnitShape {
    /// `kg/tonne-km`: a mass moved over a distance.
    WeightDistance { weight: Unit, distance: Unit },
    /// `kg/vehicle-km`, `kg/device-hour`: a count times a usage metric.
    CountUsage { usage: Unit },
    /// `kg/number`: a bare count.
    Count,
    /// `kg/kWh`, `kg/km`, `kg/kg`.
    Single(Unit),
    Unknown,
}

/// A parsed emission-factor unit expression such as `kg CO2e / tonne-km`.
#[derive(Debug, Clone)]
pub struct FactorUnit {
    pub raw: String,
    pub numerator: String,
    pub numerator_unit: Option<Unit>,
    pub denominator: Vec<Component>,
}

impl FactorUnit {
    pub fn parse(expr: &str) -> Self {
        let (num, den) = expr
            .split_once('/')
            .or_else(|| split_ascii_ci(expr, " per "))
            .unwrap_or((expr, ""));

        let numerator = strip_emission_suffix(num);
        let numerator_unit = normalize(&numerator);

        let den = den.trim().trim_matches(|c| c == '(' || c == ')');
        let mut denominator = Vec::new();
        if let Some(component) = find_packed(den) {
            denominator.extend(component);
        } else if let Some(unit) = normalize(den) {
            // Multi-word units ("cubic meter", "kilowatt-hour") must not be split.
            denominator.push(Component {
                raw: den.to_string(),
                unit: Some(unit),
            });
        } else {
            denominator.extend(
                den.split(['-', '·', '*', '×', ' ', '.'])
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(Component::new),
            );
        }

        Self {
            raw: expr.trim().to_string(),
            numerator,
            numerator_unit,
            denominator,
        }
    }

    pub fn shape(&self) -> UnitShape {
        let find = |dim: Dimension| {
            self.denominator
                .iter()
                .find(|c| c.dimension() == Some(dim))
                .and_then(|c| c.unit)
        };

        if let (Some(weight), Some(distance)) = (find(Dimension::Weight), find(Dimension::Distance))
        {
            return UnitShape::WeightDistance { weight, distance };
        }

        match self.denominator.as_slice() {
            [] => UnitShape::Unknown,
            [only] => match only.unit {
                Some(u) if u.dimension == Dimension::Count => UnitShape::Count,
                Some(u) => UnitShape::Single(u),
                None => UnitShape::Unknown,
            },
            many => {
                let usages: Vec<Unit> = many
                    .iter()
                    .filter_map(|c| c.unit)
                    .filter(|u| u.dimension.is_usage())
                    .collect();
                let others_are_counts = many.iter().all(|c| match c.dimension() {
                    Some(d) => d.is_usage() || d == Dimension::Count,
                    None => true,
                });
                match usages.as_slice() {
                    [usage] if others_are_counts => UnitShape::CountUsage { usage: *usage },
                    _ => UnitShape::Unknown,
                }
            }
        }
    }

    /// Whether the denominator is money or a purchase event rather than an activity.
    pub fn is_spend_based(&self) -> bool {
        let lower = self.raw.to_lowercase();
        lower.contains("purchase")
            || lower.contains("acquisition")
            || lower.contains("capex")
            || self
                .denominator
                .iter()
                .any(|c| c.dimension() == Some(Dimension::Currency))
    }
}

fn strip_emission_suffix(raw: &str) -> String {
    let mut s: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .collect();
    for suffix in EMISSION_SUFFIXES {
        let Some(cut) = s.len().checked_sub(suffix.len()) else {
            continue;
        };
        if cut > 0 && s.get(cut..).is_some_and(|tail| tail.eq_ignore_ascii_case(suffix)) {
            s.truncate(cut);
            break;
        }
    }
    s
}

/// Split at the first ASCII case-insensitive occurrence of `sep`.
fn split_ascii_ci<'a>(text: &'a str, sep: &str) -> Option<(&'a str, &'a str)> {
    text.char_indices()
        .map(|(i, _)| i)
        .find(|&i| {
            text.get(i..i + sep.len())
                .is_some_and(|w| w.eq_ignore_ascii_case(sep))
        })
        .map(|i| (&text[..i], &text[i + sep.len()..]))
}

fn find_packed(den: &str) -> Option<Vec<Component>> {
    let key = den.to_lowercase();
    PACKED
        .iter()
        .find(|(packed, _, _)| *packed == key)
        .map(|(_, a, b)| vec![Component::new(a), Component::new(b)])
}
