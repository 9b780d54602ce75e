use std::ops::Range;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::units::{self, Dimension};

/// `3.5t - 7.5t`, `10 km to 50 km`.
static RANGE_BOTH_UNITS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?P<min>\d+(?:\.\d+)?)\s*(?P<u1>[^\W\d_]+)\s*(?:-|–|—|~|\bto\b)\s*(?P<max>\d+(?:\.\d+)?)\s*(?P<unit>[^\W\d_]+[³²]?)",
    )
    .unwrap()
});

/// `26-32t`, `3.5 to 7.5 tonnes`, `2019–2021`.
static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?P<min>\d+(?:\.\d+)?)\s*(?:-|–|—|~|\bto\b)\s*(?P<max>\d+(?:\.\d+)?)(?:\s*(?P<unit>[^\W\d_]+[³²]?))?",
    )
    .unwrap()
});

/// `up to 3.5t`, `< 7.5 tonnes`.
static UP_TO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\bup\s+to|\bunder|\bbelow|\bless\s+than|<|≤)\s*(?P<max>\d+(?:\.\d+)?)\s*(?P<unit>[^\W\d_]+[³²]?)",
    )
    .unwrap()
});

/// An inclusive interval stated in a catalog title, e.g. the `26-32t` in
/// "Rigid truck 26-32t".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeMention {
    pub min: f64,
    pub max: f64,
    pub unit: String,
    pub dimension: Dimension,
}

impl RangeMention {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// The tolerance window `[min * 0.5, max * 1.5]` outside of which a value is a miss.
    pub fn within_tolerance(&self, value: f64) -> bool {
        value >= self.min * 0.5 && value <= self.max * 1.5
    }

    pub fn is_boundary(&self, value: f64) -> bool {
        (value - self.min).abs() < 1e-9 || (value - self.max).abs() < 1e-9
    }
}

pub(super) struct RangeSpan {
    pub range: RangeMention,
    pub span: Range<usize>,
}

/// All range descriptors in `text` with their byte spans, leftmost first.
pub(super) fn find_ranges(text: &str) -> Vec<RangeSpan> {
    let mut found: Vec<RangeSpan> = Vec::new();
    let overlaps = |found: &[RangeSpan], span: &Range<usize>| {
        found
            .iter()
            .any(|f| f.span.start < span.end && span.start < f.span.end)
    };

    for caps in RANGE_BOTH_UNITS_RE.captures_iter(text) {
        let (Some(first), Some(second)) = (units::normalize(&caps["u1"]), units::normalize(&caps["unit"]))
        else {
            continue;
        };
        if first.dimension != second.dimension {
            continue;
        }
        let Some(min) = parse(&caps["min"]) else { continue };
        let Some(max) = parse(&caps["max"]) else { continue };
        let min = units::convert_units(min, first, second).value;
        push(&mut found, &caps, min, max, Some(second.symbol), second.dimension);
    }

    for caps in RANGE_RE.captures_iter(text) {
        let span = whole(&caps);
        if overlaps(&found, &span) {
            continue;
        }
        let (Some(min), Some(max)) = (parse(&caps["min"]), parse(&caps["max"])) else {
            continue;
        };
        let unit_word = caps.name("unit").map(|m| m.as_str());
        match unit_word.and_then(units::normalize) {
            Some(unit) => push(&mut found, &caps, min, max, Some(unit.symbol), unit.dimension),
            None if is_year(min) && is_year(max) => {
                push(&mut found, &caps, min, max, None, Dimension::Year)
            }
            None => push(&mut found, &caps, min, max, unit_word, Dimension::Count),
        }
    }

    for caps in UP_TO_RE.captures_iter(text) {
        let span = whole(&caps);
        if overlaps(&found, &span) {
            continue;
        }
        let (Some(max), Some(unit)) = (parse(&caps["max"]), units::normalize(&caps["unit"])) else {
            continue;
        };
        push(&mut found, &caps, 0.0, max, Some(unit.symbol), unit.dimension);
    }

    found.sort_by_key(|f| f.span.start);
    found
}

fn push(
    found: &mut Vec<RangeSpan>,
    caps: &Captures<'_>,
    a: f64,
    b: f64,
    unit: Option<&str>,
    dimension: Dimension,
) {
    let (min, max) = if a <= b { (a, b) } else { (b, a) };
    found.push(RangeSpan {
        range: RangeMention {
            min,
            max,
            unit: unit.unwrap_or_default().to_string(),
            dimension,
        },
        span: whole(caps),
    });
}

fn whole(caps: &Captures<'_>) -> Range<usize> {
    caps.get(0).map(|m| m.range()).unwrap_or(0..0)
}

fn parse(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn is_year(v: f64) -> bool {
    v.fract() == 0.0 && (1900.0..=2100.0).contains(&v)
}

#[cfg(test)]
mod tests {
    use super::super::extract_ranges;
    use super::*;

    #[test]
    fn hyphen_range_with_packed_unit() {
        let ranges = extract_ranges("Rigid truck 26-32t - Container transport - Diesel");
        assert_eq!(ranges.len(), 1);
        let r = &ranges[0];
        assert_eq!((r.min, r.max), (26.0, 32.0));
        assert_eq!(r.unit, "tonne");
        assert_eq!(r.dimension, Dimension::Weight);
    }

    #[test]
    fn to_range_with_spaced_unit() {
        let ranges = extract_ranges("Van class III (1.74 to 3.5 tonnes)");
        assert_eq!(ranges.len(), 1);
        assert_eq!((ranges[0].min, ranges[0].max), (1.74, 3.5));
        assert_eq!(ranges[0].dimension, Dimension::Weight);
    }

    #[test]
    fn units_on_both_ends_are_normalized() {
        let ranges = extract_ranges("Flights 500 km - 3700 km");
        assert_eq!(ranges.len(), 1);
        assert_eq!((ranges[0].min, ranges[0].max), (500.0, 3700.0));
        assert_eq!(ranges[0].dimension, Dimension::Distance);

        let ranges = extract_ranges("Load 500kg-2t");
        assert_eq!((ranges[0].min, ranges[0].max), (0.5, 2.0));
        assert_eq!(ranges[0].unit, "tonne");
    }

    #[test]
    fn power_and_year_ranges() {
        let ranges = extract_ranges("Generator 100-500kW built 2015–2020");
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].dimension, Dimension::Power);
        assert_eq!(ranges[1].dimension, Dimension::Year);
        assert_eq!((ranges[1].min, ranges[1].max), (2015.0, 2020.0));
    }

    #[test]
    fn up_to_starts_at_zero() {
        let ranges = extract_ranges("Rigid truck up to 7.5 tonnes");
        assert_eq!(ranges.len(), 1);
        assert_eq!((ranges[0].min, ranges[0].max), (0.0, 7.5));
    }

    #[test]
    fn single_quantities_are_not_ranges() {
        assert!(extract_ranges("30-ton rigid diesel truck").is_empty());
        assert!(extract_ranges("drove 75km").is_empty());
    }

    #[test]
    fn reversed_bounds_are_ordered() {
        let ranges = extract_ranges("between 40-10 km");
        assert_eq!((ranges[0].min, ranges[0].max), (10.0, 40.0));
    }

    #[test]
    fn tolerance_window() {
        let r = RangeMention {
            min: 26.0,
            max: 32.0,
            unit: "tonne".into(),
            dimension: Dimension::Weight,
        };
        assert!(r.within_tolerance(13.0));
        assert!(r.within_tolerance(48.0));
        assert!(!r.within_tolerance(12.9));
        assert!(!r.within_tolerance(48.1));
        assert!(r.is_boundary(26.0));
        assert_eq!(r.midpoint(), 29.0);
    }
}
