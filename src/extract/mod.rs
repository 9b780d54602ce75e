//! Numeric mention and range descriptor extraction.
//!
//! Catalog descriptors (range fragments, load-state percentages, fleet
//! qualifiers, emission-standard tags, container sizes) are blanked out of
//! the text before quantities are scanned. Without that step "Rigid truck
//! 26-32t" would yield a 26-tonne quantity.

mod ranges;

pub use ranges::RangeMention;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::units::{self, Dimension};

/// `50% Laden`, `100 % load`.
static LOAD_STATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?P<value>\d+(?:\.\d+)?)\s*%\s*(?:laden|loaded|load|full|utili[sz]ed|utili[sz]ation|capacity)\b",
    )
    .unwrap()
});

/// `All HGVs`, `all rigids`, `Euro 6`, `Class III`.
static QUALIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\ball\s+(?:hgvs?|rigids?|artics?|articulated|cars?|vans?|vehicles?|lorries|trucks?|buses|ships?|vessels?)\b|\beuro\s*[1-7]\b|\beuro\s*(?:i{1,3}|iv|v|vi)\b|\bclass\s+(?:[ivx]+|\d)\b",
    )
    .unwrap()
});

/// `40ft container`, `20-foot box`, `45' high cube container`.
static CONTAINER_SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b\d+(?:\.\d+)?\s*-?\s*(?:ft|foot|feet|')(?:\s*-?\s*(?:high[\s-]?cube|hc|dry|reefer))?\s*-?\s*(?:containers?|boxes|box|trailers?)\b",
    )
    .unwrap()
});

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<cur>[$€£₩¥])?\s*\b(?P<num>\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)(?:\s*-?\s*(?P<unit>%|°[CcFf]|[^\W\d_]+[³²]?)(?:[\s-](?P<unit2>[^\W\d_]+))?)?",
    )
    .unwrap()
});

/// A quantity stated in free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericMention {
    pub value: f64,
    /// Canonical symbol when recognised, otherwise the raw trailing word.
    pub unit: String,
    pub dimension: Dimension,
}

/// Replace every catalog descriptor with spaces, keeping byte offsets stable.
pub fn strip_descriptors(text: &str) -> String {
    let mut spans: Vec<std::ops::Range<usize>> = ranges::find_ranges(text)
        .into_iter()
        .map(|r| r.span)
        .collect();
    spans.extend(LOAD_STATE_RE.find_iter(text).map(|m| m.range()));
    spans.extend(QUALIFIER_RE.find_iter(text).map(|m| m.range()));
    spans.extend(CONTAINER_SIZE_RE.find_iter(text).map(|m| m.range()));

    let mut out = text.to_string();
    for span in spans {
        out.replace_range(span.clone(), &" ".repeat(span.len()));
    }
    out
}

/// Range descriptors in `text`.
pub fn extract_ranges(text: &str) -> Vec<RangeMention> {
    ranges::find_ranges(text)
        .into_iter()
        .map(|r| r.range)
        .collect()
}

/// User-stated quantities in `text`, with catalog descriptors excluded.
pub fn extract_mentions(text: &str) -> Vec<NumericMention> {
    let cleaned = strip_descriptors(text);
    NUMBER_RE
        .captures_iter(&cleaned)
        .filter_map(|caps| {
            let value = caps["num"].replace(',', "").parse::<f64>().ok()?;
            if !value.is_finite() {
                return None;
            }
            if let Some(cur) = caps.name("cur") {
                let unit = units::normalize(cur.as_str())?;
                return Some(NumericMention {
                    value,
                    unit: unit.symbol.to_string(),
                    dimension: unit.dimension,
                });
            }
            Some(classify(
                value,
                caps.name("unit").map(|m| m.as_str()),
                caps.name("unit2").map(|m| m.as_str()),
            ))
        })
        .collect()
}

fn classify(value: f64, word: Option<&str>, next: Option<&str>) -> NumericMention {
    let known = word.and_then(|w| {
        next.and_then(|n| units::normalize(&format!("{w} {n}")))
            .or_else(|| units::normalize(w))
            .or_else(|| strip_particle(w))
    });

    match (known, word) {
        (Some(unit), _) => NumericMention {
            value,
            unit: unit.symbol.to_string(),
            dimension: unit.dimension,
        },
        (None, None) if value.fract() == 0.0 && (1900.0..=2100.0).contains(&value) => {
            NumericMention {
                value,
                unit: String::new(),
                dimension: Dimension::Year,
            }
        }
        (None, word) => NumericMention {
            value,
            unit: word.unwrap_or_default().to_lowercase(),
            dimension: Dimension::Count,
        },
    }
}

/// Korean units often carry a trailing particle ("킬로미터를", "톤을").
fn strip_particle(word: &str) -> Option<units::Unit> {
    if !crate::lang::contains_hangul(word) {
        return None;
    }
    let chars: Vec<char> = word.chars().collect();
    (1..chars.len())
        .rev()
        .find_map(|n| units::normalize(&chars[..n].iter().collect::<String>()))
}

/// Whether `mention` is a boundary of a range descriptor (or a load-state
/// percentage) in `text` rather than a quantity the user stated.
pub fn is_specification_fragment(text: &str, mention: &NumericMention) -> bool {
    let in_range = extract_ranges(text).iter().any(|range| {
        let comparable = mention.unit.is_empty()
            || range.dimension == mention.dimension
            || units::are_units_equivalent(&range.unit, &mention.unit);
        comparable && range.is_boundary(mention.value)
    });
    if in_range {
        return true;
    }
    mention.dimension == Dimension::Percentage
        && LOAD_STATE_RE.captures_iter(text).any(|caps| {
            caps["value"]
                .parse::<f64>()
                .is_ok_and(|v| (v - mention.value).abs() < 1e-9)
        })
}
