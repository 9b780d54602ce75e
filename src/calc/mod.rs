//! Emission calculation for a matched factor.
//!
//! The strategy follows the shape of the factor's denominator: `kg/tonne-km`
//! needs a weight and a distance, `kg/device-hour` a count and a usage,
//! `kg/km` a distance, `kg/number` a count, anything else one quantity of the
//! same dimension. Missing inputs yield a zero emission with notes, never an error.

mod inputs;
mod notes;

pub use notes::Note;

use serde::Serialize;
use tracing::debug;

use crate::lang::Lang;
use crate::model::{EmissionFactorRecord, MatchResult, QueryEntity};
use crate::units::{self, Dimension, FactorUnit, Unit, UnitShape};
use inputs::{Inputs, Term};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    WeightDistance,
    CountUsage,
    DistanceOnly,
    DirectCount,
    Direct,
    Fallback,
}

impl Strategy {
    pub fn label(self) -> &'static str {
        match self {
            Strategy::WeightDistance => "weight × distance",
            Strategy::CountUsage => "count × usage",
            Strategy::DistanceOnly => "distance",
            Strategy::DirectCount => "count",
            Strategy::Direct => "direct",
            Strategy::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    pub entity: QueryEntity,
    pub record: EmissionFactorRecord,
    pub relevance_score: f64,
    pub strategy: Strategy,
    /// Zero means the inputs were insufficient and only the factor is reported.
    pub total_emission: f64,
    pub emission_unit: String,
    pub quantity_used: f64,
    pub unit_used: String,
    pub formula: String,
    pub confidence: f64,
    pub notes: Vec<String>,
    /// The quantity's dimension differs from the factor's denominator.
    pub unit_mismatch: bool,
}

impl CalculationResult {
    pub fn is_factor_only(&self) -> bool {
        self.total_emission == 0.0
    }

    /// Whether this emission may be summed with others into a query total.
    pub fn counts_toward_total(&self) -> bool {
        self.emission_unit == "kg" && !self.unit_mismatch
    }
}

struct Outcome {
    strategy: Strategy,
    /// Empty when a required input is missing.
    terms: Vec<Term>,
    unit_used: String,
    multiplier: f64,
    notes: Vec<Note>,
}

impl Outcome {
    fn missing(strategy: Strategy, needed: Vec<Dimension>) -> Self {
        Self {
            strategy,
            terms: Vec::new(),
            unit_used: String::new(),
            multiplier: 0.5,
            notes: vec![Note::MissingQuantity { needed }, Note::FactorOnly],
        }
    }
}

/// Compute the emission of `entity` using the factor in `matched`.
pub fn calculate(entity: &QueryEntity, matched: &MatchResult, lang: Lang) -> CalculationResult {
    let lang = lang.resolve(&entity.name);
    let record = &matched.record;
    let unit = FactorUnit::parse(&record.unit);
    let inputs = Inputs::gather(entity);

    let outcome = match unit.shape() {
        UnitShape::WeightDistance { weight, distance } => {
            weight_distance(&inputs, weight, distance)
        }
        UnitShape::CountUsage { usage } => count_usage(&inputs, usage),
        UnitShape::Count => direct_count(&inputs),
        UnitShape::Single(u) if u.dimension == Dimension::Distance => distance_only(&inputs, u),
        UnitShape::Single(u) => match inputs.first(u.dimension) {
            Some(input) => {
                let mut notes = Vec::new();
                let term = input.term(Some(u), &mut notes);
                Outcome {
                    strategy: Strategy::Direct,
                    terms: vec![term],
                    unit_used: u.symbol.to_string(),
                    multiplier: 0.95,
                    notes,
                }
            }
            None if inputs.is_empty() => Outcome::missing(Strategy::Direct, vec![u.dimension]),
            None => fallback(&inputs, &unit),
        },
        UnitShape::Unknown => fallback(&inputs, &unit),
    };

    let result = finish(entity, matched, &unit, outcome, lang);
    debug!(
        entity = %entity.name,
        record = %result.record.id,
        strategy = ?result.strategy,
        total = result.total_emission,
        confidence = result.confidence,
        "calculated"
    );
    result
}

fn weight_distance(inputs: &Inputs, weight: Unit, distance: Unit) -> Outcome {
    match (inputs.first(Dimension::Weight), inputs.first(Dimension::Distance)) {
        (Some(w), Some(d)) => {
            let mut notes = Vec::new();
            let terms = vec![w.term(Some(weight), &mut notes), d.term(Some(distance), &mut notes)];
            Outcome {
                strategy: Strategy::WeightDistance,
                terms,
                unit_used: format!("{}-{}", weight.symbol, distance.symbol),
                multiplier: 0.95,
                notes,
            }
        }
        (w, d) => {
            let mut needed = Vec::new();
            if w.is_none() {
                needed.push(Dimension::Weight);
            }
            if d.is_none() {
                needed.push(Dimension::Distance);
            }
            Outcome::missing(Strategy::WeightDistance, needed)
        }
    }
}

fn count_usage(inputs: &Inputs, usage: Unit) -> Outcome {
    match (inputs.first(Dimension::Count), inputs.first(usage.dimension)) {
        (Some(c), Some(u)) => {
            let mut notes = Vec::new();
            let terms = vec![c.term(None, &mut notes), u.term(Some(usage), &mut notes)];
            Outcome {
                strategy: Strategy::CountUsage,
                terms,
                unit_used: format!("{}-{}", c.label(), usage.symbol),
                multiplier: 0.9,
                notes,
            }
        }
        (None, Some(_)) if usage.dimension == Dimension::Distance => {
            let mut outcome = distance_only(inputs, usage);
            outcome.multiplier = 0.8;
            outcome.notes.insert(0, Note::AssumedSingleUnit);
            outcome
        }
        (c, u) => {
            let mut needed = Vec::new();
            if c.is_none() {
                needed.push(Dimension::Count);
            }
            if u.is_none() {
                needed.push(usage.dimension);
            }
            Outcome::missing(Strategy::CountUsage, needed)
        }
    }
}

fn distance_only(inputs: &Inputs, distance: Unit) -> Outcome {
    let Some(d) = inputs.first(Dimension::Distance) else {
        return Outcome::missing(Strategy::DistanceOnly, vec![Dimension::Distance]);
    };
    let mut notes = Vec::new();
    let term = d.term(Some(distance), &mut notes);
    Outcome {
        strategy: Strategy::DistanceOnly,
        terms: vec![term],
        unit_used: distance.symbol.to_string(),
        multiplier: 0.9,
        notes,
    }
}

fn direct_count(inputs: &Inputs) -> Outcome {
    let Some(c) = inputs.first(Dimension::Count) else {
        return Outcome::missing(Strategy::DirectCount, vec![Dimension::Count]);
    };
    let mut notes = Vec::new();
    let term = c.term(None, &mut notes);
    Outcome {
        strategy: Strategy::DirectCount,
        unit_used: term.unit.clone(),
        terms: vec![term],
        multiplier: 0.9,
        notes,
    }
}

/// Best effort when no input shares the factor's dimension.
fn fallback(inputs: &Inputs, unit: &FactorUnit) -> Outcome {
    let denominator: Vec<&str> = unit.denominator.iter().map(|c| c.raw.as_str()).collect();
    let denominator = denominator.join("-");
    let Some(input) = inputs.primary() else {
        let needed = unit
            .denominator
            .iter()
            .filter_map(|c| c.dimension())
            .collect();
        return Outcome::missing(Strategy::Fallback, needed);
    };

    let mut notes = Vec::new();
    let mut term = input.term(None, &mut notes);
    let multiplier = if same_unit_label(input.label(), &denominator) {
        notes.push(Note::BestEffortConversion {
            from: input.label().to_string(),
            to: denominator.clone(),
        });
        term.unit = denominator.clone();
        0.8
    } else {
        notes.push(Note::DimensionMismatch {
            from: input.label().to_string(),
            to: denominator.clone(),
        });
        0.5
    };

    Outcome {
        strategy: Strategy::Fallback,
        terms: vec![term],
        unit_used: denominator,
        multiplier,
        notes,
    }
}

/// Loose match for unit words the table does not know ("room-nights" vs "room-night").
fn same_unit_label(a: &str, b: &str) -> bool {
    let key = |s: &str| s.trim().to_lowercase().trim_end_matches('s').to_string();
    (!a.trim().is_empty() && key(a) == key(b)) || units::are_units_equivalent(a, b)
}

fn finish(
    entity: &QueryEntity,
    matched: &MatchResult,
    unit: &FactorUnit,
    outcome: Outcome,
    lang: Lang,
) -> CalculationResult {
    let record = &matched.record;
    let factor = record.factor;
    let from_description = outcome
        .notes
        .iter()
        .any(|n| matches!(n, Note::FromDescription { .. }));
    let multiplier = if from_description {
        outcome.multiplier * 0.9
    } else {
        outcome.multiplier
    };
    let confidence = entity.confidence.clamp(0.0, 1.0) * multiplier;
    let unit_mismatch = outcome
        .notes
        .iter()
        .any(|n| matches!(n, Note::DimensionMismatch { .. }));

    let numerator = match unit.numerator_unit {
        Some(u) => u.symbol.to_string(),
        None if unit.numerator.is_empty() => "kg".to_string(),
        None => unit.numerator.clone(),
    };

    let (total_emission, emission_unit, quantity_used, formula) = if outcome.terms.is_empty() {
        (
            0.0,
            numerator,
            0.0,
            format!("{} {}", fmt_num(factor), record.unit),
        )
    } else {
        let quantity: f64 = outcome.terms.iter().map(|t| t.value).product();
        let raw = quantity * factor;
        let mut formula = outcome
            .terms
            .iter()
            .map(|t| format!("{} {}", fmt_num(t.value), t.unit))
            .collect::<Vec<_>>()
            .join(" × ");
        formula.push_str(&format!(
            " × {} {} = {} {numerator}",
            fmt_num(factor),
            record.unit,
            fmt_num(raw)
        ));

        let (total, emission_unit) = match (unit.numerator_unit, Dimension::Weight.base_unit()) {
            (Some(from), Some(kg)) if from.dimension == Dimension::Weight => {
                if !std::ptr::eq(from, kg) {
                    let kg_value = units::convert_units(raw, from, kg).value;
                    formula.push_str(&format!(" = {} {}", fmt_num(kg_value), kg.symbol));
                    (kg_value, kg.symbol.to_string())
                } else {
                    (raw, kg.symbol.to_string())
                }
            }
            _ => (raw, numerator),
        };
        (total, emission_unit, quantity, formula)
    };

    CalculationResult {
        entity: entity.clone(),
        record: record.clone(),
        relevance_score: matched.relevance_score,
        strategy: outcome.strategy,
        total_emission,
        emission_unit,
        quantity_used,
        unit_used: outcome.unit_used,
        formula,
        confidence,
        notes: outcome.notes.iter().map(|n| n.render(lang)).collect(),
        unit_mismatch,
    }
}

/// Six significant digits, trailing zeros trimmed.
pub fn fmt_num(v: f64) -> String {
    if v == 0.0 || !v.is_finite() {
        return if v.is_finite() { "0".to_string() } else { v.to_string() };
    }
    let magnitude = v.abs().log10().floor() as i32;
    let decimals = (5 - magnitude).clamp(0, 12) as usize;
    let s = format!("{v:.decimals$}");
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}
