use crate::extract::{extract_mentions, is_specification_fragment};
use crate::model::{Measure, QueryEntity};
use crate::units::{self, Dimension, Unit};

use super::Note;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Source {
    Scenario,
    Quantity,
    Name,
}

/// One usable magnitude for the calculation.
#[derive(Debug, Clone)]
pub(super) struct Input {
    pub value: f64,
    /// `None` for counts and unrecognised units.
    pub unit: Option<Unit>,
    pub raw_unit: String,
    pub dimension: Dimension,
    pub source: Source,
}

/// A multiplicand in the rendered formula.
#[derive(Debug, Clone)]
pub(super) struct Term {
    pub value: f64,
    pub unit: String,
}

impl Input {
    fn from_measure(m: Measure<'_>, source: Source) -> Option<Self> {
        let unit = units::normalize(m.unit)?;
        Some(Self {
            value: m.value,
            unit: Some(unit),
            raw_unit: unit.symbol.to_string(),
            dimension: unit.dimension,
            source,
        })
    }

    fn count(value: f64, raw_unit: &str, source: Source) -> Self {
        Self {
            value,
            unit: None,
            raw_unit: raw_unit.to_string(),
            dimension: Dimension::Count,
            source,
        }
    }

    pub fn label(&self) -> &str {
        if self.raw_unit.is_empty() {
            "unit"
        } else {
            &self.raw_unit
        }
    }

    /// The value expressed in `target`, recording conversion and provenance notes.
    pub fn term(&self, target: Option<Unit>, notes: &mut Vec<Note>) -> Term {
        if self.source == Source::Name {
            notes.push(Note::FromDescription {
                value: self.value,
                unit: self.label().to_string(),
            });
        }
        match (self.unit, target) {
            (Some(from), Some(to)) if !std::ptr::eq(from, to) => {
                let c = units::convert_units(self.value, from, to);
                if c.converted {
                    notes.push(Note::Converted {
                        value: self.value,
                        from: from.symbol.to_string(),
                        to_value: c.value,
                        to: to.symbol.to_string(),
                    });
                    return Term {
                        value: c.value,
                        unit: to.symbol.to_string(),
                    };
                }
                Term {
                    value: self.value,
                    unit: self.label().to_string(),
                }
            }
            _ => Term {
                value: self.value,
                unit: self.label().to_string(),
            },
        }
    }
}

/// Candidate magnitudes in priority order: scenario, stated quantity, name.
#[derive(Debug, Default)]
pub(super) struct Inputs(Vec<Input>);

impl Inputs {
    pub fn gather(entity: &QueryEntity) -> Self {
        let mut out = Vec::new();

        if let Some(ref s) = entity.scenario {
            out.extend(
                [s.weight(), s.distance(), s.volume(), s.usage()]
                    .into_iter()
                    .flatten()
                    .filter(|m| usable(m.value))
                    .filter_map(|m| Input::from_measure(m, Source::Scenario)),
            );
            if let Some(count) = s.count().filter(|c| usable(*c)) {
                out.push(Input::count(count, "unit", Source::Scenario));
            }
        }

        if let Some(m) = entity.stated_quantity().filter(|m| usable(m.value)) {
            let (value, raw) = (m.value, m.unit.trim().to_string());
            out.push(
                Input::from_measure(m, Source::Quantity)
                    .unwrap_or_else(|| Input::count(value, &raw, Source::Quantity)),
            );
        }

        for mention in extract_mentions(&entity.name) {
            if matches!(mention.dimension, Dimension::Year | Dimension::Percentage)
                || !usable(mention.value)
                || is_specification_fragment(&entity.name, &mention)
            {
                continue;
            }
            let measure = Measure {
                value: mention.value,
                unit: &mention.unit,
            };
            out.push(
                Input::from_measure(measure, Source::Name)
                    .unwrap_or_else(|| Input::count(mention.value, &mention.unit, Source::Name)),
            );
        }

        Self(out)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self, dimension: Dimension) -> Option<&Input> {
        self.0.iter().find(|i| i.dimension == dimension)
    }

    /// The stated quantity, or failing that the first input of any kind.
    pub fn primary(&self) -> Option<&Input> {
        self.0
            .iter()
            .find(|i| i.source == Source::Quantity)
            .or_else(|| self.0.first())
    }
}

fn usable(v: f64) -> bool {
    v.is_finite() && v > 0.0
}
