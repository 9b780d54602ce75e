//! Scenario heuristics as a data table: each rule either sets a base score
//! or adds a small bonus when its predicate holds.

use super::Query;
use crate::model::{EmissionFactorRecord, EntityType, ScenarioDetails, TransportDetails};
use crate::retrieve::tokenize;

const FUEL_WORDS: &[&str] = &[
    "diesel", "petrol", "gasoline", "electric", "hybrid", "lpg", "cng", "lng", "hydrogen",
    "biodiesel", "kerosene",
];

pub(super) struct Context<'a> {
    pub query: &'a Query<'a>,
    pub record: &'a EmissionFactorRecord,
    pub title_tokens: &'a [String],
    pub generic: bool,
}

#[derive(Debug, Clone, Copy)]
enum Effect {
    Base(f64),
    Bonus(f64),
}

struct Rule {
    name: &'static str,
    effect: Effect,
    applies: fn(&Context<'_>) -> bool,
}

static RULES: &[Rule] = &[
    Rule {
        name: "category",
        effect: Effect::Base(0.70),
        applies: category_match,
    },
    Rule {
        name: "material",
        effect: Effect::Base(0.85),
        applies: material_match,
    },
    Rule {
        name: "processing_method",
        effect: Effect::Base(0.92),
        applies: processing_match,
    },
    Rule {
        name: "vehicle",
        effect: Effect::Bonus(0.04),
        applies: |ctx| transport(ctx).is_some_and(|t| overlaps(t.vehicle_type.as_deref(), ctx)),
    },
    Rule {
        name: "load_state",
        effect: Effect::Bonus(0.03),
        applies: load_state_match,
    },
    Rule {
        name: "fuel",
        effect: Effect::Bonus(0.05),
        applies: fuel_match,
    },
    Rule {
        name: "cargo",
        effect: Effect::Bonus(0.04),
        applies: |ctx| transport(ctx).is_some_and(|t| overlaps(t.cargo_type.as_deref(), ctx)),
    },
    Rule {
        name: "liquid_type",
        effect: Effect::Bonus(0.06),
        applies: |ctx| match ctx.query.entity.scenario {
            Some(ScenarioDetails::Liquid(ref l)) => overlaps(l.liquid_type.as_deref(), ctx),
            _ => false,
        },
    },
    Rule {
        name: "sector",
        effect: Effect::Bonus(0.02),
        applies: sector_match,
    },
];

#[derive(Debug, Default)]
pub(super) struct Heuristic {
    /// Highest base among fired rules; `None` when no base rule fired.
    pub base: Option<f64>,
    pub bonus: f64,
    pub fired: Vec<&'static str>,
}

pub(super) fn evaluate(ctx: &Context<'_>) -> Heuristic {
    let mut out = Heuristic::default();
    for rule in RULES {
        if !(rule.applies)(ctx) {
            continue;
        }
        match rule.effect {
            Effect::Base(_) if ctx.generic => continue,
            Effect::Base(b) => out.base = Some(out.base.map_or(b, |cur| cur.max(b))),
            Effect::Bonus(b) => out.bonus += b,
        }
        out.fired.push(rule.name);
    }
    out
}

fn transport<'a>(ctx: &Context<'a>) -> Option<&'a TransportDetails> {
    match ctx.query.entity.scenario {
        Some(ScenarioDetails::Transport(ref t)) => Some(t),
        _ => None,
    }
}

/// Whether any word of `phrase` appears among the title tokens.
fn overlaps(phrase: Option<&str>, ctx: &Context<'_>) -> bool {
    phrase.is_some_and(|p| {
        tokenize(p)
            .iter()
            .any(|w| ctx.title_tokens.iter().any(|t| t == w))
    })
}

fn category_match(ctx: &Context<'_>) -> bool {
    ctx.query
        .category
        .is_some_and(|c| c.matches(&ctx.record.title))
}

/// Material of a non-transport scenario; transport cargo is a bonus instead.
fn material<'a>(ctx: &Context<'a>) -> Option<&'a str> {
    match ctx.query.entity.scenario {
        Some(ScenarioDetails::Transport(_)) | None => None,
        Some(ref s) => s.material(),
    }
}

fn material_match(ctx: &Context<'_>) -> bool {
    overlaps(material(ctx), ctx)
}

fn processing_match(ctx: &Context<'_>) -> bool {
    material_match(ctx)
        && overlaps(
            ctx.query
                .entity
                .scenario
                .as_ref()
                .and_then(ScenarioDetails::processing_method),
            ctx,
        )
}

fn load_state_match(ctx: &Context<'_>) -> bool {
    let Some(status) = transport(ctx).and_then(|t| t.load_status.as_deref()) else {
        return false;
    };
    let status = status.trim().to_lowercase();
    !status.is_empty()
        && (overlaps(Some(&status), ctx) || ctx.record.title.to_lowercase().contains(&status))
}

fn fuel_match(ctx: &Context<'_>) -> bool {
    if let Some(fuel) = transport(ctx).and_then(|t| t.fuel_type.as_deref()) {
        return overlaps(Some(fuel), ctx);
    }
    FUEL_WORDS.iter().any(|f| {
        ctx.query.tokens.iter().any(|t| t == f) && ctx.title_tokens.iter().any(|t| t == f)
    })
}

fn sector_match(ctx: &Context<'_>) -> bool {
    let sector = ctx.record.sector.to_lowercase();
    let by_type = ctx
        .query
        .entity
        .effective_type()
        .filter(|t| *t != EntityType::General)
        .is_some_and(|t| sector.contains(t.label()));
    by_type || ctx.query.category.is_some_and(|c| c.matches(&ctx.record.sector))
}
