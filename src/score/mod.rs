//! Relevance scoring of catalog records against a query entity.
//!
//! Precedence: exact title, then numeric range inclusion, then keyword overlap
//! combined with the scenario rule table.

mod rules;

use strsim::jaro_winkler;
use tracing::trace;

use crate::extract::{self, RangeMention};
use crate::model::{EmissionFactorRecord, MatchResult, MatchType, QueryEntity, sort_matches};
use crate::retrieve::{Category, classify, tokenize};
use crate::units::{self, Dimension, Unit};

/// Results below this score are dropped by [`rank`].
pub const MIN_SCORE: f64 = 0.25;
/// Default number of ranked results kept per entity.
pub const TOP_K: usize = 10;

const RANGE_BASE: f64 = 0.95;
const RANGE_PROXIMITY_WEIGHT: f64 = 0.05;
const NEAR_MISS_DAMPING: f64 = 0.7;
const KEYWORD_CEILING: f64 = 0.85;
const HEURISTIC_CAP: f64 = 0.94;
const TYPO_THRESHOLD: f64 = 0.92;
const PARTIAL_TOKEN: f64 = 0.5;
const GENERIC_PENALTY: f64 = 5.0;

/// Catalog entries that name a bare fuel or carrier rather than an activity.
const GENERIC_TITLES: &[&str] = &[
    "diesel",
    "petrol",
    "gasoline",
    "electricity",
    "natural ga",
    "lpg",
    "cng",
    "fuel oil",
    "coal",
    "kerosene",
    "fuel",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub value: f64,
    pub match_type: MatchType,
}

impl Score {
    fn fuzzy(value: f64) -> Self {
        Self {
            value,
            match_type: MatchType::Fuzzy,
        }
    }
}

/// A quantity the entity states, in a recognised unit.
#[derive(Debug, Clone, Copy)]
struct Quantity {
    value: f64,
    unit: Option<Unit>,
    dimension: Dimension,
}

/// Entity-side data shared by every record scored against it.
struct Query<'a> {
    entity: &'a QueryEntity,
    normalized_name: String,
    tokens: Vec<String>,
    quantities: Vec<Quantity>,
    category: Option<Category>,
}

enum RangeOutcome {
    Hit(f64),
    NearMiss,
    Miss,
    NotApplicable,
}

impl<'a> Query<'a> {
    fn new(entity: &'a QueryEntity) -> Self {
        let mut tokens = tokenize(&entity.name);
        let mut seen = std::collections::HashSet::new();
        tokens.retain(|t| seen.insert(t.clone()));
        Self {
            entity,
            normalized_name: normalize_title(&entity.name),
            tokens,
            quantities: quantities(entity),
            category: classify(&entity.name, entity.effective_type()),
        }
    }

    fn score(&self, record: &EmissionFactorRecord) -> Score {
        if normalize_title(&record.title) == self.normalized_name {
            return Score {
                value: 1.0,
                match_type: MatchType::Exact,
            };
        }

        let damping = match self.range_outcome(&record.title) {
            RangeOutcome::Hit(value) => return Score::fuzzy(value),
            RangeOutcome::Miss => return Score::fuzzy(0.0),
            RangeOutcome::NearMiss => NEAR_MISS_DAMPING,
            RangeOutcome::NotApplicable => 1.0,
        };

        let title_tokens = tokenize(&record.title);
        let generic = is_generic(&title_tokens);
        let keyword = self.keyword_score(&title_tokens, generic);
        let heuristic = rules::evaluate(&rules::Context {
            query: self,
            record,
            title_tokens: &title_tokens,
            generic,
        });

        let value = (keyword.max(heuristic.base.unwrap_or(0.0)) + heuristic.bonus)
            .min(HEURISTIC_CAP)
            * damping;

        trace!(
            record = %record.id,
            keyword,
            base = ?heuristic.base,
            bonus = heuristic.bonus,
            rules = ?heuristic.fired,
            damping,
            value,
            "scored"
        );
        Score::fuzzy(value)
    }

    fn range_outcome(&self, title: &str) -> RangeOutcome {
        let mut best: Option<f64> = None;
        let mut near = false;
        let mut miss = false;

        for range in extract::extract_ranges(title) {
            let range_unit = units::normalize(&range.unit);
            for q in self.quantities.iter().filter(|q| q.dimension == range.dimension) {
                let value = match (q.unit, range_unit) {
                    (Some(from), Some(to)) => {
                        let c = units::convert_units(q.value, from, to);
                        if !c.converted {
                            continue;
                        }
                        c.value
                    }
                    (None, None) => q.value,
                    _ => continue,
                };
                if range.contains(value) {
                    let hit = range_score(&range, value);
                    best = Some(best.map_or(hit, |b| b.max(hit)));
                } else if range.within_tolerance(value) {
                    near = true;
                } else {
                    miss = true;
                }
            }
        }

        match best {
            Some(value) => RangeOutcome::Hit(value),
            None if near => RangeOutcome::NearMiss,
            None if miss => RangeOutcome::Miss,
            None => RangeOutcome::NotApplicable,
        }
    }

    fn keyword_score(&self, title_tokens: &[String], generic: bool) -> f64 {
        if self.tokens.is_empty() {
            return 0.0;
        }
        let mut raw: f64 = self
            .tokens
            .iter()
            .map(|t| token_match(t, title_tokens))
            .sum();
        if generic {
            raw -= GENERIC_PENALTY;
        }
        (raw / self.tokens.len() as f64 * KEYWORD_CEILING).clamp(0.0, KEYWORD_CEILING)
    }
}

/// `0.95` plus up to `0.05` for closeness to the range midpoint.
fn range_score(range: &RangeMention, value: f64) -> f64 {
    let proximity = if range.width() > 0.0 {
        1.0 - (value - range.midpoint()).abs() / range.width()
    } else {
        1.0
    };
    (RANGE_BASE + proximity * RANGE_PROXIMITY_WEIGHT).min(1.0)
}

/// 1 for an exact token, 0.5 for a near-typo of a longer token, else 0.
fn token_match(token: &str, title_tokens: &[String]) -> f64 {
    if title_tokens.iter().any(|t| t == token) {
        return 1.0;
    }
    let long = |s: &str| s.chars().count() >= 4;
    if long(token)
        && title_tokens
            .iter()
            .any(|t| long(t) && jaro_winkler(t, token) >= TYPO_THRESHOLD)
    {
        PARTIAL_TOKEN
    } else {
        0.0
    }
}

fn is_generic(title_tokens: &[String]) -> bool {
    !title_tokens.is_empty() && GENERIC_TITLES.contains(&title_tokens.join(" ").as_str())
}

fn normalize_title(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn quantities(entity: &QueryEntity) -> Vec<Quantity> {
    let mut out = Vec::new();
    if let Some(m) = entity.stated_quantity() {
        push_quantity(&mut out, m.value, m.unit);
    }
    if let Some(ref s) = entity.scenario {
        for m in [s.weight(), s.distance(), s.volume(), s.usage()]
            .into_iter()
            .flatten()
        {
            push_quantity(&mut out, m.value, m.unit);
        }
    }
    for m in extract::extract_mentions(&entity.name) {
        if m.dimension == Dimension::Year {
            out.push(Quantity {
                value: m.value,
                unit: None,
                dimension: Dimension::Year,
            });
        } else {
            push_quantity(&mut out, m.value, &m.unit);
        }
    }
    out
}

fn push_quantity(out: &mut Vec<Quantity>, value: f64, unit: &str) {
    if let Some(unit) = units::normalize(unit) {
        out.push(Quantity {
            value,
            unit: Some(unit),
            dimension: unit.dimension,
        });
    }
}

/// Score one record against `entity`.
pub fn score(entity: &QueryEntity, record: &EmissionFactorRecord) -> Score {
    Query::new(entity).score(record)
}

/// Score `records`, drop those under [`MIN_SCORE`], and keep the best `limit`.
pub fn rank(
    entity: &QueryEntity,
    records: &[EmissionFactorRecord],
    limit: usize,
) -> Vec<MatchResult> {
    rank_above(entity, records, limit, MIN_SCORE)
}

/// Like [`rank`] with a caller-chosen floor. Zero scores are always dropped.
pub fn rank_above(
    entity: &QueryEntity,
    records: &[EmissionFactorRecord],
    limit: usize,
    floor: f64,
) -> Vec<MatchResult> {
    let query = Query::new(entity);
    let mut matches: Vec<MatchResult> = records
        .iter()
        .filter_map(|record| {
            let score = query.score(record);
            (score.value > 0.0 && score.value >= floor).then(|| MatchResult {
                record: record.clone(),
                relevance_score: score.value,
                match_type: score.match_type,
            })
        })
        .collect();
    sort_matches(&mut matches);
    matches.truncate(limit);
    matches
}
