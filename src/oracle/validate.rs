//! Sanitisation of oracle payloads. Nothing from the language model reaches
//! the engine without passing through here.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{IntentExtraction, SearchStrategy};
use crate::extract::{NumericMention, extract_mentions, is_specification_fragment};
use crate::model::{
    DeviceDetails, EntityType, LiquidDetails, QueryEntity, ScenarioDetails, TransportDetails,
    WasteDetails,
};
use crate::units;

/// Entity confidence when the oracle omits or garbles it.
const DEFAULT_CONFIDENCE: f64 = 0.7;
const MAX_KEYWORDS: usize = 5;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawIntent {
    pub intent: Option<String>,
    pub entities: Vec<RawEntity>,
    pub missing_info: Vec<Value>,
    pub confidence: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawEntity {
    pub name: Option<String>,
    pub quantity: Option<Value>,
    pub unit: Option<Value>,
    pub confidence: Option<Value>,
    #[serde(alias = "type")]
    pub entity_type: Option<String>,
    #[serde(alias = "scenario")]
    pub scenario_details: Option<Map<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawStrategy {
    pub sector: Option<String>,
    pub subsector: Option<String>,
    pub keywords: Vec<Value>,
}

/// Validate an extraction payload against the query it was produced from.
pub fn intent(raw: RawIntent, query: &str) -> IntentExtraction {
    let mut missing_info: Vec<String> = raw
        .missing_info
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    let entities: Vec<QueryEntity> = raw
        .entities
        .into_iter()
        .filter_map(|e| entity(e, query, &mut missing_info))
        .collect();

    IntentExtraction {
        intent: raw
            .intent
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .unwrap_or_else(|| "calculate_emission".to_string()),
        entities,
        missing_info,
        confidence: raw
            .confidence
            .as_ref()
            .and_then(number)
            .map_or(DEFAULT_CONFIDENCE, |c| c.clamp(0.0, 1.0)),
    }
}

fn entity(raw: RawEntity, query: &str, missing_info: &mut Vec<String>) -> Option<QueryEntity> {
    let Some(name) = raw.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) else {
        warn!("dropping oracle entity without a name");
        return None;
    };

    let mut out = QueryEntity::new(name);
    out.confidence = raw
        .confidence
        .as_ref()
        .and_then(number)
        .map_or(DEFAULT_CONFIDENCE, |c| c.clamp(0.0, 1.0));
    out.entity_type = raw.entity_type.as_deref().and_then(EntityType::parse);

    let unit = raw
        .unit
        .as_ref()
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(String::from);
    match raw.quantity.as_ref().map(|q| (q, number(q))) {
        Some((_, Some(q))) if q.is_finite() && q > 0.0 => {
            if is_range_artifact(q, unit.as_deref(), query, &out.name) {
                debug!(entity = %out.name, quantity = q, "stripped range boundary posing as quantity");
                missing_info.push(format!("quantity for {}", out.name));
            } else {
                out.quantity = Some(q);
                out.unit = unit;
            }
        }
        Some((Value::Null, _)) | None => {}
        Some((value, _)) => {
            warn!(entity = %out.name, quantity = %value, "rejected non-numeric or non-positive quantity");
        }
    }

    out.scenario = raw
        .scenario_details
        .and_then(|bag| scenario(bag, out.entity_type, query, &out.name));
    Some(out)
}

/// A number the user never stated on its own but that bounds a range in the
/// query or the entity name ("26" in "26-32t").
fn is_range_artifact(value: f64, unit: Option<&str>, query: &str, name: &str) -> bool {
    let mention = NumericMention {
        value,
        unit: unit
            .and_then(units::normalize)
            .map(|u| u.symbol.to_string())
            .unwrap_or_default(),
        dimension: unit
            .and_then(units::dimension_of)
            .unwrap_or(units::Dimension::Count),
    };
    let stated = extract_mentions(query)
        .iter()
        .any(|m| (m.value - value).abs() < 1e-9);
    !stated && (is_specification_fragment(query, &mention) || is_specification_fragment(name, &mention))
}

/// Numbers arrive as JSON numbers or as strings like "1,200" or "75 km".
fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned = s.trim().replace(',', "");
            cleaned
                .parse::<f64>()
                .ok()
                .or_else(|| extract_mentions(s).first().map(|m| m.value))
        }
        _ => None,
    }
    .filter(|n| n.is_finite())
}

const NUMERIC_KEYS: &[(&str, Option<&str>)] = &[
    ("distance", Some("distanceUnit")),
    ("weight", Some("weightUnit")),
    ("volume", Some("volumeUnit")),
    ("usage", Some("usageUnit")),
    ("vehicleCount", None),
    ("deviceCount", None),
];

/// Coerce the untyped bag into the scenario variant its entity type (or its keys) implies.
fn scenario(
    mut bag: Map<String, Value>,
    entity_type: Option<EntityType>,
    query: &str,
    name: &str,
) -> Option<ScenarioDetails> {
    for (key, unit_key) in NUMERIC_KEYS {
        let Some(raw) = bag.remove(*key) else { continue };
        let Some(value) = number(&raw).filter(|v| *v > 0.0) else {
            continue;
        };
        if let Some(unit_key) = unit_key {
            let stated_unit = bag.get(*unit_key).and_then(Value::as_str).map(String::from);
            let embedded_unit = raw
                .as_str()
                .and_then(|s| extract_mentions(s).into_iter().next())
                .map(|m| m.unit)
                .filter(|u| !u.is_empty());
            let unit = stated_unit.or(embedded_unit);
            if is_range_artifact(value, unit.as_deref(), query, name) {
                debug!(key, value, "stripped range boundary from scenario");
                continue;
            }
            if let Some(unit) = unit {
                bag.insert(unit_key.to_string(), Value::String(unit));
            }
        }
        bag.insert(key.to_string(), Value::from(value));
    }
    // Only the numeric keys stay numbers; everything else is free text.
    bag.retain(|_, v| !v.is_null() && !v.is_object() && !v.is_array());
    for (key, v) in bag.iter_mut() {
        let numeric = NUMERIC_KEYS.iter().any(|(k, _)| *k == key.as_str());
        if !numeric && !v.is_string() {
            *v = Value::String(v.to_string());
        }
    }

    let kind = scenario_kind(&bag, entity_type)?;
    let value = Value::Object(bag);
    let parsed = match kind {
        Kind::Transport => {
            serde_json::from_value::<TransportDetails>(value).map(ScenarioDetails::Transport)
        }
        Kind::Waste => serde_json::from_value::<WasteDetails>(value).map(ScenarioDetails::Waste),
        Kind::Liquid => serde_json::from_value::<LiquidDetails>(value).map(ScenarioDetails::Liquid),
        Kind::Device => serde_json::from_value::<DeviceDetails>(value).map(ScenarioDetails::Device),
    };
    match parsed {
        Ok(s) if !is_empty(&s) => Some(s),
        Ok(_) => None,
        Err(e) => {
            warn!(error = %e, "discarding malformed scenario details");
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Kind {
    Transport,
    Waste,
    Liquid,
    Device,
}

fn scenario_kind(bag: &Map<String, Value>, entity_type: Option<EntityType>) -> Option<Kind> {
    let has = |keys: &[&str]| keys.iter().any(|k| bag.contains_key(*k));
    let device = has(&["deviceType", "deviceCount", "usage"]);
    match entity_type {
        Some(EntityType::Transport) => Some(Kind::Transport),
        Some(EntityType::Waste) => Some(Kind::Waste),
        Some(EntityType::Liquid) => Some(Kind::Liquid),
        Some(EntityType::Energy) if device => Some(Kind::Device),
        _ if has(&["vehicleType", "vehicleCount", "distance", "fuelType", "cargoType", "loadStatus"]) => {
            Some(Kind::Transport)
        }
        _ if has(&["wasteType"]) => Some(Kind::Waste),
        _ if has(&["liquidType", "volume"]) => Some(Kind::Liquid),
        _ if device => Some(Kind::Device),
        _ => None,
    }
}

fn is_empty(s: &ScenarioDetails) -> bool {
    match s {
        ScenarioDetails::Transport(t) => *t == TransportDetails::default(),
        ScenarioDetails::Waste(w) => *w == WasteDetails::default(),
        ScenarioDetails::Liquid(l) => *l == LiquidDetails::default(),
        ScenarioDetails::Device(d) => *d == DeviceDetails::default(),
    }
}

/// Keep only a sector the catalog actually has, spelled as the catalog spells it.
pub fn strategy(raw: RawStrategy, sectors: &[String]) -> SearchStrategy {
    let canonical = |s: Option<String>| {
        let s = s?.trim().to_lowercase();
        sectors.iter().find(|known| known.to_lowercase() == s).cloned()
    };
    let sector = canonical(raw.sector);
    if sector.is_none() {
        debug!("oracle proposed no known sector");
    }

    let mut keywords: Vec<String> = Vec::new();
    for kw in raw.keywords.iter().filter_map(Value::as_str).map(str::trim) {
        if !kw.is_empty() && !keywords.iter().any(|k| k.eq_ignore_ascii_case(kw)) {
            keywords.push(kw.to_string());
        }
    }
    keywords.truncate(MAX_KEYWORDS);

    SearchStrategy {
        sector,
        subsector: raw
            .subsector
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        keywords,
    }
}
