//! Catalog records, query entities, and match results shared by every stage.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An immutable emission-factor catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionFactorRecord {
    pub id: String,
    pub title: String,
    pub sector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsector: Option<String>,
    /// Unit expression, e.g. `kg/tonne-km`.
    pub unit: String,
    pub factor: f64,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Transport,
    Waste,
    Liquid,
    Food,
    Energy,
    #[default]
    General,
}

impl EntityType {
    /// Lenient parse for untrusted input; unknown labels yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "transport" | "transportation" | "logistics" | "travel" => Some(Self::Transport),
            "waste" => Some(Self::Waste),
            "liquid" | "water" | "wastewater" => Some(Self::Liquid),
            "food" | "agriculture" => Some(Self::Food),
            "energy" | "electricity" | "device" => Some(Self::Energy),
            "general" | "other" => Some(Self::General),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Waste => "waste",
            Self::Liquid => "liquid",
            Self::Food => "food",
            Self::Energy => "energy",
            Self::General => "general",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransportDetails {
    pub vehicle_type: Option<String>,
    pub vehicle_count: Option<f64>,
    pub fuel_type: Option<String>,
    pub cargo_type: Option<String>,
    /// Free-form load state: "empty", "full", "50%", "average".
    pub load_status: Option<String>,
    pub distance: Option<f64>,
    pub distance_unit: Option<String>,
    pub weight: Option<f64>,
    pub weight_unit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WasteDetails {
    pub waste_type: Option<String>,
    pub processing_method: Option<String>,
    pub weight: Option<f64>,
    pub weight_unit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LiquidDetails {
    pub liquid_type: Option<String>,
    pub processing_method: Option<String>,
    pub volume: Option<f64>,
    pub volume_unit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceDetails {
    pub device_type: Option<String>,
    pub device_count: Option<f64>,
    pub usage: Option<f64>,
    pub usage_unit: Option<String>,
}

/// Scenario attributes, one variant per scenario kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ScenarioDetails {
    Transport(TransportDetails),
    Waste(WasteDetails),
    Liquid(LiquidDetails),
    Device(DeviceDetails),
}

/// A value paired with the unit it was stated in (or a scenario default).
#[derive(Debug, Clone, PartialEq)]
pub struct Measure<'a> {
    pub value: f64,
    pub unit: &'a str,
}

fn measure<'a>(value: Option<f64>, unit: &'a Option<String>, default: &'a str) -> Option<Measure<'a>> {
    value.map(|value| Measure {
        value,
        unit: unit.as_deref().filter(|u| !u.trim().is_empty()).unwrap_or(default),
    })
}

impl ScenarioDetails {
    pub fn distance(&self) -> Option<Measure<'_>> {
        match self {
            Self::Transport(t) => measure(t.distance, &t.distance_unit, "km"),
            _ => None,
        }
    }

    /// Cargo or material mass. Transport defaults to tonnes, waste to kilograms.
    pub fn weight(&self) -> Option<Measure<'_>> {
        match self {
            Self::Transport(t) => measure(t.weight, &t.weight_unit, "tonne"),
            Self::Waste(w) => measure(w.weight, &w.weight_unit, "kg"),
            _ => None,
        }
    }

    pub fn volume(&self) -> Option<Measure<'_>> {
        match self {
            Self::Liquid(l) => measure(l.volume, &l.volume_unit, "L"),
            _ => None,
        }
    }

    pub fn count(&self) -> Option<f64> {
        match self {
            Self::Transport(t) => t.vehicle_count,
            Self::Device(d) => d.device_count,
            _ => None,
        }
    }

    /// The usage half of a count×usage calculation.
    pub fn usage(&self) -> Option<Measure<'_>> {
        match self {
            Self::Transport(t) => measure(t.distance, &t.distance_unit, "km"),
            Self::Device(d) => measure(d.usage, &d.usage_unit, "h"),
            _ => None,
        }
    }

    pub fn material(&self) -> Option<&str> {
        match self {
            Self::Transport(t) => t.cargo_type.as_deref(),
            Self::Waste(w) => w.waste_type.as_deref(),
            Self::Liquid(l) => l.liquid_type.as_deref(),
            Self::Device(d) => d.device_type.as_deref(),
        }
    }

    pub fn processing_method(&self) -> Option<&str> {
        match self {
            Self::Waste(w) => w.processing_method.as_deref(),
            Self::Liquid(l) => l.processing_method.as_deref(),
            _ => None,
        }
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Transport(_) => EntityType::Transport,
            Self::Waste(_) => EntityType::Waste,
            Self::Liquid(_) => EntityType::Liquid,
            Self::Device(_) => EntityType::Energy,
        }
    }
}

/// One activity mentioned in a user query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEntity {
    pub name: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default = "full_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub entity_type: Option<EntityType>,
    #[serde(default, rename = "scenarioDetails")]
    pub scenario: Option<ScenarioDetails>,
}

fn full_confidence() -> f64 {
    1.0
}

impl QueryEntity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: None,
            unit: None,
            confidence: 1.0,
            entity_type: None,
            scenario: None,
        }
    }

    pub fn with_quantity(mut self, quantity: f64, unit: impl Into<String>) -> Self {
        self.quantity = Some(quantity);
        self.unit = Some(unit.into());
        self
    }

    pub fn with_type(mut self, entity_type: EntityType) -> Self {
        self.entity_type = Some(entity_type);
        self
    }

    pub fn with_scenario(mut self, scenario: ScenarioDetails) -> Self {
        self.scenario = Some(scenario);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Explicit type if given, otherwise the kind implied by the scenario.
    pub fn effective_type(&self) -> Option<EntityType> {
        self.entity_type
            .or_else(|| self.scenario.as_ref().map(ScenarioDetails::entity_type))
    }

    pub fn stated_quantity(&self) -> Option<Measure<'_>> {
        self.quantity.map(|value| Measure {
            value,
            unit: self.unit.as_deref().unwrap_or(""),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Fuzzy,
    Semantic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub record: EmissionFactorRecord,
    pub relevance_score: f64,
    pub match_type: MatchType,
}

/// Sort by relevance descending, ties broken by catalog id.
pub fn sort_matches(matches: &mut [MatchResult]) {
    matches.sort_by(|a, b| {
        b.relevance_score
            .total_cmp(&a.relevance_score)
            .then_with(|| a.record.id.cmp(&b.record.id))
    });
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_deserializes_camel_case_with_tagged_scenario() {
        let json = serde_json::json!({
            "name": "truck",
            "quantity": 30,
            "unit": "tonne",
            "entityType": "transport",
            "scenarioDetails": {"kind": "transport", "distance": 75, "distanceUnit": "km"}
        });
        let entity: QueryEntity = serde_json::from_value(json).unwrap();
        assert_eq!(entity.confidence, 1.0);
        assert_eq!(entity.entity_type, Some(EntityType::Transport));
        let distance = entity.scenario.as_ref().and_then(|s| s.distance()).unwrap();
        assert_eq!(distance.value, 75.0);
        assert_eq!(distance.unit, "km");
    }

    #[test]
    fn scenario_defaults_units() {
        let waste = ScenarioDetails::Waste(WasteDetails {
            weight: Some(3.0),
            ..Default::default()
        });
        assert_eq!(waste.weight().map(|m| m.unit), Some("kg"));
        let device = ScenarioDetails::Device(DeviceDetails {
            usage: Some(2.0),
            usage_unit: Some(" ".into()),
            ..Default::default()
        });
        assert_eq!(device.usage().map(|m| m.unit), Some("h"));
    }

    #[test]
    fn effective_type_falls_back_to_scenario() {
        let entity = QueryEntity::new("bottle").with_scenario(ScenarioDetails::Liquid(
            LiquidDetails::default(),
        ));
        assert_eq!(entity.effective_type(), Some(EntityType::Liquid));
    }

    #[test]
    fn sort_matches_breaks_ties_by_id() {
        let mk = |id: &str, score: f64| MatchResult {
            record: fixtures::record(id, id, "s", "kg/kg", 1.0),
            relevance_score: score,
            match_type: MatchType::Fuzzy,
        };
        let mut matches = vec![mk("b", 0.5), mk("c", 0.9), mk("a", 0.5)];
        sort_matches(&mut matches);
        let ids: Vec<_> = matches.iter().map(|m| m.record.id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn entity_type_parse_is_lenient() {
        assert_eq!(EntityType::parse(" Transportation "), Some(EntityType::Transport));
        assert_eq!(EntityType::parse("spaceship"), None);
    }
}
