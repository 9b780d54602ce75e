//! Candidate retrieval: a bounded bucket of catalog records for one entity.

mod category;

pub use category::{CATEGORY_RULES, Category, CategoryRule, classify};

use std::collections::HashSet;

use tracing::debug;

use crate::catalog::{CatalogError, CatalogStore};
use crate::model::{EmissionFactorRecord, QueryEntity};
use crate::units::{Dimension, FactorUnit};

/// Upper bound on the number of records handed to the scorer.
pub const BUCKET_LIMIT: usize = 40;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "into", "using", "used", "per", "of", "a", "an", "to",
    "in", "on", "by", "my", "our", "some", "about",
];

#[derive(Debug, Clone)]
pub struct Retrieval {
    pub category: Option<Category>,
    pub records: Vec<EmissionFactorRecord>,
}

/// Select candidate records for `entity`.
///
/// The category queries run in priority order until one returns records; the
/// full name and then its significant tokens are the fallback.
pub async fn retrieve(
    catalog: &impl CatalogStore,
    entity: &QueryEntity,
) -> Result<Retrieval, CatalogError> {
    let category = classify(&entity.name, entity.effective_type());
    let mut records = Vec::new();

    if let Some(category) = category {
        for query in category.rule().queries {
            records = catalog.fuzzy_match(query, BUCKET_LIMIT).await?;
            if !records.is_empty() {
                debug!(%category, query, hits = records.len(), "category query matched");
                break;
            }
        }
    }

    if records.is_empty() {
        records = catalog.fuzzy_match(entity.name.trim(), BUCKET_LIMIT).await?;
    }

    if records.is_empty() {
        for token in significant_tokens(&entity.name) {
            records = catalog.fuzzy_match(&token, BUCKET_LIMIT).await?;
            if !records.is_empty() {
                debug!(token = %token, hits = records.len(), "token fallback matched");
                break;
            }
        }
    }

    let spend_query = is_spend_query(entity);
    let before = records.len();
    records.retain(|r| spend_query || !FactorUnit::parse(&r.unit).is_spend_based());
    dedup_by_id(&mut records);
    records.truncate(BUCKET_LIMIT);

    debug!(
        entity = %entity.name,
        category = ?category,
        candidates = records.len(),
        filtered = before - records.len(),
        "retrieval complete"
    );

    Ok(Retrieval { category, records })
}

/// Lowercased, de-pluralised words of at least four letters, longest first.
pub fn significant_tokens(name: &str) -> Vec<String> {
    let mut tokens: Vec<String> = tokenize(name)
        .into_iter()
        .filter(|t| t.chars().count() >= 4 && t.chars().any(char::is_alphabetic))
        .collect();
    tokens.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
    let mut seen = HashSet::new();
    tokens.retain(|t| seen.insert(t.clone()));
    tokens
}

/// Lowercased words with digits-only tokens, stopwords and plural `s` removed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| singular(&w.to_lowercase()))
        .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

fn singular(word: &str) -> String {
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

fn is_spend_query(entity: &QueryEntity) -> bool {
    entity
        .unit
        .as_deref()
        .and_then(crate::units::dimension_of)
        .is_some_and(|d| d == Dimension::Currency)
}

fn dedup_by_id(records: &mut Vec<EmissionFactorRecord>) {
    let mut seen = HashSet::new();
    records.retain(|r| seen.insert(r.id.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::model::fixtures::record;

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new(vec![
            record("t1", "Rigid truck 26-32t - Container transport - Diesel", "Transport", "kg/tonne-km", 0.000116),
            record("t2", "HGV - All diesel - 50% Laden", "Transport", "kg/tonne-km", 0.00009),
            record("t3", "Rigid truck - purchased", "Capital goods", "kg/£", 0.4),
            record("r1", "Freight train - Diesel", "Transport", "kg/tonne-km", 0.00003),
            record("w1", "Plastic waste - Landfill", "Waste", "kg/tonne", 9.0),
            record("l1", "Wastewater treatment", "Water", "kg/m3", 0.7),
            record("f1", "Apple - imported", "Food", "kg/kg", 0.5),
        ])
    }

    #[tokio::test]
    async fn truck_query_pulls_truck_bucket_without_spend_records() {
        let entity = QueryEntity::new("30-ton rigid diesel truck container transport");
        let result = retrieve(&catalog(), &entity).await.unwrap();
        assert_eq!(result.category, Some(Category::Truck));
        let ids: Vec<_> = result.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["t1"]);
    }

    #[tokio::test]
    async fn spend_query_keeps_spend_records() {
        let entity = QueryEntity::new("rigid truck").with_quantity(30000.0, "USD");
        let result = retrieve(&catalog(), &entity).await.unwrap();
        assert!(result.records.iter().any(|r| r.id == "t3"));
    }

    #[tokio::test]
    async fn liquid_outranks_waste() {
        let entity = QueryEntity::new("waste water discharge");
        let result = retrieve(&catalog(), &entity).await.unwrap();
        assert_eq!(result.category, Some(Category::Liquid));
        assert_eq!(result.records[0].id, "l1");
    }

    #[tokio::test]
    async fn unknown_entity_falls_back_to_tokens() {
        let entity = QueryEntity::new("ate an imported apple");
        let result = retrieve(&catalog(), &entity).await.unwrap();
        assert_eq!(result.category, None);
        assert_eq!(result.records[0].id, "f1");
    }

    #[tokio::test]
    async fn nothing_matches_is_empty_not_error() {
        let entity = QueryEntity::new("quantum teleportation");
        let result = retrieve(&catalog(), &entity).await.unwrap();
        assert!(result.records.is_empty());
    }

    #[test]
    fn tokenize_drops_numbers_stopwords_and_plurals() {
        assert_eq!(
            tokenize("30-ton trucks hauling containers to the port"),
            ["ton", "truck", "hauling", "container", "port"]
        );
    }

    #[test]
    fn significant_tokens_longest_first() {
        assert_eq!(significant_tokens("ate an imported apple"), ["imported", "apple"]);
    }
}
