use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use super::{CatalogError, CatalogStore, HierarchyQuery};
use crate::model::EmissionFactorRecord;

/// Catalog held in memory, loaded from a JSON array of records or
/// an object with a `records` array.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    records: Vec<EmissionFactorRecord>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Bare(Vec<EmissionFactorRecord>),
    Wrapped { records: Vec<EmissionFactorRecord> },
}

impl MemoryCatalog {
    pub fn new(records: Vec<EmissionFactorRecord>) -> Self {
        Self { records }
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let records = match serde_json::from_str::<CatalogFile>(json)? {
            CatalogFile::Bare(records) | CatalogFile::Wrapped { records } => records,
        };
        debug!(records = records.len(), "catalog loaded");
        Ok(Self { records })
    }

    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

impl CatalogStore for MemoryCatalog {
    async fn exact_match(&self, name: &str) -> Result<Vec<EmissionFactorRecord>, CatalogError> {
        Ok(self
            .records
            .iter()
            .filter(|r| eq_ignore_case(&r.title, name))
            .cloned()
            .collect())
    }

    async fn fuzzy_match(
        &self,
        substring: &str,
        limit: usize,
    ) -> Result<Vec<EmissionFactorRecord>, CatalogError> {
        let needle = substring.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .records
            .iter()
            .filter(|r| r.title.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn by_hierarchy(
        &self,
        query: &HierarchyQuery,
    ) -> Result<Vec<EmissionFactorRecord>, CatalogError> {
        let activity = query.activity.as_deref().map(str::to_lowercase);
        Ok(self
            .records
            .iter()
            .filter(|r| {
                query
                    .sector
                    .as_deref()
                    .is_none_or(|s| eq_ignore_case(&r.sector, s))
            })
            .filter(|r| {
                query.subsector.as_deref().is_none_or(|s| {
                    r.subsector.as_deref().is_some_and(|rs| eq_ignore_case(rs, s))
                })
            })
            .filter(|r| {
                activity
                    .as_deref()
                    .is_none_or(|a| r.title.to_lowercase().contains(a))
            })
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn all_sectors(&self) -> Result<Vec<String>, CatalogError> {
        let sectors: BTreeSet<&str> = self.records.iter().map(|r| r.sector.as_str()).collect();
        Ok(sectors.into_iter().map(String::from).collect())
    }

    async fn subsectors_of(&self, sector: &str) -> Result<Vec<String>, CatalogError> {
        let subsectors: BTreeSet<&str> = self
            .records
            .iter()
            .filter(|r| eq_ignore_case(&r.sector, sector))
            .filter_map(|r| r.subsector.as_deref())
            .collect();
        Ok(subsectors.into_iter().map(String::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::record;

    fn catalog() -> MemoryCatalog {
        let mut waste = record("w1", "Plastic waste - Landfill", "Waste", "kg/tonne", 9.0);
        waste.subsector = Some("Landfill".into());
        MemoryCatalog::new(vec![
            record("t1", "Rigid truck 26-32t - Container transport - Diesel", "Transport", "kg/tonne-km", 0.000116),
            record("t2", "Rigid truck 7.5-17t - Diesel", "Transport", "kg/tonne-km", 0.0002),
            waste,
        ])
    }

    #[tokio::test]
    async fn exact_match_ignores_case() {
        let hits = catalog()
            .exact_match("rigid truck 7.5-17t - diesel")
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "t2");
    }

    #[tokio::test]
    async fn fuzzy_match_respects_limit_and_order() {
        let hits = catalog().fuzzy_match("RIGID", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "t1");
        assert!(catalog().fuzzy_match("  ", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn hierarchy_filters_combine() {
        let query = HierarchyQuery {
            sector: Some("waste".into()),
            subsector: Some("landfill".into()),
            activity: None,
            limit: 10,
        };
        let hits = catalog().by_hierarchy(&query).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "w1");

        let query = HierarchyQuery {
            sector: Some("Transport".into()),
            activity: Some("container".into()),
            limit: 10,
            ..Default::default()
        };
        assert_eq!(catalog().by_hierarchy(&query).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sectors_are_sorted_and_unique() {
        assert_eq!(catalog().all_sectors().await.unwrap(), ["Transport", "Waste"]);
        assert_eq!(catalog().subsectors_of("waste").await.unwrap(), ["Landfill"]);
        assert!(catalog().subsectors_of("Transport").await.unwrap().is_empty());
    }

    #[test]
    fn loads_bare_and_wrapped_json() {
        let bare = r#"[{"id":"a","title":"A","sector":"S","unit":"kg/kg","factor":1.0}]"#;
        assert_eq!(MemoryCatalog::from_json_str(bare).unwrap().len(), 1);
        let wrapped = format!(r#"{{"records": {bare}}}"#);
        assert_eq!(MemoryCatalog::from_json_str(&wrapped).unwrap().len(), 1);
        assert!(MemoryCatalog::from_json_str("{}").is_err());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"[{"id":"a","title":"A","sector":"S","unit":"kg/kg","factor":1.0,"source":"DEFRA"}]"#,
        )
        .unwrap();
        let catalog = MemoryCatalog::from_json_file(&path).unwrap();
        assert!(!catalog.is_empty());
    }
}
