//! Runtime configuration read from the environment.

use std::time::Duration;

use crate::retrieve::BUCKET_LIMIT;
use crate::score::{MIN_SCORE, TOP_K};
use crate::search::CachePolicy;

const CATALOG_VAR: &str = "FACTORSCOUT_CATALOG";
const CACHE_CAPACITY_VAR: &str = "FACTORSCOUT_CACHE_CAPACITY";
const CACHE_TTL_VAR: &str = "FACTORSCOUT_CACHE_TTL_SECS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a non-negative integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },

    #[error("no catalog configured: pass --catalog or set {CATALOG_VAR}")]
    MissingCatalog,
}

/// Tuning for [`crate::search::SearchOrchestrator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchConfig {
    /// Ranked results kept per entity.
    pub top_k: usize,
    /// Scores below this are dropped from the keyword stage.
    pub min_score: f64,
    /// Per-query limit for the semantic stage's hierarchy and keyword lookups.
    pub semantic_limit: usize,
    pub cache: CachePolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: TOP_K,
            min_score: MIN_SCORE,
            semantic_limit: BUCKET_LIMIT,
            cache: CachePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// File path or http(s) URL.
    pub catalog: Option<String>,
    pub search: SearchConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut search = SearchConfig::default();
        if let Some(capacity) = number(&lookup, CACHE_CAPACITY_VAR)? {
            search.cache.capacity = capacity as usize;
        }
        if let Some(secs) = number(&lookup, CACHE_TTL_VAR)? {
            search.cache.ttl = Duration::from_secs(secs);
        }
        Ok(Self {
            catalog: lookup(CATALOG_VAR).filter(|c| !c.trim().is_empty()),
            search,
        })
    }

    /// The command-line location wins over the environment.
    pub fn catalog_location(&self, cli: Option<&str>) -> Result<String, ConfigError> {
        cli.map(str::to_string)
            .or_else(|| self.catalog.clone())
            .ok_or(ConfigError::MissingCatalog)
    }
}

fn number(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<u64>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { name, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.catalog, None);
        assert_eq!(config.search, SearchConfig::default());
        assert_eq!(config.search.top_k, 10);
    }

    #[test]
    fn reads_cache_settings() {
        let config = Config::from_lookup(lookup(&[
            (CACHE_CAPACITY_VAR, "12"),
            (CACHE_TTL_VAR, " 30 "),
            (CATALOG_VAR, "factors.json"),
        ]))
        .unwrap();
        assert_eq!(config.search.cache.capacity, 12);
        assert_eq!(config.search.cache.ttl, Duration::from_secs(30));
        assert_eq!(config.catalog.as_deref(), Some("factors.json"));
    }

    #[test]
    fn rejects_garbage_numbers() {
        let err = Config::from_lookup(lookup(&[(CACHE_TTL_VAR, "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { name, .. } if name == CACHE_TTL_VAR));
    }

    #[test]
    fn cli_catalog_overrides_env() {
        let config = Config::from_lookup(lookup(&[(CATALOG_VAR, "env.json")])).unwrap();
        assert_eq!(config.catalog_location(Some("cli.json")).unwrap(), "cli.json");
        assert_eq!(config.catalog_location(None).unwrap(), "env.json");
        assert!(matches!(
            Config::default().catalog_location(None),
            Err(ConfigError::MissingCatalog)
        ));
    }
}
