use std::time::Duration;

use moka::sync::Cache;

use crate::lang::Lang;
use crate::model::{EntityType, MatchResult, QueryEntity};

pub const DEFAULT_CAPACITY: usize = 256;
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Zero disables caching.
    pub capacity: usize,
    /// Zero disables caching.
    pub ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            ttl: DEFAULT_TTL,
        }
    }
}

/// Identity of one search. Quantities and scenario details take part because
/// ranking depends on them: the same name at 30 t and at 10 t ranks
/// differently, and so does plastic sent to landfill versus incineration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    name: String,
    entity_type: Option<EntityType>,
    lang: Lang,
    quantity: Option<(u64, String)>,
    scenario: String,
}

impl CacheKey {
    pub fn new(entity: &QueryEntity, lang: Lang) -> Self {
        let scenario = entity
            .scenario
            .as_ref()
            .and_then(|s| serde_json::to_string(s).ok())
            .unwrap_or_default()
            .to_lowercase();
        Self {
            name: entity
                .name
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase(),
            entity_type: entity.effective_type(),
            lang,
            quantity: entity
                .stated_quantity()
                .map(|m| (m.value.to_bits(), m.unit.to_lowercase())),
            scenario,
        }
    }
}

/// Bounded, time-limited memo of search results. Empty results are stored too.
///
/// Two concurrent misses on the same key both compute; the later insert wins.
pub struct SearchCache {
    inner: Option<Cache<CacheKey, Vec<MatchResult>>>,
}

impl SearchCache {
    pub fn new(policy: CachePolicy) -> Self {
        let inner = (policy.capacity > 0 && !policy.ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(policy.capacity as u64)
                .time_to_live(policy.ttl)
                .build()
        });
        Self { inner }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Vec<MatchResult>> {
        self.inner.as_ref()?.get(key)
    }

    pub fn insert(&self, key: CacheKey, results: Vec<MatchResult>) {
        if let Some(ref cache) = self.inner {
            cache.insert(key, results);
        }
    }

    /// Live entries, after pending evictions have been applied.
    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, |cache| {
            cache.run_pending_tasks();
            cache.entry_count() as usize
        })
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
