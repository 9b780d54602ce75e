use std::collections::HashSet;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::calc::{self, CalculationResult};
use crate::catalog::{CatalogError, CatalogStore, HierarchyQuery};
use crate::config::SearchConfig;
use crate::lang::Lang;
use crate::model::{EmissionFactorRecord, MatchResult, MatchType, QueryEntity, sort_matches};
use crate::oracle::{IntentOracle, OracleError, SearchStrategy};
use crate::report::{QueryReport, Unmatched};
use crate::retrieve::retrieve;
use crate::score;

use super::cache::{CacheKey, SearchCache};
use super::variants::exact_variants;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("{0}")]
    Catalog(#[from] CatalogError),
    #[error("{0}")]
    Oracle(#[from] OracleError),
}

/// Ranked matches for one entity of a batch.
#[derive(Debug, Clone)]
pub struct EntityMatches {
    pub entity: QueryEntity,
    pub matches: Vec<MatchResult>,
}

#[derive(Debug)]
pub struct EntityFailure {
    pub entity: QueryEntity,
    pub error: SearchError,
}

/// All-settled outcome of [`SearchOrchestrator::batch_search_activities`], in input order.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub results: Vec<EntityMatches>,
    pub errors: Vec<EntityFailure>,
}

/// Drives exact lookup, scored retrieval, and the oracle-guided semantic
/// stage over a catalog, memoizing per-entity results.
pub struct SearchOrchestrator<C, O> {
    catalog: C,
    oracle: O,
    cache: SearchCache,
    config: SearchConfig,
}

impl<C: CatalogStore, O: IntentOracle> SearchOrchestrator<C, O> {
    pub fn new(catalog: C, oracle: O, config: SearchConfig) -> Self {
        Self {
            catalog,
            oracle,
            cache: SearchCache::new(config.cache),
            config,
        }
    }

    pub fn cache(&self) -> &SearchCache {
        &self.cache
    }

    /// Best catalog matches for `entity`, at most `top_k`, best first.
    ///
    /// An empty list means nothing matched; errors come only from the
    /// catalog or a configured oracle.
    pub async fn search_activities(
        &self,
        entity: &QueryEntity,
        lang: Lang,
    ) -> Result<Vec<MatchResult>, SearchError> {
        let lang = lang.resolve(&entity.name);
        let key = CacheKey::new(entity, lang);
        if let Some(hit) = self.cache.get(&key) {
            debug!(entity = %entity.name, results = hit.len(), "cache hit");
            return Ok(hit);
        }
        debug!(entity = %entity.name, "cache miss");

        let results = self.search_uncached(entity, lang).await?;
        self.cache.insert(key, results.clone());
        Ok(results)
    }

    async fn search_uncached(
        &self,
        entity: &QueryEntity,
        lang: Lang,
    ) -> Result<Vec<MatchResult>, SearchError> {
        let exact = self.exact_stage(entity).await?;
        if !exact.is_empty() {
            info!(entity = %entity.name, results = exact.len(), "exact match");
            return Ok(exact);
        }

        let retrieval = retrieve(&self.catalog, entity).await?;
        let ranked = score::rank_above(
            entity,
            &retrieval.records,
            self.config.top_k,
            self.config.min_score,
        );
        if !ranked.is_empty() {
            info!(
                entity = %entity.name,
                category = ?retrieval.category,
                candidates = retrieval.records.len(),
                results = ranked.len(),
                top = ranked[0].relevance_score,
                "keyword match"
            );
            return Ok(ranked);
        }

        let semantic = self.semantic_stage(entity, lang).await?;
        info!(entity = %entity.name, results = semantic.len(), "semantic stage finished");
        Ok(semantic)
    }

    async fn exact_stage(&self, entity: &QueryEntity) -> Result<Vec<MatchResult>, CatalogError> {
        for variant in exact_variants(&entity.name) {
            let mut records = self.catalog.exact_match(&variant).await?;
            if records.is_empty() {
                continue;
            }
            dedup_by_id(&mut records);
            let mut matches: Vec<MatchResult> = records
                .into_iter()
                .map(|record| MatchResult {
                    record,
                    relevance_score: 1.0,
                    match_type: MatchType::Exact,
                })
                .collect();
            sort_matches(&mut matches);
            matches.truncate(self.config.top_k);
            return Ok(matches);
        }
        Ok(Vec::new())
    }

    /// Ask the oracle where in the catalog the entity should live, then rank
    /// what the hierarchy and keyword lookups return. Skipped without an oracle.
    async fn semantic_stage(
        &self,
        entity: &QueryEntity,
        lang: Lang,
    ) -> Result<Vec<MatchResult>, SearchError> {
        let sectors = self.catalog.all_sectors().await?;
        let strategy = match self
            .oracle
            .propose_strategy(&entity.name, &sectors, lang)
            .await
        {
            Ok(strategy) => strategy,
            Err(OracleError::ApiKeyNotSet) => {
                debug!(entity = %entity.name, "no oracle configured, skipping semantic stage");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        debug!(
            entity = %entity.name,
            sector = ?strategy.sector,
            subsector = ?strategy.subsector,
            keywords = ?strategy.keywords,
            "search strategy"
        );

        let mut records = self.strategy_records(&strategy).await?;
        dedup_by_id(&mut records);

        let mut expanded = entity.clone();
        for keyword in &strategy.keywords {
            expanded.name.push(' ');
            expanded.name.push_str(keyword);
        }
        let mut ranked =
            score::rank_above(&expanded, &records, self.config.top_k, f64::MIN_POSITIVE);
        for m in &mut ranked {
            m.match_type = MatchType::Semantic;
        }
        Ok(ranked)
    }

    async fn strategy_records(
        &self,
        strategy: &SearchStrategy,
    ) -> Result<Vec<EmissionFactorRecord>, CatalogError> {
        let limit = self.config.semantic_limit;
        let mut records = Vec::new();

        if strategy.sector.is_some() || strategy.subsector.is_some() {
            let scoped = |activity: Option<&String>| HierarchyQuery {
                sector: strategy.sector.clone(),
                subsector: strategy.subsector.clone(),
                activity: activity.cloned(),
                limit,
            };
            for keyword in &strategy.keywords {
                records.extend(self.catalog.by_hierarchy(&scoped(Some(keyword))).await?);
            }
            if records.is_empty() {
                records = self.catalog.by_hierarchy(&scoped(None)).await?;
            }
        }

        for keyword in &strategy.keywords {
            records.extend(self.catalog.fuzzy_match(keyword, limit).await?);
        }
        Ok(records)
    }

    /// Search every entity concurrently. A failure is reported for its
    /// entity and never cancels the others.
    pub async fn batch_search_activities(&self, entities: &[QueryEntity], lang: Lang) -> BatchOutcome {
        let outcomes = join_all(entities.iter().map(|e| self.search_activities(e, lang))).await;

        let mut batch = BatchOutcome::default();
        for (entity, outcome) in entities.iter().zip(outcomes) {
            match outcome {
                Ok(matches) => batch.results.push(EntityMatches {
                    entity: entity.clone(),
                    matches,
                }),
                Err(error) => {
                    warn!(entity = %entity.name, %error, "search failed (continuing with other entities)");
                    batch.errors.push(EntityFailure {
                        entity: entity.clone(),
                        error,
                    });
                }
            }
        }
        batch
    }

    pub fn calculate(
        &self,
        entity: &QueryEntity,
        matched: &MatchResult,
        lang: Lang,
    ) -> CalculationResult {
        calc::calculate(entity, matched, lang)
    }

    /// Run the whole pipeline for a natural-language request. Failures are
    /// reported inside the returned report.
    pub async fn process_user_query(&self, query: &str, lang: Lang) -> QueryReport {
        let lang = lang.resolve(query);
        let extraction = match self.oracle.extract(query, lang).await {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!(error = %e, "intent extraction failed");
                return QueryReport::failed(query, lang, e.to_string());
            }
        };
        info!(
            intent = %extraction.intent,
            entities = extraction.entities.len(),
            confidence = extraction.confidence,
            "intent extracted"
        );

        let batch = self
            .batch_search_activities(&extraction.entities, lang)
            .await;

        let mut calculations = Vec::new();
        let mut unmatched = Vec::new();
        for EntityMatches { entity, matches } in batch.results {
            match matches.first() {
                Some(best) => calculations.push(self.calculate(&entity, best, lang)),
                None => unmatched.push(Unmatched {
                    name: entity.name,
                    error: None,
                }),
            }
        }
        unmatched.extend(batch.errors.into_iter().map(|f| Unmatched {
            name: f.entity.name,
            error: Some(f.error.to_string()),
        }));

        QueryReport::new(
            query,
            lang,
            Some(extraction.intent),
            calculations,
            unmatched,
            extraction.missing_info,
        )
    }
}

fn dedup_by_id(records: &mut Vec<EmissionFactorRecord>) {
    let mut seen = HashSet::new();
    records.retain(|r| seen.insert(r.id.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::catalog::MemoryCatalog;
    use crate::model::fixtures::record;
    use crate::model::{ScenarioDetails, TransportDetails, WasteDetails};
    use crate::oracle::IntentExtraction;
    use crate::report::QueryStatus;

    #[derive(Default)]
    struct Calls {
        exact: usize,
        fuzzy: usize,
        hierarchy: usize,
    }

    struct MockCatalog {
        inner: MemoryCatalog,
        calls: Mutex<Calls>,
        fail: bool,
    }

    impl MockCatalog {
        fn new(records: Vec<EmissionFactorRecord>) -> Self {
            Self {
                inner: MemoryCatalog::new(records),
                calls: Mutex::new(Calls::default()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(vec![])
            }
        }

        fn lookups(&self) -> usize {
            let calls = self.calls.lock().unwrap();
            calls.exact + calls.fuzzy + calls.hierarchy
        }

        fn check(&self) -> Result<(), CatalogError> {
            if self.fail {
                Err(CatalogError::RateLimited)
            } else {
                Ok(())
            }
        }
    }

    impl CatalogStore for MockCatalog {
        async fn exact_match(&self, name: &str) -> Result<Vec<EmissionFactorRecord>, CatalogError> {
            self.calls.lock().unwrap().exact += 1;
            self.check()?;
            self.inner.exact_match(name).await
        }

        async fn fuzzy_match(
            &self,
            substring: &str,
            limit: usize,
        ) -> Result<Vec<EmissionFactorRecord>, CatalogError> {
            self.calls.lock().unwrap().fuzzy += 1;
            self.check()?;
            self.inner.fuzzy_match(substring, limit).await
        }

        async fn by_hierarchy(
            &self,
            query: &HierarchyQuery,
        ) -> Result<Vec<EmissionFactorRecord>, CatalogError> {
            self.calls.lock().unwrap().hierarchy += 1;
            self.check()?;
            self.inner.by_hierarchy(query).await
        }

        async fn all_sectors(&self) -> Result<Vec<String>, CatalogError> {
            self.check()?;
            self.inner.all_sectors().await
        }

        async fn subsectors_of(&self, sector: &str) -> Result<Vec<String>, CatalogError> {
            self.check()?;
            self.inner.subsectors_of(sector).await
        }
    }

    struct MockOracle {
        extraction: Mutex<VecDeque<Result<IntentExtraction, OracleError>>>,
        strategies: Mutex<VecDeque<Result<SearchStrategy, OracleError>>>,
        strategy_requests: Mutex<Vec<String>>,
    }

    impl MockOracle {
        fn new() -> Self {
            Self {
                extraction: Mutex::new(VecDeque::new()),
                strategies: Mutex::new(VecDeque::new()),
                strategy_requests: Mutex::new(Vec::new()),
            }
        }

        fn extracting(self, extraction: Result<IntentExtraction, OracleError>) -> Self {
            self.extraction.lock().unwrap().push_back(extraction);
            self
        }

        fn proposing(self, strategy: Result<SearchStrategy, OracleError>) -> Self {
            self.strategies.lock().unwrap().push_back(strategy);
            self
        }

        fn strategy_requests(&self) -> Vec<String> {
            self.strategy_requests.lock().unwrap().clone()
        }
    }

    impl IntentOracle for MockOracle {
        async fn extract(&self, _query: &str, _lang: Lang) -> Result<IntentExtraction, OracleError> {
            self.extraction
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(OracleError::RateLimited))
        }

        async fn propose_strategy(
            &self,
            name: &str,
            _sectors: &[String],
            _lang: Lang,
        ) -> Result<SearchStrategy, OracleError> {
            self.strategy_requests.lock().unwrap().push(name.to_string());
            self.strategies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(OracleError::RateLimited))
        }
    }

    fn catalog() -> MockCatalog {
        let mut hotel = record("h1", "Accommodation - room per night", "Hotels", "kg/room-night", 10.4);
        hotel.subsector = Some("Accommodation".into());
        MockCatalog::new(vec![
            record("t1", "Rigid truck 26-32t - Container transport - Diesel", "Transport", "kg/tonne-km", 0.000116),
            record("t2", "Rigid truck 7.5-17t - Diesel", "Transport", "kg/tonne-km", 0.0002),
            record("p1", "Paper - recycled", "Materials", "kg/kg", 0.5),
            hotel,
        ])
    }

    fn orchestrator(oracle: MockOracle) -> SearchOrchestrator<MockCatalog, MockOracle> {
        SearchOrchestrator::new(catalog(), oracle, SearchConfig::default())
    }

    fn truck_entity() -> QueryEntity {
        QueryEntity::new("30-ton rigid diesel truck container transport")
            .with_quantity(30.0, "tonne")
            .with_scenario(ScenarioDetails::Transport(TransportDetails {
                vehicle_type: Some("rigid truck".into()),
                fuel_type: Some("diesel".into()),
                distance: Some(75.0),
                distance_unit: Some("km".into()),
                ..Default::default()
            }))
    }

    fn hotel_strategy() -> SearchStrategy {
        SearchStrategy {
            sector: Some("Hotels".into()),
            subsector: None,
            keywords: vec!["accommodation".into()],
        }
    }

    fn extraction(entities: Vec<QueryEntity>) -> IntentExtraction {
        IntentExtraction {
            intent: "calculate_emission".into(),
            entities,
            missing_info: vec![],
            confidence: 0.9,
        }
    }

    #[tokio::test]
    async fn exact_title_wins() {
        let engine = orchestrator(MockOracle::new());
        let results = engine
            .search_activities(&QueryEntity::new("  paper   -recycled "), Lang::En)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.id, "p1");
        assert_eq!(results[0].relevance_score, 1.0);
        assert_eq!(results[0].match_type, MatchType::Exact);
    }

    #[tokio::test]
    async fn keyword_stage_ranks_by_range() {
        let oracle = MockOracle::new();
        let engine = orchestrator(oracle);
        let results = engine
            .search_activities(&truck_entity(), Lang::En)
            .await
            .unwrap();
        assert_eq!(results[0].record.id, "t1");
        assert_eq!(results[0].match_type, MatchType::Fuzzy);
        assert!(results.iter().all(|m| m.record.id != "t2"));
        assert!(engine.oracle.strategy_requests().is_empty());
    }

    #[tokio::test]
    async fn semantic_stage_uses_oracle_strategy() {
        let engine = orchestrator(MockOracle::new().proposing(Ok(hotel_strategy())));
        let results = engine
            .search_activities(&QueryEntity::new("hotel stay"), Lang::En)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.id, "h1");
        assert_eq!(results[0].match_type, MatchType::Semantic);
        assert_eq!(engine.oracle.strategy_requests(), ["hotel stay"]);
    }

    #[tokio::test]
    async fn repeated_search_is_served_from_cache() {
        let engine = orchestrator(MockOracle::new().proposing(Ok(hotel_strategy())));
        let entity = QueryEntity::new("hotel stay");

        let first = engine.search_activities(&entity, Lang::En).await.unwrap();
        let lookups = engine.catalog.lookups();
        let second = engine.search_activities(&entity, Lang::En).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(engine.oracle.strategy_requests().len(), 1);
        assert_eq!(engine.catalog.lookups(), lookups);
    }

    #[tokio::test]
    async fn scenario_details_take_part_in_cache_identity() {
        let catalog = MockCatalog::new(vec![
            record("w1", "Plastic waste - Landfill", "Waste", "kg/tonne", 9.0),
            record("w2", "Plastic waste - Incineration", "Waste", "kg/tonne", 21.0),
        ]);
        let engine = SearchOrchestrator::new(catalog, MockOracle::new(), SearchConfig::default());
        let waste = |method: &str| {
            QueryEntity::new("plastic waste").with_scenario(ScenarioDetails::Waste(WasteDetails {
                waste_type: Some("plastic".into()),
                processing_method: Some(method.into()),
                ..Default::default()
            }))
        };

        let landfill = engine.search_activities(&waste("landfill"), Lang::En).await.unwrap();
        let incineration = engine
            .search_activities(&waste("incineration"), Lang::En)
            .await
            .unwrap();

        assert_eq!(landfill[0].record.id, "w1");
        assert_eq!(incineration[0].record.id, "w2");
        assert_eq!(engine.cache().len(), 2);
    }

    #[tokio::test]
    async fn empty_results_are_cached() {
        let engine = orchestrator(MockOracle::new().proposing(Ok(SearchStrategy::default())));
        let entity = QueryEntity::new("quantum teleportation");

        assert!(engine.search_activities(&entity, Lang::En).await.unwrap().is_empty());
        assert!(engine.search_activities(&entity, Lang::En).await.unwrap().is_empty());
        assert_eq!(engine.oracle.strategy_requests().len(), 1);
        assert_eq!(engine.cache().len(), 1);
    }

    #[tokio::test]
    async fn missing_api_key_skips_semantic_stage() {
        let engine = orchestrator(MockOracle::new().proposing(Err(OracleError::ApiKeyNotSet)));
        let results = engine
            .search_activities(&QueryEntity::new("hotel stay"), Lang::En)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn oracle_failure_is_an_error_and_not_cached() {
        let engine = orchestrator(MockOracle::new());
        let err = engine
            .search_activities(&QueryEntity::new("hotel stay"), Lang::En)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Oracle(OracleError::RateLimited)));
        assert!(engine.cache().is_empty());
    }

    #[tokio::test]
    async fn batch_isolates_failures() {
        let engine = orchestrator(MockOracle::new());
        let entities = vec![truck_entity(), QueryEntity::new("hotel stay")];
        let batch = engine.batch_search_activities(&entities, Lang::En).await;

        assert_eq!(batch.results.len(), 1);
        assert_eq!(batch.results[0].matches[0].record.id, "t1");
        assert_eq!(batch.errors.len(), 1);
        assert_eq!(batch.errors[0].entity.name, "hotel stay");
    }

    #[tokio::test]
    async fn catalog_failure_surfaces_per_entity() {
        let engine = SearchOrchestrator::new(MockCatalog::failing(), MockOracle::new(), SearchConfig::default());
        let batch = engine
            .batch_search_activities(&[QueryEntity::new("truck")], Lang::En)
            .await;
        assert!(batch.results.is_empty());
        assert!(matches!(batch.errors[0].error, SearchError::Catalog(CatalogError::RateLimited)));
    }

    #[tokio::test]
    async fn truck_query_end_to_end() {
        let oracle = MockOracle::new().extracting(Ok(extraction(vec![truck_entity()])));
        let engine = orchestrator(oracle);
        let report = engine
            .process_user_query("30-ton rigid diesel truck, 75 km container transport", Lang::Auto)
            .await;

        assert_eq!(report.status, QueryStatus::Complete);
        assert_eq!(report.language, Lang::En);
        assert_eq!(report.calculations.len(), 1);
        let calc = &report.calculations[0];
        assert_eq!(calc.record.id, "t1");
        assert!((calc.total_emission - 0.261).abs() < 1e-9);
        assert!((report.total_emission - 0.261).abs() < 1e-9);
    }

    #[tokio::test]
    async fn paper_in_grams_end_to_end() {
        let entity = QueryEntity::new("paper - recycled").with_quantity(100.0, "g");
        let engine = orchestrator(MockOracle::new().extracting(Ok(extraction(vec![entity]))));
        let report = engine.process_user_query("100 g of recycled paper", Lang::En).await;

        assert_eq!(report.status, QueryStatus::Complete);
        assert!((report.total_emission - 0.05).abs() < 1e-12);
        assert!(report.calculations[0].notes.iter().any(|n| n.contains("Converted 100 g to 0.1 kg")));
    }

    #[tokio::test]
    async fn missing_quantity_needs_more_info() {
        let entity = QueryEntity::new("rigid truck 26-32t - container transport - diesel");
        let engine = orchestrator(MockOracle::new().extracting(Ok(extraction(vec![entity]))));
        let report = engine.process_user_query("container truck", Lang::En).await;

        assert_eq!(report.status, QueryStatus::NeedsMoreInfo);
        let calc = &report.calculations[0];
        assert_eq!(calc.total_emission, 0.0);
        assert!(!calc.notes.is_empty());
    }

    #[tokio::test]
    async fn unmatched_and_failed_entities_are_reported() {
        let oracle = MockOracle::new()
            .extracting(Ok(extraction(vec![
                truck_entity(),
                QueryEntity::new("quantum teleportation"),
                QueryEntity::new("hotel stay"),
            ])))
            .proposing(Ok(SearchStrategy::default()));
        let engine = orchestrator(oracle);
        let report = engine.process_user_query("mixed", Lang::En).await;

        assert_eq!(report.status, QueryStatus::Partial);
        assert_eq!(report.calculations.len(), 1);
        assert_eq!(report.unmatched.len(), 2);
        assert!(report.unmatched.iter().any(|u| u.error.is_none()));
        assert!(report.unmatched.iter().any(|u| u.error.is_some()));
    }

    #[tokio::test]
    async fn extraction_failure_is_a_failed_report() {
        let engine = orchestrator(MockOracle::new().extracting(Err(OracleError::ApiKeyNotSet)));
        let report = engine.process_user_query("트럭 운송 75km", Lang::Auto).await;
        assert_eq!(report.status, QueryStatus::Failed);
        assert_eq!(report.language, Lang::Ko);
        assert!(report.error.unwrap().contains("GEMINI_API_KEY"));
    }

    #[tokio::test]
    async fn no_entities_needs_more_info() {
        let mut nothing = extraction(vec![]);
        nothing.missing_info = vec!["what activity".into()];
        let engine = orchestrator(MockOracle::new().extracting(Ok(nothing)));
        let report = engine.process_user_query("hello", Lang::En).await;
        assert_eq!(report.status, QueryStatus::NeedsMoreInfo);
        assert_eq!(report.missing_info, ["what activity"]);
    }
}
