//! Read-only access to the emission-factor catalog.

mod http;
mod memory;

pub use http::HttpCatalog;
pub use memory::MemoryCatalog;

use std::path::Path;

use reqwest::Client;

use crate::model::EmissionFactorRecord;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog JSON error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid catalog URL: {0}")]
    InvalidUrl(String),

    #[error("catalog rate limit exceeded. Please retry later.")]
    RateLimited,

    #[error("catalog API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Lookup filter for [`CatalogStore::by_hierarchy`]. `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HierarchyQuery {
    pub sector: Option<String>,
    pub subsector: Option<String>,
    /// Substring of the record title.
    pub activity: Option<String>,
    pub limit: usize,
}

/// Catalog lookups the engine relies on.
/// Implemented by `MemoryCatalog` and `HttpCatalog`; mock implementations used in tests.
pub trait CatalogStore {
    /// Records whose title equals `name`, ignoring case.
    async fn exact_match(&self, name: &str) -> Result<Vec<EmissionFactorRecord>, CatalogError>;

    /// Records whose title contains `substring`, ignoring case, in catalog order.
    async fn fuzzy_match(
        &self,
        substring: &str,
        limit: usize,
    ) -> Result<Vec<EmissionFactorRecord>, CatalogError>;

    async fn by_hierarchy(
        &self,
        query: &HierarchyQuery,
    ) -> Result<Vec<EmissionFactorRecord>, CatalogError>;

    async fn all_sectors(&self) -> Result<Vec<String>, CatalogError>;

    async fn subsectors_of(&self, sector: &str) -> Result<Vec<String>, CatalogError>;
}

/// Catalog selected at startup from a file path or an http(s) URL.
pub enum Catalog {
    Memory(MemoryCatalog),
    Http(HttpCatalog),
}

impl Catalog {
    pub fn open(location: &str, http: Client) -> Result<Self, CatalogError> {
        if location.starts_with("http://") || location.starts_with("https://") {
            Ok(Self::Http(HttpCatalog::new(http, location)?))
        } else {
            Ok(Self::Memory(MemoryCatalog::from_json_file(Path::new(location))?))
        }
    }
}

impl CatalogStore for Catalog {
    async fn exact_match(&self, name: &str) -> Result<Vec<EmissionFactorRecord>, CatalogError> {
        match self {
            Self::Memory(c) => c.exact_match(name).await,
            Self::Http(c) => c.exact_match(name).await,
        }
    }

    async fn fuzzy_match(
        &self,
        substring: &str,
        limit: usize,
    ) -> Result<Vec<EmissionFactorRecord>, CatalogError> {
        match self {
            Self::Memory(c) => c.fuzzy_match(substring, limit).await,
            Self::Http(c) => c.fuzzy_match(substring, limit).await,
        }
    }

    async fn by_hierarchy(
        &self,
        query: &HierarchyQuery,
    ) -> Result<Vec<EmissionFactorRecord>, CatalogError> {
        match self {
            Self::Memory(c) => c.by_hierarchy(query).await,
            Self::Http(c) => c.by_hierarchy(query).await,
        }
    }

    async fn all_sectors(&self) -> Result<Vec<String>, CatalogError> {
        match self {
            Self::Memory(c) => c.all_sectors().await,
            Self::Http(c) => c.all_sectors().await,
        }
    }

    async fn subsectors_of(&self, sector: &str) -> Result<Vec<String>, CatalogError> {
        match self {
            Self::Memory(c) => c.subsectors_of(sector).await,
            Self::Http(c) => c.subsectors_of(sector).await,
        }
    }
}
