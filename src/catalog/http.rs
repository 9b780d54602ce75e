use std::env;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::Client;
use tracing::{debug, warn};

use super::{CatalogError, CatalogStore, HierarchyQuery};
use crate::model::EmissionFactorRecord;

/// Characters to percent-encode in query values.
const QUERY_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'=')
    .add(b'?')
    .add(b'[')
    .add(b']');

/// Query set plus `/`, for values placed in a single path segment.
const SEGMENT_ENCODE_SET: &AsciiSet = &QUERY_ENCODE_SET.add(b'/');

fn encode_query(s: &str) -> String {
    utf8_percent_encode(s, QUERY_ENCODE_SET).to_string()
}

fn encode_segment(s: &str) -> String {
    utf8_percent_encode(s, SEGMENT_ENCODE_SET).to_string()
}

/// HTTP client for a catalog service exposing the record lookups as REST endpoints.
///
/// Auth: `FACTORSCOUT_CATALOG_TOKEN` is sent as a bearer token when set.
#[derive(Clone)]
pub struct HttpCatalog {
    http: Client,
    token: Option<String>,
    base_url: String,
}

impl HttpCatalog {
    pub fn new(http: Client, base_url: &str) -> Result<Self, CatalogError> {
        let parsed =
            url::Url::parse(base_url).map_err(|e| CatalogError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CatalogError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }
        let token = env::var("FACTORSCOUT_CATALOG_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        if token.is_some() {
            debug!("catalog token configured");
        }
        Ok(Self {
            http,
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        let mut req = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .header("User-Agent", crate::USER_AGENT);
        if let Some(ref token) = self.token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        req
    }

    /// `Ok(None)` on 404 so lookups of absent entries degrade to "no records".
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, CatalogError> {
        let response = self.request(path).send().await?;
        let status = response.status();
        match status.as_u16() {
            200..=299 => Ok(Some(response.json().await?)),
            404 => {
                debug!(path, "catalog returned 404");
                Ok(None)
            }
            429 => {
                warn!("catalog rate limited");
                Err(CatalogError::RateLimited)
            }
            _ => {
                let message = extract_error_message(
                    &response
                        .text()
                        .await
                        .unwrap_or_else(|_| format!("HTTP {status}")),
                );
                warn!(status = %status, "catalog API error");
                Err(CatalogError::Api {
                    code: status.as_u16(),
                    message,
                })
            }
        }
    }

    async fn get_list<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Vec<T>, CatalogError> {
        Ok(self.get_json(path).await?.unwrap_or_default())
    }
}

impl CatalogStore for HttpCatalog {
    async fn exact_match(&self, name: &str) -> Result<Vec<EmissionFactorRecord>, CatalogError> {
        self.get_list(&format!("/records/exact?name={}", encode_query(name)))
            .await
    }

    async fn fuzzy_match(
        &self,
        substring: &str,
        limit: usize,
    ) -> Result<Vec<EmissionFactorRecord>, CatalogError> {
        self.get_list(&format!(
            "/records/search?q={}&limit={limit}",
            encode_query(substring)
        ))
        .await
    }

    async fn by_hierarchy(
        &self,
        query: &HierarchyQuery,
    ) -> Result<Vec<EmissionFactorRecord>, CatalogError> {
        let mut path = format!("/records/hierarchy?limit={}", query.limit);
        for (key, value) in [
            ("sector", &query.sector),
            ("subsector", &query.subsector),
            ("activity", &query.activity),
        ] {
            if let Some(value) = value {
                path.push_str(&format!("&{key}={}", encode_query(value)));
            }
        }
        self.get_list(&path).await
    }

    async fn all_sectors(&self) -> Result<Vec<String>, CatalogError> {
        self.get_list("/sectors").await
    }

    async fn subsectors_of(&self, sector: &str) -> Result<Vec<String>, CatalogError> {
        self.get_list(&format!("/sectors/{}/subsectors", encode_segment(sector)))
            .await
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_reserved_characters() {
        assert_eq!(encode_query("truck & trailer"), "truck%20%26%20trailer");
        assert_eq!(encode_query("26-32t"), "26-32t");
        assert_eq!(encode_segment("Waste/Water"), "Waste%2FWater");
    }

    #[test]
    fn rejects_non_http_base_url() {
        assert!(matches!(
            HttpCatalog::new(Client::new(), "ftp://catalog.example.com"),
            Err(CatalogError::InvalidUrl(_))
        ));
        assert!(HttpCatalog::new(Client::new(), "not a url").is_err());
    }

    #[test]
    fn error_message_prefers_json_field() {
        assert_eq!(extract_error_message(r#"{"message":"boom"}"#), "boom");
        assert_eq!(extract_error_message("plain"), "plain");
    }
}
