//! The language-model intent oracle: entity extraction and search strategy
//! proposals. Output is untrusted and always passes through [`validate`].

mod gemini;
mod parse;
mod prompt;
mod types;
pub mod validate;

pub use gemini::GeminiOracle;

use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::lang::Lang;
use crate::model::QueryEntity;

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("GEMINI_API_KEY not set. Get one at https://aistudio.google.com/apikey")]
    ApiKeyNotSet,

    #[error("API rate limit exceeded. Please retry later.")]
    RateLimited,

    #[error("API quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("oracle returned an empty answer")]
    EmptyResponse,

    #[error("oracle returned malformed JSON: {0}")]
    MalformedPayload(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Validated result of intent extraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentExtraction {
    pub intent: String,
    pub entities: Vec<QueryEntity>,
    pub missing_info: Vec<String>,
    pub confidence: f64,
}

/// Where in the catalog hierarchy to look for an entity the keyword search missed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchStrategy {
    pub sector: Option<String>,
    pub subsector: Option<String>,
    pub keywords: Vec<String>,
}

/// Structured extraction from natural language.
/// Implemented by `GeminiOracle`; mock implementations used in tests.
pub trait IntentOracle {
    async fn extract(&self, query: &str, lang: Lang) -> Result<IntentExtraction, OracleError>;

    async fn propose_strategy(
        &self,
        name: &str,
        sectors: &[String],
        lang: Lang,
    ) -> Result<SearchStrategy, OracleError>;
}

/// Oracle selected at startup. Without an API key every call fails with
/// [`OracleError::ApiKeyNotSet`] and the engine runs keyword search only.
#[derive(Debug)]
pub enum Oracle {
    Gemini(GeminiOracle),
    Disabled,
}

impl Oracle {
    pub fn from_env(http: Client) -> Self {
        match GeminiOracle::from_env(http) {
            Ok(gemini) => {
                info!(model = gemini.model(), "gemini oracle enabled");
                Self::Gemini(gemini)
            }
            Err(e) => {
                info!(reason = %e, "oracle disabled");
                Self::Disabled
            }
        }
    }
}

impl IntentOracle for Oracle {
    async fn extract(&self, query: &str, lang: Lang) -> Result<IntentExtraction, OracleError> {
        match self {
            Self::Gemini(g) => g.extract(query, lang).await,
            Self::Disabled => Err(OracleError::ApiKeyNotSet),
        }
    }

    async fn propose_strategy(
        &self,
        name: &str,
        sectors: &[String],
        lang: Lang,
    ) -> Result<SearchStrategy, OracleError> {
        match self {
            Self::Gemini(g) => g.propose_strategy(name, sectors, lang).await,
            Self::Disabled => Err(OracleError::ApiKeyNotSet),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_oracle_reports_missing_key() {
        let oracle = Oracle::Disabled;
        assert!(matches!(
            oracle.extract("x", Lang::En).await,
            Err(OracleError::ApiKeyNotSet)
        ));
        assert!(matches!(
            oracle.propose_strategy("x", &[], Lang::En).await,
            Err(OracleError::ApiKeyNotSet)
        ));
    }
}
