use std::env;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::parse::{parse_json, response_text};
use super::types::{
    ApiError, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
};
use super::validate::{self, RawIntent, RawStrategy};
use super::{IntentExtraction, IntentOracle, OracleError, SearchStrategy, prompt};
use crate::lang::Lang;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Clone)]
struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Intent oracle backed by Gemini `generateContent` in JSON output mode.
#[derive(Clone, Debug)]
pub struct GeminiOracle {
    http: Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
}

impl GeminiOracle {
    pub fn from_env(http: Client) -> Result<Self, OracleError> {
        let api_key = env::var("GEMINI_API_KEY").map_err(|_| OracleError::ApiKeyNotSet)?;
        if api_key.trim().is_empty() {
            return Err(OracleError::ApiKeyNotSet);
        }
        let model = env::var("GEMINI_MODEL")
            .ok()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Ok(Self {
            http,
            api_key: ApiKey(api_key.trim().to_string()),
            model,
            base_url: API_BASE.to_string(),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: ApiKey("test-key".to_string()),
            model: DEFAULT_MODEL.to_string(),
            base_url: base_url.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<GenerateContentResponse, OracleError> {
        let url = format!("{}/{}:generateContent", self.base_url, self.model);

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
                role: Some("user".to_string()),
            }],
            generation_config: GenerationConfig::json(),
        };

        debug_assert!(
            url.starts_with("https://") || cfg!(test),
            "API key must only be sent over HTTPS"
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key.0)
            .header("User-Agent", crate::USER_AGENT)
            .json(&request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Gemini API rate limited");
            return Err(OracleError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if let Ok(body) = serde_json::from_str::<GenerateContentResponse>(&text)
                && let Some(err) = &body.error
            {
                let classified = classify_api_error(err);
                warn!(error = %classified, "Gemini API error");
                return Err(classified);
            }
            let snippet: String = text.chars().take(200).collect();
            warn!(status = %status, "Gemini API error (no structured body)");
            return Err(OracleError::Api {
                code: status.as_u16(),
                message: format!("HTTP {status}: {snippet}"),
            });
        }

        let body: GenerateContentResponse = response.json().await?;
        debug!(model = %self.model, "gemini generate complete");

        if let Some(err) = &body.error {
            let classified = classify_api_error(err);
            warn!(error = %classified, "Gemini API error in 200 response");
            return Err(classified);
        }

        Ok(body)
    }

    /// Generate with retries on transient errors, then decode the JSON answer.
    async fn generate_json<T: DeserializeOwned>(&self, prompt: &str) -> Result<T, OracleError> {
        let mut last_err = None;
        for attempt in 0..MAX_RETRIES {
            match self.generate(prompt).await {
                Ok(response) => {
                    let text = response_text(&response).ok_or(OracleError::EmptyResponse)?;
                    return parse_json(&text);
                }
                Err(e) if is_retriable(&e) => {
                    last_err = Some(e);
                    if attempt + 1 < MAX_RETRIES {
                        let delay_ms = jittered_backoff(attempt);
                        debug!(
                            attempt = attempt + 1,
                            delay_ms, "retrying after transient error"
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or(OracleError::RateLimited))
    }
}

impl IntentOracle for GeminiOracle {
    async fn extract(&self, query: &str, lang: Lang) -> Result<IntentExtraction, OracleError> {
        let raw: RawIntent = self.generate_json(&prompt::extraction(query, lang)).await?;
        let extraction = validate::intent(raw, query);
        debug!(
            entities = extraction.entities.len(),
            missing = extraction.missing_info.len(),
            "intent extracted"
        );
        Ok(extraction)
    }

    async fn propose_strategy(
        &self,
        name: &str,
        sectors: &[String],
        lang: Lang,
    ) -> Result<SearchStrategy, OracleError> {
        let raw: RawStrategy = self
            .generate_json(&prompt::strategy(name, sectors, lang))
            .await?;
        Ok(validate::strategy(raw, sectors))
    }
}

fn is_retriable(e: &OracleError) -> bool {
    matches!(
        e,
        OracleError::RateLimited
            | OracleError::Api {
                code: 500..=599,
                ..
            }
    )
}

/// Equal jitter backoff: base/2 + rand(0, base/2).
fn jittered_backoff(attempt: u32) -> u64 {
    let base = INITIAL_BACKOFF_MS * 2u64.pow(attempt);
    let half = base / 2;
    half + fastrand::u64(..half.max(1))
}

fn classify_api_error(err: &ApiError) -> OracleError {
    let message = err
        .message
        .clone()
        .unwrap_or_else(|| "Unknown error".to_string());

    match err.code {
        Some(429) => OracleError::RateLimited,
        Some(403) => OracleError::QuotaExhausted(message),
        Some(code) => OracleError::Api { code, message },
        None => OracleError::Api {
            code: 0,
            message: format!("Unknown error (no status code): {message}"),
        },
    }
}


#[cfg(test)]
mod http_tests {
    use super::*;
    use crate::model::ScenarioDetails;
    use wiremock::matchers::{body_partial_json, header, method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn answer(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": text}], "role": "model"},
                "finishReason": "STOP"
            }]
        })
    }

    #[tokio::test]
    async fn extract_sends_json_mode_and_validates() {
        let server = MockServer::start().await;
        let payload = serde_json::json!({
            "intent": "calculate_emission",
            "entities": [{
                "name": "rigid diesel truck container transport",
                "quantity": 30, "unit": "tonne", "confidence": 0.9,
                "entityType": "transport",
                "scenarioDetails": {"distance": 75, "distanceUnit": "km", "fuelType": "diesel"}
            }],
            "missingInfo": [],
            "confidence": 0.9
        });
        Mock::given(method("POST"))
            .and(path_regex(r":generateContent$"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "generationConfig": {"responseMimeType": "application/json"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer(&payload.to_string())))
            .mount(&server)
            .await;

        let oracle = GeminiOracle::with_base_url(Client::new(), &server.uri());
        let out = oracle
            .extract("a 30-ton diesel truck hauls containers 75km", Lang::En)
            .await
            .unwrap();
        assert_eq!(out.entities.len(), 1);
        let e = &out.entities[0];
        assert_eq!(e.quantity, Some(30.0));
        assert!(matches!(e.scenario, Some(ScenarioDetails::Transport(_))));
    }

    #[tokio::test]
    async fn strategy_returns_known_sector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r":generateContent$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer(
                r#"{"sector": "Hotels", "subsector": null, "keywords": ["hotel night"]}"#,
            )))
            .mount(&server)
            .await;

        let oracle = GeminiOracle::with_base_url(Client::new(), &server.uri());
        let s = oracle
            .propose_strategy("hotel stay", &["Hotels".into()], Lang::En)
            .await
            .unwrap();
        assert_eq!(s.sector.as_deref(), Some("Hotels"));
        assert_eq!(s.keywords, ["hotel night"]);
    }

    #[tokio::test]
    async fn empty_candidate_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r":generateContent$"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"candidates": []})),
            )
            .mount(&server)
            .await;

        let oracle = GeminiOracle::with_base_url(Client::new(), &server.uri());
        let result = oracle.extract("x", Lang::En).await;
        assert!(matches!(result, Err(OracleError::EmptyResponse)));
    }

    #[tokio::test]
    async fn quota_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r":generateContent$"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": {"code": 403, "message": "Quota exceeded"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let oracle = GeminiOracle::with_base_url(Client::new(), &server.uri());
        let result = oracle.extract("x", Lang::En).await;
        assert!(matches!(result, Err(OracleError::QuotaExhausted(_))));
    }

    #[tokio::test]
    async fn error_field_in_200_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r":generateContent$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": {"code": 400, "message": "Bad request"}
            })))
            .mount(&server)
            .await;

        let oracle = GeminiOracle::with_base_url(Client::new(), &server.uri());
        match oracle.extract("x", Lang::En).await {
            Err(OracleError::Api { code: 400, message }) => assert_eq!(message, "Bad request"),
            other => panic!("expected Api(400), got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_answer_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r":generateContent$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer("I cannot help")))
            .mount(&server)
            .await;

        let oracle = GeminiOracle::with_base_url(Client::new(), &server.uri());
        let result = oracle.extract("x", Lang::En).await;
        assert!(matches!(result, Err(OracleError::MalformedPayload(_))));
    }
}
