use serde::de::DeserializeOwned;
use tracing::warn;

use super::OracleError;
use super::types::GenerateContentResponse;

/// Concatenated text of the first candidate, `None` when blocked or empty.
pub fn response_text(response: &GenerateContentResponse) -> Option<String> {
    let candidate = response.candidates.as_ref().and_then(|c| c.first());

    let text = candidate
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .map(|p| p.text.as_str())
                .collect::<String>()
        })
        .filter(|text| !text.trim().is_empty());

    if text.is_none() {
        warn!(
            finish_reason = ?candidate.and_then(|c| c.finish_reason.as_deref()),
            "Gemini returned empty answer (safety filter or empty response)"
        );
    }
    text
}

/// Parse a JSON payload, tolerating Markdown code fences and surrounding prose.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, OracleError> {
    let body = strip_fences(text);
    match serde_json::from_str(body) {
        Ok(v) => Ok(v),
        Err(first) => {
            let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) else {
                return Err(OracleError::MalformedPayload(first.to_string()));
            };
            if start >= end {
                return Err(OracleError::MalformedPayload(first.to_string()));
            }
            serde_json::from_str(&body[start..=end])
                .map_err(|e| OracleError::MalformedPayload(e.to_string()))
        }
    }
}

fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
