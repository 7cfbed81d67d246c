//! Client for the Generative Language REST API (Gemini models).
//!
//! Structured output is requested through
//! `generationConfig.responseJsonSchema`; the JSON text of the first
//! candidate is parsed and handed back to the caller.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::error::ModelError;
use super::{GenerationRequest, GenerativeModel};

/// Largest page the model listing endpoint serves.
const MODEL_PAGE_SIZE: &str = "1000";

/// Connection settings for [`GeminiClient`].
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key; requests fail with [`ModelError::MissingApiKey`] when unset.
    pub api_key: Option<String>,
    /// Model identifier, without the `models/` prefix.
    pub model: String,
    /// API root, without a trailing `/v1beta`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl GeminiConfig {
    pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
    pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

    /// Config for the default model and endpoint.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            model: Self::DEFAULT_MODEL.to_string(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

/// [`GenerativeModel`] backed by the hosted Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, ModelError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn api_key(&self) -> Result<&str, ModelError> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ModelError::MissingApiKey)
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/v1beta/{path}",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// List the names of all models visible to the API key.
    ///
    /// Follows `nextPageToken` until the listing is exhausted. Names are
    /// returned without the `models/` prefix.
    pub async fn list_models(&self) -> Result<Vec<String>, ModelError> {
        let key = self.api_key()?;
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self
                .http
                .get(self.endpoint("models"))
                .query(&[("pageSize", MODEL_PAGE_SIZE)]);
            if let Some(token) = &page_token {
                req = req.query(&[("pageToken", token)]);
            }

            let resp = req.header("x-goog-api-key", key).send().await?;
            let page: ListModelsResponse = check_response(resp).await?.json().await?;

            names.extend(page.models.into_iter().map(|m| {
                m.name
                    .strip_prefix("models/")
                    .map(str::to_string)
                    .unwrap_or(m.name)
            }));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(names)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<serde_json::Value, ModelError> {
        let key = self.api_key()?;
        let url = self.endpoint(&format!("models/{}:generateContent", self.config.model));

        let body = serde_json::json!({
            "contents": [
                { "role": "user", "parts": [ { "text": request.prompt } ] }
            ],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseJsonSchema": request.response_schema,
            },
        });

        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await?;
        let payload: GenerateContentResponse = check_response(resp).await?.json().await?;

        let text = payload.into_text()?;
        debug!(flow = request.flow, response_chars = text.len(), "model responded");

        serde_json::from_str(&text).map_err(|e| {
            warn!(flow = request.flow, error = %e, "model returned non-JSON text");
            ModelError::Parse(e.to_string())
        })
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

impl GenerateContentResponse {
    /// Concatenate the text parts of the first candidate.
    fn into_text(self) -> Result<String, ModelError> {
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);
        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = block_reason
                .map(|r| format!("prompt blocked: {r}"))
                .unwrap_or_else(|| "no candidates returned".to_string());
            return Err(ModelError::EmptyResponse(reason));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = candidate
                .finish_reason
                .map(|r| format!("finish reason {r}"))
                .unwrap_or_else(|| "candidate had no text".to_string());
            return Err(ModelError::EmptyResponse(reason));
        }
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Response checks
// ---------------------------------------------------------------------------

/// Map 429 and other non-success statuses to [`ModelError`].
async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, ModelError> {
    if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(ModelError::RateLimited {
            retry_after_secs: parse_retry_after(&resp),
        });
    }
    if !resp.status().is_success() {
        return Err(ModelError::Api {
            status: resp.status().as_u16(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

/// Parse the `Retry-After` header as seconds, falling back to 60 s.
fn parse_retry_after(resp: &reqwest::Response) -> u64 {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn text_joins_parts_of_first_candidate() {
        let resp = parse(serde_json::json!({
            "candidates": [
                { "content": { "parts": [ { "text": "{\"a\":" }, { "text": "1}" } ] } },
                { "content": { "parts": [ { "text": "ignored" } ] } }
            ]
        }));
        assert_eq!(resp.into_text().unwrap(), "{\"a\":1}");
    }

    #[test]
    fn blocked_prompt_is_empty_response() {
        let resp = parse(serde_json::json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }));
        let err = resp.into_text().unwrap_err();
        assert!(matches!(err, ModelError::EmptyResponse(ref m) if m.contains("SAFETY")));
    }

    #[test]
    fn candidate_without_text_reports_finish_reason() {
        let resp = parse(serde_json::json!({
            "candidates": [ { "finishReason": "MAX_TOKENS" } ]
        }));
        let err = resp.into_text().unwrap_err();
        assert!(matches!(err, ModelError::EmptyResponse(ref m) if m.contains("MAX_TOKENS")));
    }

    #[test]
    fn missing_key_is_reported_before_any_request() {
        let client = GeminiClient::new(GeminiConfig::new(None)).unwrap();
        assert!(matches!(client.api_key(), Err(ModelError::MissingApiKey)));

        let client = GeminiClient::new(GeminiConfig::new(Some(String::new()))).unwrap();
        assert!(matches!(client.api_key(), Err(ModelError::MissingApiKey)));
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let mut config = GeminiConfig::new(Some("k".into()));
        config.base_url = "http://localhost:9999/".into();
        let client = GeminiClient::new(config).unwrap();
        assert_eq!(
            client.endpoint("models"),
            "http://localhost:9999/v1beta/models"
        );
    }
}
