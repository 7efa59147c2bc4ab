//! Hosted model triage backend (Gemini `generateContent`).

use serde::{Deserialize, Serialize};

use crate::prompts::{make_triage_prompt, RESPONSE_SCHEMA};
use crate::suggestion::{
    parse_triage_response, TriageError, TriageProvider, TriageRequest, TriageResult,
    TriageSuggestion,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Blocking HTTP client for the hosted triage model.
pub struct GeminiTriage {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl GeminiTriage {
    /// Create a client against the public endpoint.
    pub fn new(api_key: String) -> TriageResult<Self> {
        Self::with_endpoint(DEFAULT_BASE_URL, DEFAULT_MODEL, api_key)
    }

    /// Create a client against a custom endpoint and model.
    pub fn with_endpoint(base_url: &str, model: &str, api_key: String) -> TriageResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| TriageError::Backend(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            client,
        })
    }

    /// Read the API key from `API_KEY`.
    pub fn from_env() -> TriageResult<Self> {
        let api_key = std::env::var("API_KEY")
            .map_err(|_| TriageError::Backend("API_KEY is not set".into()))?;
        Self::new(api_key)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

impl TriageProvider for GeminiTriage {
    fn suggest(&self, request: &TriageRequest) -> TriageResult<TriageSuggestion> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: make_triage_prompt(request),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: serde_json::from_str(RESPONSE_SCHEMA)?,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| TriageError::Backend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(TriageError::Backend(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| TriageError::Backend(e.to_string()))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| TriageError::InvalidFormat("Response has no candidates".into()))?;

        tracing::debug!(model = %self.model, "Triage response received");
        parse_triage_response(&text)
    }
}
