//! Gemini `generateContent` transport.
//!
//! Request shape:
//!
//! ```json
//! {
//!   "contents": [{"parts": [{"text": "<user query>"}]}],
//!   "systemInstruction": {"parts": [{"text": "<system instruction>"}]},
//!   "generationConfig": {
//!     "responseMimeType": "application/json",
//!     "responseSchema": {"type": "OBJECT", ...}
//!   }
//! }
//! ```
//!
//! Success envelope: `{"candidates": [{"content": {"parts": [{"text": "<json>"}]}}]}`.

use async_trait::async_trait;
use sentinel_core::{AuditRequest, SchemaSpec};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{secrets::ApiCredential, RawEnvelope, Transport, TransportError};
use crate::config::ClientConfig;

/// Header carrying the API key. Keeps the key out of request URLs.
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// MIME type requested for structured output.
pub const JSON_MIME_TYPE: &str = "application/json";

/// Wire body of a `generateContent` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Content {
    parts: Vec<TextPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: SchemaSpec,
}

impl Content {
    fn text(text: &str) -> Self {
        Self {
            parts: vec![TextPart {
                text: text.to_string(),
            }],
        }
    }
}

impl From<&AuditRequest> for GenerateContentRequest {
    fn from(request: &AuditRequest) -> Self {
        Self {
            contents: vec![Content::text(request.user_query())],
            system_instruction: Content::text(request.system_instruction()),
            generation_config: GenerationConfig {
                response_mime_type: JSON_MIME_TYPE,
                response_schema: request.schema().clone(),
            },
        }
    }
}

/// Response envelope. Every level is optional; absence is a content fault.
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Pull the generated text out of a success envelope.
///
/// Returns a description of the first missing level on failure.
pub fn extract_text(body: &str) -> Result<String, String> {
    let envelope: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| format!("envelope is not JSON: {}", e))?;

    let candidate = envelope
        .candidates
        .and_then(|c| c.into_iter().next())
        .ok_or_else(|| "response has no candidates".to_string())?;
    let parts = candidate
        .content
        .and_then(|c| c.parts)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| "candidate has no content parts".to_string())?;

    parts
        .into_iter()
        .next()
        .and_then(|p| p.text)
        .ok_or_else(|| "first content part has no text".to_string())
}

/// HTTP transport for the Gemini API.
///
/// The API key is stored as an [`ApiCredential`]; `Debug` output shows
/// `[REDACTED]`.
#[derive(Debug)]
pub struct GeminiTransport {
    credential: ApiCredential,
    endpoint: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl GeminiTransport {
    /// Create a transport from configuration and a loaded credential.
    pub fn new(credential: ApiCredential, config: &ClientConfig) -> Result<Self, TransportError> {
        if credential.is_empty() {
            return Err(TransportError::NotConfigured(format!(
                "{} is empty",
                credential.name()
            )));
        }

        if reqwest::header::HeaderValue::from_str(credential.expose()).is_err() {
            return Err(TransportError::NotConfigured(format!(
                "{} contains characters not allowed in an HTTP header",
                credential.name()
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::NotConfigured(e.to_string()))?;

        Ok(Self {
            credential,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout: config.timeout,
            client,
        })
    }

    /// Full URL of the `generateContent` method.
    pub fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl Transport for GeminiTransport {
    async fn send(&self, request: &GenerateContentRequest) -> Result<RawEnvelope, TransportError> {
        // SECURITY: Only expose the credential here, at the point of use
        let response = self
            .client
            .post(self.url())
            .header(API_KEY_HEADER, self.credential.expose())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(self.timeout)
                } else {
                    TransportError::Http(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Http(format!("failed to read response body: {}", e)))?;

        Ok(RawEnvelope::new(status, body))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
