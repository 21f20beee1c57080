//! Gemini `embedContent` client.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::embeddings::{validate_embedding, Embedder, EmbeddingError};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Blocking embeddings client for the Gemini API.
///
/// Issues exactly one HTTP request per [`Embedder::embed`] call; the
/// transport timeout is the only deadline on a provider call.
pub struct GeminiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: Option<usize>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: String,
    content: Content<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

impl GeminiEmbedder {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        dimensions: Option<usize>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing Gemini API key");
        anyhow::ensure!(!model.trim().is_empty(), "missing Gemini model name");

        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key.trim())
            .map_err(|_| anyhow::anyhow!("invalid Gemini API key"))?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        let model = model.trim().trim_start_matches("models/").to_string();
        let endpoint = format!(
            "{}/models/{}:embedContent",
            base_url.trim_end_matches('/'),
            model
        );

        Ok(Self {
            client,
            endpoint,
            model,
            dimensions,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Embedder for GeminiEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbedRequest {
            model: format!("models/{}", self.model),
            content: Content {
                parts: [Part { text }],
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(|err| EmbeddingError::Request(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|err| EmbeddingError::Request(err.to_string()))?;

        if !status.is_success() {
            log::warn!("embedding provider returned {status}");
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_embed_response(&body, self.dimensions)
    }

    fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }
}

/// Extract and validate the vector from an `embedContent` response body.
pub fn parse_embed_response(
    body: &str,
    expected: Option<usize>,
) -> Result<Vec<f32>, EmbeddingError> {
    let parsed: EmbedResponse =
        serde_json::from_str(body).map_err(|err| EmbeddingError::Malformed(err.to_string()))?;

    let values = parsed.embedding.values;
    validate_embedding(&values, expected)?;
    Ok(values)
}
