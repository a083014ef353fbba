use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use tutor_core::config::EmbeddingConfig;
use tutor_core::{Embedder, Error, ProviderError, Result};

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embeddings from Ollama's `/api/embed`.
pub struct OllamaEmbedder {
    client: Client,
    url: String,
    model: String,
    dim: usize,
    timeout: Duration,
    id: String,
}

impl OllamaEmbedder {
    pub fn new(cfg: &EmbeddingConfig) -> Result<Self> {
        let timeout = Duration::from_secs(cfg.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("http client: {e}")))?;
        Ok(Self {
            client,
            url: format!("{}/api/embed", cfg.endpoint.trim_end_matches('/')),
            model: cfg.model.clone(),
            dim: cfg.dim,
            timeout,
            id: format!("ollama:{}:d{}", cfg.model, cfg.dim),
        })
    }

    fn request(&self, input: &[String]) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
        let response = self
            .client
            .post(&self.url)
            .json(&EmbedRequest { model: &self.model, input })
            .send()
            .map_err(|e| map_transport_error(&e, self.timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(ProviderError::Request(format!("{status} - {body}")));
        }

        let parsed: EmbedResponse = response
            .json()
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        if parsed.embeddings.len() != input.len() {
            return Err(ProviderError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                input.len(),
                parsed.embeddings.len()
            )));
        }
        if let Some(bad) = parsed.embeddings.iter().find(|e| e.len() != self.dim) {
            return Err(ProviderError::InvalidResponse(format!(
                "expected {}-d embedding, got {}",
                self.dim,
                bad.len()
            )));
        }
        Ok(parsed.embeddings)
    }
}

pub(crate) fn map_transport_error(e: &reqwest::Error, timeout: Duration) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(timeout)
    } else if e.is_connect() {
        ProviderError::Unavailable(e.to_string())
    } else {
        ProviderError::Request(e.to_string())
    }
}

impl Embedder for OllamaEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        let input = [text.to_string()];
        self.request(&input)?
            .pop()
            .ok_or_else(|| ProviderError::InvalidResponse("no embedding returned".into()))
    }

    fn embed_batch(&self, texts: &[String]) -> Vec<std::result::Result<Vec<f32>, ProviderError>> {
        if texts.is_empty() {
            return Vec::new();
        }
        match self.request(texts) {
            Ok(vectors) => vectors.into_iter().map(Ok).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "batch embedding failed; retrying per item");
                texts.iter().map(|t| self.embed(t)).collect()
            }
        }
    }
}
