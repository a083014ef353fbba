use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use tutor_core::{Error, GenerationRequest, Generator, ProviderError, Result};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

/// One Ollama model, non-streaming.
pub struct OllamaGenerator {
    client: Client,
    url: String,
    model: String,
    timeout: Duration,
    id: String,
}

impl OllamaGenerator {
    pub fn new(endpoint: &str, model: &str, timeout_secs: u64) -> Result<Self> {
        let timeout = Duration::from_secs(timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: format!("{}/api/generate", endpoint.trim_end_matches('/')),
            model: model.to_string(),
            timeout,
            id: format!("ollama:{model}"),
        })
    }

    fn body<'a>(&'a self, request: &'a GenerationRequest) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.model,
            prompt: &request.prompt,
            stream: false,
            options: GenerateOptions { temperature: request.temperature, num_predict: request.max_tokens },
        }
    }
}

impl Generator for OllamaGenerator {
    fn id(&self) -> &str {
        &self.id
    }

    fn generate(&self, request: &GenerationRequest) -> std::result::Result<String, ProviderError> {
        let response = self.client.post(&self.url).json(&self.body(request)).send().map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(self.timeout)
            } else if e.is_connect() {
                ProviderError::Unavailable(e.to_string())
            } else {
                ProviderError::Request(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().unwrap_or_default();
            return Err(ProviderError::Request(format!("{status}: {error}")));
        }

        let parsed: GenerateResponse = response.json().map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(self.timeout)
            } else {
                ProviderError::InvalidResponse(e.to_string())
            }
        })?;
        if !parsed.done {
            tracing::debug!(model = %self.model, "generation stopped before completion");
        }
        Ok(parsed.response)
    }
}
