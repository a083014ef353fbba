use crate::error::ProviderError;

/// Maps text to a fixed-length vector.
///
/// Implementations must be deterministic for a fixed `id()` and always return
/// `dim()`-length vectors.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `hash:xxh64:d384`).
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    /// Per-item results; identical to calling `embed` for each text.
    fn embed_batch(&self, texts: &[String]) -> Vec<Result<Vec<f32>, ProviderError>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Generated text and the model that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub model: String,
}

/// Turns a prompt into text.
///
/// `Ok("")` means the model answered with nothing, which is different from a
/// provider failure.
pub trait Generator: Send + Sync {
    fn id(&self) -> &str;
    fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError>;

    /// Like `generate`, also naming the model that answered. Composite
    /// generators report the member that produced the text.
    fn generate_attributed(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        Ok(Generation { text: self.generate(request)?, model: self.id().to_string() })
    }
}
