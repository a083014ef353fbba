//! Embedding providers.
//!
//! `HashEmbedder` is deterministic and offline; `OllamaEmbedder` calls a local
//! Ollama server. `APP_USE_FAKE_EMBEDDINGS=1` forces the hashing embedder
//! regardless of the configured provider.

mod hash;
mod ollama;

pub use hash::HashEmbedder;
pub use ollama::OllamaEmbedder;

use tutor_core::config::{use_fake_embeddings, EmbeddingConfig, EmbeddingProviderKind};
use tutor_core::{Embedder, Result};

pub fn embedder_from_config(cfg: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    if use_fake_embeddings() || cfg.provider == EmbeddingProviderKind::Hash {
        tracing::info!(dim = cfg.dim, "using hashing embedder");
        return Ok(Box::new(HashEmbedder::new(cfg.dim)));
    }
    tracing::info!(model = %cfg.model, endpoint = %cfg.endpoint, "using ollama embedder");
    Ok(Box::new(OllamaEmbedder::new(cfg)?))
}

/// L2-normalize in place; zero vectors are left untouched.
pub fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-6 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
