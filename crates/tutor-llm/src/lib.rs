//! Text generation providers.
//!
//! - `OllamaGenerator`: one model behind Ollama's `/api/generate`
//! - `GeneratorChain`: primary model first, then fallbacks in order
//! - `DisabledGenerator`: always unavailable, for deployments without an LLM

pub mod chain;
pub mod disabled;
pub mod ollama;

pub use chain::GeneratorChain;
pub use disabled::DisabledGenerator;
pub use ollama::OllamaGenerator;

use std::sync::Arc;

use tutor_core::config::{GenerationConfig, GenerationProviderKind};
use tutor_core::{Generator, Result};

pub fn generator_from_config(cfg: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    match cfg.provider {
        GenerationProviderKind::Disabled => {
            tracing::info!("generation disabled; answers come from templates");
            Ok(Arc::new(DisabledGenerator))
        }
        GenerationProviderKind::Ollama => {
            let mut models: Vec<Box<dyn Generator>> = Vec::with_capacity(1 + cfg.fallback_models.len());
            models.push(Box::new(OllamaGenerator::new(&cfg.endpoint, &cfg.model, cfg.timeout_secs)?));
            for model in &cfg.fallback_models {
                models.push(Box::new(OllamaGenerator::new(&cfg.endpoint, model, cfg.timeout_secs)?));
            }
            tracing::info!(primary = %cfg.model, fallbacks = cfg.fallback_models.len(), "ollama generation enabled");
            if models.len() == 1 {
                Ok(Arc::from(models.remove(0)))
            } else {
                Ok(Arc::new(GeneratorChain::new(models)))
            }
        }
    }
}
