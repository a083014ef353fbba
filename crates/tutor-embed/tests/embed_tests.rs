use tutor_core::config::{EmbeddingConfig, EmbeddingProviderKind};
use tutor_core::Embedder;
use tutor_embed::{embedder_from_config, OllamaEmbedder};

#[test]
fn hash_provider_from_config() {
    let cfg = EmbeddingConfig { provider: EmbeddingProviderKind::Hash, dim: 32, ..Default::default() };
    let embedder = embedder_from_config(&cfg).expect("embedder");
    assert_eq!(embedder.dim(), 32);

    let texts = vec!["ohm's law".to_string(), "ohm's law".to_string()];
    let embs = embedder.embed_batch(&texts);
    assert_eq!(embs.len(), 2);
    assert_eq!(embs[0].as_ref().unwrap(), embs[1].as_ref().unwrap());
}

#[test]
fn unreachable_ollama_reports_provider_error() {
    let cfg = EmbeddingConfig {
        provider: EmbeddingProviderKind::Ollama,
        endpoint: "http://127.0.0.1:9".to_string(),
        timeout_secs: 2,
        dim: 8,
        ..Default::default()
    };
    let embedder = OllamaEmbedder::new(&cfg).expect("client");
    assert!(embedder.embed("anything").is_err());
    assert!(embedder.embed_batch(&[]).is_empty());
}
