//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` +
//! `config.<env>.toml` + `APP_*` env vars (`__` separates nesting, so
//! `APP_INDEX__KIND=ivf` sets `index.kind`). Provides helpers to expand `~`
//! and `${VAR}` and to resolve relative paths against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
    env_name: String,
}

impl Config {
    /// Load from the current working directory.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    pub fn load_from(dir: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment, env_name })
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::Configuration(format!("Failed to get '{}': {}", key, e)))
    }

    /// Extract and validate the full typed configuration.
    pub fn app(&self) -> Result<AppConfig> {
        let app: AppConfig = self
            .figment
            .extract()
            .map_err(|e| Error::Configuration(e.to_string()))?;
        app.validate()?;
        Ok(app)
    }
}

/// `APP_USE_FAKE_EMBEDDINGS=1|true` forces the deterministic hashing embedder.
pub fn use_fake_embeddings() -> bool {
    env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub index: IndexConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub retrieval: RetrievalConfig,
    pub rerank: RerankConfig,
    pub confidence: ConfidenceConfig,
    pub precomputed: PrecomputedConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Exhaustive scan, exact.
    Flat,
    /// Inverted lists over a k-means coarse quantizer; approximate unless
    /// `nprobe >= nlist`.
    Ivf,
}

impl IndexKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IndexKind::Flat => "flat",
            IndexKind::Ivf => "ivf",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub dir: String,
    pub kind: IndexKind,
    /// Number of inverted lists; `None` derives it from the corpus size.
    pub nlist: Option<usize>,
    pub nprobe: usize,
    pub kmeans_iterations: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { dir: "data/index".to_string(), kind: IndexKind::Flat, nlist: None, nprobe: 4, kmeans_iterations: 10 }
    }
}

impl IndexConfig {
    pub fn dir_path(&self, base: &Path) -> PathBuf {
        resolve_with_base(base, &self.dir)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    Hash,
    Ollama,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    pub model: String,
    pub dim: usize,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Hash,
            model: "all-minilm".to_string(),
            dim: 384,
            endpoint: "http://localhost:11434".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProviderKind {
    Disabled,
    Ollama,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: GenerationProviderKind,
    pub endpoint: String,
    pub model: String,
    /// Tried in order when the primary model fails.
    pub fallback_models: Vec<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GenerationProviderKind::Disabled,
            endpoint: "http://localhost:11434".to_string(),
            model: "llama2".to_string(),
            fallback_models: vec!["mistral".to_string(), "codellama".to_string()],
            temperature: 0.1,
            max_tokens: 1000,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Raw candidates fetched per final result when reranking.
    pub oversample: usize,
    /// Evidence items placed into the generation prompt.
    pub max_context_docs: usize,
    /// Characters kept from each evidence item in the prompt.
    pub max_context_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3, oversample: 2, max_context_docs: 3, max_context_chars: 500 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    pub enabled: bool,
    /// Weight of lexical overlap against geometric proximity, in [0, 1].
    pub lexical_weight: f32,
    /// Query terms shorter than this are ignored.
    pub min_term_len: usize,
    /// Re-embed candidates and blend cosine similarity into proximity.
    pub semantic: bool,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self { enabled: true, lexical_weight: 0.3, min_term_len: 3, semantic: false }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub precomputed: f32,
    pub template: f32,
    pub error: f32,
    /// Average distance at which retrieval confidence reaches zero.
    pub distance_scale: f32,
    /// Share of proximity kept when only one evidence item is present.
    pub coverage_floor: f32,
    /// Evidence count at which the coverage term saturates.
    pub coverage_saturation: usize,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            precomputed: 0.9,
            template: 0.35,
            error: 0.1,
            distance_scale: 2.0,
            coverage_floor: 0.7,
            coverage_saturation: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecomputedConfig {
    pub enabled: bool,
    /// Optional TOML table replacing the built-in answers.
    pub file: Option<String>,
}

impl Default for PrecomputedConfig {
    fn default() -> Self {
        Self { enabled: true, file: None }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        fn unit(name: &str, v: f32) -> Result<()> {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(Error::Configuration(format!("{name} must be within [0, 1], got {v}")))
            }
        }

        if self.embedding.dim == 0 {
            return Err(Error::Configuration("embedding.dim must be positive".into()));
        }
        if self.retrieval.top_k == 0 || self.retrieval.oversample == 0 {
            return Err(Error::Configuration("retrieval.top_k and retrieval.oversample must be >= 1".into()));
        }
        if self.index.nprobe == 0 || self.index.nlist == Some(0) {
            return Err(Error::Configuration("index.nprobe and index.nlist must be >= 1".into()));
        }
        if !self.generation.temperature.is_finite() || self.generation.temperature < 0.0 {
            return Err(Error::Configuration("generation.temperature must be a non-negative number".into()));
        }
        unit("rerank.lexical_weight", self.rerank.lexical_weight)?;

        let c = &self.confidence;
        unit("confidence.precomputed", c.precomputed)?;
        unit("confidence.template", c.template)?;
        unit("confidence.error", c.error)?;
        unit("confidence.coverage_floor", c.coverage_floor)?;
        if c.error > c.template || c.error > c.precomputed {
            return Err(Error::Configuration("confidence.error must not exceed the other constants".into()));
        }
        if !(c.distance_scale.is_finite() && c.distance_scale > 0.0) || c.coverage_saturation == 0 {
            return Err(Error::Configuration(
                "confidence.distance_scale must be positive and confidence.coverage_saturation >= 1".into(),
            ));
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
