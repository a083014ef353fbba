use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tutor_core::config::{resolve_with_base, AppConfig, PrecomputedConfig};
use tutor_core::error::Result;
use tutor_core::{DocumentChunk, Embedder, Generator, IndexStats, Subject, SynthesisResponse};
use tutor_rerank::Reranker;
use tutor_vector::persist::MANIFEST_FILE;
use tutor_vector::{BuildReport, IndexHandle};

use crate::cascade::Cascade;
use crate::precomputed::{AnswersFile, PrecomputedTable};
use crate::suggest::suggested_questions;
use crate::templates::Templates;

/// Per-request overrides for [`Assistant::ask_with`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AskOptions {
    /// Only retrieve chunks whose `subject` metadata equals this, ignoring
    /// ASCII case.
    pub subject: Option<String>,
    pub top_k: Option<usize>,
    pub temperature: Option<f32>,
    pub rerank: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub index: IndexStats,
    pub index_dir: String,
    pub embedder: String,
    pub generator: String,
    pub top_k: usize,
    pub rerank_enabled: bool,
    pub lexical_weight: f32,
    pub semantic_rerank: bool,
    pub precomputed_entries: usize,
}

/// Everything needed to answer questions: providers, index, reranker and
/// cascade. Built once at startup; the index inside is swapped on rebuild.
pub struct Assistant {
    config: AppConfig,
    index_dir: PathBuf,
    index: Arc<IndexHandle>,
    reranker: Reranker,
    cascade: Cascade,
}

fn answers(config: &PrecomputedConfig, base_dir: &Path) -> Result<(Option<PrecomputedTable>, Templates)> {
    let Some(file) = config.file.as_deref() else {
        return Ok((config.enabled.then(PrecomputedTable::builtin), Templates::default()));
    };
    let path = resolve_with_base(base_dir, file);
    let loaded = AnswersFile::load(&path)?;
    tracing::info!(path = %path.display(), entries = loaded.entries.len(), "loaded answers file");
    let table = if loaded.entries.is_empty() {
        PrecomputedTable::builtin()
    } else {
        PrecomputedTable::new(loaded.entries)
    };
    Ok((config.enabled.then_some(table), loaded.templates.unwrap_or_default()))
}

impl Assistant {
    /// Build providers from configuration and pick up a saved index if one
    /// exists under `index.dir`.
    pub fn from_config(config: AppConfig, base_dir: &Path) -> Result<Self> {
        config.validate()?;
        let embedder: Arc<dyn Embedder> = Arc::from(tutor_embed::embedder_from_config(&config.embedding)?);
        let generator = tutor_llm::generator_from_config(&config.generation)?;
        let assistant = Self::with_providers(config, base_dir, embedder, generator)?;
        assistant.load_if_present();
        Ok(assistant)
    }

    pub fn with_providers(
        config: AppConfig,
        base_dir: &Path,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        let (precomputed, templates) = answers(&config.precomputed, base_dir)?;
        let mut reranker = Reranker::new(config.rerank.clone());
        if config.rerank.semantic {
            reranker = reranker.with_embedder(embedder.clone());
        }
        let cascade = Cascade::new(precomputed, templates, generator, &config);
        let index = Arc::new(IndexHandle::new(embedder, config.index.clone()));
        Ok(Self { index_dir: config.index.dir_path(base_dir), config, index, reranker, cascade })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<IndexHandle> {
        &self.index
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    pub fn ask(&self, question: &str) -> SynthesisResponse {
        self.ask_with(question, &AskOptions::default())
    }

    /// Answer with per-request overrides; unset options use the configuration.
    pub fn ask_with(&self, question: &str, options: &AskOptions) -> SynthesisResponse {
        let k = options.top_k.filter(|k| *k > 0).unwrap_or(self.config.retrieval.top_k);
        let rerank = options.rerank.unwrap_or(self.reranker.config().enabled);
        let fetch = if rerank { k.saturating_mul(self.config.retrieval.oversample) } else { k };
        let subject = options.subject.as_deref().map(str::trim).filter(|s| !s.is_empty());

        self.cascade.answer_with(question, options.temperature, |q| {
            let raw = match subject {
                Some(subject) => self.index.search_where(q, fetch, |c| c.subject().eq_ignore_ascii_case(subject))?,
                None => self.index.search(q, fetch)?,
            };
            if rerank {
                Ok(self.reranker.rescore(q, raw, k))
            } else {
                Ok(Reranker::by_distance(raw, k))
            }
        })
    }

    pub fn rebuild(&self, chunks: Vec<DocumentChunk>) -> Result<BuildReport> {
        self.index.build(chunks)
    }

    pub fn rebuild_with_progress(&self, chunks: Vec<DocumentChunk>, progress: impl Fn(usize)) -> Result<BuildReport> {
        self.index.build_with_progress(chunks, progress)
    }

    pub fn save(&self) -> Result<()> {
        self.index.save(&self.index_dir)
    }

    pub fn load(&self) -> Result<IndexStats> {
        self.index.load(&self.index_dir)
    }

    /// Load the saved index when a manifest exists; failures are logged and
    /// leave the current (empty) index in place.
    pub fn load_if_present(&self) -> bool {
        if !self.index_dir.join(MANIFEST_FILE).exists() {
            tracing::info!(dir = %self.index_dir.display(), "no saved index");
            return false;
        }
        match self.load() {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(dir = %self.index_dir.display(), error = %e, "could not load saved index");
                false
            }
        }
    }

    pub fn stats(&self) -> IndexStats {
        self.index.stats()
    }

    pub fn status(&self) -> SystemStatus {
        SystemStatus {
            index: self.stats(),
            index_dir: self.index_dir.display().to_string(),
            embedder: self.index.embedder().id().to_string(),
            generator: self.cascade.generator_id().to_string(),
            top_k: self.config.retrieval.top_k,
            rerank_enabled: self.config.rerank.enabled,
            lexical_weight: self.config.rerank.lexical_weight,
            semantic_rerank: self.config.rerank.semantic,
            precomputed_entries: self.cascade.precomputed_entries(),
        }
    }

    pub fn suggestions(&self, subject: Option<Subject>) -> &'static [&'static str] {
        suggested_questions(subject)
    }
}
