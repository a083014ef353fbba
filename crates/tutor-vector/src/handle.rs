use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tutor_core::config::{IndexConfig, IndexKind};
use tutor_core::error::{Error, ProviderError, Result};
use tutor_core::{DocumentChunk, Embedder, IndexStats, RetrievalCandidate};

use crate::ivf::{compute_ivf_params, IvfIndex, IvfParams};
use crate::persist::{self, Manifest};
use crate::flat;

const EMBED_BATCH: usize = 32;

#[derive(Debug, Clone)]
enum Layout {
    Flat,
    Ivf(IvfIndex),
}

/// Immutable view of one built or loaded index.
///
/// Position `i` in the vector buffer is position `i` in `chunks`.
#[derive(Debug)]
pub struct IndexSnapshot {
    dim: usize,
    vectors: Vec<f32>,
    chunks: Vec<DocumentChunk>,
    layout: Layout,
    embeddings_model: String,
    kind: IndexKind,
    last_updated: Option<DateTime<Utc>>,
}

impl IndexSnapshot {
    pub fn empty(dim: usize, embeddings_model: impl Into<String>, kind: IndexKind) -> Self {
        Self {
            dim,
            vectors: Vec::new(),
            chunks: Vec::new(),
            layout: Layout::Flat,
            embeddings_model: embeddings_model.into(),
            kind,
            last_updated: None,
        }
    }

    fn assemble(
        dim: usize,
        vectors: Vec<f32>,
        chunks: Vec<DocumentChunk>,
        ivf: Option<IvfParams>,
        embeddings_model: String,
        last_updated: DateTime<Utc>,
    ) -> Self {
        let (layout, kind) = match ivf {
            Some(params) => (Layout::Ivf(IvfIndex::train(&vectors, dim, params)), IndexKind::Ivf),
            None => (Layout::Flat, IndexKind::Flat),
        };
        Self { dim, vectors, chunks, layout, embeddings_model, kind, last_updated: Some(last_updated) }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn ivf_params(&self) -> Option<IvfParams> {
        match &self.layout {
            Layout::Ivf(ivf) => Some(ivf.params()),
            Layout::Flat => None,
        }
    }

    /// k-NN for an already embedded query.
    pub fn search_vector(&self, query: &[f32], k: usize) -> Result<Vec<RetrievalCandidate>> {
        self.search_vector_where(query, k, |_| true)
    }

    /// k-NN over the chunks `filter` accepts; up to `k` accepted chunks are
    /// returned even when nearer chunks were rejected.
    pub fn search_vector_where<F>(&self, query: &[f32], k: usize, filter: F) -> Result<Vec<RetrievalCandidate>>
    where
        F: Fn(&DocumentChunk) -> bool + Sync,
    {
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        let keep = |i: usize| filter(&self.chunks[i]);
        let hits = match &self.layout {
            Layout::Flat => flat::search_where(&self.vectors, self.dim, query, k, &keep),
            Layout::Ivf(ivf) => ivf.search_where(&self.vectors, query, k, &keep),
        };
        Ok(hits
            .into_iter()
            .map(|(position, distance)| RetrievalCandidate { chunk: self.chunks[position].clone(), distance, position })
            .collect())
    }

    pub fn stats(&self) -> IndexStats {
        let documents: BTreeSet<&str> = self.chunks.iter().filter_map(DocumentChunk::source).collect();
        IndexStats {
            total_vectors: self.len(),
            total_documents: documents.len(),
            dimension: self.dim,
            embeddings_model: self.embeddings_model.clone(),
            index_type: self.kind.as_str().to_string(),
            last_updated: self.last_updated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub indexed: usize,
    pub skipped: usize,
    pub elapsed: Duration,
}

/// Shared, swappable index.
///
/// Readers clone the current `Arc<IndexSnapshot>` and search it without
/// holding any lock. Builds and loads stage a full snapshot off-lock and
/// replace the pointer in one write; `writer` serialises them.
pub struct IndexHandle {
    embedder: Arc<dyn Embedder>,
    config: IndexConfig,
    current: RwLock<Arc<IndexSnapshot>>,
    writer: Mutex<()>,
}

impl IndexHandle {
    pub fn new(embedder: Arc<dyn Embedder>, config: IndexConfig) -> Self {
        let empty = IndexSnapshot::empty(embedder.dim(), embedder.id(), config.kind);
        Self { embedder, config, current: RwLock::new(Arc::new(empty)), writer: Mutex::new(()) }
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.current.read().clone()
    }

    fn swap(&self, next: IndexSnapshot) {
        *self.current.write() = Arc::new(next);
    }

    pub fn build(&self, chunks: Vec<DocumentChunk>) -> Result<BuildReport> {
        self.build_with_progress(chunks, |_| {})
    }

    /// Embed and index `chunks`, replacing the current snapshot on success.
    ///
    /// `progress` receives the number of chunks handled so far. Chunks with
    /// empty content or a failed/non-finite embedding are skipped; the build
    /// fails only when nothing could be indexed.
    pub fn build_with_progress(&self, chunks: Vec<DocumentChunk>, progress: impl Fn(usize)) -> Result<BuildReport> {
        if chunks.is_empty() {
            return Err(Error::EmptyInput("no chunks to index".into()));
        }
        let _guard = self.writer.lock();
        let started = Instant::now();
        let dim = self.embedder.dim();

        let mut vectors = Vec::with_capacity(chunks.len() * dim);
        let mut kept = Vec::with_capacity(chunks.len());
        let mut skipped = 0usize;
        let mut last_error: Option<ProviderError> = None;
        let mut done = 0usize;

        for batch in chunks.chunks(EMBED_BATCH) {
            let (live, empty): (Vec<&DocumentChunk>, Vec<&DocumentChunk>) =
                batch.iter().partition(|c| !c.content.trim().is_empty());
            for chunk in &empty {
                tracing::warn!(source = chunk.source().unwrap_or("?"), "skipping chunk with empty content");
            }
            skipped += empty.len();

            let texts: Vec<String> = live.iter().map(|c| c.content.clone()).collect();
            let results = if texts.is_empty() { Vec::new() } else { self.embedder.embed_batch(&texts) };
            for (chunk, result) in live.into_iter().zip(results) {
                match result {
                    Ok(v) if v.len() != dim => {
                        return Err(Error::DimensionMismatch { expected: dim, actual: v.len() });
                    }
                    Ok(v) if v.iter().any(|x| !x.is_finite()) => {
                        tracing::warn!(source = chunk.source().unwrap_or("?"), "skipping chunk with non-finite embedding");
                        skipped += 1;
                    }
                    Ok(v) => {
                        vectors.extend_from_slice(&v);
                        kept.push(chunk.clone());
                    }
                    Err(e) => {
                        tracing::warn!(source = chunk.source().unwrap_or("?"), error = %e, "embedding failed; skipping chunk");
                        skipped += 1;
                        last_error = Some(e);
                    }
                }
            }
            done += batch.len();
            progress(done);
        }

        if kept.is_empty() {
            return Err(match last_error {
                Some(e) => Error::Provider(e),
                None => Error::EmptyInput("every chunk was empty".into()),
            });
        }

        let ivf = match self.config.kind {
            IndexKind::Flat => None,
            IndexKind::Ivf => Some(compute_ivf_params(
                kept.len(),
                self.config.nlist,
                self.config.nprobe,
                self.config.kmeans_iterations,
            )),
        };
        let indexed = kept.len();
        let next = IndexSnapshot::assemble(dim, vectors, kept, ivf, self.embedder.id().to_string(), Utc::now());
        self.swap(next);

        let report = BuildReport { indexed, skipped, elapsed: started.elapsed() };
        tracing::info!(
            indexed,
            skipped,
            kind = self.config.kind.as_str(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "index built"
        );
        Ok(report)
    }

    /// Embed `query` and return up to `k` nearest chunks.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievalCandidate>> {
        self.search_where(query, k, |_| true)
    }

    /// Like [`IndexHandle::search`], restricted to chunks `filter` accepts.
    pub fn search_where<F>(&self, query: &str, k: usize, filter: F) -> Result<Vec<RetrievalCandidate>>
    where
        F: Fn(&DocumentChunk) -> bool + Sync,
    {
        let snapshot = self.snapshot();
        if k == 0 || snapshot.is_empty() {
            return Ok(Vec::new());
        }
        let vector = self.embedder.embed(query)?;
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(ProviderError::InvalidResponse("non-finite query embedding".into()).into());
        }
        snapshot.search_vector_where(&vector, k, filter)
    }

    pub fn stats(&self) -> IndexStats {
        self.snapshot().stats()
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let snapshot = self.snapshot();
        let manifest = Manifest {
            format_version: persist::FORMAT_VERSION,
            dimension: snapshot.dim,
            count: snapshot.len(),
            documents: snapshot.stats().total_documents,
            embeddings_model: snapshot.embeddings_model.clone(),
            index_type: snapshot.kind.as_str().to_string(),
            ivf: snapshot.ivf_params(),
            last_updated: snapshot.last_updated.unwrap_or_else(Utc::now),
            vectors_blake3: String::new(),
        };
        persist::save(dir, manifest, &snapshot.vectors, &snapshot.chunks)?;
        Ok(())
    }

    /// Replace the current snapshot with the artifacts in `dir`.
    ///
    /// On any error the current snapshot stays in place.
    pub fn load(&self, dir: &Path) -> Result<IndexStats> {
        let _guard = self.writer.lock();
        let artifacts = persist::load(dir)?;
        let manifest = artifacts.manifest;
        if manifest.dimension != self.embedder.dim() {
            return Err(Error::DimensionMismatch { expected: self.embedder.dim(), actual: manifest.dimension });
        }
        if manifest.embeddings_model != self.embedder.id() {
            tracing::warn!(
                saved = %manifest.embeddings_model,
                current = %self.embedder.id(),
                "index was built with a different embedder"
            );
        }
        let ivf = match manifest.index_type.as_str() {
            "flat" => None,
            "ivf" => Some(manifest.ivf.unwrap_or_else(|| {
                compute_ivf_params(manifest.count, self.config.nlist, self.config.nprobe, self.config.kmeans_iterations)
            })),
            other => return Err(Error::Persistence(format!("unknown index type '{other}'"))),
        };
        let next = IndexSnapshot::assemble(
            manifest.dimension,
            artifacts.vectors,
            artifacts.chunks,
            ivf,
            manifest.embeddings_model,
            manifest.last_updated,
        );
        let stats = next.stats();
        self.swap(next);
        tracing::info!(dir = %dir.display(), vectors = stats.total_vectors, "index loaded");
        Ok(stats)
    }
}
