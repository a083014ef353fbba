//! Second-stage ranking of raw index candidates.
//!
//! `combined = (1 - w) * proximity + w * overlap`, where `proximity` is
//! `1 / (1 + distance)` (plus cosine similarity of re-embedded content in
//! semantic mode) and `overlap` is the share of query terms found in the
//! candidate. Any malformed candidate or a semantic embedding failure drops
//! the whole batch back to plain distance order.

use std::collections::BTreeSet;
use std::sync::Arc;

use tutor_core::config::RerankConfig;
use tutor_core::text::tokens;
use tutor_core::{Embedder, Evidence, RetrievalCandidate};
use tutor_vector::distance::cosine;

pub struct Reranker {
    config: RerankConfig,
    embedder: Option<Arc<dyn Embedder>>,
}

fn proximity(distance: f32) -> f32 {
    1.0 / (1.0 + distance)
}

/// Why a candidate cannot be scored, if it cannot.
fn malformed(c: &RetrievalCandidate) -> Option<&'static str> {
    if c.chunk.source().map_or(true, |s| s.trim().is_empty()) {
        Some("missing source")
    } else if !c.distance.is_finite() || c.distance < 0.0 {
        Some("invalid distance")
    } else if c.chunk.content.trim().is_empty() {
        Some("empty content")
    } else {
        None
    }
}

impl Reranker {
    pub fn new(config: RerankConfig) -> Self {
        Self { config, embedder: None }
    }

    /// Embedder used when `semantic` is on.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn config(&self) -> &RerankConfig {
        &self.config
    }

    pub fn query_terms(&self, query: &str) -> BTreeSet<String> {
        tokens(query)
            .into_iter()
            .filter(|t| t.chars().count() >= self.config.min_term_len)
            .collect()
    }

    /// Fraction of `terms` present as terms of `content`.
    pub fn overlap(terms: &BTreeSet<String>, content: &str) -> f32 {
        if terms.is_empty() {
            return 0.0;
        }
        let words: BTreeSet<String> = tokens(content).into_iter().collect();
        let hits = terms.iter().filter(|t| words.contains(*t)).count();
        hits as f32 / terms.len() as f32
    }

    /// Reorder `candidates` and keep the best `k`. Never fails.
    pub fn rerank(&self, query: &str, candidates: Vec<RetrievalCandidate>, k: usize) -> Vec<Evidence> {
        if !self.config.enabled {
            return Self::by_distance(candidates, k);
        }
        self.rescore(query, candidates, k)
    }

    /// Blend distance and term overlap regardless of `enabled`.
    pub fn rescore(&self, query: &str, candidates: Vec<RetrievalCandidate>, k: usize) -> Vec<Evidence> {
        if k == 0 || candidates.is_empty() {
            return Vec::new();
        }
        if let Some((i, reason)) = candidates.iter().enumerate().find_map(|(i, c)| malformed(c).map(|r| (i, r))) {
            tracing::warn!(candidate = i, reason, "malformed candidate; falling back to distance order");
            let valid = candidates.into_iter().filter(|c| malformed(c).is_none()).collect();
            return Self::by_distance(valid, k);
        }

        let semantic = if self.config.semantic {
            match self.semantic_scores(query, &candidates) {
                Some(scores) => scores,
                None => return Self::by_distance(candidates, k),
            }
        } else {
            vec![0.0; candidates.len()]
        };

        let terms = self.query_terms(query);
        let w = self.config.lexical_weight;
        let mut scored: Vec<Evidence> = candidates
            .into_iter()
            .zip(semantic)
            .map(|(c, sim)| {
                let overlap = Self::overlap(&terms, &c.chunk.content);
                let score = (1.0 - w) * (proximity(c.distance) + sim) + w * overlap;
                Evidence { chunk: c.chunk, distance: c.distance, score }
            })
            .collect();
        // stable: equal scores keep retrieval order
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        tracing::debug!(kept = scored.len(), terms = terms.len(), "reranked candidates");
        scored
    }

    fn semantic_scores(&self, query: &str, candidates: &[RetrievalCandidate]) -> Option<Vec<f32>> {
        let Some(embedder) = self.embedder.as_ref() else {
            tracing::warn!("semantic rerank enabled without an embedder; using distance order");
            return None;
        };
        let q = match embedder.embed(query) {
            Ok(q) => q,
            Err(e) => {
                tracing::warn!(error = %e, "semantic rerank failed; using distance order");
                return None;
            }
        };
        let texts: Vec<String> = candidates.iter().map(|c| c.chunk.content.clone()).collect();
        let mut out = Vec::with_capacity(texts.len());
        for result in embedder.embed_batch(&texts) {
            match result {
                Ok(v) if v.len() == q.len() => out.push(cosine(&q, &v)),
                Ok(v) => {
                    tracing::warn!(expected = q.len(), actual = v.len(), "semantic rerank dimension mismatch");
                    return None;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "semantic rerank failed; using distance order");
                    return None;
                }
            }
        }
        Some(out)
    }

    /// Best `k` candidates by raw distance, scored by proximity alone.
    pub fn by_distance(mut candidates: Vec<RetrievalCandidate>, k: usize) -> Vec<Evidence> {
        candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        candidates
            .into_iter()
            .take(k)
            .map(|c| Evidence { score: proximity(c.distance), distance: c.distance, chunk: c.chunk })
            .collect()
    }
}
