//! Domain types shared by the index, the reranker and the answer cascade.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Chunk metadata. Ordered so that persisted records are byte-stable.
pub type Meta = BTreeMap<String, String>;

pub const META_SOURCE: &str = "source";
pub const META_SUBJECT: &str = "subject";
pub const DEFAULT_SUBJECT: &str = "General";

/// A chunk of a source document that is independently indexed.
///
/// - `content`: the text payload, never empty once indexed
/// - `metadata`: at least `source` (origin file) and `subject`; chunking
///   provenance (`chunk_id`, `total_chunks`) is optional
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub content: String,
    #[serde(default)]
    pub metadata: Meta,
}

impl DocumentChunk {
    pub fn new(content: impl Into<String>, source: impl Into<String>, subject: impl Into<String>) -> Self {
        let mut metadata = Meta::new();
        metadata.insert(META_SOURCE.to_string(), source.into());
        metadata.insert(META_SUBJECT.to_string(), subject.into());
        Self { content: content.into(), metadata }
    }

    pub fn source(&self) -> Option<&str> {
        self.metadata.get(META_SOURCE).map(String::as_str)
    }

    pub fn subject(&self) -> &str {
        self.metadata.get(META_SUBJECT).map_or(DEFAULT_SUBJECT, String::as_str)
    }
}

/// One raw hit from the vector index.
///
/// `distance` is squared Euclidean, smaller is closer. `position` is the
/// chunk's insertion slot in the index and doubles as its stable identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalCandidate {
    pub chunk: DocumentChunk,
    pub distance: f32,
    pub position: usize,
}

/// Derived statistics; recomputed on every build and load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_vectors: usize,
    pub total_documents: usize,
    pub dimension: usize,
    pub embeddings_model: String,
    pub index_type: String,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Which cascade state produced the final answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Precomputed,
    RetrievalGenerated,
    TemplateFallback,
    ErrorFallback,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Precomputed => "precomputed",
            Strategy::RetrievalGenerated => "retrieval_generated",
            Strategy::TemplateFallback => "template_fallback",
            Strategy::ErrorFallback => "error_fallback",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of subjects a question can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Mathematics,
    Physics,
    Chemistry,
    Electrical,
    Computing,
    Biology,
    Unclassified,
}

impl Subject {
    /// Classified subjects in detection order.
    pub const CLASSIFIED: [Subject; 6] = [
        Subject::Mathematics,
        Subject::Physics,
        Subject::Chemistry,
        Subject::Electrical,
        Subject::Computing,
        Subject::Biology,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Subject::Mathematics => "Mathematics",
            Subject::Physics => "Physics",
            Subject::Chemistry => "Chemistry",
            Subject::Electrical => "Electrical engineering",
            Subject::Computing => "Computing",
            Subject::Biology => "Biology",
            Subject::Unclassified => "General",
        }
    }

    /// Serialized (snake_case) name.
    pub fn name(self) -> &'static str {
        match self {
            Subject::Mathematics => "mathematics",
            Subject::Physics => "physics",
            Subject::Chemistry => "chemistry",
            Subject::Electrical => "electrical",
            Subject::Computing => "computing",
            Subject::Biology => "biology",
            Subject::Unclassified => "unclassified",
        }
    }

    /// Case-insensitive lookup by label or serialized name.
    pub fn parse(name: &str) -> Option<Subject> {
        let needle = name.trim().to_lowercase();
        Self::CLASSIFIED
            .into_iter()
            .chain(std::iter::once(Subject::Unclassified))
            .find(|s| s.name() == needle || s.label().to_lowercase() == needle)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A piece of evidence attached to an answer.
///
/// `distance` is the raw index distance; `score` is the reranked relevance
/// (higher is better).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub chunk: DocumentChunk,
    pub distance: f32,
    pub score: f32,
}

/// The answer returned for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisResponse {
    pub answer: String,
    pub confidence: f32,
    pub evidence: Vec<Evidence>,
    pub strategy_used: Strategy,
    pub subject: Subject,
    /// Wall-clock seconds for the whole cascade.
    pub processing_time: f64,
    /// Generator that wrote the answer; set only for `retrieval_generated`.
    #[serde(default)]
    pub model_used: Option<String>,
}
