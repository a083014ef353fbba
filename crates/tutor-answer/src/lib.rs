//! Question answering over the indexed course material.
//!
//! [`Assistant`] wires the providers, the vector index, the reranker and the
//! [`Cascade`] together; the other modules are the cascade's building blocks.

pub mod assistant;
pub mod cascade;
pub mod confidence;
pub mod precomputed;
pub mod prompt;
pub mod subject;
pub mod suggest;
pub mod templates;

pub use assistant::{AskOptions, Assistant, SystemStatus};
pub use cascade::Cascade;
pub use confidence::ConfidenceEstimator;
pub use precomputed::{AnswersFile, PrecomputedEntry, PrecomputedTable};
pub use subject::detect_subject;
pub use suggest::suggested_questions;
pub use templates::Templates;
