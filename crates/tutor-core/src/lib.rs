pub mod config;
pub mod error;
pub mod text;
pub mod traits;
pub mod types;

pub use error::{Error, ProviderError, Result};
pub use traits::{Embedder, Generation, GenerationRequest, Generator};
pub use types::{
    DocumentChunk, Evidence, IndexStats, RetrievalCandidate, Strategy, Subject, SynthesisResponse,
};
