use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use tutor_core::text::tokens;
use tutor_core::{Embedder, ProviderError};

use crate::normalize;

/// Feature-hashing embedder: each lowercased word lands in one bucket.
///
/// Texts sharing words end up close to each other, which is enough for
/// offline operation and tests.
pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim, id: format!("hash:xxh64:d{dim}") }
    }
}

impl Embedder for HashEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let mut v = vec![0f32; self.dim];
        if self.dim == 0 {
            return Ok(v);
        }
        for (i, token) in tokens(text).iter().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let val = ((h >> 32) as u32) as f32 / u32::MAX as f32;
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        normalize(&mut v);
        Ok(v)
    }
}
