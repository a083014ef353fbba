use rayon::prelude::*;

use crate::distance::{l2_sq, rank};

/// Exhaustive k-NN over a row-major vector buffer.
pub fn search(vectors: &[f32], dim: usize, query: &[f32], k: usize) -> Vec<(usize, f32)> {
    search_where(vectors, dim, query, k, &|_| true)
}

/// Exhaustive k-NN restricted to the positions `keep` accepts.
pub fn search_where(
    vectors: &[f32],
    dim: usize,
    query: &[f32],
    k: usize,
    keep: &(dyn Fn(usize) -> bool + Sync),
) -> Vec<(usize, f32)> {
    if k == 0 || dim == 0 || vectors.is_empty() {
        return Vec::new();
    }
    let mut hits: Vec<(usize, f32)> = vectors
        .par_chunks(dim)
        .enumerate()
        .filter(|(i, _)| keep(*i))
        .map(|(i, v)| (i, l2_sq(query, v)))
        .collect();
    rank(&mut hits);
    hits.truncate(k);
    hits
}
