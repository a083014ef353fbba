//! Inverted-file layout over a deterministic k-means coarse quantizer.
//!
//! Centroids are seeded from evenly spaced vectors and refined with Lloyd
//! iterations, so the same corpus always yields the same lists. Search probes
//! the `nprobe` nearest lists and ranks their members exactly.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::distance::{l2_sq, rank};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IvfParams {
    pub nlist: usize,
    pub nprobe: usize,
    pub kmeans_iterations: usize,
}

/// Pick IVF parameters for `total` vectors.
///
/// `nlist` defaults to `2·sqrt(n)`, capped at 65536 and never above the number
/// of vectors; an explicit `nlist` is capped the same way.
pub fn compute_ivf_params(total: usize, nlist: Option<usize>, nprobe: usize, kmeans_iterations: usize) -> IvfParams {
    let sqrt_n = (total as f64).sqrt() as usize;
    let mut n = nlist.unwrap_or(2 * sqrt_n);
    n = n.min(65536).min(total).max(1);
    IvfParams { nlist: n, nprobe: nprobe.max(1), kmeans_iterations }
}

#[derive(Debug, Clone)]
pub struct IvfIndex {
    params: IvfParams,
    dim: usize,
    centroids: Vec<f32>,
    lists: Vec<Vec<usize>>,
}

fn nearest(centroids: &[f32], dim: usize, v: &[f32]) -> usize {
    let mut best = (0usize, f32::INFINITY);
    for (j, c) in centroids.chunks(dim).enumerate() {
        let d = l2_sq(v, c);
        if d < best.1 {
            best = (j, d);
        }
    }
    best.0
}

impl IvfIndex {
    pub fn train(vectors: &[f32], dim: usize, params: IvfParams) -> Self {
        let n = if dim == 0 { 0 } else { vectors.len() / dim };
        let nlist = params.nlist.min(n).max(1);
        let params = IvfParams { nlist, ..params };
        if n == 0 {
            return Self { params, dim, centroids: Vec::new(), lists: vec![Vec::new(); nlist] };
        }

        let mut centroids = Vec::with_capacity(nlist * dim);
        for j in 0..nlist {
            let i = j * n / nlist;
            centroids.extend_from_slice(&vectors[i * dim..(i + 1) * dim]);
        }

        let assign = |centroids: &[f32]| -> Vec<usize> {
            vectors.par_chunks(dim).map(|v| nearest(centroids, dim, v)).collect()
        };
        let mut assignment: Vec<usize> = vec![usize::MAX; n];
        let mut converged = false;
        for iteration in 0..params.kmeans_iterations.max(1) {
            let next = assign(&centroids);
            let changed = next != assignment;
            assignment = next;
            if !changed {
                tracing::debug!(iteration, "k-means converged");
                converged = true;
                break;
            }

            let mut sums = vec![0f32; nlist * dim];
            let mut counts = vec![0usize; nlist];
            for (v, &c) in vectors.chunks(dim).zip(&assignment) {
                counts[c] += 1;
                for (s, x) in sums[c * dim..(c + 1) * dim].iter_mut().zip(v) {
                    *s += x;
                }
            }
            for (c, &count) in counts.iter().enumerate() {
                // empty lists keep their previous centroid
                if count == 0 {
                    continue;
                }
                for (dst, s) in centroids[c * dim..(c + 1) * dim].iter_mut().zip(&sums[c * dim..(c + 1) * dim]) {
                    *dst = s / count as f32;
                }
            }
        }
        // ran out of iterations: lists must follow the final centroids
        if !converged {
            assignment = assign(&centroids);
        }

        let mut lists = vec![Vec::new(); nlist];
        for (i, &c) in assignment.iter().enumerate() {
            lists[c].push(i);
        }
        Self { params, dim, centroids, lists }
    }

    pub fn params(&self) -> IvfParams {
        self.params
    }

    pub fn list_sizes(&self) -> Vec<usize> {
        self.lists.iter().map(Vec::len).collect()
    }

    pub fn search(&self, vectors: &[f32], query: &[f32], k: usize) -> Vec<(usize, f32)> {
        self.search_where(vectors, query, k, &|_| true)
    }

    /// Probe the `nprobe` nearest lists, then keep probing farther lists
    /// until `k` accepted members are collected or every list was scanned.
    pub fn search_where(
        &self,
        vectors: &[f32],
        query: &[f32],
        k: usize,
        keep: &(dyn Fn(usize) -> bool + Sync),
    ) -> Vec<(usize, f32)> {
        if k == 0 || self.centroids.is_empty() {
            return Vec::new();
        }
        let mut probes: Vec<(usize, f32)> =
            self.centroids.chunks(self.dim).enumerate().map(|(j, c)| (j, l2_sq(query, c))).collect();
        rank(&mut probes);

        let mut hits: Vec<(usize, f32)> = Vec::new();
        for (probed, (j, _)) in probes.iter().enumerate() {
            if probed >= self.params.nprobe && hits.len() >= k {
                break;
            }
            hits.extend(
                self.lists[*j]
                    .iter()
                    .copied()
                    .filter(|&i| keep(i))
                    .map(|i| (i, l2_sq(query, &vectors[i * self.dim..(i + 1) * self.dim]))),
            );
        }
        rank(&mut hits);
        hits.truncate(k);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flat;

    fn grid(n: usize) -> Vec<f32> {
        (0..n).flat_map(|i| [(i % 7) as f32, (i / 7) as f32 * 0.5]).collect()
    }

    #[test]
    fn params_are_clamped_to_corpus() {
        assert_eq!(compute_ivf_params(100, None, 4, 10).nlist, 20);
        assert_eq!(compute_ivf_params(3, Some(16), 4, 10).nlist, 3);
        assert_eq!(compute_ivf_params(0, None, 0, 10), IvfParams { nlist: 1, nprobe: 1, kmeans_iterations: 10 });
    }

    #[test]
    fn training_is_deterministic_and_covers_every_vector() {
        let v = grid(50);
        let params = compute_ivf_params(50, Some(5), 2, 10);
        let a = IvfIndex::train(&v, 2, params);
        let b = IvfIndex::train(&v, 2, params);
        assert_eq!(a.lists, b.lists);
        assert_eq!(a.list_sizes().iter().sum::<usize>(), 50);
    }

    #[test]
    fn probing_every_list_is_exact() {
        let v = grid(60);
        let ivf = IvfIndex::train(&v, 2, IvfParams { nlist: 6, nprobe: 6, kmeans_iterations: 10 });
        for q in [[0.0, 0.0], [3.2, 1.1], [6.0, 4.0]] {
            assert_eq!(ivf.search(&v, &q, 5), flat::search(&v, 2, &q, 5));
        }
    }

    #[test]
    fn every_vector_sits_in_the_list_of_its_nearest_centroid() {
        let v = [0.0, 0.0, 1.0, 0.0, 2.0, 0.0, 10.0, 0.0];
        let ivf = IvfIndex::train(&v, 2, IvfParams { nlist: 2, nprobe: 1, kmeans_iterations: 1 });
        for (j, list) in ivf.lists.iter().enumerate() {
            for &i in list {
                assert_eq!(nearest(&ivf.centroids, 2, &v[i * 2..i * 2 + 2]), j, "vector {i}");
            }
        }
        assert_eq!(ivf.search(&v, &[2.0, 0.0], 1), vec![(2, 0.0)]);

        let grid = grid(60);
        let ivf = IvfIndex::train(&grid, 2, IvfParams { nlist: 6, nprobe: 1, kmeans_iterations: 1 });
        for i in 0..60 {
            let q = &grid[i * 2..i * 2 + 2];
            assert_eq!(ivf.search(&grid, q, 1)[0].1, 0.0, "stored vector {i} must find itself");
        }
    }

    #[test]
    fn filtered_search_probes_past_nprobe_until_k_hits() {
        let v = grid(60);
        let ivf = IvfIndex::train(&v, 2, IvfParams { nlist: 6, nprobe: 1, kmeans_iterations: 10 });
        let keep = |i: usize| i >= 50;
        let hits = ivf.search_where(&v, &[0.0, 0.0], 3, &keep);
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|(i, _)| keep(*i)));
        assert!(hits.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn single_probe_returns_subset_in_distance_order() {
        let v = grid(60);
        let ivf = IvfIndex::train(&v, 2, IvfParams { nlist: 6, nprobe: 1, kmeans_iterations: 10 });
        let hits = ivf.search(&v, &[1.0, 1.0], 10);
        assert!(!hits.is_empty());
        assert!(hits.windows(2).all(|w| w[0].1 <= w[1].1));
    }
}
