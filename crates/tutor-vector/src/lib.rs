//! In-memory vector index over document chunks.
//!
//! Two layouts share one store: `flat` scans every vector, `ivf` clusters
//! vectors with a deterministic k-means quantizer and scans only the probed
//! lists. Both rank by squared Euclidean distance with insertion order as the
//! tie breaker. The index lives behind [`IndexHandle`], which swaps whole
//! snapshots so readers never observe a half-built state.

pub mod distance;
pub mod flat;
pub mod handle;
pub mod ivf;
pub mod persist;

pub use handle::{BuildReport, IndexHandle, IndexSnapshot};
pub use ivf::{compute_ivf_params, IvfParams};
