//! Total-delta statistic for permuted time-series expression data.
//!
//! For every permutation and feature, the total delta is the sum over all
//! consecutive timepoint pairs (cyclic, so the last timepoint pairs with the
//! first) and over all replicate pairs of the absolute difference between
//! the two measurements. Pairs whose difference is NaN are skipped, so
//! missing measurements simply contribute nothing.
//!
//! # Primary API
//!
//! - [`compute_delta_sums`]: Fill a `[permutation, feature]` output from a
//!   `[permutation, timepoint, replicate, feature]` input
//! - [`DeltaSumEngine`]: The same operation under an explicit [`DeltaSumConfig`],
//!   plus [`compute_slices`](DeltaSumEngine::compute_slices) for flat buffers
//!   and [`compute_batches`](DeltaSumEngine::compute_batches) for inputs split
//!   into permutation runs
//! - [`Writeback`]: Stage writes to a strided output and commit them on success
//! - `interop` (feature `ndarray`): Zero-copy entry point for `ndarray` views
//!
//! # Example
//!
//! ```rust
//! use total_delta::{compute_delta_sums, Tensor, TensorView};
//!
//! // P=1, T=2, R=2, G=1
//! let data = [1.0, 3.0, 2.0, 6.0];
//! let input = TensorView::row_major(&data, &[1, 2, 2, 1]).unwrap();
//! let mut out = Tensor::<f64>::row_major(&[1, 1]);
//! compute_delta_sums(&input, &mut out.view_mut()).unwrap();
//! assert_eq!(out.get(&[0, 0]), 20.0);
//! ```
//!
//! # Parallelism
//!
//! With the default `parallel` feature, problems above
//! [`DeltaSumConfig::min_parallel_work`] pair evaluations are split across
//! rayon workers along the permutation and feature axes. Results are
//! bit-identical to the sequential kernel.

pub mod config;
mod engine;
#[cfg(feature = "ndarray")]
pub mod interop;
mod writeback;

pub use config::{ConfigError, DeltaSumConfig};
pub use engine::{compute_delta_sums, DeltaSumEngine};
pub use writeback::Writeback;

// ============================================================================
// Re-exports from the kernel and view crates
// ============================================================================
pub use delta_kernel::{
    delta_sum_cell, delta_sums_into, validate_shapes, DeltaShape, ShapeError, Tensor, TensorView,
    TensorViewMut, ViewError,
};
#[cfg(feature = "parallel")]
pub use delta_kernel::{par_delta_sums_into, MIN_PARALLEL_WORK};

// ============================================================================
// Error types
// ============================================================================

/// Errors returned by the delta-sum entry points.
#[derive(Debug, thiserror::Error)]
pub enum DeltaError {
    /// Input or output shape rejected; nothing was written.
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// A buffer could not be viewed with the requested layout.
    #[error("invalid view: {0}")]
    View(#[from] ViewError),

    /// Configuration could not be read.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The dedicated worker pool could not be started.
    #[cfg(feature = "parallel")]
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result type for delta-sum operations.
pub type Result<T> = std::result::Result<T, DeltaError>;
