//! Total-delta reduction kernels.
//!
//! Given an input tensor indexed `[permutation, timepoint, replicate, feature]`
//! and an output tensor indexed `[permutation, feature]`, each output cell
//! receives the sum of absolute differences between every replicate at one
//! timepoint and every replicate at the next, with the last timepoint
//! wrapping around to the first. Pairs whose difference is NaN are skipped.
//!
//! # Operations
//!
//! - [`validate_shapes`]: Shape checks, run before any write
//! - [`delta_sums_into`]: Sequential kernel
//! - [`par_delta_sums_into`]: Parallel kernel over the cell grid (feature `parallel`)
//! - [`delta_sum_cell`]: One cell by the plain loop nest
//!
//! # Example
//!
//! ```rust
//! use delta_kernel::delta_sums_into;
//! use delta_view::{Tensor, TensorView};
//!
//! // P=1, T=2, R=1, G=1: timepoint values 2.0 and 5.0
//! let data = [2.0, 5.0];
//! let input = TensorView::row_major(&data, &[1, 2, 1, 1]).unwrap();
//! let mut out = Tensor::<f64>::row_major(&[1, 1]);
//! delta_sums_into(&mut out.view_mut(), &input).unwrap();
//! assert_eq!(out.get(&[0, 0]), 6.0); // |2-5| + |5-2|
//! ```

mod kernel;
mod shape;
#[cfg(feature = "parallel")]
mod threading;

pub use kernel::{delta_sum_cell, delta_sums_into};
pub use shape::{validate_shapes, DeltaShape, ShapeError};
#[cfg(feature = "parallel")]
pub use threading::{par_delta_sums_into, MIN_PARALLEL_WORK};

// ============================================================================
// Re-exports from delta-view
// ============================================================================
pub use delta_view::{row_major_strides, Tensor, TensorView, TensorViewMut, ViewError};

/// Result type for kernel operations.
pub type Result<T> = std::result::Result<T, ShapeError>;
