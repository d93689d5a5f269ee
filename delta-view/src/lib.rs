//! Bounds-validated dense tensor views for the total-delta workspace.
//!
//! This crate provides the view types the delta-sum kernel reads from and
//! writes into. Shape, strides and offset are carried explicitly and every
//! reachable element is checked against the borrowed buffer when a view is
//! constructed, so element access never reaches outside caller memory.
//!
//! # Core Types
//!
//! - [`TensorView`]: Read-only dynamic-rank view over a borrowed slice
//! - [`TensorViewMut`]: Writable dynamic-rank view; can be split into disjoint halves
//! - [`Tensor`]: Owned dense array (row-major by default)
//!
//! # Example
//!
//! ```rust
//! use delta_view::{Tensor, TensorView};
//!
//! let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
//! let view = TensorView::row_major(&data, &[2, 3]).unwrap();
//! assert_eq!(view.get(&[1, 2]), 6.0);
//!
//! let mut out = Tensor::<f64>::row_major(&[2, 3]);
//! out.view_mut().set(&[0, 1], 7.5);
//! assert_eq!(out.get(&[0, 1]), 7.5);
//! ```

pub mod view;

pub use view::{col_major_strides, row_major_strides, Tensor, TensorView, TensorViewMut};

// ============================================================================
// Error types
// ============================================================================

/// Errors that can occur while constructing or transforming a view.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    /// Ranks do not match.
    #[error("rank mismatch: {0} vs {1}")]
    RankMismatch(usize, usize),

    /// Shapes are incompatible for the operation.
    #[error("shape mismatch: {0:?} vs {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),

    /// Invalid axis index for the given rank.
    #[error("invalid axis {axis} for rank {rank}")]
    InvalidAxis { axis: usize, rank: usize },

    /// Stride array length doesn't match dimensions.
    #[error("stride and dims length mismatch")]
    StrideLengthMismatch,

    /// A reachable offset falls outside the borrowed buffer, or overflows.
    #[error("offset overflow while computing element position")]
    OffsetOverflow,

    /// Buffer length does not match the element count of a dense layout.
    #[error("buffer length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    /// Two distinct indices of a writable view address the same element.
    #[error("writable view has overlapping strides {0:?}")]
    Overlapping(Vec<isize>),
}

/// Result type for view operations.
pub type Result<T> = std::result::Result<T, ViewError>;
