//! Conversion from `ndarray` views.
//!
//! A view whose elements form one contiguous block (in any axis order, with
//! any stride signs) is borrowed without copying. Other views may have gaps
//! owned by some other live borrow, so they are never viewed as a slice:
//! inputs are copied into a row-major [`Tensor`], and outputs are computed
//! into a row-major scratch tensor that is copied back only on success.

use ndarray::{ArrayView, ArrayViewMut, Dimension};
use tracing::debug;

use delta_kernel::{row_major_strides, Tensor, TensorView, TensorViewMut, ViewError};

use crate::Result;

/// Offset of the element at `[0, 0, ..., 0]` from the lowest reachable address.
///
/// Negative strides (reversed views) move the lowest element before
/// `as_ptr()`.
fn first_element_offset(shape: &[usize], strides: &[isize]) -> isize {
    shape
        .iter()
        .zip(strides.iter())
        .filter(|&(&d, &s)| d > 1 && s < 0)
        .map(|(&d, &s)| -(s * (d as isize - 1)))
        .sum()
}

/// Borrow `view` as a [`TensorView`] if its elements are one contiguous block.
///
/// Returns `Ok(None)` for views with gaps; see [`to_tensor`] for those.
pub fn tensor_view<'a, T, D: Dimension>(
    view: &'a ArrayView<'_, T, D>,
) -> std::result::Result<Option<TensorView<'a, T>>, ViewError> {
    let shape = view.shape();
    let strides = view.strides();
    if view.is_empty() {
        return TensorView::new(&[], shape, strides, 0).map(Some);
    }
    match view.as_slice_memory_order() {
        Some(data) => {
            TensorView::new(data, shape, strides, first_element_offset(shape, strides)).map(Some)
        }
        None => Ok(None),
    }
}

/// Borrow `view` as a [`TensorViewMut`] if its elements are one contiguous block.
///
/// Returns `Ok(None)` for views with gaps.
pub fn tensor_view_mut<'a, T, D: Dimension>(
    view: &'a mut ArrayViewMut<'_, T, D>,
) -> std::result::Result<Option<TensorViewMut<'a, T>>, ViewError> {
    let shape = view.shape().to_vec();
    let strides = view.strides().to_vec();
    if view.is_empty() {
        return TensorViewMut::new(&mut [], &shape, &strides, 0).map(Some);
    }
    let offset = first_element_offset(&shape, &strides);
    match view.as_slice_memory_order_mut() {
        Some(data) => TensorViewMut::new(data, &shape, &strides, offset).map(Some),
        None => Ok(None),
    }
}

/// Copy `view` into an owned row-major [`Tensor`].
pub fn to_tensor<T: Copy, D: Dimension>(
    view: &ArrayView<'_, T, D>,
) -> std::result::Result<Tensor<T>, ViewError> {
    let shape = view.shape();
    Tensor::from_parts(
        view.iter().copied().collect(),
        shape,
        &row_major_strides(shape),
        0,
    )
}

/// [`compute_delta_sums`](crate::compute_delta_sums) for `ndarray` inputs.
///
/// Any dimensionality is accepted; ranks are checked like every other entry
/// point. On error `output` is untouched.
pub fn compute_delta_sums_ndarray<D1: Dimension, D2: Dimension>(
    input: ArrayView<'_, f64, D1>,
    mut output: ArrayViewMut<'_, f64, D2>,
) -> Result<()> {
    let copied;
    let input = match tensor_view(&input)? {
        Some(view) => view,
        None => {
            debug!(dims = ?input.shape(), "copying non-contiguous input");
            copied = to_tensor(&input)?;
            copied.view()
        }
    };

    if let Some(mut target) = tensor_view_mut(&mut output)? {
        return crate::compute_delta_sums(&input, &mut target);
    }

    debug!(dims = ?output.shape(), "staging non-contiguous output");
    let mut scratch = Tensor::<f64>::row_major(output.shape());
    crate::compute_delta_sums(&input, &mut scratch.view_mut())?;
    for (dst, &value) in output.iter_mut().zip(scratch.data()) {
        *dst = value;
    }
    Ok(())
}
