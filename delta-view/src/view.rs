//! Dynamic-rank dense tensor views.
//!
//! - [`TensorView`]: Immutable view over a borrowed slice
//! - [`TensorViewMut`]: Mutable view that can be split into disjoint halves
//! - [`Tensor`]: Owned multidimensional array

use std::marker::PhantomData;
use std::ops::Index;
use std::sync::Arc;

use crate::{Result, ViewError};

// ============================================================================
// Validation helpers
// ============================================================================

/// Validate that all accessed offsets stay within `[0, len)`.
fn validate_bounds(len: usize, dims: &[usize], strides: &[isize], offset: isize) -> Result<()> {
    if dims.len() != strides.len() {
        return Err(ViewError::StrideLengthMismatch);
    }
    // Empty array - no access needed
    if dims.iter().any(|&d| d == 0) {
        return Ok(());
    }
    let mut min_offset = offset;
    let mut max_offset = offset;
    for (&dim, &stride) in dims.iter().zip(strides.iter()) {
        if dim > 1 {
            let end = stride
                .checked_mul(dim as isize - 1)
                .ok_or(ViewError::OffsetOverflow)?;
            if end >= 0 {
                max_offset = max_offset
                    .checked_add(end)
                    .ok_or(ViewError::OffsetOverflow)?;
            } else {
                min_offset = min_offset
                    .checked_add(end)
                    .ok_or(ViewError::OffsetOverflow)?;
            }
        }
    }
    if min_offset < 0 || max_offset < 0 {
        return Err(ViewError::OffsetOverflow);
    }
    if max_offset as usize >= len {
        return Err(ViewError::OffsetOverflow);
    }
    Ok(())
}

/// Reject layouts where two distinct indices reach the same element.
///
/// Axes are visited by increasing `|stride|`; each stride must exceed the
/// span already covered by the faster axes. This is sufficient (not
/// necessary) for injectivity and accepts every dense or sliced layout.
fn validate_no_overlap(dims: &[usize], strides: &[isize]) -> Result<()> {
    if dims.iter().any(|&d| d == 0) {
        return Ok(());
    }
    let mut axes: Vec<(usize, usize)> = dims
        .iter()
        .zip(strides.iter())
        .filter(|&(&d, _)| d > 1)
        .map(|(&d, &s)| (s.unsigned_abs(), d))
        .collect();
    axes.sort_unstable();

    let mut reach = 0usize;
    for (stride, dim) in axes {
        if stride <= reach {
            return Err(ViewError::Overlapping(strides.to_vec()));
        }
        reach = stride
            .checked_mul(dim - 1)
            .and_then(|span| span.checked_add(reach))
            .ok_or(ViewError::OffsetOverflow)?;
    }
    Ok(())
}

fn check_dense_len(len: usize, dims: &[usize]) -> Result<()> {
    let expected: usize = dims.iter().product();
    if expected != len {
        return Err(ViewError::LengthMismatch { expected, got: len });
    }
    Ok(())
}

/// Dims of the two halves of `axis` split at `mid`, plus the right half's offset.
///
/// # Panics
/// Panics if `axis` is out of range or `mid > dims[axis]`.
fn split_layout(
    dims: &[usize],
    strides: &[isize],
    offset: isize,
    axis: usize,
    mid: usize,
) -> (Vec<usize>, Vec<usize>, isize) {
    assert!(axis < dims.len(), "axis {} out of range for rank {}", axis, dims.len());
    let len = dims[axis];
    assert!(mid <= len, "split point {} out of bounds for dim {}", mid, len);
    let mut left = dims.to_vec();
    left[axis] = mid;
    let mut right = dims.to_vec();
    right[axis] = len - mid;
    let right_offset = if mid == len {
        offset
    } else {
        offset + mid as isize * strides[axis]
    };
    (left, right, right_offset)
}

/// Element position of `indices`, asserting each index is in range.
#[inline]
fn element_offset(dims: &[usize], strides: &[isize], offset: isize, indices: &[usize]) -> isize {
    assert_eq!(indices.len(), dims.len(), "wrong number of indices");
    let mut idx = offset;
    for (i, &index) in indices.iter().enumerate() {
        assert!(
            index < dims[i],
            "index {} out of bounds for dim {}",
            index,
            dims[i]
        );
        idx += index as isize * strides[i];
    }
    idx
}

/// Visit every multi-index of `dims` in row-major order (last index fastest).
pub(crate) fn for_each_index(dims: &[usize], mut f: impl FnMut(&[usize])) {
    let total: usize = dims.iter().product();
    let rank = dims.len();
    let mut idx = vec![0usize; rank];
    for _ in 0..total {
        f(&idx);
        for d in (0..rank).rev() {
            idx[d] += 1;
            if idx[d] < dims[d] {
                break;
            }
            idx[d] = 0;
        }
    }
}

/// Compute column-major strides (first index varies fastest).
pub fn col_major_strides(dims: &[usize]) -> Vec<isize> {
    let rank = dims.len();
    if rank == 0 {
        return vec![];
    }
    let mut strides = vec![1isize; rank];
    for i in 1..rank {
        strides[i] = strides[i - 1] * dims[i - 1] as isize;
    }
    strides
}

/// Compute row-major strides (C default: last index varies fastest).
pub fn row_major_strides(dims: &[usize]) -> Vec<isize> {
    let rank = dims.len();
    if rank == 0 {
        return vec![];
    }
    let mut strides = vec![1isize; rank];
    for i in (0..rank - 1).rev() {
        strides[i] = strides[i + 1] * dims[i + 1] as isize;
    }
    strides
}

fn is_row_major(dims: &[usize], strides: &[isize]) -> bool {
    let mut expected = 1isize;
    for i in (0..dims.len()).rev() {
        if dims[i] <= 1 {
            continue;
        }
        if strides[i] != expected {
            return false;
        }
        expected *= dims[i] as isize;
    }
    true
}

// ============================================================================
// TensorView
// ============================================================================

/// Dynamic-rank immutable view over a borrowed slice.
///
/// Every element reachable through `dims`/`strides`/`offset` is guaranteed to
/// lie inside `data`; this is checked once in [`TensorView::new`].
pub struct TensorView<'a, T> {
    data: &'a [T],
    dims: Arc<[usize]>,
    strides: Arc<[isize]>,
    offset: isize,
}

impl<T> Clone for TensorView<'_, T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data,
            dims: self.dims.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
        }
    }
}

impl<T> std::fmt::Debug for TensorView<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TensorView")
            .field("dims", &self.dims)
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<'a, T> TensorView<'a, T> {
    /// Create a new view from a borrowed slice.
    ///
    /// # Errors
    /// Returns an error if any index combination would read outside `data`.
    pub fn new(data: &'a [T], dims: &[usize], strides: &[isize], offset: isize) -> Result<Self> {
        validate_bounds(data.len(), dims, strides, offset)?;
        Ok(Self {
            data,
            dims: Arc::from(dims),
            strides: Arc::from(strides),
            offset,
        })
    }

    /// View a dense row-major buffer with the given shape.
    pub fn row_major(data: &'a [T], dims: &[usize]) -> Result<Self> {
        check_dense_len(data.len(), dims)?;
        let strides = row_major_strides(dims);
        Self::new(data, dims, &strides, 0)
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn offset(&self) -> isize {
        self.offset
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dims.iter().any(|&d| d == 0)
    }

    /// The whole borrowed buffer, including elements outside the view.
    #[inline]
    pub fn data(&self) -> &'a [T] {
        self.data
    }

    /// Check if the view is contiguous in memory (row-major order).
    pub fn is_row_major_contiguous(&self) -> bool {
        is_row_major(&self.dims, &self.strides)
    }

    /// Permute dimensions.
    pub fn permute(&self, perm: &[usize]) -> Result<TensorView<'a, T>> {
        let rank = self.dims.len();
        if perm.len() != rank {
            return Err(ViewError::RankMismatch(perm.len(), rank));
        }
        let mut seen = vec![false; rank];
        for &p in perm {
            if p >= rank || seen[p] {
                return Err(ViewError::InvalidAxis { axis: p, rank });
            }
            seen[p] = true;
        }
        let new_dims: Vec<usize> = perm.iter().map(|&p| self.dims[p]).collect();
        let new_strides: Vec<isize> = perm.iter().map(|&p| self.strides[p]).collect();
        Ok(TensorView {
            data: self.data,
            dims: Arc::from(new_dims),
            strides: Arc::from(new_strides),
            offset: self.offset,
        })
    }

    /// Split `axis` at `mid` (zero-copy).
    ///
    /// The left view covers `0..mid`, the right view `mid..dims[axis]`.
    ///
    /// # Panics
    /// Panics if `axis` is out of range or `mid > dims[axis]`.
    pub fn split_at(&self, axis: usize, mid: usize) -> (TensorView<'a, T>, TensorView<'a, T>) {
        let (left, right, right_offset) =
            split_layout(&self.dims, &self.strides, self.offset, axis, mid);
        (
            TensorView {
                data: self.data,
                dims: Arc::from(left),
                strides: self.strides.clone(),
                offset: self.offset,
            },
            TensorView {
                data: self.data,
                dims: Arc::from(right),
                strides: self.strides.clone(),
                offset: right_offset,
            },
        )
    }
}

impl<T: Copy> TensorView<'_, T> {
    /// Get an element.
    ///
    /// # Panics
    /// Panics if the number of indices or any index is out of range.
    #[inline]
    pub fn get(&self, indices: &[usize]) -> T {
        let pos = element_offset(&self.dims, &self.strides, self.offset, indices);
        self.data[pos as usize]
    }
}

// ============================================================================
// TensorViewMut
// ============================================================================

/// Dynamic-rank mutable view.
///
/// Construction rejects overlapping layouts, so distinct indices always
/// address distinct elements. [`TensorViewMut::split_at`] relies on this to
/// hand out two views that can be written from different threads.
pub struct TensorViewMut<'a, T> {
    base: *mut T,
    len: usize,
    dims: Arc<[usize]>,
    strides: Arc<[isize]>,
    offset: isize,
    _marker: PhantomData<&'a mut [T]>,
}

// A view only writes the elements its own index space reaches.
unsafe impl<T: Send> Send for TensorViewMut<'_, T> {}
unsafe impl<T: Sync> Sync for TensorViewMut<'_, T> {}

impl<T> std::fmt::Debug for TensorViewMut<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TensorViewMut")
            .field("dims", &self.dims)
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<'a, T> TensorViewMut<'a, T> {
    /// Create a new mutable view.
    ///
    /// # Errors
    /// Returns an error if any index would write outside `data`, or if two
    /// indices would address the same element.
    pub fn new(
        data: &'a mut [T],
        dims: &[usize],
        strides: &[isize],
        offset: isize,
    ) -> Result<Self> {
        validate_bounds(data.len(), dims, strides, offset)?;
        validate_no_overlap(dims, strides)?;
        Ok(Self {
            base: data.as_mut_ptr(),
            len: data.len(),
            dims: Arc::from(dims),
            strides: Arc::from(strides),
            offset,
            _marker: PhantomData,
        })
    }

    /// View a dense row-major buffer with the given shape.
    pub fn row_major(data: &'a mut [T], dims: &[usize]) -> Result<Self> {
        check_dense_len(data.len(), dims)?;
        let strides = row_major_strides(dims);
        Self::new(data, dims, &strides, 0)
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn offset(&self) -> isize {
        self.offset
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dims.iter().any(|&d| d == 0)
    }

    /// Check if the view is contiguous in memory (row-major order).
    pub fn is_row_major_contiguous(&self) -> bool {
        is_row_major(&self.dims, &self.strides)
    }

    /// Reborrow with a shorter lifetime.
    pub fn reborrow(&mut self) -> TensorViewMut<'_, T> {
        TensorViewMut {
            base: self.base,
            len: self.len,
            dims: self.dims.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
            _marker: PhantomData,
        }
    }

    /// Split `axis` at `mid`, consuming the view.
    ///
    /// The left view covers `0..mid`, the right view `mid..dims[axis]`.
    /// The halves address disjoint elements and may be written concurrently.
    ///
    /// # Panics
    /// Panics if `axis` is out of range or `mid > dims[axis]`.
    pub fn split_at(self, axis: usize, mid: usize) -> (Self, Self) {
        let (left_dims, right_dims, right_offset) =
            split_layout(&self.dims, &self.strides, self.offset, axis, mid);
        let left = TensorViewMut {
            base: self.base,
            len: self.len,
            dims: Arc::from(left_dims),
            strides: self.strides.clone(),
            offset: self.offset,
            _marker: PhantomData,
        };
        let right = TensorViewMut {
            base: self.base,
            len: self.len,
            dims: Arc::from(right_dims),
            strides: self.strides,
            offset: right_offset,
            _marker: PhantomData,
        };
        (left, right)
    }
}

impl<T: Copy> TensorViewMut<'_, T> {
    /// Get an element.
    pub fn get(&self, indices: &[usize]) -> T {
        let pos = element_offset(&self.dims, &self.strides, self.offset, indices) as usize;
        assert!(pos < self.len);
        // In bounds: validated at construction and asserted above.
        unsafe { *self.base.add(pos) }
    }

    /// Set an element.
    pub fn set(&mut self, indices: &[usize], value: T) {
        let pos = element_offset(&self.dims, &self.strides, self.offset, indices) as usize;
        assert!(pos < self.len);
        unsafe {
            *self.base.add(pos) = value;
        }
    }

    /// Copy every element of `src` into this view.
    pub fn copy_from(&mut self, src: &TensorView<'_, T>) -> Result<()> {
        if self.dims() != src.dims() {
            return Err(ViewError::ShapeMismatch(
                self.dims().to_vec(),
                src.dims().to_vec(),
            ));
        }
        let dims = self.dims.clone();
        for_each_index(&dims, |idx| self.set(idx, src.get(idx)));
        Ok(())
    }
}

// ============================================================================
// Tensor
// ============================================================================

/// Owned multidimensional array.
///
/// Supports both row-major (C default) and column-major layouts.
pub struct Tensor<T> {
    data: Vec<T>,
    dims: Arc<[usize]>,
    strides: Arc<[isize]>,
    offset: isize,
}

impl<T> std::fmt::Debug for Tensor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("dims", &self.dims)
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<T: Clone> Clone for Tensor<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            dims: self.dims.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
        }
    }
}

impl<T: Clone + Default> Tensor<T> {
    /// Create a row-major tensor filled with Default values.
    pub fn row_major(dims: &[usize]) -> Self {
        let total: usize = dims.iter().product();
        Self {
            data: vec![T::default(); total],
            dims: Arc::from(dims),
            strides: Arc::from(row_major_strides(dims)),
            offset: 0,
        }
    }

    /// Create a column-major tensor filled with Default values.
    pub fn col_major(dims: &[usize]) -> Self {
        let total: usize = dims.iter().product();
        Self {
            data: vec![T::default(); total],
            dims: Arc::from(dims),
            strides: Arc::from(col_major_strides(dims)),
            offset: 0,
        }
    }
}

impl<T> Tensor<T> {
    /// Create a row-major tensor with values produced by a function.
    ///
    /// The function is called with indices in row-major iteration order.
    pub fn from_fn_row_major(dims: &[usize], mut f: impl FnMut(&[usize]) -> T) -> Self {
        let total: usize = dims.iter().product();
        let mut data = Vec::with_capacity(total);
        for_each_index(dims, |idx| data.push(f(idx)));
        Self {
            data,
            dims: Arc::from(dims),
            strides: Arc::from(row_major_strides(dims)),
            offset: 0,
        }
    }

    /// Create from raw parts.
    pub fn from_parts(data: Vec<T>, dims: &[usize], strides: &[isize], offset: isize) -> Result<Self> {
        validate_bounds(data.len(), dims, strides, offset)?;
        validate_no_overlap(dims, strides)?;
        Ok(Self {
            data,
            dims: Arc::from(dims),
            strides: Arc::from(strides),
            offset,
        })
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dims.iter().any(|&d| d == 0)
    }

    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consume the tensor, returning its storage.
    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Create an immutable view over this tensor.
    pub fn view(&self) -> TensorView<'_, T> {
        TensorView {
            data: &self.data,
            dims: self.dims.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
        }
    }

    /// Create a mutable view over this tensor.
    pub fn view_mut(&mut self) -> TensorViewMut<'_, T> {
        TensorViewMut {
            base: self.data.as_mut_ptr(),
            len: self.data.len(),
            dims: self.dims.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
            _marker: PhantomData,
        }
    }
}

impl<T: Copy> Tensor<T> {
    /// Materialize any view into a fresh row-major tensor.
    pub fn from_view(src: &TensorView<'_, T>) -> Self {
        Self::from_fn_row_major(src.dims(), |idx| src.get(idx))
    }

    /// Get an element by multi-dimensional index.
    pub fn get(&self, indices: &[usize]) -> T {
        self.view().get(indices)
    }

    /// Set an element by multi-dimensional index.
    pub fn set(&mut self, indices: &[usize], value: T) {
        let pos = element_offset(&self.dims, &self.strides, self.offset, indices);
        self.data[pos as usize] = value;
    }
}

impl<T> Index<&[usize]> for Tensor<T> {
    type Output = T;

    fn index(&self, indices: &[usize]) -> &T {
        let pos = element_offset(&self.dims, &self.strides, self.offset, indices);
        &self.data[pos as usize]
    }
}

// ============================================================================
// Tests
// ============================================================================
