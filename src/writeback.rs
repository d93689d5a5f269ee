//! Staged writes into a caller-owned view.
//!
//! A [`Writeback`] holds a row-major scratch tensor for its target, either a
//! copy of the target ([`Writeback::new`]) or default-filled when every
//! element will be rewritten ([`Writeback::overwrite`]). Work goes into the
//! scratch; [`Writeback::resolve`] copies it back, while dropping the guard
//! without resolving leaves the target exactly as it was.

use delta_kernel::{Tensor, TensorView, TensorViewMut, ViewError};

/// Row-major scratch copy of a target view, committed only on success.
pub struct Writeback<'a, T: Copy> {
    target: TensorViewMut<'a, T>,
    scratch: Tensor<T>,
    resolved: bool,
}

impl<'a, T: Copy + Default> Writeback<'a, T> {
    /// Stage `target` for a write that covers every element. The target is
    /// not read; the scratch buffer starts at `T::default()`.
    pub fn overwrite(target: TensorViewMut<'a, T>) -> Self {
        let scratch = Tensor::row_major(target.dims());
        Self {
            target,
            scratch,
            resolved: false,
        }
    }
}

impl<'a, T: Copy> Writeback<'a, T> {
    /// Stage `target`, copying its current contents into the scratch buffer.
    pub fn new(target: TensorViewMut<'a, T>) -> Self {
        let scratch = Tensor::from_fn_row_major(target.dims(), |idx| target.get(idx));
        Self {
            target,
            scratch,
            resolved: false,
        }
    }

    /// Read access to the staged values.
    pub fn scratch(&self) -> TensorView<'_, T> {
        self.scratch.view()
    }

    /// Write access to the staged values.
    pub fn scratch_mut(&mut self) -> TensorViewMut<'_, T> {
        self.scratch.view_mut()
    }

    /// Copy the staged values into the target.
    pub fn resolve(mut self) -> Result<(), ViewError> {
        let scratch = self.scratch.view();
        self.target.copy_from(&scratch)?;
        self.resolved = true;
        Ok(())
    }

    /// Drop the staged values; the target is left untouched.
    pub fn discard(self) {}
}

impl<T: Copy> Drop for Writeback<'_, T> {
    fn drop(&mut self) {
        if !self.resolved {
            tracing::debug!(dims = ?self.target.dims(), "discarding staged writeback");
        }
    }
}
