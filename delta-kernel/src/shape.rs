//! Shape validation for the delta-sum reduction.
//!
//! The input is `[permutation, timepoint, replicate, feature]`, the output
//! `[permutation, feature]`. Checks run in a fixed order and stop at the
//! first failure; nothing is read from or written to either buffer.

/// Errors raised when input and output tensors cannot be paired.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    /// Input rank is not 4.
    #[error("input must be 4-dimensional (got rank {0})")]
    InputRank(usize),

    /// Output rank is not 2.
    #[error("output must be 2-dimensional (got rank {0})")]
    OutputRank(usize),

    /// Output axes do not match the input's permutation and feature axes.
    #[error("output shape incompatible with input shape: input {input:?}, output {output:?}")]
    Incompatible {
        input: Vec<usize>,
        output: Vec<usize>,
    },
}

/// Validated extents of a delta-sum problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaShape {
    pub perms: usize,
    pub timepoints: usize,
    pub replicates: usize,
    pub genes: usize,
}

impl DeltaShape {
    /// Number of `(timepoint, rep, rep2)` pairs summed per output cell.
    pub fn pair_count(&self) -> usize {
        self.timepoints
            .saturating_mul(self.replicates)
            .saturating_mul(self.replicates)
    }

    /// Number of output cells.
    pub fn cells(&self) -> usize {
        self.perms.saturating_mul(self.genes)
    }

    /// Total pair evaluations for the whole problem.
    pub fn work(&self) -> usize {
        self.cells().saturating_mul(self.pair_count())
    }

    /// Output dims `[P, G]`.
    pub fn output_dims(&self) -> [usize; 2] {
        [self.perms, self.genes]
    }
}

/// Check that `input_dims` and `output_dims` describe a delta-sum problem.
///
/// 1. input rank must be 4
/// 2. output rank must be 2
/// 3. `output[0] == input[0]` and `output[1] == input[3]`
pub fn validate_shapes(
    input_dims: &[usize],
    output_dims: &[usize],
) -> Result<DeltaShape, ShapeError> {
    if input_dims.len() != 4 {
        return Err(ShapeError::InputRank(input_dims.len()));
    }
    if output_dims.len() != 2 {
        return Err(ShapeError::OutputRank(output_dims.len()));
    }
    if output_dims[0] != input_dims[0] || output_dims[1] != input_dims[3] {
        return Err(ShapeError::Incompatible {
            input: input_dims.to_vec(),
            output: output_dims.to_vec(),
        });
    }
    Ok(DeltaShape {
        perms: input_dims[0],
        timepoints: input_dims[1],
        replicates: input_dims[2],
        genes: input_dims[3],
    })
}
