//! The delta-sum engine: validation, dispatch and output staging.

use delta_kernel::{
    delta_sums_into, validate_shapes, DeltaShape, ShapeError, TensorView, TensorViewMut,
};
use tracing::debug;

use crate::config::DeltaSumConfig;
use crate::writeback::Writeback;
use crate::Result;

/// Fill `output[perm, gene]` with the total delta of `input[perm, .., .., gene]`
/// using the default configuration.
///
/// `input` is `[permutation, timepoint, replicate, feature]`, `output` is
/// `[permutation, feature]`. On a shape error nothing has been written.
pub fn compute_delta_sums(
    input: &TensorView<'_, f64>,
    output: &mut TensorViewMut<'_, f64>,
) -> Result<()> {
    DeltaSumEngine::default().compute(input, output)
}

/// Runs the delta-sum kernel according to a [`DeltaSumConfig`].
pub struct DeltaSumEngine {
    config: DeltaSumConfig,
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl Default for DeltaSumEngine {
    fn default() -> Self {
        Self {
            config: DeltaSumConfig::default(),
            #[cfg(feature = "parallel")]
            pool: None,
        }
    }
}

impl std::fmt::Debug for DeltaSumEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeltaSumEngine")
            .field("config", &self.config)
            .finish()
    }
}

impl DeltaSumEngine {
    /// Create an engine; builds a dedicated thread pool if `config.threads` is set.
    pub fn new(config: DeltaSumConfig) -> Result<Self> {
        config.validate()?;
        #[cfg(feature = "parallel")]
        let pool = match config.threads {
            Some(threads) if config.parallel => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("total-delta-{i}"))
                    .build()?,
            ),
            _ => None,
        };
        #[cfg(not(feature = "parallel"))]
        if config.threads.is_some() {
            debug!("thread count ignored: built without the `parallel` feature");
        }

        Ok(Self {
            config,
            #[cfg(feature = "parallel")]
            pool,
        })
    }

    /// Create an engine configured from `TOTAL_DELTA_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(DeltaSumConfig::from_env()?)
    }

    pub fn config(&self) -> &DeltaSumConfig {
        &self.config
    }

    /// Fill `output` from `input`.
    ///
    /// Shapes are checked first; a [`ShapeError`] leaves `output` untouched.
    /// Every output cell is overwritten on success.
    pub fn compute(
        &self,
        input: &TensorView<'_, f64>,
        output: &mut TensorViewMut<'_, f64>,
    ) -> Result<()> {
        let shape = validate_shapes(input.dims(), output.dims()).map_err(|err| {
            debug!(%err, input = ?input.dims(), output = ?output.dims(), "rejected delta-sum shapes");
            err
        })?;

        let span = tracing::debug_span!(
            "delta_sums",
            perms = shape.perms,
            timepoints = shape.timepoints,
            replicates = shape.replicates,
            genes = shape.genes,
        );
        let _enter = span.enter();

        if self.config.stage_strided_output && !output.is_row_major_contiguous() {
            debug!("staging strided output through a row-major scratch buffer");
            let mut staged = Writeback::overwrite(output.reborrow());
            self.dispatch(input, &mut staged.scratch_mut(), &shape)?;
            staged.resolve()?;
            return Ok(());
        }
        self.dispatch(input, output, &shape)
    }

    /// Fill `output` from flat row-major buffers.
    pub fn compute_slices(
        &self,
        input: &[f64],
        input_dims: &[usize],
        output: &mut [f64],
        output_dims: &[usize],
    ) -> Result<()> {
        let input = TensorView::row_major(input, input_dims)?;
        let mut output = TensorViewMut::row_major(output, output_dims)?;
        self.compute(&input, &mut output)
    }

    /// Fill `output` from permutations delivered in several input tensors.
    ///
    /// Batch `k` fills the output rows following those of batch `k - 1`.
    /// All batches are validated before any row is written: each must be
    /// 4-dimensional with the same timepoint, replicate and feature extents,
    /// their permutation counts must add up to `output.dims()[0]`, and the
    /// feature extent must equal `output.dims()[1]`.
    pub fn compute_batches(
        &self,
        batches: &[TensorView<'_, f64>],
        output: &mut TensorViewMut<'_, f64>,
    ) -> Result<()> {
        let shapes = validate_batches(batches, output.dims()).map_err(|err| {
            debug!(%err, batches = batches.len(), "rejected delta-sum batches");
            err
        })?;

        let mut rest = output.reborrow();
        for (batch, shape) in batches.iter().zip(shapes) {
            let (mut rows, tail) = rest.split_at(0, shape.perms);
            self.compute(batch, &mut rows)?;
            rest = tail;
        }
        Ok(())
    }

    fn dispatch(
        &self,
        input: &TensorView<'_, f64>,
        output: &mut TensorViewMut<'_, f64>,
        shape: &DeltaShape,
    ) -> Result<()> {
        #[cfg(feature = "parallel")]
        if self.config.parallel && shape.work() > self.config.min_parallel_work {
            debug!(work = shape.work(), "running parallel kernel");
            let min_work = self.config.min_parallel_work;
            match &self.pool {
                Some(pool) => pool
                    .install(|| delta_kernel::par_delta_sums_into(output, input, min_work))?,
                None => delta_kernel::par_delta_sums_into(output, input, min_work)?,
            }
            return Ok(());
        }

        debug!(work = shape.work(), "running sequential kernel");
        delta_sums_into(output, input)?;
        Ok(())
    }
}

/// Validate a batch list against `output_dims`, returning each batch's shape.
fn validate_batches(
    batches: &[TensorView<'_, f64>],
    output_dims: &[usize],
) -> std::result::Result<Vec<DeltaShape>, ShapeError> {
    for batch in batches {
        if batch.ndim() != 4 {
            return Err(ShapeError::InputRank(batch.ndim()));
        }
    }
    if output_dims.len() != 2 {
        return Err(ShapeError::OutputRank(output_dims.len()));
    }

    let (timepoints, replicates, genes) = match batches.first() {
        Some(first) => (first.dims()[1], first.dims()[2], first.dims()[3]),
        None => (0, 0, output_dims[1]),
    };
    let mut shapes = Vec::with_capacity(batches.len());
    let mut total_perms = 0usize;
    for batch in batches {
        let dims = batch.dims();
        if dims[1..] != [timepoints, replicates, genes] {
            return Err(ShapeError::Incompatible {
                input: dims.to_vec(),
                output: output_dims.to_vec(),
            });
        }
        total_perms = total_perms.saturating_add(dims[0]);
        shapes.push(DeltaShape {
            perms: dims[0],
            timepoints,
            replicates,
            genes,
        });
    }

    validate_shapes(&[total_perms, timepoints, replicates, genes], output_dims)?;
    Ok(shapes)
}
