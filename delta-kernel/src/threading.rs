//! Rayon-based parallel execution over the `P x G` cell grid.
//!
//! Recursive halving with `rayon::join`: each step splits the output block
//! and the matching input block along one axis, so every cell ends up in
//! exactly one leaf block and has exactly one writer.

use delta_view::{TensorView, TensorViewMut};

use crate::kernel::fill_block;
use crate::shape::{validate_shapes, ShapeError};

/// Minimum number of pair evaluations to justify splitting a block.
pub const MIN_PARALLEL_WORK: usize = 1 << 15;

/// Parallel [`delta_sums_into`](crate::delta_sums_into).
///
/// Blocks with at most `min_work` pair evaluations run sequentially. The
/// result is bit-identical to the sequential kernel for any thread count.
pub fn par_delta_sums_into(
    dest: &mut TensorViewMut<'_, f64>,
    src: &TensorView<'_, f64>,
    min_work: usize,
) -> Result<(), ShapeError> {
    let shape = validate_shapes(src.dims(), dest.dims())?;
    let costs = split_costs(src.strides());
    split_cells(
        dest.reborrow(),
        src.clone(),
        shape.pair_count(),
        costs,
        rayon::current_num_threads(),
        min_work.max(1),
    );
    Ok(())
}

/// Per-axis splitting weight for the `[perm, gene]` grid.
///
/// Uses the input stride of each axis, so the slow permutation axis is
/// preferred and gene rows stay intact while there is enough to split.
pub(crate) fn split_costs(src_strides: &[isize]) -> [usize; 2] {
    [
        src_strides[0].unsigned_abs().max(1),
        src_strides[3].unsigned_abs().max(1),
    ]
}

/// Index of the axis with the highest `(len - 1) * cost`, preferring the
/// later axis on ties. `None` if no axis has more than one entry.
pub(crate) fn find_split_axis(lens: [usize; 2], costs: [usize; 2]) -> Option<usize> {
    let mut best = None;
    let mut best_score = 0usize;
    for (axis, (&len, &cost)) in lens.iter().zip(costs.iter()).enumerate() {
        if len <= 1 {
            continue;
        }
        let score = (len - 1).saturating_mul(cost);
        if score >= best_score {
            best_score = score;
            best = Some(axis);
        }
    }
    best
}

fn split_cells(
    mut dest: TensorViewMut<'_, f64>,
    src: TensorView<'_, f64>,
    pairs: usize,
    costs: [usize; 2],
    nthreads: usize,
    min_work: usize,
) {
    let lens = [dest.dims()[0], dest.dims()[1]];
    let work = lens[0].saturating_mul(lens[1]).saturating_mul(pairs);

    let axis = match find_split_axis(lens, costs) {
        Some(axis) if nthreads > 1 && work > min_work => axis,
        _ => {
            fill_block(&mut dest, &src);
            return;
        }
    };

    // Output axis 1 (gene) is input axis 3
    let src_axis = if axis == 0 { 0 } else { 3 };
    let mid = lens[axis] / 2;
    let (dest_left, dest_right) = dest.split_at(axis, mid);
    let (src_left, src_right) = src.split_at(src_axis, mid);

    let nt_left = nthreads / 2;
    let nt_right = nthreads - nt_left;
    rayon::join(
        || split_cells(dest_left, src_left, pairs, costs, nt_left, min_work),
        || split_cells(dest_right, src_right, pairs, costs, nt_right, min_work),
    );
}
