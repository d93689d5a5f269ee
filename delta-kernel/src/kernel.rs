//! Sequential delta-sum kernel.
//!
//! For every `(perm, gene)` cell the kernel sums `|a - b|` over all
//! `(timepoint, rep, rep2)` with `a = src[perm, timepoint, rep, gene]` and
//! `b = src[perm, (timepoint + 1) % T, rep2, gene]`, skipping NaN
//! differences. `rep == rep2` pairs are included.

use delta_view::{TensorView, TensorViewMut};

use crate::shape::{validate_shapes, ShapeError};

/// Fill `dest[perm, gene]` with the total delta of `src[perm, .., .., gene]`.
///
/// Shapes are validated before anything is written; on error `dest` is
/// untouched.
pub fn delta_sums_into(
    dest: &mut TensorViewMut<'_, f64>,
    src: &TensorView<'_, f64>,
) -> Result<(), ShapeError> {
    validate_shapes(src.dims(), dest.dims())?;
    fill_block(dest, src);
    Ok(())
}

/// Total delta of a single cell, computed by the plain loop nest.
///
/// # Panics
/// Panics if `src` is not 4-dimensional or `perm`/`gene` are out of range.
pub fn delta_sum_cell(src: &TensorView<'_, f64>, perm: usize, gene: usize) -> f64 {
    assert_eq!(src.ndim(), 4, "input must be 4-dimensional");
    let timepoints = src.dims()[1];
    let replicates = src.dims()[2];

    let mut sum = 0.0;
    for timepoint in 0..timepoints {
        let next = (timepoint + 1) % timepoints;
        for rep in 0..replicates {
            for rep2 in 0..replicates {
                let a = src.get(&[perm, timepoint, rep, gene]);
                let b = src.get(&[perm, next, rep2, gene]);
                let diff = (a - b).abs();
                if !diff.is_nan() {
                    sum += diff;
                }
            }
        }
    }
    sum
}

/// Fill a block whose shapes already agree: `dest` is `[p, g]`, `src` is
/// `[p, t, r, g]`.
///
/// Each row keeps `g` running sums and walks `timepoint -> rep -> rep2`
/// outside the gene loop, so the innermost loop follows the gene axis. Per
/// cell the additions happen in the same order as [`delta_sum_cell`], which
/// keeps the two bit-identical. A row is stored once it is complete.
pub(crate) fn fill_block(dest: &mut TensorViewMut<'_, f64>, src: &TensorView<'_, f64>) {
    let dims = src.dims();
    let (perms, timepoints, replicates, genes) = (dims[0], dims[1], dims[2], dims[3]);
    debug_assert_eq!(dest.dims(), &[perms, genes]);
    if perms == 0 || genes == 0 {
        return;
    }
    if timepoints == 0 || replicates == 0 {
        // No pairs. The input holds no elements, so its offset and strides
        // were never checked and must not be used.
        for perm in 0..perms {
            for gene in 0..genes {
                dest.set(&[perm, gene], 0.0);
            }
        }
        return;
    }

    let data = src.data();
    let strides = src.strides();
    let (perm_stride, time_stride, rep_stride, gene_stride) =
        (strides[0], strides[1], strides[2], strides[3]);

    let mut acc = vec![0.0f64; genes];
    for perm in 0..perms {
        acc.fill(0.0);
        let perm_base = src.offset() + perm as isize * perm_stride;
        for timepoint in 0..timepoints {
            let next = (timepoint + 1) % timepoints;
            let here = perm_base + timepoint as isize * time_stride;
            let there = perm_base + next as isize * time_stride;
            for rep in 0..replicates {
                let a_base = here + rep as isize * rep_stride;
                for rep2 in 0..replicates {
                    let b_base = there + rep2 as isize * rep_stride;
                    accumulate_pairs(&mut acc, data, a_base, b_base, gene_stride);
                }
            }
        }
        for (gene, &sum) in acc.iter().enumerate() {
            dest.set(&[perm, gene], sum);
        }
    }
}

/// `acc[g] += |data[a_base + g*stride] - data[b_base + g*stride]|`, NaN skipped.
///
/// `acc` is never negative zero or NaN, so adding `0.0` for a skipped pair
/// leaves it bit-for-bit unchanged.
#[inline]
fn accumulate_pairs(acc: &mut [f64], data: &[f64], a_base: isize, b_base: isize, stride: isize) {
    let genes = acc.len();
    if stride == 1 {
        let a = &data[a_base as usize..][..genes];
        let b = &data[b_base as usize..][..genes];
        for ((sum, &x), &y) in acc.iter_mut().zip(a).zip(b) {
            let diff = (x - y).abs();
            *sum += if diff.is_nan() { 0.0 } else { diff };
        }
        return;
    }
    for (gene, sum) in acc.iter_mut().enumerate() {
        let step = gene as isize * stride;
        let x = data[(a_base + step) as usize];
        let y = data[(b_base + step) as usize];
        let diff = (x - y).abs();
        *sum += if diff.is_nan() { 0.0 } else { diff };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delta_view::Tensor;

    fn run(input: &Tensor<f64>) -> Tensor<f64> {
        let dims = input.dims();
        let mut out = Tensor::<f64>::row_major(&[dims[0], dims[3]]);
        delta_sums_into(&mut out.view_mut(), &input.view()).unwrap();
        out
    }

    fn input(dims: [usize; 4], values: &[f64]) -> Tensor<f64> {
        Tensor::from_parts(values.to_vec(), &dims, &delta_view::row_major_strides(&dims), 0)
            .unwrap()
    }

    #[test]
    fn test_two_timepoints_wraparound() {
        let out = run(&input([1, 2, 1, 1], &[2.0, 5.0]));
        assert_eq!(out.get(&[0, 0]), 6.0);
    }

    #[test]
    fn test_nan_pairs_skipped() {
        let out = run(&input([1, 2, 1, 1], &[f64::NAN, 4.0]));
        assert_eq!(out.get(&[0, 0]), 0.0);
        assert!(out.get(&[0, 0]).is_sign_positive());
    }

    #[test]
    fn test_multi_replicate() {
        // t0 reps [1, 3], t1 reps [2, 6]
        let out = run(&input([1, 2, 2, 1], &[1.0, 3.0, 2.0, 6.0]));
        assert_eq!(out.get(&[0, 0]), 20.0);
    }

    #[test]
    fn test_single_timepoint_pairs_with_itself() {
        // T = 1: sum over rep, rep2 of |x_rep - x_rep2|
        let out = run(&input([1, 1, 3, 1], &[1.0, 4.0, 6.0]));
        // |1-4| + |1-6| + |4-6| = 10, counted in both directions
        assert_eq!(out.get(&[0, 0]), 20.0);
    }

    #[test]
    fn test_self_pairs_contribute_zero() {
        // Flat feature: every pair, including rep == rep2, has zero difference
        let out = run(&input([1, 3, 2, 1], &[5.0; 6]));
        assert_eq!(out.get(&[0, 0]), 0.0);
    }

    #[test]
    fn test_one_nan_operand_skips_only_its_pairs() {
        // t0 reps [1, NaN], t1 reps [2, 4]
        // forward: |1-2| + |1-4| = 4 (NaN rep skipped)
        // backward: |2-1| + |4-1| = 4
        let out = run(&input([1, 2, 2, 1], &[1.0, f64::NAN, 2.0, 4.0]));
        assert_eq!(out.get(&[0, 0]), 8.0);
    }

    #[test]
    fn test_genes_and_perms_independent() {
        // P=2, T=2, R=1, G=2
        // perm 0: gene0 [0, 1], gene1 [0, 10]
        // perm 1: gene0 [3, 3], gene1 [NaN, 2]
        let values = [0.0, 0.0, 1.0, 10.0, 3.0, f64::NAN, 3.0, 2.0];
        let out = run(&input([2, 2, 1, 2], &values));
        assert_eq!(out.data(), &[2.0, 20.0, 0.0, 0.0]);
    }

    #[test]
    fn test_infinity_minus_infinity_is_skipped() {
        let out = run(&input([1, 2, 1, 1], &[f64::INFINITY, f64::INFINITY]));
        assert_eq!(out.get(&[0, 0]), 0.0);
        let out = run(&input([1, 2, 1, 1], &[f64::INFINITY, 1.0]));
        assert_eq!(out.get(&[0, 0]), f64::INFINITY);
    }

    #[test]
    fn test_zero_timepoints_or_replicates_write_zero() {
        for dims in [[2usize, 0, 3, 2], [2, 3, 0, 2]] {
            let src = input(dims, &[]);
            let mut out = Tensor::<f64>::row_major(&[2, 2]);
            out.data_mut().fill(-1.0);
            delta_sums_into(&mut out.view_mut(), &src.view()).unwrap();
            assert_eq!(out.data(), &[0.0; 4]);
        }
    }

    #[test]
    fn test_empty_input_with_extreme_layout_writes_zero() {
        // An empty view accepts any offset and strides
        for dims in [[2usize, 0, 1, 1], [2, 1, 0, 1]] {
            let src = TensorView::new(&[], &dims, &[1, 1, 1, 1], isize::MAX).unwrap();
            let mut out = Tensor::<f64>::row_major(&[2, 1]);
            out.data_mut().fill(7.0);
            delta_sums_into(&mut out.view_mut(), &src).unwrap();
            assert_eq!(out.data(), &[0.0, 0.0]);
        }
        let src = TensorView::new(&[], &[2, 0, 3, 2], &[-5, isize::MAX, 1, -1], isize::MIN)
            .unwrap();
        let mut out = Tensor::<f64>::row_major(&[2, 2]);
        out.data_mut().fill(7.0);
        delta_sums_into(&mut out.view_mut(), &src).unwrap();
        assert_eq!(out.data(), &[0.0; 4]);
    }

    #[test]
    fn test_empty_output_is_fine() {
        let src = input([0, 2, 2, 3], &[]);
        let mut out = Tensor::<f64>::row_major(&[0, 3]);
        delta_sums_into(&mut out.view_mut(), &src.view()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_shape_error_leaves_output_untouched() {
        let src = input([1, 2, 1, 2], &[1.0, 2.0, 3.0, 4.0]);
        let mut out = Tensor::<f64>::row_major(&[1, 3]);
        out.data_mut().fill(7.0);
        let err = delta_sums_into(&mut out.view_mut(), &src.view()).unwrap_err();
        assert!(matches!(err, ShapeError::Incompatible { .. }));
        assert_eq!(out.data(), &[7.0; 3]);
    }

    #[test]
    fn test_row_kernel_matches_cell_loop() {
        let dims = [3usize, 4, 3, 5];
        let src = Tensor::<f64>::from_fn_row_major(&dims, |idx| {
            let v = ((idx[0] * 31 + idx[1] * 17 + idx[2] * 7 + idx[3] * 3) % 13) as f64 * 0.37;
            if (idx[1] + idx[2] + idx[3]) % 7 == 0 {
                f64::NAN
            } else {
                v
            }
        });
        let out = run(&src);
        for perm in 0..dims[0] {
            for gene in 0..dims[3] {
                let expected = delta_sum_cell(&src.view(), perm, gene);
                assert_eq!(out.get(&[perm, gene]).to_bits(), expected.to_bits());
            }
        }
    }

    #[test]
    fn test_strided_output() {
        // Column-major output still receives each cell at the right position
        let src = input([2, 2, 1, 1], &[2.0, 5.0, 1.0, 1.5]);
        let mut out = Tensor::<f64>::col_major(&[2, 1]);
        delta_sums_into(&mut out.view_mut(), &src.view()).unwrap();
        assert_eq!(out.get(&[0, 0]), 6.0);
        assert_eq!(out.get(&[1, 0]), 1.0);
    }

    #[test]
    fn test_non_unit_gene_stride() {
        // Stored as [P, G, T, R], viewed as [P, T, R, G]
        let stored = Tensor::<f64>::from_fn_row_major(&[1, 2, 2, 1], |idx| {
            [[2.0, 5.0], [1.0, 4.0]][idx[1]][idx[2]]
        });
        let view = stored.view().permute(&[0, 2, 3, 1]).unwrap();
        assert_eq!(view.dims(), &[1, 2, 1, 2]);
        let mut out = Tensor::<f64>::row_major(&[1, 2]);
        delta_sums_into(&mut out.view_mut(), &view).unwrap();
        assert_eq!(out.data(), &[6.0, 6.0]);
    }
}
