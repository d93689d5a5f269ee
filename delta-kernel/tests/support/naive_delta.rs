//! Independent reference for the delta sum, on flat row-major buffers.
//!
//! Materializes the time-rotated copy of the data, takes every
//! `(rep, rep2)` difference, zeroes NaNs, then sums per `(perm, gene)`.
//! Summation order differs from the kernel, so compare with a tolerance.

use delta_view::{row_major_strides, Tensor};

pub fn row_major_f64(dims: &[usize], data: Vec<f64>) -> Tensor<f64> {
    let strides = row_major_strides(dims);
    Tensor::from_parts(data, dims, &strides, 0).expect("valid row-major f64 tensor")
}

/// `dims = [P, T, R, G]`, `data` row-major. Returns a row-major `P * G` buffer.
pub fn naive_delta_sums(dims: [usize; 4], data: &[f64]) -> Vec<f64> {
    let [p_len, t_len, r_len, g_len] = dims;
    let at = |p: usize, t: usize, r: usize, g: usize| ((p * t_len + t) * r_len + r) * g_len + g;

    // rotated[p, t] = data[p, t + 1 mod T]
    let mut rotated = vec![0.0; data.len()];
    for p in 0..p_len {
        for t in 0..t_len {
            for r in 0..r_len {
                for g in 0..g_len {
                    rotated[at(p, t, r, g)] = data[at(p, (t + 1) % t_len, r, g)];
                }
            }
        }
    }

    let mut diffs = Vec::with_capacity(p_len * t_len * r_len * r_len * g_len);
    for p in 0..p_len {
        for t in 0..t_len {
            for r in 0..r_len {
                for r2 in 0..r_len {
                    for g in 0..g_len {
                        diffs.push((data[at(p, t, r, g)] - rotated[at(p, t, r2, g)]).abs());
                    }
                }
            }
        }
    }
    for d in diffs.iter_mut() {
        if d.is_nan() {
            *d = 0.0;
        }
    }

    let per_perm = t_len * r_len * r_len * g_len;
    let mut out = vec![0.0; p_len * g_len];
    for p in 0..p_len {
        for (k, &d) in diffs[p * per_perm..(p + 1) * per_perm].iter().enumerate() {
            out[p * g_len + k % g_len] += d;
        }
    }
    out
}
