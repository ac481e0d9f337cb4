//! CPU reference implementations of `C = A × B` for square row-major matrices.
//!
//! Both baselines accumulate in `f32` in the same order, so their outputs
//! are bit-identical.

use rayon::prelude::*;

use crate::error::{NumericError, Result};

fn check_operands(a: &[f32], b: &[f32], n: usize) -> Result<()> {
    let expected = n
        .checked_mul(n)
        .ok_or_else(|| NumericError::DimensionMismatch(format!("{n}×{n} overflows usize")))?;
    for (name, m) in [("A", a), ("B", b)] {
        if m.len() != expected {
            return Err(NumericError::DimensionMismatch(format!(
                "operand {name} has {} elements, expected {n}×{n} = {expected}",
                m.len()
            )));
        }
    }
    Ok(())
}

#[inline]
fn dot_row_col(a: &[f32], b: &[f32], n: usize, row: usize, col: usize) -> f32 {
    let mut sum = 0.0f32;
    for k in 0..n {
        sum += a[row * n + k] * b[k * n + col];
    }
    sum
}

/// Naive triple loop.
pub fn matmul_sequential(a: &[f32], b: &[f32], n: usize) -> Result<Vec<f32>> {
    check_operands(a, b, n)?;
    let mut c = vec![0.0f32; n * n];
    for i in 0..n {
        for j in 0..n {
            c[i * n + j] = dot_row_col(a, b, n, i, j);
        }
    }
    Ok(c)
}

/// Rows of C computed in parallel on the rayon pool.
pub fn matmul_parallel(a: &[f32], b: &[f32], n: usize) -> Result<Vec<f32>> {
    check_operands(a, b, n)?;
    let mut c = vec![0.0f32; n * n];
    if n == 0 {
        return Ok(c);
    }
    c.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
        for (j, out) in row.iter_mut().enumerate() {
            *out = dot_row_col(a, b, n, i, j);
        }
    });
    Ok(c)
}
