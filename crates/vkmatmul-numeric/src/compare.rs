//! Result comparison under a relative tolerance.

use crate::error::{NumericError, Result};

/// Denominator floor, so entries that should be zero compare absolutely.
const MIN_MAGNITUDE: f32 = 1.0e-6;

/// Largest `|expected - actual| / max(|expected|, 1e-6)` over all entries.
///
/// Any NaN makes the result infinite.
pub fn max_relative_error(expected: &[f32], actual: &[f32]) -> Result<f32> {
    if expected.len() != actual.len() {
        return Err(NumericError::DimensionMismatch(format!(
            "comparing {} elements against {}",
            expected.len(),
            actual.len()
        )));
    }
    let mut worst = 0.0f32;
    for (&e, &a) in expected.iter().zip(actual) {
        if e.is_nan() || a.is_nan() {
            return Ok(f32::INFINITY);
        }
        let err = (e - a).abs() / e.abs().max(MIN_MAGNITUDE);
        worst = worst.max(err);
    }
    Ok(worst)
}

/// Whether every entry is within `rel_tol`. Mismatched lengths are never equal.
pub fn approx_eq(expected: &[f32], actual: &[f32], rel_tol: f32) -> bool {
    max_relative_error(expected, actual).is_ok_and(|err| err <= rel_tol)
}
