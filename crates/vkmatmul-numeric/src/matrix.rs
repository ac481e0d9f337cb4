//! Square matrix construction.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seed used when the caller does not choose one, so runs are repeatable.
pub const DEFAULT_SEED: u64 = 5489;

/// A deterministic generator for `seed`.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// An `n×n` row-major matrix with entries uniform in `[0, 1)`.
pub fn generate_random_matrix<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<f32> {
    (0..n * n).map(|_| rng.gen_range(0.0f32..1.0)).collect()
}

/// The `n×n` identity matrix.
pub fn identity_matrix(n: usize) -> Vec<f32> {
    let mut m = vec![0.0f32; n * n];
    for i in 0..n {
        m[i * n + i] = 1.0;
    }
    m
}
