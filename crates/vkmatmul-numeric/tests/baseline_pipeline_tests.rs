//! Generate → multiply → persist → reload, the way the CLI baselines run.

use vkmatmul_numeric::{
    DEFAULT_SEED, approx_eq, generate_random_matrix, matmul_parallel, matmul_sequential, max_relative_error,
    read_from_binary, seeded_rng, write_to_binary,
};

#[test]
fn baseline_output_survives_disk() {
    let n = 64;
    let mut rng = seeded_rng(DEFAULT_SEED);
    let a = generate_random_matrix(n, &mut rng);
    let b = generate_random_matrix(n, &mut rng);
    let c = matmul_parallel(&a, &b, n).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cpu.bin");
    write_to_binary(&path, &c).unwrap();

    assert_eq!(std::fs::metadata(&path).unwrap().len(), (n * n * 4) as u64);
    let reloaded = read_from_binary(&path).unwrap();
    assert_eq!(max_relative_error(&c, &reloaded).unwrap(), 0.0);
}

#[test]
fn random_product_entries_are_bounded() {
    // Entries of A and B lie in [0, 1), so each entry of C lies in [0, n).
    let n = 32;
    let mut rng = seeded_rng(3);
    let a = generate_random_matrix(n, &mut rng);
    let b = generate_random_matrix(n, &mut rng);
    let c = matmul_sequential(&a, &b, n).unwrap();
    assert!(c.iter().all(|&v| (0.0..n as f32).contains(&v)));
}

#[test]
fn perturbed_result_detected() {
    let n = 16;
    let mut rng = seeded_rng(11);
    let a = generate_random_matrix(n, &mut rng);
    let b = generate_random_matrix(n, &mut rng);
    let expected = matmul_sequential(&a, &b, n).unwrap();

    let mut actual = expected.clone();
    assert!(approx_eq(&expected, &actual, 1e-3));
    actual[n + 3] *= 1.01;
    assert!(!approx_eq(&expected, &actual, 1e-3));
}
