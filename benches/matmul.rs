use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use vkmatmul::numeric::{generate_random_matrix, matmul_parallel, matmul_sequential, seeded_rng};
use vkmatmul::{ComputeConfig, ComputeContext};

const SIZES: [usize; 3] = [64, 128, 256];

fn operands(n: usize) -> (Vec<f32>, Vec<f32>) {
    let mut rng = seeded_rng(42);
    let a = generate_random_matrix(n, &mut rng);
    let b = generate_random_matrix(n, &mut rng);
    (a, b)
}

fn benchmark_cpu(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_matmul");
    for n in SIZES {
        let (a, b) = operands(n);
        group.bench_with_input(BenchmarkId::new("sequential", n), &n, |bench, &n| {
            bench.iter(|| black_box(matmul_sequential(black_box(&a), black_box(&b), n)))
        });
        group.bench_with_input(BenchmarkId::new("parallel", n), &n, |bench, &n| {
            bench.iter(|| black_box(matmul_parallel(black_box(&a), black_box(&b), n)))
        });
    }
    group.finish();
}

fn benchmark_gpu(c: &mut Criterion) {
    let mut group = c.benchmark_group("gpu_matmul");
    for n in SIZES {
        let mut config = ComputeConfig::with_matrix_size(n as u32);
        if config.apply_env_overrides().is_err() {
            eprintln!("skipping GPU benchmarks: invalid VKMATMUL_* override");
            return;
        }
        config.matrix_size = n as u32;
        let mut ctx = match ComputeContext::new(&config) {
            Ok(ctx) => ctx,
            Err(e) => {
                eprintln!("skipping GPU benchmarks: {e}");
                return;
            }
        };
        let (a, b) = operands(n);
        group.bench_with_input(BenchmarkId::new("dispatch", n), &n, |bench, _| {
            bench.iter(|| black_box(ctx.multiply(black_box(&a), black_box(&b))))
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_cpu, benchmark_gpu);
criterion_main!(benches);
