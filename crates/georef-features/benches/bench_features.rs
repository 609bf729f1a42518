use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use georef_features::{match_descriptors, Descriptor, KeypointExtractor, RATIO_THRESHOLD};
use georef_image::SampleGrid;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_descriptors(n: usize, seed: u64) -> Vec<Descriptor> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let mut d = [0u8; 32];
            rng.fill(&mut d[..]);
            d
        })
        .collect()
}

fn random_grid(size: usize, seed: u64) -> SampleGrid<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..size * size).map(|_| rng.random::<u8>()).collect();
    SampleGrid::new([size, size].into(), data).unwrap()
}

fn bench_match_descriptors(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_descriptors");

    for n in [100usize, 500] {
        let query = random_descriptors(n, 1);
        let train = random_descriptors(n, 2);

        group.bench_with_input(BenchmarkId::new("brute_force", n), &n, |b, _| {
            b.iter(|| match_descriptors(&query, &train, RATIO_THRESHOLD))
        });
    }

    group.finish();
}

fn bench_detect_and_compute(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_and_compute");
    group.sample_size(10);

    for size in [128usize, 256] {
        let grid = random_grid(size, 7);
        let extractor = KeypointExtractor::default();

        group.bench_with_input(BenchmarkId::new("noise", size), &size, |b, _| {
            b.iter(|| extractor.detect_and_compute(&grid).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_match_descriptors, bench_detect_and_compute);
criterion_main!(benches);
