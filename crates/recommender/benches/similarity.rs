//! Benchmarks for the similarity ranker
//!
//! Run with: cargo bench --package recommender
//!
//! Uses a synthetic catalog sized like MovieLens latest-small with
//! 50-dimensional embeddings.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use data_loader::{Catalog, MovieRecord};
use models::EmbeddingMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use recommender::SimilarityRanker;

const DIM: usize = 50;

fn synthetic_ranker(items: usize) -> SimilarityRanker {
    let records = (0..items)
        .map(|i| MovieRecord::new(i as u32 + 1, format!("Movie {}", i), vec![]))
        .collect();
    let catalog = Catalog::finalize(records).expect("Failed to build catalog");

    let mut rng = StdRng::seed_from_u64(42);
    let rows: Vec<Vec<f64>> = (0..items)
        .map(|_| (0..DIM).map(|_| rng.random_range(-1.0..1.0)).collect())
        .collect();
    let embeddings = EmbeddingMatrix::from_rows(&catalog, &rows).expect("Failed to build embeddings");
    SimilarityRanker::new(embeddings)
}

fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("similarity_rank");
    for items in [1_000usize, 10_000] {
        let ranker = synthetic_ranker(items);
        group.bench_with_input(BenchmarkId::from_parameter(items), &ranker, |b, ranker| {
            b.iter(|| {
                let ranked = ranker.rank(black_box(items / 2), black_box(10));
                black_box(ranked)
            })
        });
    }
    group.finish();
}

fn bench_scores(c: &mut Criterion) {
    let ranker = synthetic_ranker(10_000);
    c.bench_function("similarity_scores_10k", |b| {
        b.iter(|| black_box(ranker.scores(black_box(0))))
    });
}

criterion_group!(benches, bench_rank, bench_scores);
criterion_main!(benches);
