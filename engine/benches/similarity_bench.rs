use criterion::{criterion_group, criterion_main, Criterion};
use engine::fuzzy::resolve;
use engine::matrix::{build, MatrixConfig};
use engine::vectorizer::{vectorize_corpus, VectorizerWeights};
use engine::CatalogItem;

const GENRES: &[&str] = &["Action", "Comedy", "Drama", "Horror", "Romance", "Sci-Fi", "Thriller", "War"];

fn synthetic_catalog(n: usize) -> Vec<CatalogItem> {
    (0..n)
        .map(|i| {
            let genres = [GENRES[i % GENRES.len()], GENRES[(i / 3) % GENRES.len()]];
            CatalogItem::new(format!("Movie {i} Part {}", i % 7), 1970 + (i % 55) as i32, &genres, 5.0 + (i % 50) as f32 / 10.0, (i as u64 * 7919) % 2_000_000)
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let corpus = vectorize_corpus(&synthetic_catalog(2_000), &VectorizerWeights::default());
    c.bench_function("build_similarity_2k", |b| b.iter(|| build(&corpus.vectors, &MatrixConfig::default())));
}

fn bench_resolve(c: &mut Criterion) {
    let titles: Vec<String> = synthetic_catalog(10_000).into_iter().map(|i| i.title).collect();
    c.bench_function("resolve_10k_titles", |b| b.iter(|| resolve("movie 4242 prt", &titles, 60)));
}

criterion_group!(benches, bench_build, bench_resolve);
criterion_main!(benches);
