use engine::cache::ArtifactCache;
use engine::fuzzy::resolve;
use engine::matrix::{build, MatrixConfig};
use engine::ranker::recommend;
use engine::vectorizer::{vectorize_corpus, VectorizerWeights};
use engine::{BuildOutcome, CatalogItem, Engine, EngineConfig, EngineError, ScoringWeights};
use std::collections::HashSet;
use tempfile::tempdir;

fn abc() -> Vec<CatalogItem> {
    vec![
        CatalogItem::new("Alpha", 2020, &["Action"], 8.0, 50_000),
        CatalogItem::new("Beta", 2020, &["Action"], 7.0, 40_000),
        CatalogItem::new("Gamma", 1990, &["Drama"], 8.0, 60_000),
    ]
}

fn catalog() -> Vec<CatalogItem> {
    vec![
        CatalogItem::new("The Matrix", 1999, &["Action", "Sci-Fi"], 8.7, 2_000_000),
        CatalogItem::new("The Matrix Reloaded", 2003, &["Action", "Sci-Fi"], 7.2, 600_000),
        CatalogItem::new("Heat", 1995, &["Action", "Crime", "Drama"], 8.3, 700_000),
        CatalogItem::new("Alien", 1979, &["Horror", "Sci-Fi"], 8.5, 950_000),
        CatalogItem::new("Aliens", 1986, &["Action", "Adventure", "Sci-Fi"], 8.4, 750_000),
        CatalogItem::new("Toy Story", 1995, &["Animation", "Adventure", "Comedy"], 8.3, 1_000_000),
        CatalogItem::new("Casablanca", 1942, &["Drama", "Romance", "War"], 8.5, 600_000),
        CatalogItem::new("Blade Runner", 1982, &["Action", "Drama", "Sci-Fi"], 8.1, 800_000),
        CatalogItem::new("Ghost in the Shell", 1995, &["Animation", "Action", "Sci-Fi"], 7.9, 150_000),
        CatalogItem::new("Inception", 2010, &["Action", "Adventure", "Sci-Fi"], 8.8, 2_500_000),
        CatalogItem::new("Amélie", 2001, &["Comedy", "Romance"], 8.3, 780_000),
        CatalogItem::new("Heat", 1986, &["Action", "Crime", "Thriller"], 5.8, 9_000),
    ]
}

fn ready_engine(config: EngineConfig) -> Engine {
    let engine = Engine::new(config).unwrap();
    engine.rebuild(&catalog()).unwrap();
    engine
}

#[test]
fn similarity_matrix_is_symmetric_with_unit_diagonal() {
    let corpus = vectorize_corpus(&catalog(), &VectorizerWeights::default());
    let (_, sim) = build(&corpus.vectors, &MatrixConfig::default()).unwrap();
    for i in 0..sim.len() {
        assert!((sim.get(i, i) - 1.0).abs() < 1e-6);
        for j in 0..sim.len() {
            assert_eq!(sim.get(i, j), sim.get(j, i));
            assert!((0.0..=1.0).contains(&sim.get(i, j)));
            assert!(sim.get(i, j) <= sim.get(i, i));
        }
    }
}

#[test]
fn rebuilding_is_bit_identical() {
    let corpus = vectorize_corpus(&catalog(), &VectorizerWeights::default());
    let first = build(&corpus.vectors, &MatrixConfig::default()).unwrap();
    let second = build(&corpus.vectors, &MatrixConfig::default()).unwrap();
    assert_eq!(first.0, second.0);
    let bits = |m: &engine::SimilarityMatrix| -> Vec<u32> {
        (0..m.len()).flat_map(|i| m.row(i).iter().map(|v| v.to_bits()).collect::<Vec<_>>()).collect()
    };
    assert_eq!(bits(&first.1), bits(&second.1));
}

#[test]
fn resolve_is_idempotent() {
    let titles: Vec<String> = catalog().into_iter().map(|i| i.title).collect();
    let a = resolve("matrix reloded", &titles, 60);
    let b = resolve("matrix reloded", &titles, 60);
    assert_eq!(a, b);
    assert_eq!(a, Some("The Matrix Reloaded"));
}

#[test]
fn pinned_example_with_similarity_dominant_weights() {
    let items = abc();
    let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(resolve("alph", &titles, 60), Some("Alpha"));

    let corpus = vectorize_corpus(&items, &VectorizerWeights::default());
    let (_, sim) = build(&corpus.vectors, &MatrixConfig::default()).unwrap();
    let recs = recommend(Some(0), &corpus.items, &sim, 2, &ScoringWeights::default());
    let order: Vec<&str> = recs.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(order, vec!["Beta", "Gamma"]);
    assert!((recs[0].score - 0.542_718).abs() < 1e-4);
    assert!((recs[1].score - 0.283_949).abs() < 1e-4);
}

#[test]
fn pinned_example_with_era_dominant_weights() {
    let weights = ScoringWeights {
        similarity: 0.4,
        diversity: 0.1,
        repetition: 0.0,
        rating: 0.0,
        popularity: 0.0,
        era: 0.5,
        ..Default::default()
    };
    weights.validate().unwrap();
    let items = abc();
    let corpus = vectorize_corpus(&items, &VectorizerWeights::default());
    let (_, sim) = build(&corpus.vectors, &MatrixConfig::default()).unwrap();
    let recs = recommend(Some(0), &corpus.items, &sim, 2, &weights);
    let order: Vec<&str> = recs.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(order, vec!["Gamma", "Beta"]);
    assert!((recs[0].score - 0.594_872).abs() < 1e-4);
    assert!((recs[1].score - 0.371_795).abs() < 1e-4);
}

#[test]
fn find_similar_excludes_source_and_duplicates() {
    let engine = ready_engine(EngineConfig::default());
    let recs = engine.find_similar("heat", 20).unwrap();
    assert!(!recs.is_empty());
    assert!(recs.len() <= 20);
    let mut seen = HashSet::new();
    for r in &recs {
        assert_ne!(r.title, "Heat");
        assert!(seen.insert(r.title.clone()), "duplicate {}", r.title);
    }
    assert!(recs.windows(2).all(|p| p[0].score >= p[1].score));
}

#[test]
fn count_is_clamped_to_configured_bounds() {
    let engine = ready_engine(EngineConfig::default());
    assert_eq!(engine.find_similar("Inception", 1).unwrap().len(), 5);
    // 12 items, one source and one duplicate "Heat" leave at most 10 candidates
    assert_eq!(engine.find_similar("Inception", 100).unwrap().len(), 10);
}

#[test]
fn unmatched_query_is_empty_not_an_error() {
    let engine = ready_engine(EngineConfig::default());
    assert!(engine.find_similar("zzqxv wplk", 10).unwrap().is_empty());
    assert_eq!(engine.resolve("zzqxv wplk").unwrap(), None);
}

#[test]
fn blank_query_is_rejected() {
    let engine = ready_engine(EngineConfig::default());
    assert!(matches!(engine.find_similar("   ", 10), Err(EngineError::EmptyQuery)));
}

#[test]
fn engine_is_not_ready_before_first_build() {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    assert!(!engine.is_ready());
    assert!(matches!(engine.find_similar("heat", 10), Err(EngineError::NotReady)));
    assert!(engine.rebuild(&[]).is_err());
    assert!(!engine.is_ready());
}

#[test]
fn failed_rebuild_keeps_serving_previous_snapshot() {
    let engine = ready_engine(EngineConfig::default());
    assert!(matches!(engine.rebuild(&[]), Err(EngineError::EmptyCorpus)));
    assert!(!engine.find_similar("alien", 5).unwrap().is_empty());
}

#[test]
fn repeated_queries_are_memoized_and_cleared_on_rebuild() {
    let engine = ready_engine(EngineConfig::default());
    let first = engine.find_similar("Blade Runner", 5).unwrap();
    let second = engine.find_similar("  blade RUNNER ", 5).unwrap();
    assert_eq!(first, second);
    assert_eq!(engine.query_stats().hits, 1);

    engine.rebuild(&catalog()).unwrap();
    assert_eq!(engine.query_stats().len, 0);
}

#[test]
fn artifact_cache_round_trip_is_bit_identical() {
    let dir = tempdir().unwrap();
    let cache = ArtifactCache::new(dir.path());

    let builder = Engine::new(EngineConfig::default()).unwrap();
    assert_eq!(builder.load_or_build(&catalog(), &cache).unwrap(), BuildOutcome::Built { stored: true });
    let built = builder.snapshot().unwrap();

    let reader = Engine::new(EngineConfig::default()).unwrap();
    assert_eq!(reader.load_or_build(&catalog(), &cache).unwrap(), BuildOutcome::Cached);
    let loaded = reader.snapshot().unwrap();

    assert_eq!(built.terms, loaded.terms);
    assert_eq!(built.similarity, loaded.similarity);
    assert_eq!(reader.find_similar("aliens", 5).unwrap(), builder.find_similar("aliens", 5).unwrap());
}

#[test]
fn changed_catalog_invalidates_cached_artifacts() {
    let dir = tempdir().unwrap();
    let cache = ArtifactCache::new(dir.path());
    let engine = Engine::new(EngineConfig::default()).unwrap();
    engine.load_or_build(&catalog(), &cache).unwrap();

    let mut changed = catalog();
    changed.push(CatalogItem::new("Arrival", 2016, &["Drama", "Sci-Fi"], 7.9, 750_000));
    assert_eq!(engine.load_or_build(&changed, &cache).unwrap(), BuildOutcome::Built { stored: true });
    assert_eq!(engine.status().items, changed.len());
}

#[test]
fn changed_vectorizer_weights_invalidate_cached_artifacts() {
    let dir = tempdir().unwrap();
    let cache = ArtifactCache::new(dir.path());
    let engine = Engine::new(EngineConfig::default()).unwrap();
    assert_eq!(engine.load_or_build(&abc(), &cache).unwrap(), BuildOutcome::Built { stored: true });

    let config = EngineConfig {
        vectorizer: VectorizerWeights { genre: 0, year: 1, rating: 0, popularity: 0 },
        ..Default::default()
    };
    let reweighted = Engine::new(config.clone()).unwrap();
    assert_eq!(reweighted.load_or_build(&abc(), &cache).unwrap(), BuildOutcome::Built { stored: true });

    let fresh = Engine::new(config).unwrap();
    fresh.rebuild(&abc()).unwrap();
    assert_eq!(reweighted.snapshot().unwrap().similarity, fresh.snapshot().unwrap().similarity);
}

#[test]
fn recommend_reports_matched_title_from_the_same_lookup() {
    let engine = ready_engine(EngineConfig::default());
    let first = engine.recommend("matrix reloded", 5).unwrap();
    assert_eq!(first.matched.as_deref(), Some("The Matrix Reloaded"));
    assert!(first.results.iter().all(|r| r.title != "The Matrix Reloaded"));

    let again = engine.recommend("Matrix  Reloded", 5).unwrap();
    assert_eq!(engine.query_stats().hits, 1);
    assert_eq!(again, first);

    let miss = engine.recommend("zzqxv wplk", 5).unwrap();
    assert_eq!(miss.matched, None);
    assert!(miss.results.is_empty());
}

#[test]
fn unwritable_cache_is_not_fatal() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, b"x").unwrap();
    // a regular file where the artifact directory should be
    let cache = ArtifactCache::new(&blocker);
    let engine = Engine::new(EngineConfig::default()).unwrap();
    assert_eq!(engine.load_or_build(&catalog(), &cache).unwrap(), BuildOutcome::Built { stored: false });
    assert!(engine.is_ready());
}
