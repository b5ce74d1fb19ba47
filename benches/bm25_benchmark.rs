use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hyperseek_engine::core::types::{Document, DocId, DocumentStats, SourceTag};
use hyperseek_engine::repository::{DocumentRepository, InMemoryRepository, Posting};
use hyperseek_engine::scoring::Bm25Scorer;
use hyperseek_engine::{index, text};
use rand::Rng;
use tokio::runtime::Runtime;

fn lorem_words(n: usize) -> String {
    let mut rng = rand::thread_rng();
    let vocab = ["the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog", "rust", "search"];
    (0..n).map(|_| vocab[rng.gen_range(0..vocab.len())]).collect::<Vec<_>>().join(" ")
}

async fn seeded_repo(doc_count: usize, words_per_doc: usize) -> InMemoryRepository {
    let repo = InMemoryRepository::new();
    for i in 0..doc_count {
        let mut doc = Document::new(format!("https://bench/{i}"), SourceTag::Custom, format!("doc {i}"));
        doc.clean_text = lorem_words(words_per_doc);
        let id = repo.insert_document(doc).await.unwrap();
        index::index_document(&repo, id).await.unwrap();
    }
    index::update_collection_stats(&repo).await.unwrap();
    repo
}

fn bench_text_processing(c: &mut Criterion) {
    let text = lorem_words(500);
    c.bench_function("text_process_500_words", |b| {
        b.iter(|| text::process(black_box(&text), true));
    });
}

fn bench_indexing(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("index_document");

    for &words in [50usize, 200, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(words), &words, |b, &words| {
            b.iter_batched(
                || {
                    rt.block_on(async {
                        let repo = InMemoryRepository::new();
                        let mut doc = Document::new("https://bench/single", SourceTag::Custom, "doc");
                        doc.clean_text = lorem_words(words);
                        let id = repo.insert_document(doc).await.unwrap();
                        (repo, id)
                    })
                },
                |(repo, id)| {
                    rt.block_on(index::index_document(&repo, id)).unwrap();
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_bm25_search(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let repo = rt.block_on(seeded_repo(2000, 100));
    let scorer = Bm25Scorer::default();

    let mut group = c.benchmark_group("bm25_search");
    group.bench_function("single_term", |b| {
        b.iter(|| rt.block_on(scorer.search(&repo, black_box(&["fox".to_string()]), 1, 20)).unwrap());
    });
    group.bench_function("three_terms", |b| {
        let terms = vec!["quick".to_string(), "brown".to_string(), "fox".to_string()];
        b.iter(|| rt.block_on(scorer.search(&repo, black_box(&terms), 1, 20)).unwrap());
    });
    group.finish();
}

/// Direct `Posting` insertion, bypassing text processing, to isolate
/// `replace_postings`/stats-recompute cost from tokenization cost.
fn bench_raw_postings_replace(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let repo = InMemoryRepository::new();
    let doc_id = DocId::new();

    c.bench_function("replace_postings_200_terms", |b| {
        b.iter(|| {
            let postings: Vec<Posting> = (0..200)
                .map(|i| Posting { term: format!("term{i}"), doc_id, term_freq: 1, positions: vec![i] })
                .collect();
            let stats = DocumentStats { doc_id, total_terms: 200, unique_terms: 200 };
            rt.block_on(repo.replace_postings(black_box(doc_id), postings, stats)).unwrap();
        });
    });
}

criterion_group!(benches, bench_text_processing, bench_indexing, bench_bm25_search, bench_raw_postings_replace);
criterion_main!(benches);
