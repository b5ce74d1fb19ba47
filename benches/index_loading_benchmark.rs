use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hyperseek_engine::core::types::{Document, SourceTag};
use hyperseek_engine::repository::{DocumentRepository, InMemoryRepository};
use hyperseek_engine::vector::{chunk_text, Embedder, HashingEmbedder};
use hyperseek_engine::{index, vector};
use rand::Rng;
use tokio::runtime::Runtime;

fn lorem_words(n: usize) -> String {
    let mut rng = rand::thread_rng();
    let vocab = ["the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog", "rust", "search"];
    (0..n).map(|_| vocab[rng.gen_range(0..vocab.len())]).collect::<Vec<_>>().join(" ")
}

/// Bulk-loads a batch of documents through the full `index`-then-`vector`
/// pipeline, mirroring what `worker::full_reindex_task` does for a cold
/// collection.
fn bench_bulk_load(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let embedder = HashingEmbedder::default();

    let mut group = c.benchmark_group("bulk_load");
    for &doc_count in [10usize, 100, 500].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(doc_count), &doc_count, |b, &doc_count| {
            b.iter_batched(
                InMemoryRepository::new,
                |repo| {
                    rt.block_on(async {
                        for i in 0..doc_count {
                            let mut doc =
                                Document::new(format!("https://bulk/{i}"), SourceTag::Custom, format!("doc {i}"));
                            doc.clean_text = lorem_words(200);
                            let id = repo.insert_document(doc).await.unwrap();
                            index::index_document(&repo, id).await.unwrap();
                            vector::index_document_vectors(&repo, &embedder, id, 512, 50).await.unwrap();
                        }
                        index::update_collection_stats(&repo).await.unwrap();
                    });
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_chunking(c: &mut Criterion) {
    let text = lorem_words(5000);
    c.bench_function("chunk_text_5000_words", |b| {
        b.iter(|| chunk_text(black_box(&text), 512, 50));
    });
}

fn bench_embedding(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let embedder = HashingEmbedder::default();
    let chunk = lorem_words(400);

    c.bench_function("embed_one_chunk", |b| {
        b.iter(|| rt.block_on(embedder.embed(black_box(&chunk))).unwrap());
    });
}

criterion_group!(benches, bench_bulk_load, bench_chunking, bench_embedding);
criterion_main!(benches);
