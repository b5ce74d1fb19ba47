pub mod core;
pub mod telemetry;
pub mod repository;
pub mod text;
pub mod index;
pub mod vector;
pub mod query;
pub mod scoring;
pub mod semantic;
pub mod rank;
pub mod rag;
pub mod autocomplete;
pub mod cache;
pub mod crawl;
pub mod orchestrator;
pub mod worker;

/*
┌────────────────────────────────────────────────────────────────────────────────────────────┐
│                          HYPERSEEK ENGINE — MODULE ARCHITECTURE                              │
└────────────────────────────────────────────────────────────────────────────────────────────┘

  text          html -> tokens -> stems                    (C1)
  index         postings + doc/collection stats            (C2)
  vector        chunking + embeddings                      (C3)
  query         raw query -> cleaned/tokens/cache key       (C4)
  scoring       BM25 + snippet + highlight                  (C5)
  semantic      embed query -> cosine NN over chunks        (C6)
  rank          reciprocal rank fusion                      (C7)
  rag           retrieval facade + recursive controller     (C8, C9)
  autocomplete  prefix trie                                 (C10)
  crawl         page sources + robots.txt                   (C11)
  orchestrator  drains crawl, dedups, persists, job state   (C12)
  worker        background index jobs, retry/backoff        (C13)
  cache         TTL query-result cache                      (C14)

  repository    DocumentRepository trait: the persistence seam every
                component above reaches through; in-memory implementation
                used by tests and as the default collaborator.
  core          error types, config, shared domain types.
  telemetry     tracing setup.
*/
