pub mod generator;
pub mod recursive;
pub mod retriever;
