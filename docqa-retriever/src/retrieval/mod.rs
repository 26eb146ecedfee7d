pub mod chunking_strategy;
pub mod documents;
pub mod embedding;
pub mod indexing_engine;
pub mod live_index;
pub mod retriever;
