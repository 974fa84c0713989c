pub mod config;
pub mod db;
pub mod dto;
pub mod errors;
pub mod services;

pub use db::models::document_chunk::Chunk;
pub use services::chunker::chunk_text;
pub use services::ranker::{ScoringWeights, find_relevant, find_relevant_with};
