pub mod chunker;
pub mod generation;
pub mod llm_provider;
pub mod ranker;
pub mod study;
pub mod text_extract;
