pub mod document;
pub mod document_chunk;
pub mod flashcard;
pub mod quiz;
