use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bounded, ordered segment of a document's extracted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Assigned when the chunk list is stored with its document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub content: String,
    pub chunk_index: usize,
    /// Reserved; extraction does not report page boundaries yet.
    pub page_number: u32,
}

impl Chunk {
    pub fn new(content: String, chunk_index: usize) -> Self {
        Self {
            id: None,
            content,
            chunk_index,
            page_number: 0,
        }
    }

    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

/// Stamps an identity on every chunk that doesn't have one yet.
pub fn assign_ids(chunks: Vec<Chunk>) -> Vec<Chunk> {
    chunks
        .into_iter()
        .map(|mut chunk| {
            chunk.id.get_or_insert_with(Uuid::new_v4);
            chunk
        })
        .collect()
}
