use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::models::document::{Document, DocumentStatus};

/// Document listing shape: record metadata without the extracted text or chunks.
#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub id: String,
    pub title: String,
    pub original_filename: String,
    pub size_bytes: u64,
    pub status: DocumentStatus,
    pub error_message: Option<String>,
    pub chunk_count: usize,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            title: doc.title,
            original_filename: doc.original_filename,
            size_bytes: doc.size_bytes,
            status: doc.status,
            error_message: doc.error_message,
            chunk_count: doc.chunks.len(),
            created_at: doc.created_at,
            processed_at: doc.processed_at,
        }
    }
}
