use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::models::document_chunk::{self, Chunk};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub original_filename: String,
    pub size_bytes: u64,
    pub status: DocumentStatus,
    pub error_message: Option<String>,
    pub extracted_text: String,
    pub chunks: Vec<Chunk>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Processing,
    Ready,
    Failed,
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentStatus::Processing => write!(f, "processing"),
            DocumentStatus::Ready => write!(f, "ready"),
            DocumentStatus::Failed => write!(f, "failed"),
        }
    }
}

/// In-process document records. Clones share the same store.
#[derive(Clone, Default)]
pub struct DocumentRepository {
    documents: Arc<RwLock<HashMap<String, Document>>>,
}

impl DocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, title: &str, original_filename: &str, size_bytes: u64) -> Document {
        let doc = Document {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            original_filename: original_filename.to_string(),
            size_bytes,
            status: DocumentStatus::Processing,
            error_message: None,
            extracted_text: String::new(),
            chunks: Vec::new(),
            created_at: Utc::now(),
            processed_at: None,
        };

        self.documents
            .write()
            .await
            .insert(doc.id.clone(), doc.clone());

        doc
    }

    pub async fn find_by_id(&self, id: &str) -> Option<Document> {
        self.documents.read().await.get(id).cloned()
    }

    /// Newest first.
    pub async fn list(&self) -> Vec<Document> {
        let mut docs: Vec<Document> = self.documents.read().await.values().cloned().collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        docs
    }

    /// Chunks in `chunk_index` order.
    pub async fn find_chunks(&self, id: &str) -> Result<Vec<Chunk>> {
        let docs = self.documents.read().await;
        let doc = docs
            .get(id)
            .ok_or_else(|| anyhow::anyhow!("Document {id} not found"))?;

        let mut chunks = doc.chunks.clone();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    /// Store extraction output and mark the document ready.
    pub async fn save_processed(&self, id: &str, text: String, chunks: Vec<Chunk>) -> Result<()> {
        let mut docs = self.documents.write().await;
        let doc = docs
            .get_mut(id)
            .ok_or_else(|| anyhow::anyhow!("Document {id} not found"))?;

        doc.extracted_text = text;
        doc.chunks = document_chunk::assign_ids(chunks);
        doc.status = DocumentStatus::Ready;
        doc.error_message = None;
        doc.processed_at = Some(Utc::now());

        Ok(())
    }

    pub async fn update_status(
        &self,
        id: &str,
        status: DocumentStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        let mut docs = self.documents.write().await;
        let doc = docs
            .get_mut(id)
            .ok_or_else(|| anyhow::anyhow!("Document {id} not found"))?;

        doc.status = status;
        doc.error_message = error_message.map(str::to_string);
        if status == DocumentStatus::Ready || status == DocumentStatus::Failed {
            doc.processed_at = Some(Utc::now());
        }

        Ok(())
    }

    pub async fn delete(&self, id: &str) -> bool {
        self.documents.write().await.remove(id).is_some()
    }
}
