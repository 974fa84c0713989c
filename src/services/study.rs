use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::config::{AppConfig, ChunkingConfig};
use crate::db::models::document::{Document, DocumentRepository, DocumentStatus};
use crate::db::models::document_chunk::Chunk;
use crate::db::models::flashcard::Flashcard;
use crate::db::models::quiz::QuizQuestion;
use crate::dto::document::DocumentResponse;
use crate::errors::AppError;
use crate::services::llm_provider::TextGenerator;
use crate::services::{chunker, generation, ranker, text_extract};

#[derive(Debug, Clone, Serialize)]
pub struct ChatAnswer {
    pub answer: String,
    /// `chunk_index` of every chunk sent as context, in prompt order.
    pub relevant_chunks: Vec<usize>,
}

/// Ties document processing, retrieval and generation together.
pub struct StudyService<G> {
    config: Arc<AppConfig>,
    documents: DocumentRepository,
    generator: G,
}

impl<G: TextGenerator> StudyService<G> {
    pub fn new(config: AppConfig, documents: DocumentRepository, generator: G) -> Self {
        Self {
            config: Arc::new(config),
            documents,
            generator,
        }
    }

    pub fn documents(&self) -> &DocumentRepository {
        &self.documents
    }

    /// Create the document record and start processing it in the background.
    ///
    /// The returned handle resolves once the document is `ready` or `failed`.
    pub async fn upload(
        &self,
        title: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<(Document, JoinHandle<()>), AppError> {
        if title.trim().is_empty() {
            return Err(AppError::Validation(
                "Please provide a document title".to_string(),
            ));
        }
        if !text_extract::is_supported(filename) {
            return Err(AppError::Validation(format!(
                "Unsupported file type: {filename}"
            )));
        }

        let max_bytes = self.config.processing.max_file_size_mb * 1024 * 1024;
        if bytes.len() > max_bytes {
            return Err(AppError::Validation(format!(
                "File too large. Maximum size is {} MB",
                self.config.processing.max_file_size_mb
            )));
        }

        let doc = self
            .documents
            .create(title.trim(), filename, bytes.len() as u64)
            .await;

        let repo = self.documents.clone();
        let chunking = self.config.chunking.clone();
        let timeout = Duration::from_secs(self.config.processing.extraction_timeout_secs);
        let doc_id = doc.id.clone();
        let filename = filename.to_string();

        let handle = tokio::spawn(async move {
            process_document(&repo, &doc_id, &filename, bytes, &chunking, timeout).await;
        });

        Ok((doc, handle))
    }

    async fn ready_document(&self, id: &str) -> Result<Document, AppError> {
        let doc = self
            .documents
            .find_by_id(id)
            .await
            .ok_or_else(|| AppError::NotFound("Document not found".to_string()))?;

        if doc.status != DocumentStatus::Ready {
            return Err(AppError::NotReady(doc.status.to_string()));
        }

        Ok(doc)
    }

    /// Rank a ready document's chunks, read back in `chunk_index` order.
    async fn relevant_chunks(
        &self,
        id: &str,
        query: &str,
    ) -> Result<(Vec<Chunk>, usize), AppError> {
        let doc = self.ready_document(id).await?;
        let chunks = self.documents.find_chunks(&doc.id).await?;
        let retrieval = &self.config.retrieval;
        let relevant =
            ranker::find_relevant_with(&chunks, query, retrieval.max_chunks, &retrieval.weights);
        Ok((relevant, chunks.len()))
    }

    /// All documents, newest first, without their text or chunks.
    pub async fn list_documents(&self) -> Vec<DocumentResponse> {
        self.documents
            .list()
            .await
            .into_iter()
            .map(DocumentResponse::from)
            .collect()
    }

    pub async fn delete_document(&self, id: &str) -> Result<(), AppError> {
        if !self.documents.delete(id).await {
            return Err(AppError::NotFound("Document not found".to_string()));
        }
        tracing::info!("Document {id} deleted");
        Ok(())
    }

    async fn generate(&self, prompt: &str) -> Result<String, AppError> {
        self.generator
            .generate(prompt)
            .await
            .map_err(|e| AppError::Generation(format!("{e:#}")))
    }

    /// Answer a question from the document's most relevant chunks.
    pub async fn chat(&self, id: &str, question: &str) -> Result<ChatAnswer, AppError> {
        if question.trim().is_empty() {
            return Err(AppError::Validation("Please provide a question".to_string()));
        }

        let (relevant, total) = self.relevant_chunks(id, question).await?;
        tracing::info!(
            "Chat on document {id}: {} of {total} chunks selected",
            relevant.len()
        );

        let context = generation::join_context(&relevant);
        let answer = self
            .generate(&generation::chat_prompt(question, &context))
            .await?;

        Ok(ChatAnswer {
            answer,
            relevant_chunks: relevant.iter().map(|c| c.chunk_index).collect(),
        })
    }

    pub async fn generate_flashcards(
        &self,
        id: &str,
        count: Option<usize>,
    ) -> Result<Vec<Flashcard>, AppError> {
        let doc = self.ready_document(id).await?;
        let settings = &self.config.generation;
        let count = count.unwrap_or(settings.flashcard_count).max(1);

        let text = generation::truncate_chars(&doc.extracted_text, settings.flashcard_context_chars);
        let generated = self.generate(&generation::flashcard_prompt(text, count)).await?;

        let cards = generation::parse_flashcards(&generated, count);
        if cards.is_empty() {
            return Err(AppError::Generation(
                "Model returned no usable flashcards".to_string(),
            ));
        }

        tracing::info!("Generated {} flashcards for document {id}", cards.len());
        Ok(cards)
    }

    pub async fn generate_quiz(
        &self,
        id: &str,
        questions: Option<usize>,
    ) -> Result<Vec<QuizQuestion>, AppError> {
        let doc = self.ready_document(id).await?;
        let settings = &self.config.generation;
        let questions = questions.unwrap_or(settings.quiz_questions).max(1);

        let text = generation::truncate_chars(&doc.extracted_text, settings.quiz_context_chars);
        let generated = self.generate(&generation::quiz_prompt(text, questions)).await?;

        let quiz = generation::parse_quiz(&generated, questions);
        if quiz.is_empty() {
            return Err(AppError::Generation(
                "Model returned no usable quiz questions".to_string(),
            ));
        }

        tracing::info!("Generated {} quiz questions for document {id}", quiz.len());
        Ok(quiz)
    }

    pub async fn summarize(&self, id: &str) -> Result<String, AppError> {
        let doc = self.ready_document(id).await?;
        let text = generation::truncate_chars(
            &doc.extracted_text,
            self.config.generation.summary_context_chars,
        );
        self.generate(&generation::summary_prompt(text)).await
    }

    /// Explain `concept` using the chunks most relevant to it.
    pub async fn explain_concept(&self, id: &str, concept: &str) -> Result<String, AppError> {
        if concept.trim().is_empty() {
            return Err(AppError::Validation("Please provide a concept".to_string()));
        }

        let (relevant, _) = self.relevant_chunks(id, concept).await?;
        let context = generation::join_context(&relevant);
        let context =
            generation::truncate_chars(&context, self.config.generation.explain_context_chars);
        self.generate(&generation::explain_prompt(concept, context)).await
    }
}

/// Extract, chunk and store one document, marking it `failed` on any error.
pub async fn process_document(
    repo: &DocumentRepository,
    doc_id: &str,
    filename: &str,
    bytes: Vec<u8>,
    chunking: &ChunkingConfig,
    timeout: Duration,
) {
    let result = async {
        let text = text_extract::extract_text(bytes, filename, timeout).await?;
        let chunks = chunker::chunk_text(&text, chunking.chunk_size, chunking.overlap);
        let count = chunks.len();
        repo.save_processed(doc_id, text, chunks).await?;
        anyhow::Ok(count)
    }
    .await;

    match result {
        Ok(count) => tracing::info!("Document {doc_id} processed successfully ({count} chunks)"),
        Err(e) => {
            let msg = format!("{e:#}");
            tracing::error!("Document {doc_id} processing failed: {msg}");
            if let Err(e) = repo
                .update_status(doc_id, DocumentStatus::Failed, Some(&msg))
                .await
            {
                tracing::error!("Failed to mark document {doc_id} as failed: {e:#}");
            }
        }
    }
}
