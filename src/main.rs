use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

use study_rag::config::AppConfig;
use study_rag::db::models::document::{DocumentRepository, DocumentStatus};
use study_rag::db::models::quiz::{self, QuizQuestion, SubmittedAnswer};
use study_rag::dto::document::DocumentResponse;
use study_rag::errors::AppError;
use study_rag::services::llm_provider::{RigGenerator, TextGenerator};
use study_rag::services::ranker;
use study_rag::services::study::{self, StudyService};

#[derive(Parser)]
#[command(name = "study-rag")]
#[command(about = "Chunk a document and study it with an LLM", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the chunks a document is split into
    Chunk {
        /// PDF, text or markdown file
        file: PathBuf,
        #[arg(long)]
        chunk_size: Option<usize>,
        #[arg(long)]
        overlap: Option<usize>,
    },
    /// Process several documents and print their listing, including failures
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the chunks most relevant to a query
    Rank {
        file: PathBuf,
        query: String,
        #[arg(long)]
        max_chunks: Option<usize>,
    },
    /// Ask a question about a document
    Ask { file: PathBuf, question: String },
    /// Generate flashcards
    Flashcards {
        file: PathBuf,
        #[arg(long)]
        count: Option<usize>,
    },
    /// Generate a multiple choice quiz
    Quiz {
        file: PathBuf,
        #[arg(long)]
        questions: Option<usize>,
    },
    /// Summarize a document
    Summary { file: PathBuf },
    /// Explain a concept using the document as context
    Explain { file: PathBuf, concept: String },
    /// Score answers against a quiz saved from the `quiz` command
    Grade {
        /// JSON quiz questions
        quiz: PathBuf,
        /// JSON list of `{"question_index", "selected_answer"}`
        answers: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load().context("Failed to load configuration")?;
    tracing::info!(
        "Configuration loaded (env: {})",
        std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into())
    );

    match cli.command {
        Commands::Chunk {
            file,
            chunk_size,
            overlap,
        } => {
            if let Some(size) = chunk_size {
                config.chunking.chunk_size = size;
            }
            if let Some(overlap) = overlap {
                config.chunking.overlap = overlap;
            }
            config.validate().context("Invalid chunking options")?;

            let repo = DocumentRepository::new();
            let id = process_local(&repo, &config, &file).await?;
            print_json(&repo.find_chunks(&id).await?)
        }
        Commands::Ingest { files } => {
            let repo = DocumentRepository::new();
            for file in &files {
                ingest_local(&repo, &config, file).await?;
            }

            let listing: Vec<DocumentResponse> =
                repo.list().await.into_iter().map(DocumentResponse::from).collect();
            print_json(&listing)
        }
        Commands::Grade {
            quiz: quiz_path,
            answers: answers_path,
        } => {
            let questions: Vec<QuizQuestion> = read_json(&quiz_path).await?;
            let answers: Vec<SubmittedAnswer> = read_json(&answers_path).await?;
            let attempt = quiz::score_quiz(&questions, &answers).map_err(user_error)?;

            tracing::info!("Scored {}/{}", attempt.score, attempt.total_questions);
            print_json(&attempt)
        }
        Commands::Rank {
            file,
            query,
            max_chunks,
        } => {
            let repo = DocumentRepository::new();
            let id = process_local(&repo, &config, &file).await?;
            let chunks = repo.find_chunks(&id).await?;

            let max_chunks = max_chunks.unwrap_or(config.retrieval.max_chunks);
            let relevant =
                ranker::find_relevant_with(&chunks, &query, max_chunks, &config.retrieval.weights);
            print_json(&relevant)
        }
        command => {
            let api_key = config.api_key().with_context(|| {
                format!("{} is not set", config.llm.api_key_env)
            })?;
            let generator = RigGenerator::new(&config.llm, api_key)?;
            let service = StudyService::new(config, DocumentRepository::new(), generator);
            run_generation(&service, command).await
        }
    }
}

async fn run_generation<G: TextGenerator>(
    service: &StudyService<G>,
    command: Commands,
) -> anyhow::Result<()> {
    match command {
        Commands::Ask { file, question } => {
            let id = upload_local(service, &file).await?;
            print_json(&service.chat(&id, &question).await.map_err(user_error)?)
        }
        Commands::Flashcards { file, count } => {
            let id = upload_local(service, &file).await?;
            print_json(&service.generate_flashcards(&id, count).await.map_err(user_error)?)
        }
        Commands::Quiz { file, questions } => {
            let id = upload_local(service, &file).await?;
            print_json(&service.generate_quiz(&id, questions).await.map_err(user_error)?)
        }
        Commands::Summary { file } => {
            let id = upload_local(service, &file).await?;
            println!("{}", service.summarize(&id).await.map_err(user_error)?);
            Ok(())
        }
        Commands::Explain { file, concept } => {
            let id = upload_local(service, &file).await?;
            println!(
                "{}",
                service.explain_concept(&id, &concept).await.map_err(user_error)?
            );
            Ok(())
        }
        Commands::Chunk { .. }
        | Commands::Rank { .. }
        | Commands::Ingest { .. }
        | Commands::Grade { .. } => {
            anyhow::bail!("this command does not call the generation service")
        }
    }
}

async fn process_local(
    repo: &DocumentRepository,
    config: &AppConfig,
    file: &Path,
) -> anyhow::Result<String> {
    let id = ingest_local(repo, config, file).await?;
    ensure_ready(repo, &id).await
}

/// Create and process a record for `file`; the document may end up `failed`.
async fn ingest_local(
    repo: &DocumentRepository,
    config: &AppConfig,
    file: &Path,
) -> anyhow::Result<String> {
    let (title, filename) = names(file);
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let doc = repo.create(&title, &filename, bytes.len() as u64).await;
    study::process_document(
        repo,
        &doc.id,
        &filename,
        bytes,
        &config.chunking,
        Duration::from_secs(config.processing.extraction_timeout_secs),
    )
    .await;

    Ok(doc.id)
}

async fn upload_local<G: TextGenerator>(
    service: &StudyService<G>,
    file: &Path,
) -> anyhow::Result<String> {
    let (title, filename) = names(file);
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let (doc, handle) = service
        .upload(&title, &filename, bytes)
        .await
        .map_err(user_error)?;
    handle.await.context("Document processing task panicked")?;

    ensure_ready(service.documents(), &doc.id).await
}

async fn ensure_ready(repo: &DocumentRepository, id: &str) -> anyhow::Result<String> {
    let doc = repo
        .find_by_id(id)
        .await
        .context("Document disappeared")?;

    if doc.status != DocumentStatus::Ready {
        anyhow::bail!(
            "Document processing failed: {}",
            doc.error_message.as_deref().unwrap_or("unknown error")
        );
    }

    tracing::info!("Document '{}' ready with {} chunks", doc.title, doc.chunks.len());
    Ok(doc.id)
}

fn names(file: &Path) -> (String, String) {
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let title = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.clone());
    (title, filename)
}

fn user_error(e: AppError) -> anyhow::Error {
    anyhow::anyhow!(e.public_message())
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
