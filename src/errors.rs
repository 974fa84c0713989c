#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Document is not ready (status: {0})")]
    NotReady(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Message safe to show an end user. Internal detail is logged, not returned.
    pub fn public_message(&self) -> String {
        match self {
            AppError::NotFound(msg) | AppError::Validation(msg) => msg.clone(),
            AppError::NotReady(_) => self.to_string(),
            AppError::Generation(msg) => {
                tracing::error!("Generation error: {msg}");
                "Failed to generate a response, please try again".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:#}");
                "Internal error".to_string()
            }
        }
    }
}
