use std::time::Duration;

use anyhow::{Context, Result};

/// Supported file extensions for document upload.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "md"];

pub fn is_supported(filename: &str) -> bool {
    extension_from_filename(filename)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Extract plain text from an uploaded file.
///
/// PDFs are parsed on the blocking thread pool and abandoned after `timeout`.
/// Plain text and markdown are decoded in place.
pub async fn extract_text(bytes: Vec<u8>, filename: &str, timeout: Duration) -> Result<String> {
    let ext = extension_from_filename(filename).unwrap_or_default();

    match ext.as_str() {
        "pdf" => {
            let fname = filename.to_string();
            tracing::info!("extract_text: starting PDF extraction for '{fname}' ({} bytes)", bytes.len());

            let handle = tokio::task::spawn_blocking(move || {
                let result = extract_pdf(&bytes);
                match &result {
                    Ok(text) => tracing::info!("extract_text: '{fname}' extraction succeeded, {} chars", text.len()),
                    Err(e) => tracing::error!("extract_text: '{fname}' extraction failed: {e:#}"),
                }
                result
            });

            match tokio::time::timeout(timeout, handle).await {
                Ok(join_result) => join_result.context("Text extraction task panicked")?,
                Err(_) => anyhow::bail!(
                    "Text extraction timed out after {}s for '{filename}'",
                    timeout.as_secs()
                ),
            }
        }
        "txt" | "md" => extract_plaintext(bytes),
        other => Err(anyhow::anyhow!("Unsupported file type: {other}")),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    // pdftotext (poppler) handles complex layouts better when it is installed
    match extract_pdf_pdftotext(bytes) {
        Ok(text) if !text.trim().is_empty() => {
            tracing::info!("PDF extracted via pdftotext ({} chars)", text.len());
            return Ok(text);
        }
        Ok(_) => tracing::warn!("pdftotext returned empty text, falling back to pdf_extract"),
        Err(e) => tracing::warn!("pdftotext failed ({e:#}), falling back to pdf_extract"),
    }

    pdf_extract::extract_text_from_mem(bytes).context("Failed to extract text from PDF")
}

fn extract_pdf_pdftotext(bytes: &[u8]) -> Result<String> {
    use std::io::Write;
    use std::process::Command;

    let mut tmp = tempfile::NamedTempFile::new().context("Failed to create temp file")?;
    tmp.write_all(bytes).context("Failed to write PDF to temp file")?;
    tmp.flush()?;

    let output = Command::new("pdftotext")
        .arg(tmp.path())
        .arg("-")
        .output()
        .context("Failed to run pdftotext")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("pdftotext exited with {}: {stderr}", output.status);
    }

    String::from_utf8(output.stdout).context("pdftotext output is not valid UTF-8")
}

fn extract_plaintext(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).context("File is not valid UTF-8 text")
}

fn extension_from_filename(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    Some(ext.to_lowercase())
}
