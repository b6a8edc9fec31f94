//! Research producer error types
//!
//! A `ResearchError` describes why one paper could not be processed. The
//! processor records it against the paper and moves on.

use lineage_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResearchError {
    #[error("Invalid arXiv URL format: {url}")]
    InvalidArxivUrl { url: String },

    #[error("Download failed for {url}: {message}")]
    Download { url: String, message: String },

    #[error("PDF parse error: {message}")]
    PdfParse { message: String },

    #[error("Generation failed: {message}")]
    Generation { message: String },

    #[error("Malformed model response: {message}")]
    MalformedResponse { message: String },

    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<AppError> for ResearchError {
    fn from(e: AppError) -> Self {
        match e {
            AppError::Io { path, message } => ResearchError::Io { path, message },
            AppError::Configuration { message } => ResearchError::Config(message),
            other => ResearchError::Generation {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_app_error() {
        let err: ResearchError = AppError::GenerationTimeout { timeout_ms: 600_000 }.into();
        assert!(matches!(err, ResearchError::Generation { .. }));
        assert_eq!(err.to_string(), "Generation failed: Text generation timeout after 600000ms");

        let err: ResearchError = AppError::Io {
            path: "summaries.txt".into(),
            message: "read-only file system".into(),
        }
        .into();
        assert!(matches!(err, ResearchError::Io { ref path, .. } if path == "summaries.txt"));
    }
}
