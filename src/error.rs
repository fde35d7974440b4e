//! Error types for the docswap library.
//!
//! Errors are split by where they originate: rule validation happens
//! synchronously before any text is touched, while document and I/O errors
//! come from the format-specific loaders and writers around the engine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for docswap operations.
pub type DocswapResult<T> = Result<T, DocswapError>;

/// Error type for all docswap operations.
#[derive(Debug, Error)]
pub enum DocswapError {
    /// A replacement rule cannot be applied (e.g. its find text is empty).
    ///
    /// The whole rule batch is rejected when this is returned.
    #[error("Invalid rule #{index}: {reason}")]
    InvalidRule { index: usize, reason: String },

    /// Invalid configuration or parameters
    #[error("Invalid input for '{parameter}': {reason}")]
    InvalidInput { parameter: String, reason: String },

    /// Error occurred while reading or writing files
    #[error("IO error for path '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The document format is not one docswap can process
    #[error("Unsupported document format: {format}")]
    UnsupportedFormat { format: String },

    /// A format backend failed to parse or serialize a document
    #[error("{format} processing error{}: {message}", page.map(|p| format!(" on page {}", p)).unwrap_or_default())]
    Document {
        format: &'static str,
        message: String,
        page: Option<u32>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Text extraction failed
    #[error("Text extraction failed: {reason}")]
    TextExtraction { reason: String },

    /// The preferred rendering path cannot handle this document.
    ///
    /// Renderers that have a default path fall back on this error; it is
    /// never swallowed for any other variant.
    #[error("Rendering unsupported: {reason}")]
    RenderingUnsupported { reason: String },

    /// Settings could not be loaded
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl DocswapError {
    /// Creates a document error without an underlying source.
    pub fn document(format: &'static str, message: impl Into<String>) -> Self {
        Self::Document {
            format,
            message: message.into(),
            page: None,
            source: None,
        }
    }

    /// Returns true for errors caused by the caller's rules or parameters.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRule { .. } | Self::InvalidInput { .. } | Self::UnsupportedFormat { .. }
        )
    }
}

impl From<lopdf::Error> for DocswapError {
    fn from(err: lopdf::Error) -> Self {
        Self::Document {
            format: "PDF",
            message: err.to_string(),
            page: None,
            source: Some(Box::new(err)),
        }
    }
}

impl From<::config::ConfigError> for DocswapError {
    fn from(err: ::config::ConfigError) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DocswapError::InvalidRule {
            index: 2,
            reason: "find text is empty".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid rule #2: find text is empty");
    }

    #[test]
    fn test_document_error_page_suffix() {
        let err = DocswapError::Document {
            format: "PDF",
            message: "bad content stream".to_string(),
            page: Some(3),
            source: None,
        };
        assert_eq!(
            err.to_string(),
            "PDF processing error on page 3: bad content stream"
        );

        let err = DocswapError::document("CSV", "unterminated quote");
        assert_eq!(err.to_string(), "CSV processing error: unterminated quote");
    }

    #[test]
    fn test_client_error_classification() {
        assert!(DocswapError::UnsupportedFormat {
            format: "docx".to_string()
        }
        .is_client_error());
        assert!(!DocswapError::TextExtraction {
            reason: "x".to_string()
        }
        .is_client_error());
    }
}
