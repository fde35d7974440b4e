//! Replacement strategy trait and supporting types.
//!
//! A strategy owns everything format-specific: how text is pulled out of a
//! document, where the engine's output goes back in, and how the result is
//! serialized.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::{PageText, ReplacementReport, Replacer};
use crate::error::{DocswapError, DocswapResult};

/// Document formats docswap can process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Csv,
    Xml,
    Text,
}

impl DocumentFormat {
    /// Maps a file extension (without the dot, any case) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "csv" => Some(Self::Csv),
            "xml" => Some(Self::Xml),
            "txt" | "text" => Some(Self::Text),
            _ => None,
        }
    }

    /// Detects the format from a path's extension.
    pub fn from_path(path: &Path) -> DocswapResult<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        Self::from_extension(ext).ok_or_else(|| DocswapError::UnsupportedFormat {
            format: if ext.is_empty() {
                path.display().to_string()
            } else {
                ext.to_string()
            },
        })
    }

    /// Guesses the format from file content.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        let trimmed = bytes.trim_ascii_start();
        if bytes.starts_with(b"%PDF-") {
            Some(Self::Pdf)
        } else if trimmed.starts_with(b"<") {
            Some(Self::Xml)
        } else {
            None
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Csv => "text/csv",
            Self::Xml => "application/xml",
            Self::Text => "text/plain; charset=utf-8",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Csv => "CSV",
            Self::Xml => "XML",
            Self::Text => "Text",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How PDFs are rewritten.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PdfMode {
    /// Edit strings inside the existing content streams
    #[default]
    InPlace,
    /// Extract text and typeset a new document
    Rebuild,
}

impl FromStr for PdfMode {
    type Err = DocswapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "in-place" | "inplace" | "in_place" => Ok(Self::InPlace),
            "rebuild" => Ok(Self::Rebuild),
            other => Err(DocswapError::InvalidInput {
                parameter: "mode".to_string(),
                reason: format!("unknown PDF mode '{}' (expected in-place or rebuild)", other),
            }),
        }
    }
}

/// Result of rewriting one document.
#[derive(Debug, Clone, Default)]
pub struct DocumentOutcome {
    /// Serialized output document
    pub bytes: Vec<u8>,

    /// Substitution counts
    pub report: ReplacementReport,
}

/// Strategy for applying a [`Replacer`] to one document format.
pub trait ReplaceStrategy: Send + Sync {
    /// Format handled by this strategy.
    fn format(&self) -> DocumentFormat;

    /// Extracts plain text per page (or per row/record for tabular formats).
    fn extract_pages(&self, input: &[u8]) -> DocswapResult<PageText>;

    /// Rewrites `input` with every rule in `replacer` applied.
    fn replace(&self, input: &[u8], replacer: &Replacer) -> DocswapResult<DocumentOutcome>;

    /// Returns a human-readable name for this strategy.
    fn name(&self) -> &str;

    /// Returns whether output keeps the source layout.
    fn preserves_layout(&self) -> bool;
}
