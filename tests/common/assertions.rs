//! Custom assertions for document replacement testing.
//!
//! Provides domain-specific assertions that make tests more readable
//! and provide better error messages.

use docswap::{PdfMode, ReplacementService};
use std::path::Path;

/// Extracts all text from a document, panicking with context on failure.
pub fn extract_text_or_panic(path: &Path) -> String {
    ReplacementService::new(PdfMode::InPlace)
        .extract_text(path)
        .unwrap_or_else(|e| panic!("Failed to extract text from '{}': {}", path.display(), e))
}

/// Asserts that `text` no longer appears in the document.
///
/// # Panics
/// Panics if the text is still found.
pub fn assert_replaced(path: &Path, text: &str) {
    let extracted = extract_text_or_panic(path);
    assert!(
        !extracted.contains(text),
        "'{}' should have been replaced but was found in '{}'.\nExtracted text: {:?}",
        text,
        path.display(),
        extracted
    );
}

/// Asserts that `text` appears in the document.
///
/// # Panics
/// Panics if the text is not found.
pub fn assert_present(path: &Path, text: &str) {
    let extracted = extract_text_or_panic(path);
    assert!(
        extracted.contains(text),
        "'{}' should be present in '{}'.\nExtracted text: {:?}",
        text,
        path.display(),
        extracted
    );
}

/// Asserts that a file is a loadable PDF.
pub fn assert_valid_pdf(path: &Path) {
    assert!(path.exists(), "PDF should exist at '{}'", path.display());
    assert!(
        ::lopdf::Document::load(path).is_ok(),
        "PDF at '{}' should load",
        path.display()
    );
}
