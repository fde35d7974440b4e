//! Document formats and the replacement service.
//!
//! This module wraps the engine in format-specific strategies and provides
//! a service that picks the right strategy for a file, validates requests,
//! and handles reading and writing.

pub mod markup;
pub mod pdf;
pub mod strategy;
pub mod tabular;

pub use markup::{PlainTextStrategy, XmlStrategy};
pub use pdf::{InPlacePdfStrategy, RebuildPdfStrategy};
pub use strategy::{DocumentFormat, DocumentOutcome, PdfMode, ReplaceStrategy};
pub use tabular::CsvStrategy;

use std::path::Path;

use tracing::{debug, info};

use crate::engine::{MatchOptions, PageText, ReplacementReport, ReplacementRule, Replacer};
use crate::error::{DocswapError, DocswapResult};

/// Replacement service coordinating strategy execution.
///
/// Holds one strategy per format. The PDF strategy is chosen at
/// construction; the others are fixed.
pub struct ReplacementService {
    pdf: Box<dyn ReplaceStrategy>,
    csv: Box<dyn ReplaceStrategy>,
    xml: Box<dyn ReplaceStrategy>,
    text: Box<dyn ReplaceStrategy>,
}

impl Default for ReplacementService {
    fn default() -> Self {
        Self::new(PdfMode::default())
    }
}

impl ReplacementService {
    /// Creates a service using the default strategy for `mode`.
    pub fn new(mode: PdfMode) -> Self {
        let pdf: Box<dyn ReplaceStrategy> = match mode {
            PdfMode::InPlace => Box::new(InPlacePdfStrategy::new()),
            PdfMode::Rebuild => Box::new(RebuildPdfStrategy::new()),
        };
        Self::with_pdf_strategy(pdf)
    }

    /// Creates a service with a caller-supplied PDF strategy.
    pub fn with_pdf_strategy(pdf: Box<dyn ReplaceStrategy>) -> Self {
        Self {
            pdf,
            csv: Box::new(CsvStrategy::new()),
            xml: Box::new(XmlStrategy::new()),
            text: Box::new(PlainTextStrategy::new()),
        }
    }

    /// Returns the strategy that handles `format`.
    pub fn strategy(&self, format: DocumentFormat) -> &dyn ReplaceStrategy {
        match format {
            DocumentFormat::Pdf => self.pdf.as_ref(),
            DocumentFormat::Csv => self.csv.as_ref(),
            DocumentFormat::Xml => self.xml.as_ref(),
            DocumentFormat::Text => self.text.as_ref(),
        }
    }

    /// Applies `rules` to an in-memory document.
    pub fn replace_bytes(
        &self,
        format: DocumentFormat,
        input: &[u8],
        rules: &[ReplacementRule],
        options: MatchOptions,
    ) -> DocswapResult<DocumentOutcome> {
        if rules.is_empty() {
            return Err(DocswapError::InvalidInput {
                parameter: "rules".to_string(),
                reason: "No replacement rules specified".to_string(),
            });
        }
        let replacer = Replacer::new(rules, options)?;
        let strategy = self.strategy(format);

        debug!(
            format = %format,
            strategy = strategy.name(),
            rules = replacer.rule_count(),
            bytes = input.len(),
            "replacing"
        );
        let outcome = strategy.replace(input, &replacer)?;
        info!(
            format = %format,
            total = outcome.report.total,
            pages = outcome.report.pages_modified(),
            "replacement finished"
        );
        Ok(outcome)
    }

    /// Reads `input`, applies `rules`, and writes the result to `output`.
    ///
    /// The format is taken from the input file's extension. When nothing
    /// matched, `output` is a byte-for-byte copy of `input`.
    pub fn replace_file(
        &self,
        input: &Path,
        output: &Path,
        rules: &[ReplacementRule],
        options: MatchOptions,
    ) -> DocswapResult<ReplacementReport> {
        let bytes = read_input(input)?;
        let format = DocumentFormat::from_path(input)?;

        let outcome = self.replace_bytes(format, &bytes, rules, options)?;

        std::fs::write(output, &outcome.bytes).map_err(|e| DocswapError::Io {
            path: output.to_path_buf(),
            source: e,
        })?;
        Ok(outcome.report)
    }

    /// Extracts text per page from a file for inspection.
    pub fn extract_pages(&self, input: &Path) -> DocswapResult<PageText> {
        let bytes = read_input(input)?;
        let format = DocumentFormat::from_path(input)?;
        self.strategy(format).extract_pages(&bytes)
    }

    /// Extracts all text from a file, pages separated by form feeds.
    pub fn extract_text(&self, input: &Path) -> DocswapResult<String> {
        let pages = self.extract_pages(input)?;
        Ok(pages.into_values().collect::<Vec<_>>().join("\x0c"))
    }
}

fn read_input(input: &Path) -> DocswapResult<Vec<u8>> {
    if !input.exists() {
        return Err(DocswapError::Io {
            path: input.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "Input file does not exist"),
        });
    }
    std::fs::read(input).map_err(|e| DocswapError::Io {
        path: input.to_path_buf(),
        source: e,
    })
}
