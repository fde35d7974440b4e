//! PDF replacement strategies.
//!
//! Two approaches trade layout fidelity against reliability:
//!
//! - [`InPlacePdfStrategy`] edits the strings inside each page's content
//!   stream with lopdf. Everything else on the page (positions, fonts,
//!   graphics) is left alone, but a match split across two text-showing
//!   operators is not found.
//! - [`RebuildPdfStrategy`] extracts page text with pdf-extract, runs the
//!   engine over whole pages, and typesets a plain new document with
//!   printpdf. Every match in the extracted text is replaced; the original
//!   layout is not kept.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use lopdf::content::Content;
use lopdf::{Document, Object};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference};
use tracing::{debug, warn};

use super::strategy::{DocumentFormat, DocumentOutcome, ReplaceStrategy};
use crate::engine::{PageText, ReplacementReport, Replacer};
use crate::error::{DocswapError, DocswapResult};

/// Operators whose operands carry shown text.
const TEXT_OPERATORS: [&str; 4] = ["Tj", "TJ", "'", "\""];

/// Rewrites text inside existing content streams.
#[derive(Debug, Clone, Default)]
pub struct InPlacePdfStrategy;

impl InPlacePdfStrategy {
    pub fn new() -> Self {
        Self
    }

    /// Applies `replacer` to the text operators of one page.
    ///
    /// Returns the re-encoded content stream and the substitution count, or
    /// `None` when nothing on the page matched. A replacement the current
    /// font's encoding cannot represent fails with
    /// [`DocswapError::RenderingUnsupported`].
    fn rewrite_page(
        doc: &Document,
        page_no: u32,
        page_id: lopdf::ObjectId,
        replacer: &Replacer,
    ) -> DocswapResult<Option<(Vec<u8>, usize)>> {
        let page_error = |e: lopdf::Error| DocswapError::Document {
            format: "PDF",
            message: e.to_string(),
            page: Some(page_no),
            source: Some(Box::new(e)),
        };

        let fonts = doc.get_page_fonts(page_id).map_err(page_error)?;
        let encodings: BTreeMap<Vec<u8>, _> = fonts
            .into_iter()
            .filter_map(|(name, font)| match font.get_font_encoding(doc) {
                Ok(encoding) => Some((name, encoding)),
                Err(e) => {
                    warn!(page = page_no, error = %e, "skipping font with unreadable encoding");
                    None
                }
            })
            .collect();

        let content_data = doc.get_page_content(page_id).map_err(page_error)?;
        let mut content = Content::decode(&content_data).map_err(page_error)?;

        let mut current_encoding = None;
        // the font is part of the graphics state, so q/Q save and restore it
        let mut saved_encodings = Vec::new();
        let mut count = 0;
        let mut undecodable = 0;

        for operation in &mut content.operations {
            let operator = operation.operator.as_str();
            match operator {
                "q" => {
                    saved_encodings.push(current_encoding);
                    continue;
                }
                "Q" => {
                    current_encoding = saved_encodings.pop().flatten();
                    continue;
                }
                "Tf" => {
                    current_encoding = operation
                        .operands
                        .first()
                        .and_then(|font| font.as_name().ok())
                        .and_then(|name| encodings.get(name));
                    continue;
                }
                _ if !TEXT_OPERATORS.contains(&operator) => continue,
                _ => {}
            }
            let Some(encoding) = current_encoding else {
                undecodable += 1;
                continue;
            };

            let mut rewrite = |bytes: &mut Vec<u8>| -> DocswapResult<()> {
                let decoded = Document::decode_text(encoding, bytes).map_err(page_error)?;
                let replaced = replacer.apply(&decoded);
                if replaced.count > 0 {
                    let encoded = Document::encode_text(encoding, &replaced.text);
                    // encode_text drops characters the font cannot show
                    let shown = Document::decode_text(encoding, &encoded).map_err(page_error)?;
                    if shown != replaced.text {
                        return Err(DocswapError::RenderingUnsupported {
                            reason: format!(
                                "page {}: font encoding cannot represent {:?}; use rebuild mode",
                                page_no, replaced.text
                            ),
                        });
                    }
                    *bytes = encoded;
                    count += replaced.count;
                }
                Ok(())
            };

            for operand in operation.operands.iter_mut() {
                match operand {
                    Object::String(bytes, _) => rewrite(bytes)?,
                    Object::Array(items) => {
                        for item in items.iter_mut() {
                            if let Object::String(bytes, _) = item {
                                rewrite(bytes)?;
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        if undecodable > 0 {
            warn!(
                page = page_no,
                operations = undecodable,
                "text shown without a decodable font was left unchanged"
            );
        }

        if count == 0 {
            return Ok(None);
        }
        let encoded = content.encode().map_err(page_error)?;
        Ok(Some((encoded, count)))
    }
}

impl ReplaceStrategy for InPlacePdfStrategy {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    fn extract_pages(&self, input: &[u8]) -> DocswapResult<PageText> {
        let doc = Document::load_mem(input)?;
        doc.get_pages()
            .into_keys()
            .map(|page_no| {
                let text = doc
                    .extract_text(&[page_no])
                    .map_err(|e| DocswapError::TextExtraction {
                        reason: format!("page {}: {}", page_no, e),
                    })?;
                Ok((page_no, text))
            })
            .collect()
    }

    fn replace(&self, input: &[u8], replacer: &Replacer) -> DocswapResult<DocumentOutcome> {
        let mut doc = Document::load_mem(input)?;
        let mut report = ReplacementReport::none();

        for (page_no, page_id) in doc.get_pages() {
            let rewritten = Self::rewrite_page(&doc, page_no, page_id, replacer)?;
            match rewritten {
                Some((content, count)) => {
                    doc.change_page_content(page_id, content)?;
                    report.merge_page(page_no, count);
                }
                None => report.merge_page(page_no, 0),
            }
        }

        if !report.has_replacements() {
            return Ok(DocumentOutcome {
                bytes: input.to_vec(),
                report,
            });
        }

        let mut bytes = Vec::with_capacity(input.len());
        doc.save_to(&mut bytes)
            .map_err(|e| DocswapError::document("PDF", format!("save failed: {}", e)))?;
        Ok(DocumentOutcome { bytes, report })
    }

    fn name(&self) -> &str {
        "InPlace"
    }

    fn preserves_layout(&self) -> bool {
        true
    }
}

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const PT_TO_MM: f32 = 0.352_778;

/// Re-typesets extracted text into a fresh document.
#[derive(Debug, Clone)]
pub struct RebuildPdfStrategy {
    /// TrueType font to typeset with; Helvetica when unset or unusable
    font_path: Option<PathBuf>,
    font_size: f32,
}

impl Default for RebuildPdfStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl RebuildPdfStrategy {
    pub fn new() -> Self {
        Self {
            font_path: None,
            font_size: 11.0,
        }
    }

    pub fn with_font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(path.into());
        self
    }

    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = size;
        self
    }

    fn line_height_pt(&self) -> f32 {
        self.font_size * 1.2
    }

    fn lines_per_page(&self) -> usize {
        let usable = PAGE_HEIGHT_MM - 2.0 * MARGIN_MM;
        ((usable / (self.line_height_pt() * PT_TO_MM)).floor() as usize).max(1)
    }

    /// Loads the configured font into `doc`.
    ///
    /// A font file that cannot be read is an I/O error. A file printpdf
    /// cannot embed is reported as [`DocswapError::RenderingUnsupported`].
    fn preferred_font(
        &self,
        doc: &PdfDocumentReference,
        path: &Path,
    ) -> DocswapResult<IndirectFontRef> {
        let file = File::open(path).map_err(|e| DocswapError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        doc.add_external_font(file)
            .map_err(|e| DocswapError::RenderingUnsupported {
                reason: format!("cannot embed font '{}': {}", path.display(), e),
            })
    }

    fn select_font(&self, doc: &PdfDocumentReference) -> DocswapResult<IndirectFontRef> {
        if let Some(path) = &self.font_path {
            match self.preferred_font(doc, path) {
                Ok(font) => return Ok(font),
                Err(DocswapError::RenderingUnsupported { reason }) => {
                    warn!(%reason, "falling back to built-in Helvetica");
                }
                Err(e) => return Err(e),
            }
        }
        doc.add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| DocswapError::document("PDF", format!("builtin font: {}", e)))
    }

    /// Typesets `pages` into a new PDF. Each source page starts a new output
    /// page; long pages continue onto additional ones.
    pub fn render(&self, pages: &PageText) -> DocswapResult<Vec<u8>> {
        let (doc, first_page, first_layer) = PdfDocument::new(
            "docswap",
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "Layer 1",
        );
        let font = self.select_font(&doc)?;

        let mut sheets: Vec<Vec<&str>> = Vec::new();
        for text in pages.values() {
            let lines: Vec<&str> = text.lines().collect();
            if lines.is_empty() {
                sheets.push(Vec::new());
                continue;
            }
            sheets.extend(lines.chunks(self.lines_per_page()).map(<[&str]>::to_vec));
        }
        if sheets.is_empty() {
            sheets.push(Vec::new());
        }

        for (index, lines) in sheets.iter().enumerate() {
            let (page, layer) = if index == 0 {
                (first_page, first_layer)
            } else {
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1")
            };
            let layer = doc.get_page(page).get_layer(layer);

            layer.begin_text_section();
            layer.set_font(&font, self.font_size);
            layer.set_line_height(self.line_height_pt());
            layer.set_text_cursor(Mm(MARGIN_MM), Mm(PAGE_HEIGHT_MM - MARGIN_MM));
            for line in lines {
                layer.write_text(line.replace('\t', "    "), &font);
                layer.add_line_break();
            }
            layer.end_text_section();
        }
        debug!(sheets = sheets.len(), "rebuilt PDF");

        let mut writer = BufWriter::new(Vec::new());
        doc.save(&mut writer)
            .map_err(|e| DocswapError::document("PDF", format!("save failed: {}", e)))?;
        writer
            .into_inner()
            .map_err(|e| DocswapError::document("PDF", e.to_string()))
    }
}

impl ReplaceStrategy for RebuildPdfStrategy {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    fn extract_pages(&self, input: &[u8]) -> DocswapResult<PageText> {
        extract_pages_by_text_layer(input)
    }

    fn replace(&self, input: &[u8], replacer: &Replacer) -> DocswapResult<DocumentOutcome> {
        let pages = self.extract_pages(input)?;
        let (updated, report) = replacer.apply_pages(&pages);
        let bytes = self.render(&updated)?;
        Ok(DocumentOutcome { bytes, report })
    }

    fn name(&self) -> &str {
        "Rebuild"
    }

    fn preserves_layout(&self) -> bool {
        false
    }
}

/// Extracts one string per page with pdf-extract.
///
/// pdf-extract panics on some malformed input, so the call is isolated
/// behind `catch_unwind` and a panic becomes a [`DocswapError::TextExtraction`].
pub fn extract_pages_by_text_layer(input: &[u8]) -> DocswapResult<PageText> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(input)
    }));
    match result {
        Ok(Ok(pages)) => Ok(pages
            .into_iter()
            .enumerate()
            .map(|(i, text)| (i as u32 + 1, text))
            .collect()),
        Ok(Err(e)) => Err(DocswapError::TextExtraction {
            reason: e.to_string(),
        }),
        Err(_) => Err(DocswapError::TextExtraction {
            reason: "PDF extraction panicked (malformed document)".to_string(),
        }),
    }
}
