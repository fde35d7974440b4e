//! Test fixtures and PDF builders.
//!
//! Provides builders for creating test documents with specific content,
//! following the Builder pattern for clean test setup.

use anyhow::Result;
use printpdf::*;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Builder for creating test PDFs, one text line per `write_text` call.
///
/// # Example
///
/// ```no_run
/// # use anyhow::Result;
/// # fn main() -> Result<()> {
/// let pdf = TestPdfBuilder::new()
///     .with_line("Invoice for ACME Corp")
///     .new_page()
///     .with_line("Terms and conditions")
///     .build(std::path::Path::new("/tmp/test.pdf"))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TestPdfBuilder {
    title: String,
    pages: Vec<Vec<String>>,
    font_size: f32,
}

impl TestPdfBuilder {
    /// Creates a new test PDF builder with a single empty page.
    pub fn new() -> Self {
        Self {
            title: "Test Document".to_string(),
            pages: vec![Vec::new()],
            font_size: 12.0,
        }
    }

    /// Sets the document title.
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Adds a line of text to the current page.
    pub fn with_line(mut self, line: &str) -> Self {
        if let Some(page) = self.pages.last_mut() {
            page.push(line.to_string());
        }
        self
    }

    /// Starts a new page.
    pub fn new_page(mut self) -> Self {
        self.pages.push(Vec::new());
        self
    }

    /// Builds the PDF and returns its bytes.
    pub fn build_bytes(self) -> Result<Vec<u8>> {
        let (doc, page1, layer1) = PdfDocument::new(&self.title, Mm(210.0), Mm(297.0), "Layer 1");
        let font = doc.add_builtin_font(BuiltinFont::Helvetica)?;

        for (index, lines) in self.pages.iter().enumerate() {
            let (page, layer) = if index == 0 {
                (page1, layer1)
            } else {
                doc.add_page(Mm(210.0), Mm(297.0), "Layer 1")
            };
            let current_layer = doc.get_page(page).get_layer(layer);

            for (row, line) in lines.iter().enumerate() {
                let y = 270.0 - row as f32 * 8.0;
                current_layer.use_text(line.as_str(), self.font_size, Mm(20.0), Mm(y), &font);
            }
        }

        let mut writer = BufWriter::new(Vec::new());
        doc.save(&mut writer)?;
        Ok(writer.into_inner()?)
    }

    /// Builds the PDF and writes it to the specified path.
    pub fn build(self, output_path: &Path) -> Result<PathBuf> {
        fs::write(output_path, self.build_bytes()?)?;
        Ok(output_path.to_path_buf())
    }
}

impl Default for TestPdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Quick helper to create a two-page contract PDF.
pub fn create_contract(path: &Path) -> Result<PathBuf> {
    TestPdfBuilder::new()
        .with_title("Service Agreement")
        .with_line("Service Agreement between ACME Corp and Client")
        .with_line("ACME Corp agrees to deliver the services.")
        .new_page()
        .with_line("Signed for ACME Corp")
        .with_line("Witnessed by the unhappy notary")
        .build(path)
}

/// Writes `content` to `name` inside `dir`.
pub fn write_file(dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, content)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builder_pattern() {
        let builder = TestPdfBuilder::new()
            .with_title("Test")
            .with_line("one")
            .new_page()
            .with_line("two");

        assert_eq!(builder.title, "Test");
        assert_eq!(builder.pages.len(), 2);
    }

    #[test]
    fn test_create_contract() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let pdf_path = temp_dir.path().join("contract.pdf");
        create_contract(&pdf_path)?;
        assert!(pdf_path.exists());
        Ok(())
    }
}
