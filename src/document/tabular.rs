//! CSV replacement.
//!
//! Every record counts as one "page" in the report (row 1 is the first line,
//! header or not). Only cell values are matched, so a `find` never spans a
//! delimiter.

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use super::strategy::{DocumentFormat, DocumentOutcome, ReplaceStrategy};
use crate::engine::{PageText, ReplacementReport, Replacer};
use crate::error::{DocswapError, DocswapResult};

#[derive(Debug, Clone)]
pub struct CsvStrategy {
    delimiter: u8,
}

impl Default for CsvStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvStrategy {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn records(&self, input: &[u8]) -> DocswapResult<Vec<StringRecord>> {
        ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(input)
            .records()
            .enumerate()
            .map(|(index, record)| {
                record.map_err(|e| DocswapError::Document {
                    format: "CSV",
                    message: e.to_string(),
                    page: Some(index as u32 + 1),
                    source: Some(Box::new(e)),
                })
            })
            .collect()
    }
}

impl ReplaceStrategy for CsvStrategy {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Csv
    }

    fn extract_pages(&self, input: &[u8]) -> DocswapResult<PageText> {
        let separator = char::from(self.delimiter).to_string();
        Ok(self
            .records(input)?
            .iter()
            .enumerate()
            .map(|(index, record)| (index as u32 + 1, record.iter().collect::<Vec<_>>().join(&separator)))
            .collect())
    }

    fn replace(&self, input: &[u8], replacer: &Replacer) -> DocswapResult<DocumentOutcome> {
        let records = self.records(input)?;
        let mut report = ReplacementReport::none();
        let mut writer = WriterBuilder::new()
            .flexible(true)
            .delimiter(self.delimiter)
            .from_writer(Vec::with_capacity(input.len()));

        for (index, record) in records.iter().enumerate() {
            let mut row_count = 0;
            let cells: Vec<String> = record
                .iter()
                .map(|cell| {
                    let replaced = replacer.apply(cell);
                    row_count += replaced.count;
                    replaced.text
                })
                .collect();
            report.merge_page(index as u32 + 1, row_count);
            writer
                .write_record(&cells)
                .map_err(|e| DocswapError::document("CSV", e.to_string()))?;
        }

        if !report.has_replacements() {
            return Ok(DocumentOutcome {
                bytes: input.to_vec(),
                report,
            });
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| DocswapError::document("CSV", e.to_string()))?;
        Ok(DocumentOutcome { bytes, report })
    }

    fn name(&self) -> &str {
        "Csv"
    }

    fn preserves_layout(&self) -> bool {
        true
    }
}
