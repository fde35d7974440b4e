//! XML and plain-text replacement.
//!
//! Both formats are treated as a single page.

use quick_xml::events::{BytesCData, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::strategy::{DocumentFormat, DocumentOutcome, ReplaceStrategy};
use crate::engine::{PageText, ReplacementReport, Replacer};
use crate::error::{DocswapError, DocswapResult};

fn decode_utf8<'a>(format: &'static str, input: &'a [u8]) -> DocswapResult<&'a str> {
    std::str::from_utf8(input).map_err(|e| DocswapError::Document {
        format,
        message: format!("input is not valid UTF-8: {}", e),
        page: None,
        source: Some(Box::new(e)),
    })
}

fn xml_error(e: impl std::fmt::Display, position: usize) -> DocswapError {
    DocswapError::document("XML", format!("{} at byte {}", e, position))
}

/// Splits `text` into CDATA section bodies that never contain `]]>`.
///
/// Each `]]>` is broken between `]]` and `>`, so the sections written back
/// to back read as the original text.
fn cdata_sections(text: &str) -> Vec<String> {
    let pieces: Vec<&str> = text.split("]]>").collect();
    let last = pieces.len() - 1;
    pieces
        .iter()
        .enumerate()
        .map(|(index, piece)| {
            let mut section = String::with_capacity(piece.len() + 3);
            if index > 0 {
                section.push('>');
            }
            section.push_str(piece);
            if index < last {
                section.push_str("]]");
            }
            section
        })
        .collect()
}

/// Replaces inside element text and CDATA sections.
///
/// Tag names, attribute values, comments and processing instructions are
/// copied through unchanged.
#[derive(Debug, Clone, Default)]
pub struct XmlStrategy;

impl XmlStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl ReplaceStrategy for XmlStrategy {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Xml
    }

    fn extract_pages(&self, input: &[u8]) -> DocswapResult<PageText> {
        let source = decode_utf8("XML", input)?;
        let mut reader = Reader::from_str(source);
        let mut text = String::new();

        loop {
            let position = reader.buffer_position();
            match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(Event::Text(e)) => {
                    text.push_str(&e.unescape().map_err(|err| xml_error(err, position))?)
                }
                Ok(Event::CData(e)) => text.push_str(decode_utf8("XML", &e)?),
                Ok(_) => {}
                Err(e) => return Err(xml_error(e, position)),
            }
        }

        Ok(PageText::from([(1, text)]))
    }

    fn replace(&self, input: &[u8], replacer: &Replacer) -> DocswapResult<DocumentOutcome> {
        let source = decode_utf8("XML", input)?;
        let mut reader = Reader::from_str(source);
        let mut writer = Writer::new(Vec::with_capacity(input.len()));
        let mut count = 0;

        loop {
            let position = reader.buffer_position();
            let event = match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(Event::Text(e)) => {
                    let replaced = {
                        let unescaped = e.unescape().map_err(|err| xml_error(err, position))?;
                        replacer.apply(&unescaped)
                    };
                    if replaced.count > 0 {
                        count += replaced.count;
                        Event::Text(BytesText::new(&replaced.text).into_owned())
                    } else {
                        Event::Text(e)
                    }
                }
                Ok(Event::CData(e)) => {
                    let replaced = replacer.apply(decode_utf8("XML", &e)?);
                    if replaced.count > 0 {
                        count += replaced.count;
                        let mut sections = cdata_sections(&replaced.text);
                        let last = sections.pop().unwrap_or_default();
                        for section in sections {
                            writer
                                .write_event(Event::CData(BytesCData::new(section)))
                                .map_err(|e| xml_error(e, position))?;
                        }
                        Event::CData(BytesCData::new(last))
                    } else {
                        Event::CData(e)
                    }
                }
                Ok(event) => event,
                Err(e) => return Err(xml_error(e, position)),
            };
            writer
                .write_event(event)
                .map_err(|e| xml_error(e, position))?;
        }

        let mut report = ReplacementReport::none();
        report.merge_page(1, count);
        if !report.has_replacements() {
            return Ok(DocumentOutcome {
                bytes: input.to_vec(),
                report,
            });
        }
        Ok(DocumentOutcome {
            bytes: writer.into_inner(),
            report,
        })
    }

    fn name(&self) -> &str {
        "Xml"
    }

    fn preserves_layout(&self) -> bool {
        true
    }
}

/// UTF-8 text, replaced as a whole.
#[derive(Debug, Clone, Default)]
pub struct PlainTextStrategy;

impl PlainTextStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl ReplaceStrategy for PlainTextStrategy {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Text
    }

    fn extract_pages(&self, input: &[u8]) -> DocswapResult<PageText> {
        Ok(PageText::from([(1, decode_utf8("Text", input)?.to_string())]))
    }

    fn replace(&self, input: &[u8], replacer: &Replacer) -> DocswapResult<DocumentOutcome> {
        let replaced = replacer.apply(decode_utf8("Text", input)?);
        let mut report = ReplacementReport::none();
        report.merge_page(1, replaced.count);
        Ok(DocumentOutcome {
            bytes: replaced.text.into_bytes(),
            report,
        })
    }

    fn name(&self) -> &str {
        "PlainText"
    }

    fn preserves_layout(&self) -> bool {
        true
    }
}
