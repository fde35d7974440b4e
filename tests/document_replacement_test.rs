//! End-to-end replacement through the file-level service.

use anyhow::Result;
use docswap::document::{InPlacePdfStrategy, RebuildPdfStrategy};
use docswap::{
    DocswapError, DocumentFormat, MatchOptions, PdfMode, ReplaceStrategy, ReplacementRule,
    ReplacementService, Replacer,
};
use std::fs;
use tempfile::TempDir;

mod common;
use common::*;

fn rules(pairs: &[(&str, &str)]) -> Vec<ReplacementRule> {
    pairs.iter().map(|(f, r)| ReplacementRule::new(*f, *r)).collect()
}

mod pdf_in_place {
    use super::*;

    #[test]
    fn test_replaces_across_pages() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let input = create_contract(&temp_dir.path().join("contract.pdf"))?;
        let output = temp_dir.path().join("out.pdf");

        let report = ReplacementService::new(PdfMode::InPlace).replace_file(
            &input,
            &output,
            &rules(&[("ACME Corp", "Globex Ltd")]),
            MatchOptions::new().case_sensitive(true),
        )?;

        assert_eq!(report.total, 3);
        assert_eq!(report.by_page.get(&1), Some(&2));
        assert_eq!(report.by_page.get(&2), Some(&1));
        assert_eq!(report.pages_processed, 2);

        assert_valid_pdf(&output);
        assert_replaced(&output, "ACME Corp");
        assert_present(&output, "Globex Ltd");
        assert_present(&output, "Service Agreement");
        Ok(())
    }

    #[test]
    fn test_whole_word_in_pdf() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let input = create_contract(&temp_dir.path().join("contract.pdf"))?;
        let output = temp_dir.path().join("out.pdf");

        let report = ReplacementService::new(PdfMode::InPlace).replace_file(
            &input,
            &output,
            &rules(&[("happy", "cheerful")]),
            MatchOptions::new().whole_word(true),
        )?;

        // only "unhappy" contains the text, and it is not a whole word
        assert!(!report.has_replacements());
        assert_eq!(fs::read(&input)?, fs::read(&output)?);
        Ok(())
    }

    #[test]
    fn test_no_match_copies_bytes() -> Result<()> {
        let bytes = TestPdfBuilder::new().with_line("nothing relevant").build_bytes()?;
        let replacer = Replacer::new(&rules(&[("absent", "x")]), MatchOptions::new())?;

        let outcome = InPlacePdfStrategy::new().replace(&bytes, &replacer)?;
        assert_eq!(outcome.bytes, bytes);
        assert_eq!(outcome.report.total, 0);
        assert_eq!(outcome.report.pages_processed, 1);
        Ok(())
    }

    #[test]
    fn test_replacement_outside_font_encoding_fails() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let input = TestPdfBuilder::new()
            .with_line("Visit the cafe today")
            .build(&temp_dir.path().join("menu.pdf"))?;
        let output = temp_dir.path().join("out.pdf");

        let err = ReplacementService::new(PdfMode::InPlace)
            .replace_file(&input, &output, &rules(&[("cafe", "café Ω€")]), MatchOptions::new())
            .unwrap_err();

        assert!(matches!(err, DocswapError::RenderingUnsupported { .. }));
        assert!(!output.exists());
        Ok(())
    }

    #[test]
    fn test_extract_pages() -> Result<()> {
        let bytes = TestPdfBuilder::new()
            .with_line("first")
            .new_page()
            .with_line("second")
            .build_bytes()?;

        let pages = InPlacePdfStrategy::new().extract_pages(&bytes)?;
        assert_eq!(pages.len(), 2);
        assert!(pages[&1].contains("first"));
        assert!(pages[&2].contains("second"));
        Ok(())
    }
}

mod pdf_rebuild {
    use super::*;

    #[test]
    fn test_rebuild_replaces_and_keeps_page_count() -> Result<()> {
        let bytes = TestPdfBuilder::new()
            .with_line("Dear customer,")
            .new_page()
            .with_line("Your customer number is 42.")
            .build_bytes()?;
        let replacer = Replacer::new(&rules(&[("customer", "client")]), MatchOptions::new())?;

        let outcome = RebuildPdfStrategy::new().replace(&bytes, &replacer)?;
        assert!(outcome.bytes.starts_with(b"%PDF-"));
        assert_eq!(outcome.report.total, 2);
        assert_eq!(outcome.report.pages_modified(), 2);

        let rebuilt = InPlacePdfStrategy::new().extract_pages(&outcome.bytes)?;
        assert_eq!(rebuilt.len(), 2);
        assert!(rebuilt[&1].contains("client"));
        assert!(!rebuilt[&2].contains("customer"));
        Ok(())
    }

    #[test]
    fn test_rebuild_through_service() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let input = create_contract(&temp_dir.path().join("contract.pdf"))?;
        let output = temp_dir.path().join("rebuilt.pdf");

        let report = ReplacementService::new(PdfMode::Rebuild).replace_file(
            &input,
            &output,
            &rules(&[("notary", "witness")]),
            MatchOptions::new(),
        )?;

        assert_eq!(report.total, 1);
        assert_valid_pdf(&output);
        assert_present(&output, "witness");
        Ok(())
    }
}

mod tabular_and_markup {
    use super::*;

    #[test]
    fn test_csv_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let input = write_file(temp_dir.path(), "people.csv", "name,team\nAda,red\nBob,Red\nCy,blue\n")?;
        let output = temp_dir.path().join("out.csv");

        let report = ReplacementService::default().replace_file(
            &input,
            &output,
            &rules(&[("red", "green")]),
            MatchOptions::new().whole_word(true),
        )?;

        assert_eq!(report.total, 2);
        assert_eq!(report.to_string(), "Replaced 2 occurrences across 2 pages");
        assert_eq!(
            fs::read_to_string(&output)?,
            "name,team\nAda,green\nBob,green\nCy,blue\n"
        );
        Ok(())
    }

    #[test]
    fn test_xml_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let input = write_file(
            temp_dir.path(),
            "feed.xml",
            "<items><item id=\"old\">old price</item><item>bold</item></items>",
        )?;
        let output = temp_dir.path().join("out.xml");

        let report = ReplacementService::default().replace_file(
            &input,
            &output,
            &rules(&[("old", "new")]),
            MatchOptions::new().whole_word(true),
        )?;

        assert_eq!(report.total, 1);
        assert_eq!(
            fs::read_to_string(&output)?,
            "<items><item id=\"old\">new price</item><item>bold</item></items>"
        );
        Ok(())
    }

    #[test]
    fn test_text_file_multiple_rules() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let input = write_file(temp_dir.path(), "notes.txt", "foo foobar bar")?;
        let output = temp_dir.path().join("notes-out.txt");

        let report = ReplacementService::default().replace_file(
            &input,
            &output,
            &rules(&[("foo", "1"), ("foobar", "2"), ("bar", "3")]),
            MatchOptions::new(),
        )?;

        assert_eq!(fs::read_to_string(&output)?, "1 2 3");
        assert_eq!(report.total, 3);
        Ok(())
    }
}

mod failures {
    use super::*;

    #[test]
    fn test_unsupported_extension() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let input = write_file(temp_dir.path(), "letter.docx", "x")?;
        let err = ReplacementService::default()
            .replace_file(&input, &temp_dir.path().join("o.docx"), &rules(&[("x", "y")]), MatchOptions::new())
            .unwrap_err();
        assert!(matches!(err, DocswapError::UnsupportedFormat { .. }));
        Ok(())
    }

    #[test]
    fn test_invalid_rule_writes_nothing() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let input = write_file(temp_dir.path(), "a.txt", "abc")?;
        let output = temp_dir.path().join("b.txt");

        let err = ReplacementService::default()
            .replace_file(&input, &output, &rules(&[("a", "b"), ("", "c")]), MatchOptions::new())
            .unwrap_err();
        assert!(matches!(err, DocswapError::InvalidRule { index: 1, .. }));
        assert!(!output.exists());
        Ok(())
    }

    #[test]
    fn test_corrupt_pdf() {
        let service = ReplacementService::default();
        let result = service.replace_bytes(
            DocumentFormat::Pdf,
            b"%PDF-1.4 truncated",
            &rules(&[("a", "b")]),
            MatchOptions::new(),
        );
        assert!(matches!(result, Err(DocswapError::Document { .. })));
    }
}
