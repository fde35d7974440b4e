//! Multi-page replacement and reporting.

use std::collections::BTreeMap;
use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{MatchOptions, ReplacementRule, Replacer};
use crate::error::DocswapResult;

/// Extracted plain text keyed by 1-based page index.
pub type PageText = BTreeMap<u32, String>;

/// Substitution counts for one replacement operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementReport {
    /// Total substitutions across all pages
    pub total: usize,

    /// Substitutions per page; pages without matches are omitted
    pub by_page: BTreeMap<u32, usize>,

    /// Pages examined
    pub pages_processed: usize,
}

impl ReplacementReport {
    /// Creates a report indicating nothing was replaced.
    pub fn none() -> Self {
        Self::default()
    }

    /// Returns true if any substitution was made.
    pub fn has_replacements(&self) -> bool {
        self.total > 0
    }

    /// Number of pages with at least one substitution.
    pub fn pages_modified(&self) -> usize {
        self.by_page.len()
    }

    /// Records the outcome for one page. Order of calls does not matter.
    pub fn merge_page(&mut self, page: u32, count: usize) {
        self.pages_processed += 1;
        if count > 0 {
            self.total += count;
            *self.by_page.entry(page).or_insert(0) += count;
        }
    }
}

impl fmt::Display for ReplacementReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.has_replacements() {
            return write!(f, "No occurrences found");
        }
        write!(
            f,
            "Replaced {} occurrence{} across {} page{}",
            self.total,
            if self.total == 1 { "" } else { "s" },
            self.pages_modified(),
            if self.pages_modified() == 1 { "" } else { "s" },
        )
    }
}

impl Replacer {
    /// Applies this replacer to every page independently, in parallel.
    pub fn apply_pages(&self, pages: &PageText) -> (PageText, ReplacementReport) {
        let results: Vec<(u32, String, usize)> = pages
            .par_iter()
            .map(|(&page, text)| {
                let replaced = self.apply(text);
                (page, replaced.text, replaced.count)
            })
            .collect();

        let mut updated = PageText::new();
        let mut report = ReplacementReport::none();
        for (page, text, count) in results {
            report.merge_page(page, count);
            updated.insert(page, text);
        }
        (updated, report)
    }
}

/// Applies `rules` to each page and aggregates the counts.
///
/// Rules are validated once up front; an invalid rule rejects the whole call.
pub fn replace_pages(
    pages: &PageText,
    rules: &[ReplacementRule],
    options: MatchOptions,
) -> DocswapResult<(PageText, ReplacementReport)> {
    let replacer = Replacer::new(rules, options)?;
    Ok(replacer.apply_pages(pages))
}
