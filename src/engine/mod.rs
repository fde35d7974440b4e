//! Text replacement engine.
//!
//! The engine applies an ordered batch of literal find/replace rules to a
//! body of text and reports how many substitutions were made. It performs no
//! I/O; document formats are handled by [`crate::document`] around it.
//!
//! Rules are applied one at a time, longest `find` first. Each rule scans the
//! text produced by the rules before it, left to right, consuming every match
//! it replaces, so replacement text is never rescanned by the same rule.

pub mod pages;

pub use pages::{replace_pages, PageText, ReplacementReport};

use std::fmt;
use std::str::FromStr;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DocswapError, DocswapResult};

/// A literal find/replace pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementRule {
    pub find: String,
    pub replace: String,
}

impl ReplacementRule {
    pub fn new(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            find: find.into(),
            replace: replace.into(),
        }
    }
}

impl FromStr for ReplacementRule {
    type Err = DocswapError;

    /// Parses `FIND=REPLACE`, splitting on the first `=`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (find, replace) = s.split_once('=').ok_or_else(|| DocswapError::InvalidRule {
            index: 0,
            reason: format!("expected FIND=REPLACE, got '{}'", s),
        })?;
        Ok(Self::new(find, replace))
    }
}

impl fmt::Display for ReplacementRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' -> '{}'", self.find, self.replace)
    }
}

/// Matching flags shared by every rule in a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    pub case_sensitive: bool,
    pub whole_word: bool,
}

impl MatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn case_sensitive(mut self, value: bool) -> Self {
        self.case_sensitive = value;
        self
    }

    pub fn whole_word(mut self, value: bool) -> Self {
        self.whole_word = value;
        self
    }
}

/// Output of a single [`Replacer::apply`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub text: String,
    pub count: usize,
}

#[derive(Debug, Clone)]
struct CompiledRule {
    pattern: Regex,
    replace: String,
}

/// A validated, compiled rule batch.
///
/// Build once with [`Replacer::new`] and reuse it for every page or request;
/// it is `Send + Sync` and applying it never mutates it.
#[derive(Debug, Clone)]
pub struct Replacer {
    rules: Vec<CompiledRule>,
    options: MatchOptions,
}

impl Replacer {
    /// Validates and compiles `rules`.
    ///
    /// Fails with [`DocswapError::InvalidRule`] if any rule has an empty
    /// `find`; nothing is compiled in that case.
    pub fn new(rules: &[ReplacementRule], options: MatchOptions) -> DocswapResult<Self> {
        if let Some(index) = rules.iter().position(|rule| rule.find.is_empty()) {
            return Err(DocswapError::InvalidRule {
                index,
                reason: "find text is empty".to_string(),
            });
        }

        let mut ordered: Vec<(usize, &ReplacementRule)> = rules.iter().enumerate().collect();
        // stable: equal lengths keep caller order
        ordered.sort_by(|(_, a), (_, b)| b.find.chars().count().cmp(&a.find.chars().count()));

        let compiled = ordered
            .into_iter()
            .map(|(index, rule)| {
                let pattern = RegexBuilder::new(&regex::escape(&rule.find))
                    .case_insensitive(!options.case_sensitive)
                    .build()
                    .map_err(|e| DocswapError::InvalidRule {
                        index,
                        reason: e.to_string(),
                    })?;
                Ok(CompiledRule {
                    pattern,
                    replace: rule.replace.clone(),
                })
            })
            .collect::<DocswapResult<Vec<_>>>()?;

        Ok(Self {
            rules: compiled,
            options,
        })
    }

    pub fn options(&self) -> MatchOptions {
        self.options
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Applies every rule in order and returns the new text with the total
    /// number of substitutions.
    pub fn apply(&self, text: &str) -> Replacement {
        let mut current = text.to_string();
        let mut total = 0;

        for rule in &self.rules {
            let (next, count) = self.apply_rule(rule, &current);
            debug!(pattern = %rule.pattern, count, "rule applied");
            if count > 0 {
                current = next;
                total += count;
            }
        }

        Replacement {
            text: current,
            count: total,
        }
    }

    fn apply_rule(&self, rule: &CompiledRule, text: &str) -> (String, usize) {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        let mut pos = 0;
        let mut count = 0;

        while pos <= text.len() {
            let Some(m) = rule.pattern.find_at(text, pos) else {
                break;
            };

            if self.options.whole_word && !is_word_bounded(text, m.start(), m.end()) {
                // retry one character further; a later overlapping candidate may qualify
                pos = m.start() + text[m.start()..].chars().next().map_or(1, char::len_utf8);
                continue;
            }

            out.push_str(&text[last..m.start()]);
            out.push_str(&rule.replace);
            last = m.end();
            pos = m.end();
            count += 1;
        }

        if count == 0 {
            return (String::new(), 0);
        }
        out.push_str(&text[last..]);
        (out, count)
    }
}

/// Replaces every occurrence of each rule's `find` in `text`.
///
/// Returns the updated text and the number of substitutions. An empty rule
/// list or empty text yields the input unchanged with a count of zero.
pub fn replace(
    text: &str,
    rules: &[ReplacementRule],
    options: MatchOptions,
) -> DocswapResult<(String, usize)> {
    let replacer = Replacer::new(rules, options)?;
    let Replacement { text, count } = replacer.apply(text);
    Ok((text, count))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_word_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}
