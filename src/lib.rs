//! Find-and-replace for documents.
//!
//! docswap replaces literal text in PDF, CSV, XML and plain-text documents.
//! Matching can be case-insensitive and restricted to whole words, and any
//! number of find/replace rules can be applied in one pass.
//!
//! # Architecture
//!
//! - [`engine`]: the pure replacement engine (rules, options, per-page reports)
//! - [`document`]: per-format strategies and the file-level service
//! - [`config`]: layered settings for the CLI and HTTP adapter
//! - [`server`]: HTTP adapter over the same engine
//! - [`error`]: error types
//!
//! # Quick Start
//!
//! ```
//! use docswap::{replace, MatchOptions, ReplacementRule};
//!
//! let rules = [ReplacementRule::new("happy", "glad")];
//! let options = MatchOptions::new().whole_word(true);
//! let (text, count) = replace("unhappy and happy", &rules, options).unwrap();
//! assert_eq!(text, "unhappy and glad");
//! assert_eq!(count, 1);
//! ```
//!
//! # Replacing in a file
//!
//! ```no_run
//! use docswap::{MatchOptions, PdfMode, ReplacementRule, ReplacementService};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = ReplacementService::new(PdfMode::InPlace);
//! let report = service.replace_file(
//!     Path::new("contract.pdf"),
//!     Path::new("contract-updated.pdf"),
//!     &[ReplacementRule::new("ACME Corp", "Globex Ltd")],
//!     MatchOptions::new().case_sensitive(true),
//! )?;
//! println!("{}", report);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod server;

pub use config::Settings;
pub use document::{
    DocumentFormat, DocumentOutcome, PdfMode, ReplaceStrategy, ReplacementService,
};
pub use engine::{
    replace, replace_pages, MatchOptions, PageText, Replacement, ReplacementReport,
    ReplacementRule, Replacer,
};
pub use error::{DocswapError, DocswapResult};
