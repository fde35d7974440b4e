//! docswap CLI application.
//!
//! Replaces text in a document from the command line, dumps extracted text
//! for inspection, or runs the HTTP adapter.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use docswap::{MatchOptions, PdfMode, ReplacementRule, Settings};

/// Document find-and-replace tool
///
/// Replaces literal text in PDF, CSV, XML and text files.
/// By default, performs replacement. Use 'extract' to inspect text or
/// 'serve' to start the HTTP API.
#[derive(Parser)]
#[command(name = "docswap")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input file path
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output file path
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Replacement rule as FIND=REPLACE (can be specified multiple times)
    #[arg(short, long = "rule", value_name = "FIND=REPLACE")]
    rules: Vec<ReplacementRule>,

    /// Text to find (combined with --replace)
    #[arg(short, long, value_name = "TEXT")]
    find: Option<String>,

    /// Replacement for --find (defaults to empty, i.e. delete)
    #[arg(long, value_name = "TEXT", requires = "find")]
    replace: Option<String>,

    /// Match letter case exactly
    #[arg(short, long, overrides_with = "no_case_sensitive")]
    case_sensitive: bool,

    /// Ignore letter case (overrides the settings file)
    #[arg(long, overrides_with = "case_sensitive")]
    no_case_sensitive: bool,

    /// Only match whole words
    #[arg(short, long, overrides_with = "no_whole_word")]
    whole_word: bool,

    /// Match inside words too (overrides the settings file)
    #[arg(long, overrides_with = "whole_word")]
    no_whole_word: bool,

    /// PDF handling: in-place (keeps layout) or rebuild (re-typesets text)
    #[arg(short, long, value_name = "MODE")]
    mode: Option<PdfMode>,

    /// Settings file (defaults to ./docswap.toml when present)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text per page (for debugging and verification)
    Extract {
        /// Input file path
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Output text file (optional, defaults to stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Run the HTTP API
    Serve {
        /// Address to bind (overrides settings)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides settings)
        #[arg(long)]
        port: Option<u16>,
    },
}

/// Command handler holding the loaded settings.
struct ReplaceHandler {
    settings: Settings,
    verbose: bool,
}

impl ReplaceHandler {
    fn new(settings: Settings, verbose: bool) -> Self {
        Self { settings, verbose }
    }

    /// Executes a replacement operation.
    fn replace(
        &self,
        input: &Path,
        output: &Path,
        rules: Vec<ReplacementRule>,
        options: MatchOptions,
        mode: PdfMode,
    ) -> Result<()> {
        if !input.exists() {
            anyhow::bail!("Input file does not exist: {}", input.display());
        }

        if rules.is_empty() {
            anyhow::bail!("No replacement rules specified. Use --rule FIND=REPLACE or --find.");
        }

        if self.verbose {
            println!("Input:  {}", input.display());
            println!("Output: {}", output.display());
            for rule in &rules {
                println!("Rule:   {}", rule);
            }
            println!(
                "Options: case-sensitive={}, whole-word={}, mode={:?}",
                options.case_sensitive, options.whole_word, mode
            );
        }

        let service = self.settings.pdf.service(mode);
        let report = service
            .replace_file(input, output, &rules, options)
            .with_context(|| "Replacement failed")?;

        if self.verbose {
            println!("\nReplacement Summary:");
            println!("  Pages processed: {}", report.pages_processed);
            println!("  Pages modified:  {}", report.pages_modified());
            for (page, count) in &report.by_page {
                println!("    page {}: {}", page, count);
            }
        }

        if report.has_replacements() {
            println!("✓ {} → {}", report, output.display());
        } else {
            println!("⚠ {}", report);
        }

        Ok(())
    }

    /// Extracts text from a document.
    fn extract(&self, input: &Path, output: Option<&Path>) -> Result<()> {
        if !input.exists() {
            anyhow::bail!("Input file does not exist: {}", input.display());
        }

        let text = self
            .settings
            .pdf
            .service(self.settings.pdf.mode)
            .extract_text(input)
            .with_context(|| "Text extraction failed")?;

        if let Some(output_path) = output {
            std::fs::write(output_path, &text)
                .with_context(|| format!("Failed to write to {}", output_path.display()))?;
            println!(
                "✓ Extracted {} characters → {}",
                text.chars().count(),
                output_path.display()
            );
        } else {
            println!("{}", text);
        }

        Ok(())
    }

    /// Runs the HTTP adapter until interrupted.
    fn serve(mut self, host: Option<String>, port: Option<u16>) -> Result<()> {
        if let Some(host) = host {
            self.settings.server.host = host;
        }
        if let Some(port) = port {
            self.settings.server.port = port;
        }

        let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
        runtime
            .block_on(docswap::server::serve(self.settings))
            .context("Server failed")
    }
}

/// Merges --rule entries with the --find/--replace pair.
fn build_rules(
    rules: &[ReplacementRule],
    find: Option<&str>,
    replace: Option<&str>,
) -> Vec<ReplacementRule> {
    let mut all = rules.to_vec();
    if let Some(find) = find {
        all.push(ReplacementRule::new(find, replace.unwrap_or_default()));
    }
    all
}

/// Resolves a `--x` / `--no-x` pair; `None` leaves the setting alone.
fn flag(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let format = fmt::format().with_target(false).compact();

    // RUST_LOG wins; otherwise warnings only, or debug with --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "docswap=debug" } else { "docswap=warn" })
    });

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    match cli.command {
        Some(Commands::Extract { input, output }) => {
            let handler = ReplaceHandler::new(settings, cli.verbose);
            handler.extract(&input, output.as_deref())?;
        }
        Some(Commands::Serve { host, port }) => {
            let handler = ReplaceHandler::new(settings, cli.verbose);
            handler.serve(host, port)?;
        }
        None => {
            // Default: replacement mode
            let input = cli
                .input
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("--input is required"))?;
            let output = cli
                .output
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("--output is required"))?;

            let options = MatchOptions {
                case_sensitive: flag(cli.case_sensitive, cli.no_case_sensitive)
                    .unwrap_or(settings.matching.case_sensitive),
                whole_word: flag(cli.whole_word, cli.no_whole_word)
                    .unwrap_or(settings.matching.whole_word),
            };
            let mode = cli.mode.unwrap_or(settings.pdf.mode);
            let rules = build_rules(&cli.rules, cli.find.as_deref(), cli.replace.as_deref());

            let handler = ReplaceHandler::new(settings, cli.verbose);
            handler.replace(input, output, rules, options, mode)?;
        }
    }

    Ok(())
}
