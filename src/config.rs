//! Runtime settings.
//!
//! Settings are layered: built-in defaults, then an optional `docswap.toml`
//! (or an explicit file), then `DOCSWAP__`-prefixed environment variables,
//! e.g. `DOCSWAP__SERVER__PORT=9000`. Command-line flags override all three.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ::config::{Config, Environment, File};
use serde::Deserialize;

use crate::document::{PdfMode, RebuildPdfStrategy, ReplacementService};
use crate::engine::MatchOptions;
use crate::error::DocswapResult;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,

    /// Defaults for requests that leave matching flags unset
    #[serde(default)]
    pub matching: MatchOptions,

    #[serde(default)]
    pub pdf: PdfSettings,
}

/// HTTP adapter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Requests still running after this long are abandoned with 408
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ServerSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// PDF handling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PdfSettings {
    #[serde(default)]
    pub mode: PdfMode,

    /// TrueType font used by the rebuild strategy
    #[serde(default)]
    pub font_path: Option<PathBuf>,

    #[serde(default = "default_font_size")]
    pub font_size: f32,
}

impl Default for PdfSettings {
    fn default() -> Self {
        Self {
            mode: PdfMode::default(),
            font_path: None,
            font_size: default_font_size(),
        }
    }
}

impl PdfSettings {
    /// Builds a service for `mode` using these font settings.
    pub fn service(&self, mode: PdfMode) -> ReplacementService {
        match mode {
            PdfMode::InPlace => ReplacementService::new(PdfMode::InPlace),
            PdfMode::Rebuild => {
                let mut strategy = RebuildPdfStrategy::new().with_font_size(self.font_size);
                if let Some(path) = &self.font_path {
                    strategy = strategy.with_font_path(path);
                }
                ReplacementService::with_pdf_strategy(Box::new(strategy))
            }
        }
    }
}

impl Settings {
    /// Loads settings from `docswap.toml` in the working directory (if
    /// present) or from `path` (which must exist), then the environment.
    pub fn load(path: Option<&Path>) -> DocswapResult<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("docswap").required(false),
        };

        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("DOCSWAP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}

// ==================== Default Value Functions ====================

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_font_size() -> f32 {
    11.0
}
