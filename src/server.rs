//! HTTP adapter.
//!
//! Exposes the same engine and strategies as the CLI over HTTP:
//! - `GET /health`
//! - `POST /api/replace` (multipart upload, returns the modified file)
//! - `POST /api/replace/text` (JSON pages in, JSON pages and report out)
//!
//! Replacement is CPU-bound, so each request runs it on the blocking pool.
//! A request still running after the configured timeout gets a 408 and its
//! result is dropped when it completes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Settings;
use crate::document::{DocumentFormat, PdfMode};
use crate::engine::{MatchOptions, PageText, ReplacementReport, ReplacementRule, Replacer};
use crate::error::DocswapError;

const REPLACEMENT_COUNT_HEADER: HeaderName = HeaderName::from_static("x-replacement-count");
const PAGES_MODIFIED_HEADER: HeaderName = HeaderName::from_static("x-pages-modified");

/// Application state
pub struct AppState {
    pub settings: Settings,
    pub start_time: Instant,
}

/// API error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    pub code: String,
}

/// Errors surfaced by the HTTP handlers.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request that never reached the engine
    BadRequest(String),
    /// Error from the library
    Docswap(DocswapError),
    /// The blocking task panicked or was cancelled
    Internal(String),
}

impl From<DocswapError> for ApiError {
    fn from(err: DocswapError) -> Self {
        Self::Docswap(err)
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Docswap(err) => match err {
                DocswapError::InvalidRule { .. } | DocswapError::InvalidInput { .. } => {
                    StatusCode::BAD_REQUEST
                }
                DocswapError::UnsupportedFormat { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                DocswapError::Document { .. }
                | DocswapError::TextExtraction { .. }
                | DocswapError::RenderingUnsupported { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                DocswapError::Io { .. } | DocswapError::Config { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "invalid_request",
            Self::Docswap(err) => match err {
                DocswapError::InvalidRule { .. } => "invalid_rule",
                DocswapError::InvalidInput { .. } => "invalid_input",
                DocswapError::UnsupportedFormat { .. } => "unsupported_format",
                DocswapError::Document { .. } => "document_error",
                DocswapError::TextExtraction { .. } => "text_extraction_error",
                DocswapError::RenderingUnsupported { .. } => "rendering_unsupported",
                DocswapError::Io { .. } => "io_error",
                DocswapError::Config { .. } => "config_error",
            },
            Self::Internal(_) => "internal_error",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::BadRequest(message) | Self::Internal(message) => message.clone(),
            Self::Docswap(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            warn!(error = %self.message(), "request failed");
        }
        let body = ErrorResponse {
            message: self.message(),
            code: self.error_code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the API router
pub fn router(settings: Settings) -> Router {
    let max_upload = settings.server.max_upload_bytes;
    let timeout = settings.server.request_timeout();

    let state = Arc::new(AppState {
        settings,
        start_time: Instant::now(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([REPLACEMENT_COUNT_HEADER, PAGES_MODIFIED_HEADER]);

    let api_routes = Router::new()
        .route(
            "/replace",
            post(replace_upload_handler).layer(DefaultBodyLimit::max(max_upload)),
        )
        .route("/replace/text", post(replace_text_handler));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api_routes)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds to the configured address and serves until Ctrl-C.
pub async fn serve(settings: Settings) -> std::io::Result<()> {
    let addr = settings.server.address();
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, router(settings))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await
}

// === Health ===

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

// === File replacement ===

#[derive(Default)]
struct UploadForm {
    file: Option<(Vec<u8>, String)>,
    find: Option<String>,
    replace: Option<String>,
    rules: Vec<ReplacementRule>,
    case_sensitive: Option<bool>,
    whole_word: Option<bool>,
    mode: Option<PdfMode>,
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ApiError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" | "" => Ok(false),
        other => Err(ApiError::BadRequest(format!(
            "field '{}' must be a boolean, got '{}'",
            name, other
        ))),
    }
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();
    let bad = |e: axum::extract::multipart::MultipartError| ApiError::BadRequest(e.to_string());

    while let Some(field) = multipart.next_field().await.map_err(bad)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("document").to_string();
                let data = field.bytes().await.map_err(bad)?;
                form.file = Some((data.to_vec(), filename));
            }
            "findWord" => form.find = Some(field.text().await.map_err(bad)?),
            "replaceWord" => form.replace = Some(field.text().await.map_err(bad)?),
            "rules" => {
                let raw = field.text().await.map_err(bad)?;
                form.rules = serde_json::from_str(&raw)
                    .map_err(|e| ApiError::BadRequest(format!("invalid rules JSON: {}", e)))?;
            }
            "caseSensitive" => {
                form.case_sensitive = Some(parse_flag(&name, &field.text().await.map_err(bad)?)?)
            }
            "wholeWord" => {
                form.whole_word = Some(parse_flag(&name, &field.text().await.map_err(bad)?)?)
            }
            "mode" => form.mode = Some(field.text().await.map_err(bad)?.parse()?),
            _ => {}
        }
    }
    Ok(form)
}

fn detect_format(filename: &str, data: &[u8]) -> Result<DocumentFormat, ApiError> {
    let by_name = std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(DocumentFormat::from_extension);
    by_name
        .or_else(|| DocumentFormat::sniff(data))
        .ok_or_else(|| {
            ApiError::Docswap(DocswapError::UnsupportedFormat {
                format: filename.to_string(),
            })
        })
}

/// Replace text in an uploaded document
async fn replace_upload_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = read_form(multipart).await?;

    let (data, filename) = form
        .file
        .ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;
    let format = detect_format(&filename, &data)?;

    let mut rules = form.rules;
    match (form.find, form.replace) {
        (Some(find), replace) => rules.push(ReplacementRule::new(find, replace.unwrap_or_default())),
        (None, Some(_)) => {
            return Err(ApiError::BadRequest(
                "replaceWord given without findWord".to_string(),
            ))
        }
        (None, None) => {}
    }

    let defaults = state.settings.matching;
    let options = MatchOptions {
        case_sensitive: form.case_sensitive.unwrap_or(defaults.case_sensitive),
        whole_word: form.whole_word.unwrap_or(defaults.whole_word),
    };
    let mode = form.mode.unwrap_or(state.settings.pdf.mode);
    let pdf_settings = state.settings.pdf.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        pdf_settings
            .service(mode)
            .replace_bytes(format, &data, &rules, options)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("replacement task failed: {}", e)))??;

    info!(
        file = %filename,
        total = outcome.report.total,
        "upload processed"
    );

    let disposition = format!(
        "attachment; filename=\"modified_{}\"",
        filename.replace(['"', '\\', '\r', '\n'], "_")
    );
    let headers = [
        (header::CONTENT_TYPE, format.mime_type().to_string()),
        (header::CONTENT_DISPOSITION, disposition),
        (REPLACEMENT_COUNT_HEADER, outcome.report.total.to_string()),
        (
            PAGES_MODIFIED_HEADER,
            outcome.report.pages_modified().to_string(),
        ),
    ];
    Ok((headers, outcome.bytes).into_response())
}

// === Text replacement ===

/// Request for replacing in already-extracted text
#[derive(Debug, Deserialize, Serialize)]
pub struct TextReplaceRequest {
    pub pages: BTreeMap<u32, String>,
    pub rules: Vec<ReplacementRule>,
    #[serde(default)]
    pub options: Option<MatchOptions>,
}

/// Response for text replacement
#[derive(Debug, Deserialize, Serialize)]
pub struct TextReplaceResponse {
    pub pages: PageText,
    pub report: ReplacementReport,
    pub summary: String,
}

async fn replace_text_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TextReplaceRequest>,
) -> Result<Json<TextReplaceResponse>, ApiError> {
    if request.rules.is_empty() {
        return Err(DocswapError::InvalidInput {
            parameter: "rules".to_string(),
            reason: "No replacement rules specified".to_string(),
        }
        .into());
    }
    let options = request.options.unwrap_or(state.settings.matching);
    let replacer = Replacer::new(&request.rules, options)?;
    let pages = request.pages;

    let (pages, report) = tokio::task::spawn_blocking(move || replacer.apply_pages(&pages))
        .await
        .map_err(|e| ApiError::Internal(format!("replacement task failed: {}", e)))?;

    Ok(Json(TextReplaceResponse {
        summary: report.to_string(),
        pages,
        report,
    }))
}
