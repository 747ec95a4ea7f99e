//! HTTP Surface
//!
//! Thin axum layer over the analyzer. Handlers only translate between HTTP
//! and the library: every decision is made by `Analyzer` or `BatchAnalyzer`.
//!
//! | Route | Handler |
//! |---|---|
//! | `POST /api/analyze` | multipart `sensor_data` + optional `image` |
//! | `POST /api/start-analysis` | start a batch run |
//! | `GET /api/analysis-status` | batch progress and results |
//! | `GET /api/analysis/:id` | one batch result |
//! | `GET /health` | configuration, usage and inference stats |

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Path, State,
        multipart::{Field, MultipartError},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::ai::{ImageAttachment, MetricsSummary, SharedMetrics, create_shared_metrics};
use crate::analysis::{
    Analyzer, BatchAnalyzer, BatchResult, BatchStarted, BatchStatus, UsageReport,
};
use crate::config::Config;
use crate::constants::image::DEFAULT_MIME;
use crate::constants::network::MAX_SENSOR_DATA_BYTES;
use crate::storage::{BatchResultStore, Database};
use crate::types::{AnalysisResult, MonitorError, Result, ValidationError, ValidationErrorKind};

/// Shared handler state
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
    pub batch: Arc<BatchAnalyzer>,
    pub metrics: SharedMetrics,
}

impl AppState {
    pub fn new(analyzer: Arc<Analyzer>, batch: Arc<BatchAnalyzer>, metrics: SharedMetrics) -> Self {
        Self {
            analyzer,
            batch,
            metrics,
        }
    }

    /// Open the database and wire the analyzers from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let db = Database::open_initialized(config.storage.database_path())?;
        let metrics = create_shared_metrics();
        let analyzer = Arc::new(Analyzer::from_config(config, db.clone(), metrics.clone()));
        let batch = Arc::new(BatchAnalyzer::with_cached_results(
            analyzer.clone(),
            config.batch.clone(),
            BatchResultStore::new(db),
        ));

        Ok(Self::new(analyzer, batch, metrics))
    }

    /// Health report for the probe endpoint and the `health` command
    pub fn health(&self) -> HealthReport {
        let usage = match self.analyzer.usage() {
            Ok(usage) => Some(usage),
            Err(e) => {
                warn!("Usage unavailable: {}", e);
                None
            }
        };

        HealthReport {
            status: "healthy",
            openai_configured: self.analyzer.is_configured(),
            openai_model: self.analyzer.model().map(str::to_string),
            version: env!("CARGO_PKG_VERSION"),
            usage,
            metrics: self.metrics.summary(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub openai_configured: bool,
    pub openai_model: Option<String>,
    pub version: &'static str,
    pub usage: Option<UsageReport>,
    pub metrics: MetricsSummary,
}

// =============================================================================
// Errors
// =============================================================================

/// `MonitorError` rendered as `{"detail": ...}` with a caller-facing status
#[derive(Debug)]
pub struct ApiError(MonitorError);

impl From<MonitorError> for ApiError {
    fn from(err: MonitorError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            MonitorError::Validation(_) | MonitorError::Json(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            MonitorError::Config(_) => StatusCode::BAD_REQUEST,
            MonitorError::BatchInProgress => StatusCode::CONFLICT,
            MonitorError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = if self.0.is_caller_error() {
            self.0.to_string()
        } else {
            error!("Request failed: {}", self.0);
            "Internal server error".to_string()
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

// =============================================================================
// Router
// =============================================================================

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Form fields are capped while streaming, so oversized images still
        // reach the validator
        .route("/api/analyze", post(analyze).layer(DefaultBodyLimit::disable()))
        .route("/api/start-analysis", post(start_analysis))
        .route("/api/analysis-status", get(analysis_status))
        .route("/api/analysis/:id", get(analysis_by_id))
        .route("/health", get(health))
        .with_state(state)
}

/// Serve until ctrl-c
pub async fn serve(state: Arc<AppState>, bind: &str) -> Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!("Listening on {}", listener.local_addr()?);
    let metrics = state.metrics.clone();

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped\n{}", metrics.summary().display());
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn analyze(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<AnalysisResult> {
    let image_cap = state.analyzer.image_validator().max_bytes();
    let (sensor_data, image) = read_analyze_form(multipart, image_cap).await?;
    let result = state.analyzer.analyze_payload(&sensor_data, image).await?;
    Ok(Json(result))
}

async fn start_analysis(State(state): State<Arc<AppState>>) -> ApiResult<BatchStarted> {
    Ok(Json(state.batch.start().await?))
}

async fn analysis_status(State(state): State<Arc<AppState>>) -> Json<BatchStatus> {
    Json(state.batch.status())
}

async fn analysis_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<BatchResult> {
    Ok(Json(state.batch.result_by_id(&id)?))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    Json(state.health())
}

/// `sensor_data` text field plus an optional `image` file. An empty file
/// part counts as no image. At most `image_cap + 1` image bytes are kept,
/// enough for the validator to report an oversized upload.
async fn read_analyze_form(
    mut multipart: Multipart,
    image_cap: usize,
) -> Result<(String, Option<ImageAttachment>)> {
    let mut sensor_data = None;
    let mut image = None;

    while let Some(mut field) = multipart.next_field().await.map_err(form_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("sensor_data") => {
                let bytes = read_capped(&mut field, MAX_SENSOR_DATA_BYTES + 1).await?;
                if bytes.len() > MAX_SENSOR_DATA_BYTES {
                    return Err(ValidationError::new(
                        ValidationErrorKind::Range,
                        format!("sensor_data exceeds {} bytes", MAX_SENSOR_DATA_BYTES),
                    )
                    .with_field("sensor_data")
                    .into());
                }
                let text = String::from_utf8(bytes).map_err(|_| {
                    ValidationError::new(ValidationErrorKind::Format, "sensor_data must be UTF-8")
                        .with_field("sensor_data")
                })?;
                sensor_data = Some(text);
            }
            Some("image") => {
                let mime = field
                    .content_type()
                    .filter(|ct| ct.starts_with("image/"))
                    .unwrap_or(DEFAULT_MIME)
                    .to_string();
                let bytes = read_capped(&mut field, image_cap.saturating_add(1)).await?;
                if !bytes.is_empty() {
                    image = Some(ImageAttachment { bytes, mime });
                }
            }
            _ => {}
        }
    }

    let sensor_data = sensor_data.ok_or_else(|| {
        ValidationError::new(ValidationErrorKind::MissingField, "sensor_data is required")
            .with_field("sensor_data")
    })?;
    Ok((sensor_data, image))
}

/// Keep the first `cap` bytes of a field and discard the rest
async fn read_capped(field: &mut Field<'_>, cap: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(form_error)? {
        let room = cap.saturating_sub(buf.len());
        buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }
    Ok(buf)
}

fn form_error(err: MultipartError) -> MonitorError {
    ValidationError::new(
        ValidationErrorKind::Schema,
        format!("Invalid multipart body: {}", err),
    )
    .into()
}
