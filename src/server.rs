//! HTTP server.
//!
//! Serves the search page and a small JSON API over the [`Engine`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Search page |
//! | `POST` | `/search` | `{query, granularity, k?, start_date?, end_date?}` → `{results: [...]}` |
//! | `POST` | `/reload` | Reload the corpus and publish a new generation |
//! | `GET`  | `/health` | Status, version, and current generation summary |
//!
//! # Error Contract
//!
//! Every error response carries a JSON body:
//!
//! ```json
//! { "error": "invalid query: query must not be empty" }
//! ```
//!
//! | Failure | Status |
//! |---------|--------|
//! | Empty query, unknown granularity, start date after end date, malformed JSON | 400 |
//! | Request exceeded `server.request_timeout_secs` | 408 |
//! | No generation published yet | 503 |
//! | Corpus, embedding, or other backend failure | 500 |
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the page can be
//! served from elsewhere during development.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use journal_search_core::generation::GenerationSummary;
use journal_search_core::{SearchError, SearchResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::reload::{Engine, ReloadOptions, ReloadReport};

const SEARCH_PAGE: &str = include_str!("../assets/search.html");

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<Engine>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.engine.config().server.request_timeout_secs)
    }
}

/// Build the router. Separate from [`run_server`] so tests can drive it
/// without binding a socket.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_index))
        .route("/search", post(handle_search))
        .route("/reload", post(handle_reload))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server.
///
/// Loads the corpus first. A failed initial load is logged and the server
/// starts anyway, answering searches with 503 until `POST /reload`
/// succeeds.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let engine = Arc::new(Engine::new(config.clone())?);

    if let Err(e) = engine.reload(ReloadOptions::default()).await {
        tracing::error!("initial corpus load failed: {:#}", e);
    }

    let app = router(AppState::new(engine));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on http://{}", bind_addr);
    println!("Journal search listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, "{}", self.message);
        }
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

/// HTTP status for each error kind.
fn status_for(err: &SearchError) -> StatusCode {
    match err {
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        SearchError::IndexUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        AppError::new(status_for(&err), err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        let status = err
            .downcast_ref::<SearchError>()
            .map(status_for)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        AppError::new(status, format!("{:#}", err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(AppError::new(
            StatusCode::REQUEST_TIMEOUT,
            format!("request timed out after {}s", limit.as_secs()),
        )),
    }
}

// ============ GET / ============

async fn handle_index() -> Html<&'static str> {
    Html(SEARCH_PAGE)
}

// ============ POST /search ============

/// JSON request body for `POST /search`.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    /// `paragraphs`, `sentences`, or `journals` (singular forms accepted).
    #[serde(default = "default_granularity")]
    pub granularity: String,
    /// Result count; defaults to `retrieval.default_k`, clamped to `retrieval.max_k`.
    #[serde(default)]
    pub k: Option<usize>,
    /// Earliest entry date to return (`YYYY-MM-DD`, inclusive).
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Latest entry date to return (`YYYY-MM-DD`, inclusive).
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

fn default_granularity() -> String {
    "paragraphs".to_string()
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}

async fn handle_search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    let Json(req) = payload?;

    let service = Arc::clone(state.engine.service());
    let results = with_timeout(state.request_timeout(), async move {
        service
            .search_between(
                &req.query,
                &req.granularity,
                req.k,
                req.start_date,
                req.end_date,
            )
            .await
            .map_err(AppError::from)
    })
    .await?;

    Ok(Json(SearchResponse { results }))
}

// ============ POST /reload ============

async fn handle_reload(State(state): State<AppState>) -> Result<Json<ReloadReport>, AppError> {
    let report = state
        .engine
        .reload(ReloadOptions::default())
        .await
        .map_err(AppError::from)?;
    Ok(Json(report))
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    /// `None` until the first generation is published.
    generation: Option<GenerationSummary>,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let generation = state.engine.service().current().map(|g| g.summary());
    Json(HealthResponse {
        status: if generation.is_some() { "ok" } else { "loading" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        generation,
    })
}
