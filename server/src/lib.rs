use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use booksearch_core::persist::{load_snapshot, IndexPaths};
use booksearch_core::popularity::{ClickStore, Popularity};
use booksearch_core::suggest::SuggestionSource;
use booksearch_core::{DocId, SearchError, SearchHit, Snapshot, SortKey};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

type ApiError = (StatusCode, String);
type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

fn api_error(err: SearchError) -> ApiError {
    let status = match &err {
        SearchError::InvalidQuery(_) | SearchError::InvalidPattern(_) => StatusCode::BAD_REQUEST,
        SearchError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }
    (status, err.to_string())
}

fn internal(err: impl std::fmt::Display) -> ApiError {
    tracing::error!(error = %err, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_size")]
    pub size: usize,
    #[serde(default)]
    pub sort_by: Option<String>,
}
fn default_size() -> usize { 10 }

#[derive(Deserialize)]
pub struct PatternParams {
    pub regex: String,
    #[serde(default = "default_size")]
    pub size: usize,
}

#[derive(Deserialize)]
pub struct SuggestParams {
    #[serde(default = "default_limit")]
    pub limit: usize,
}
fn default_limit() -> usize { 5 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub sort_by: SortKey,
    pub took_s: f64,
    pub total: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct PatternResponse {
    pub regex: String,
    pub took_s: f64,
    pub total: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct BookResponse {
    pub id: DocId,
    pub external_id: String,
    pub title: String,
    pub author: Option<String>,
    pub language: Option<String>,
    pub publication_year: Option<u16>,
    pub word_count: u32,
    pub centrality: f64,
    pub clicks: u64,
    pub text: String,
}

#[derive(Serialize)]
pub struct SuggestedBook {
    pub id: DocId,
    pub title: String,
    pub author: Option<String>,
    /// Jaccard similarity to the requested book; absent for popularity picks.
    pub similarity: Option<f64>,
    pub clicks: u64,
}

#[derive(Serialize)]
pub struct SuggestResponse {
    pub book_id: DocId,
    pub source: SuggestionSource,
    pub results: Vec<SuggestedBook>,
}

#[derive(Clone)]
pub struct AppState {
    pub index_dir: PathBuf,
    snapshot: Arc<RwLock<Arc<Snapshot>>>,
    pub clicks: ClickStore,
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn load(index_dir: impl Into<PathBuf>, clicks: ClickStore, admin_token: Option<String>) -> Result<Self> {
        let index_dir = index_dir.into();
        let snapshot = load_snapshot(&IndexPaths::new(&index_dir))?;
        Ok(Self { index_dir, snapshot: Arc::new(RwLock::new(Arc::new(snapshot))), clicks, admin_token })
    }

    /// Current snapshot; the lock is released before the caller uses it.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().clone()
    }

    fn replace(&self, next: Snapshot) {
        *self.snapshot.write() = Arc::new(next);
    }
}

/// Loads the index at `index_dir` and reads `ADMIN_TOKEN` from the environment.
pub fn build_app(index_dir: impl Into<PathBuf>, clicks: ClickStore) -> Result<Router> {
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    Ok(router(AppState::load(index_dir, clicks, admin_token)?))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/search/advanced", get(pattern_handler))
        .route("/books/:id", get(book_handler))
        .route("/suggestions/:id", get(suggest_handler))
        .route("/index/reload", post(reload_handler))
        .with_state(state)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

/// `CORS_ALLOW_ORIGIN` (comma-separated) restricts origins; any origin otherwise.
fn cors_layer() -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let origins: Vec<_> = std::env::var("CORS_ALLOW_ORIGIN")
        .map(|val| val.split(',').filter_map(|s| s.trim().parse().ok()).collect())
        .unwrap_or_default();
    if origins.is_empty() {
        base.allow_origin(Any)
    } else {
        base.allow_origin(AllowOrigin::list(origins))
    }
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> ApiResult<SearchResponse> {
    let start = Instant::now();
    let sort_by = match params.sort_by.as_deref() {
        Some(s) => s.parse::<SortKey>().map_err(api_error)?,
        None => SortKey::default(),
    };
    let res = state.snapshot().search(&params.q, params.size, sort_by).map_err(api_error)?;
    let took_s = start.elapsed().as_secs_f64();
    tracing::debug!(query = %params.q, total = res.total, took_s, "search");
    Ok(Json(SearchResponse { query: params.q, sort_by, took_s, total: res.total, results: res.results }))
}

pub async fn pattern_handler(State(state): State<AppState>, Query(params): Query<PatternParams>) -> ApiResult<PatternResponse> {
    let start = Instant::now();
    let res = state.snapshot().pattern_search(&params.regex, params.size).map_err(api_error)?;
    Ok(Json(PatternResponse { regex: params.regex, took_s: start.elapsed().as_secs_f64(), total: res.total, results: res.results }))
}

pub async fn book_handler(State(state): State<AppState>, Path(id): Path<DocId>) -> ApiResult<BookResponse> {
    let snapshot = state.snapshot();
    let meta = snapshot.document(id).map_err(api_error)?;
    let clicks = state.clicks.record_click(id).map_err(internal)?;
    Ok(Json(BookResponse {
        id,
        external_id: meta.external_id.clone(),
        title: meta.title.clone(),
        author: meta.author.clone(),
        language: meta.language.clone(),
        publication_year: meta.publication_year,
        word_count: meta.length,
        centrality: snapshot.centrality(id),
        clicks,
        text: meta.text.clone(),
    }))
}

pub async fn suggest_handler(
    State(state): State<AppState>,
    Path(id): Path<DocId>,
    Query(params): Query<SuggestParams>,
) -> ApiResult<SuggestResponse> {
    let snapshot = state.snapshot();
    let (source, suggestions) = snapshot.suggest(id, params.limit, &state.clicks).map_err(api_error)?;
    let mut results = Vec::with_capacity(suggestions.len());
    for s in suggestions {
        let meta = snapshot.document(s.doc_id).map_err(api_error)?;
        results.push(SuggestedBook {
            id: s.doc_id,
            title: meta.title.clone(),
            author: meta.author.clone(),
            similarity: (source == SuggestionSource::Similarity).then_some(s.score),
            clicks: state.clicks.clicks(s.doc_id),
        });
    }
    Ok(Json(SuggestResponse { book_id: id, source, results }))
}

/// Rebuilt artifacts are loaded off the async runtime and swapped in whole;
/// in-flight requests finish against the snapshot they started with.
async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<serde_json::Value> {
    authorize(&state, &headers)?;
    let paths = IndexPaths::new(&state.index_dir);
    let next = tokio::task::spawn_blocking(move || load_snapshot(&paths))
        .await
        .map_err(internal)?
        .map_err(|e| internal(format!("{e:#}")))?;
    let num_docs = next.index().docs().len();
    state.replace(next);
    tracing::info!(num_docs, "index reloaded");
    Ok(Json(serde_json::json!({ "status": "reloaded", "num_docs": num_docs })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> std::result::Result<(), ApiError> {
    let Some(required) = &state.admin_token else {
        return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into()));
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
