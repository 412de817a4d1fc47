//! HTTP API boundary
//!
//! A thin axum layer over the engine facade: it marshals requests into
//! the controller/search calls and maps typed errors onto status codes.
//! Misuse and validation failures become 400 responses carrying the
//! error message; anything unclassified becomes a generic 500.

use crate::indexer::IndexingController;
use crate::search::{SearchEngine, SearchItem};
use crate::stats::{self, StatisticsData};
use crate::storage::SqliteStorage;
use crate::LumenError;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Shared state of every API handler
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<IndexingController>,
    pub search: SearchEngine,
    pub storage: Arc<Mutex<SqliteStorage>>,
}

/// Plain result/error payload for the command endpoints
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    fn ok() -> Self {
        Self {
            result: true,
            error: None,
        }
    }

    fn error(message: String) -> Self {
        Self {
            result: false,
            error: Some(message),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub result: bool,
    pub statistics: StatisticsData,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<SearchItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    pub site: Option<String>,
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

#[derive(Debug, Deserialize)]
pub struct IndexPageParams {
    pub url: String,
}

/// Builds the API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/statistics", get(statistics))
        .route("/api/startIndexing", get(start_indexing))
        .route("/api/stopIndexing", get(stop_indexing))
        .route("/api/indexPage", post(index_page))
        .route("/api/search", get(search))
        .with_state(state)
}

/// Maps an engine error onto a status code and error payload
fn error_response(error: &LumenError) -> Response {
    if error.is_client_error() {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(error.to_string())),
        )
            .into_response()
    } else {
        tracing::error!("Internal error: {}", error);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error("Internal server error".to_string())),
        )
            .into_response()
    }
}

async fn statistics(State(state): State<AppState>) -> Response {
    match stats::get_statistics(&state.storage, state.controller.is_running()) {
        Ok(statistics) => Json(StatisticsResponse {
            result: true,
            statistics,
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn start_indexing(State(state): State<AppState>) -> Response {
    match state.controller.start() {
        Ok(()) => Json(ApiResponse::ok()).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn stop_indexing(State(state): State<AppState>) -> Response {
    match state.controller.stop() {
        Ok(()) => Json(ApiResponse::ok()).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn index_page(
    State(state): State<AppState>,
    Form(params): Form<IndexPageParams>,
) -> Response {
    match state.controller.index_page(&params.url).await {
        Ok(()) => Json(ApiResponse::ok()).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    let result = state.search.search(
        &params.query,
        params.site.as_deref(),
        params.offset,
        params.limit,
    );

    match result {
        Ok(page) => Json(SearchResponse {
            result: true,
            count: Some(page.count),
            data: Some(page.items),
            error: None,
        })
        .into_response(),
        Err(e) if e.is_client_error() => (
            StatusCode::BAD_REQUEST,
            Json(SearchResponse {
                result: false,
                count: None,
                data: None,
                error: Some(e.to_string()),
            }),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}
