// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Application state, route handlers, and router construction.
//!
//! This module is `pub` so that integration tests can build a test router directly
//! without starting the full binary.

use crate::error::SearchError;
use crate::models::facets::{FacetBucket, FacetStats, FacetSummary, FacetValue};
use crate::models::health::{HealthReport, HealthStatus};
use crate::models::ingestion::{IngestionReport, IngestionState};
use crate::models::search::{
    DietaryFlag, DietaryProfile, Difficulty, FalseFlagPolicy, RecipeSummary, SearchRequest,
    SearchResult, RESULT_SCHEMA_VERSION,
};
use crate::models::version::VersionResponse;
use crate::services::health::HealthProbe;
use crate::services::ingestion::BulkIngestionPipeline;
use crate::services::search::SearchService;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application version extracted from `Cargo.toml` at compile time.
/// The patch segment can be overridden via `DISHCOVERY_PATCH_VERSION` (see `build.rs`).
pub const VERSION: &str = env!("DISHCOVERY_VERSION");

pub const SERVICE_NAME: &str = "dishcovery-search";

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Shared application state injected into every route handler via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub search: Arc<SearchService>,
    pub ingestion: Arc<BulkIngestionPipeline>,
    pub health: Arc<HealthProbe>,
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Status code and message for a failed call. Engine internals never reach the body.
pub fn error_response(error: SearchError) -> (StatusCode, String) {
    let status = match &error {
        SearchError::Validation(_) => StatusCode::BAD_REQUEST,
        SearchError::Compilation(_) | SearchError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        SearchError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        SearchError::EngineUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        SearchError::EngineRejected { .. } => StatusCode::BAD_GATEWAY,
    };
    (status, error.to_string())
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/version",
    responses((status = OK, body = VersionResponse)),
    tag = "service"
)]
pub async fn version_handler() -> Json<VersionResponse> {
    Json(VersionResponse {
        service: SERVICE_NAME.to_string(),
        version: VERSION.to_string(),
        result_schema_version: RESULT_SCHEMA_VERSION,
    })
}

#[utoipa::path(
    post,
    path = "/search",
    request_body = SearchRequest,
    responses(
        (status = OK, body = SearchResult),
        (status = BAD_REQUEST, description = "Malformed request"),
        (status = GATEWAY_TIMEOUT, description = "Search engine did not answer in time"),
        (status = SERVICE_UNAVAILABLE, description = "Search engine unreachable"),
    ),
    tag = "search"
)]
pub async fn search_handler(
    State(state): State<AppState>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResult>, (StatusCode, String)> {
    state
        .search
        .search(&payload)
        .await
        .map(Json)
        .map_err(error_response)
}

#[utoipa::path(
    get,
    path = "/facets",
    responses((status = OK, body = FacetSummary)),
    tag = "search"
)]
pub async fn facets_handler(
    State(state): State<AppState>,
) -> Result<Json<FacetSummary>, (StatusCode, String)> {
    let overview = state
        .search
        .facet_overview()
        .await
        .map_err(error_response)?;
    Ok(Json(overview.facets.unwrap_or_default()))
}

/// Takes a JSON array of recipes. Aborted runs are still answered with their report;
/// `state` tells them apart.
#[utoipa::path(
    post,
    path = "/bulk-load",
    responses((status = OK, body = IngestionReport)),
    tag = "ingestion"
)]
pub async fn bulk_load_handler(
    State(state): State<AppState>,
    Json(documents): Json<Vec<Value>>,
) -> Json<IngestionReport> {
    Json(state.ingestion.run_iter(documents).await)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = OK, body = HealthReport),
        (status = SERVICE_UNAVAILABLE, body = HealthReport),
    ),
    tag = "service"
)]
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.health.check().await;
    let status = match report.status {
        HealthStatus::Unreachable => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
    };
    (status, Json(report))
}

// ---------------------------------------------------------------------------
// OpenAPI
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        version_handler,
        search_handler,
        facets_handler,
        bulk_load_handler,
        health_handler
    ),
    components(schemas(
        VersionResponse,
        SearchRequest,
        SearchResult,
        RecipeSummary,
        DietaryProfile,
        DietaryFlag,
        Difficulty,
        FalseFlagPolicy,
        FacetSummary,
        FacetValue,
        FacetBucket,
        FacetStats,
        IngestionReport,
        IngestionState,
        HealthReport,
        HealthStatus
    )),
    tags(
        (name = "search", description = "Recipe search and facets"),
        (name = "ingestion", description = "Bulk loading"),
        (name = "service", description = "Version and health")
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the Axum application router with Swagger UI at `/swagger-ui`.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/version", get(version_handler))
        .route("/search", post(search_handler))
        .route("/facets", get(facets_handler))
        .route("/bulk-load", post(bulk_load_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Operation;
    use std::time::Duration;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (SearchError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (
                SearchError::Compilation("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                SearchError::Timeout {
                    operation: Operation::Search,
                    deadline: Duration::from_secs(1),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                SearchError::EngineUnavailable {
                    operation: Operation::Search,
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                SearchError::EngineRejected {
                    operation: Operation::Search,
                    status: 400,
                },
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error_response(error).0, expected);
        }
    }

    #[test]
    fn test_openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in ["/version", "/search", "/facets", "/bulk-load", "/health"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
