// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{health_probe, pipeline, search_service, seeded_engine};
use dishcovery_search::app::{create_router, AppState, SERVICE_NAME, VERSION};
use dishcovery_search::models::health::{HealthReport, HealthStatus};
use dishcovery_search::models::ingestion::{IngestionReport, IngestionState};
use dishcovery_search::models::search::SearchResult;
use dishcovery_search::models::version::VersionResponse;
use dishcovery_search::services::events::CollectingEventSink;
use dishcovery_search::services::memory_engine::InMemoryEngine;
use dishcovery_search::services::query::QueryConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn create_test_app(engine: Arc<InMemoryEngine>) -> Router {
    let events = Arc::new(CollectingEventSink::new());
    let state = AppState {
        search: Arc::new(search_service(
            Arc::clone(&engine),
            QueryConfig::default(),
            Arc::clone(&events),
        )),
        ingestion: Arc::new(pipeline(Arc::clone(&engine), 100, Arc::clone(&events))),
        health: Arc::new(health_probe(engine, events)),
    };
    create_router(state)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_version_endpoint_returns_semver() {
    let (status, body) = send(create_test_app(seeded_engine()), get("/version")).await;
    assert_eq!(status, StatusCode::OK);

    let version: VersionResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(version.service, SERVICE_NAME);
    assert_eq!(version.version, VERSION);

    let parts: Vec<&str> = version.version.split('.').collect();
    assert_eq!(parts.len(), 3);
    assert!(parts.iter().all(|part| part.parse::<u32>().is_ok()));
}

#[tokio::test]
async fn test_search_endpoint() {
    let payload = json!({
        "query": "pasta",
        "cuisines": ["Italian"],
        "max_prep_time": 30,
        "include_aggregations": true,
        "facets": ["cuisines"]
    });
    let (status, body) = send(
        create_test_app(seeded_engine()),
        post_json("/search", &payload),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let result: SearchResult = serde_json::from_slice(&body).unwrap();
    assert_eq!(result.total, 1);
    assert_eq!(result.recipes[0].title, "Spaghetti Pomodoro");
    assert_eq!(
        result.facets.unwrap().bucket_count("cuisines", "Italian"),
        Some(1)
    );
}

#[tokio::test]
async fn test_search_rejects_inverted_bounds() {
    let payload = json!({ "min_healthiness": 80, "max_healthiness": 20 });
    let (status, body) = send(
        create_test_app(seeded_engine()),
        post_json("/search", &payload),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8(body).unwrap().contains("healthiness"));
}

#[tokio::test]
async fn test_search_with_unreachable_engine_is_503() {
    let engine = seeded_engine();
    engine.set_available(false);
    let (status, _) = send(create_test_app(engine), post_json("/search", &json!({}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_facets_endpoint_lists_every_facet() {
    let (status, body) = send(create_test_app(seeded_engine()), get("/facets")).await;
    assert_eq!(status, StatusCode::OK);

    let facets: Value = serde_json::from_slice(&body).unwrap();
    let facets = facets.as_object().unwrap();
    assert_eq!(facets.len(), 8);
    assert_eq!(facets["healthiness_stats"]["type"], "stats");
    assert_eq!(facets["cuisines"]["type"], "buckets");
}

#[tokio::test]
async fn test_bulk_load_endpoint_indexes_documents() {
    let engine = Arc::new(InMemoryEngine::new());
    let payload = json!([
        { "recipe_title": "Tomato Soup", "est_prep_time_min": 5, "est_cook_time_min": 25 },
        { "recipe_title": "Bread", "is_vegan": "maybe" }
    ]);
    let (status, body) = send(
        create_test_app(Arc::clone(&engine)),
        post_json("/bulk-load", &payload),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let report: IngestionReport = serde_json::from_slice(&body).unwrap();
    assert_eq!(report.state, IngestionState::Completed);
    assert_eq!(report.total_indexed, 1);
    assert_eq!(report.total_failed, 1);
    assert_eq!(engine.document_count(common::INDEX), 1);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (status, body) = send(create_test_app(seeded_engine()), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let report: HealthReport = serde_json::from_slice(&body).unwrap();
    assert_eq!(report.status, HealthStatus::Healthy);

    let engine = seeded_engine();
    engine.set_available(false);
    let (status, body) = send(create_test_app(engine), get("/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let report: HealthReport = serde_json::from_slice(&body).unwrap();
    assert_eq!(report.status, HealthStatus::Unreachable);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let (status, body) = send(
        create_test_app(seeded_engine()),
        get("/api-docs/openapi.json"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let doc: Value = serde_json::from_slice(&body).unwrap();
    assert!(doc["paths"].get("/search").is_some());
}

#[tokio::test]
async fn test_invalid_route_returns_404() {
    let (status, _) = send(create_test_app(seeded_engine()), get("/invalid")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
