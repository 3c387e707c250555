// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

#![allow(dead_code)]

use dishcovery_search::models::ingestion::BulkDocument;
use dishcovery_search::services::bridge::{BridgeConfig, ExecutionBridge};
use dishcovery_search::services::engine::SearchEngine;
use dishcovery_search::services::events::{CollectingEventSink, EventSink};
use dishcovery_search::services::health::HealthProbe;
use dishcovery_search::services::ingestion::{
    document_id, BulkIngestionPipeline, IngestionConfig,
};
use dishcovery_search::services::memory_engine::InMemoryEngine;
use dishcovery_search::services::query::QueryConfig;
use dishcovery_search::services::search::SearchService;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const INDEX: &str = "recipes";

/// Five recipes: three vegan, two Italian, one stored with a stale `total_time_min`
pub fn corpus() -> Vec<Value> {
    vec![
        json!({
            "recipe_title": "Spaghetti Pomodoro",
            "description": "Classic pasta with tomato sauce",
            "cuisine_list": ["Italian"],
            "difficulty": "easy",
            "est_prep_time_min": 10,
            "est_cook_time_min": 20,
            "healthiness_score": 70,
            "is_vegan": true,
            "is_vegetarian": true,
            "is_gluten_free": false,
            "is_dairy_free": true,
            "is_nut_free": true,
            "ingredients_raw": ["spaghetti", "tomato", "basil"],
            "directions_raw": ["Boil spaghetti", "Simmer tomato", "Combine"]
        }),
        json!({
            "recipe_title": "Lasagna Bolognese",
            "description": "Layered pasta with beef ragu",
            "cuisine_list": ["Italian"],
            "difficulty": "hard",
            "est_prep_time_min": 45,
            "est_cook_time_min": 90,
            "healthiness_score": 40,
            "is_vegan": false,
            "is_vegetarian": false,
            "is_gluten_free": false,
            "is_dairy_free": false,
            "is_nut_free": true,
            "ingredients_raw": ["lasagna sheets", "beef", "bechamel"]
        }),
        json!({
            "recipe_title": "Pad Thai",
            "description": "Stir-fried rice noodles with egg",
            "cuisine_list": ["Thai"],
            "difficulty": "medium",
            "est_prep_time_min": 20,
            "est_cook_time_min": 15,
            "healthiness_score": 60,
            "is_vegan": false,
            "is_vegetarian": false,
            "is_gluten_free": true,
            "is_dairy_free": true,
            "is_nut_free": false,
            "ingredients_raw": ["rice noodles", "egg", "peanuts"]
        }),
        json!({
            "recipe_title": "Chana Masala",
            "description": "Chickpeas in spiced gravy",
            "cuisine_list": ["Indian"],
            "difficulty": "easy",
            "est_prep_time_min": 15,
            "est_cook_time_min": 40,
            "healthiness_score": 85,
            "is_vegan": true,
            "is_vegetarian": true,
            "is_gluten_free": true,
            "is_dairy_free": true,
            "is_nut_free": true,
            "ingredients_raw": ["chickpeas", "onion", "garam masala"]
        }),
        json!({
            "recipe_title": "Green Salad",
            "description": "Crisp leaves with lemon dressing",
            "cuisine_list": ["Mediterranean"],
            "difficulty": "easy",
            "est_prep_time_min": 10,
            "est_cook_time_min": 0,
            "total_time_min": 999,
            "healthiness_score": 95,
            "is_vegan": true,
            "is_vegetarian": true,
            "is_gluten_free": true,
            "is_dairy_free": true,
            "is_nut_free": true,
            "ingredients_raw": ["lettuce", "lemon", "olive oil"]
        }),
    ]
}

/// Engine with the corpus already indexed under `INDEX`
pub fn seeded_engine() -> Arc<InMemoryEngine> {
    let engine = Arc::new(InMemoryEngine::new());
    let documents: Vec<BulkDocument> = corpus()
        .into_iter()
        .map(|source| BulkDocument {
            id: document_id(&source),
            source,
        })
        .collect();
    let response = engine.bulk(INDEX, &documents).unwrap();
    assert!(!response.errors);
    engine
}

pub fn bridge(engine: Arc<InMemoryEngine>, workers: usize) -> ExecutionBridge {
    ExecutionBridge::new(engine, BridgeConfig { workers })
}

pub fn search_service(
    engine: Arc<InMemoryEngine>,
    config: QueryConfig,
    events: Arc<CollectingEventSink>,
) -> SearchService {
    SearchService::new(
        bridge(engine, 2),
        INDEX,
        config,
        Duration::from_secs(5),
        events as Arc<dyn EventSink>,
    )
}

pub fn pipeline(
    engine: Arc<InMemoryEngine>,
    batch_size: usize,
    events: Arc<CollectingEventSink>,
) -> BulkIngestionPipeline {
    BulkIngestionPipeline::new(
        bridge(engine, 2),
        INDEX,
        IngestionConfig {
            batch_size,
            deadline: Duration::from_secs(5),
        },
        events as Arc<dyn EventSink>,
    )
}

pub fn health_probe(engine: Arc<InMemoryEngine>, events: Arc<CollectingEventSink>) -> HealthProbe {
    HealthProbe::new(
        bridge(engine, 1),
        INDEX,
        Duration::from_secs(2),
        events as Arc<dyn EventSink>,
    )
}
