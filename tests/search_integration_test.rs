// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

mod common;

use common::{search_service, seeded_engine};
use dishcovery_search::error::SearchError;
use dishcovery_search::models::ingestion::BulkDocument;
use dishcovery_search::models::search::{DietaryFlag, FalseFlagPolicy, SearchRequest};
use dishcovery_search::services::engine::SearchEngine;
use dishcovery_search::services::events::{CollectingEventSink, QueryOutcome, SearchEvent};
use dishcovery_search::services::query::{AggregationScope, QueryConfig};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

fn dietary(flag: DietaryFlag, wanted: bool) -> BTreeMap<DietaryFlag, bool> {
    BTreeMap::from([(flag, wanted)])
}

#[tokio::test]
async fn test_empty_request_matches_everything() {
    let events = Arc::new(CollectingEventSink::new());
    let service = search_service(seeded_engine(), QueryConfig::default(), Arc::clone(&events));

    let result = service.search(&SearchRequest::default()).await.unwrap();

    assert_eq!(result.total, 5);
    assert_eq!(result.recipes.len(), 5);
    assert!(result.facets.is_none());

    let recorded = events.events();
    assert_eq!(recorded.len(), 1);
    assert!(matches!(
        recorded[0],
        SearchEvent::QueryCompleted {
            total_hits: Some(5),
            outcome: QueryOutcome::Success,
            ..
        }
    ));
}

#[tokio::test]
async fn test_text_cuisine_and_prep_time_combine() {
    let events = Arc::new(CollectingEventSink::new());
    let service = search_service(seeded_engine(), QueryConfig::default(), events);

    let request = SearchRequest {
        cuisines: vec!["Italian".to_string()],
        max_prep_time: Some(30),
        ..SearchRequest::text("pasta")
    };
    let result = service.search(&request).await.unwrap();

    assert_eq!(result.total, 1);
    let recipe = &result.recipes[0];
    assert_eq!(recipe.title, "Spaghetti Pomodoro");
    assert_eq!(recipe.cuisines, vec!["Italian"]);
    assert_eq!(recipe.total_time_min, 30);
    assert!(recipe.dietary.vegan);
    assert_eq!(recipe.ingredients, vec!["spaghetti", "tomato", "basil"]);
    assert_eq!(recipe.directions.len(), 3);
}

#[tokio::test]
async fn test_fuzzy_text_tolerates_typos() {
    let events = Arc::new(CollectingEventSink::new());
    let service = search_service(seeded_engine(), QueryConfig::default(), events);

    let result = service.search(&SearchRequest::text("spagetti")).await.unwrap();
    assert_eq!(result.total, 1);
    assert_eq!(result.recipes[0].title, "Spaghetti Pomodoro");

    let exact = SearchRequest {
        fuzziness: "0".parse().unwrap(),
        ..SearchRequest::text("spagetti")
    };
    assert_eq!(service.search(&exact).await.unwrap().total, 0);
}

#[tokio::test]
async fn test_dietary_flag_facet_counts_both_sides() {
    let events = Arc::new(CollectingEventSink::new());
    let service = search_service(seeded_engine(), QueryConfig::default(), events);

    let request = SearchRequest {
        size: 0,
        include_aggregations: true,
        facets: vec!["dietary_flags".to_string()],
        ..SearchRequest::default()
    };
    let result = service.search(&request).await.unwrap();

    assert!(result.recipes.is_empty());
    let facets = result.facets.unwrap();
    assert_eq!(facets.len(), 1);
    assert_eq!(facets.bucket_count("dietary_flags", "vegan"), Some(3));
    assert_eq!(facets.bucket_count("dietary_flags", "non_vegan"), Some(2));
    assert_eq!(facets.bucket_count("dietary_flags", "gluten_free"), Some(3));
    assert_eq!(facets.bucket_count("dietary_flags", "non_nut_free"), Some(1));
}

#[tokio::test]
async fn test_total_time_facet_is_derived_from_prep_and_cook() {
    let events = Arc::new(CollectingEventSink::new());
    let service = search_service(seeded_engine(), QueryConfig::default(), events);

    let request = SearchRequest {
        size: 0,
        include_aggregations: true,
        facets: vec!["total_time_ranges".to_string()],
        ..SearchRequest::default()
    };
    let facets = service.search(&request).await.unwrap().facets.unwrap();

    // The salad stores a stale total of 999 minutes; prep 10 plus cook 0 puts it under 30
    assert_eq!(facets.bucket_count("total_time_ranges", "0-30 min"), Some(1));
    assert_eq!(facets.bucket_count("total_time_ranges", "30-60 min"), Some(3));
    assert_eq!(facets.bucket_count("total_time_ranges", "60-90 min"), Some(0));
    assert_eq!(facets.bucket_count("total_time_ranges", "120+ min"), Some(1));
}

#[tokio::test]
async fn test_facet_overview_covers_every_registered_facet() {
    let events = Arc::new(CollectingEventSink::new());
    let service = search_service(seeded_engine(), QueryConfig::default(), events);

    let overview = service.facet_overview().await.unwrap();
    assert!(overview.recipes.is_empty());
    let facets = overview.facets.unwrap();

    assert_eq!(facets.len(), 8);
    assert_eq!(facets.bucket_count("cuisines", "Italian"), Some(2));
    assert_eq!(facets.bucket_count("difficulty_levels", "easy"), Some(3));

    let stats = facets.get("healthiness_stats").unwrap().stats().unwrap();
    assert_eq!(stats.count, 5);
    assert_eq!(stats.min, Some(40.0));
    assert_eq!(stats.max, Some(95.0));
    assert_eq!(stats.avg, Some(70.0));
}

#[tokio::test]
async fn test_pagination_past_the_last_hit() {
    let events = Arc::new(CollectingEventSink::new());
    let service = search_service(seeded_engine(), QueryConfig::default(), events);

    let tail = SearchRequest {
        size: 2,
        from: 4,
        ..SearchRequest::default()
    };
    let result = service.search(&tail).await.unwrap();
    assert_eq!(result.total, 5);
    assert_eq!(result.recipes.len(), 1);

    let beyond = SearchRequest {
        from: 10,
        ..SearchRequest::default()
    };
    let result = service.search(&beyond).await.unwrap();
    assert_eq!(result.total, 5);
    assert!(result.recipes.is_empty());
}

#[tokio::test]
async fn test_false_flag_policy() {
    let events = Arc::new(CollectingEventSink::new());
    let service = search_service(seeded_engine(), QueryConfig::default(), events);

    let ignore = SearchRequest {
        dietary: dietary(DietaryFlag::Vegan, false),
        ..SearchRequest::default()
    };
    assert_eq!(service.search(&ignore).await.unwrap().total, 5);

    let exclude = SearchRequest {
        false_flag_policy: FalseFlagPolicy::Exclude,
        ..ignore
    };
    let result = service.search(&exclude).await.unwrap();
    assert_eq!(result.total, 2);
    assert!(result.recipes.iter().all(|r| !r.dietary.vegan));
}

#[tokio::test]
async fn test_invalid_bounds_never_reach_the_engine() {
    let engine = seeded_engine();
    engine.set_available(false);
    let events = Arc::new(CollectingEventSink::new());
    let service = search_service(engine, QueryConfig::default(), Arc::clone(&events));

    let request = SearchRequest {
        min_prep_time: Some(40),
        max_prep_time: Some(10),
        ..SearchRequest::default()
    };
    let err = service.search(&request).await.unwrap_err();

    assert!(matches!(err, SearchError::Validation(_)));
    assert!(events.events().is_empty());
}

#[tokio::test]
async fn test_unknown_facet_is_a_compilation_error() {
    let events = Arc::new(CollectingEventSink::new());
    let service = search_service(seeded_engine(), QueryConfig::default(), events);

    let request = SearchRequest {
        include_aggregations: true,
        facets: vec!["calories".to_string()],
        ..SearchRequest::default()
    };
    let err = service.search(&request).await.unwrap_err();
    assert!(matches!(err, SearchError::Compilation(_)));
}

#[tokio::test]
async fn test_aggregation_scope_decides_what_facets_describe() {
    let request = SearchRequest {
        dietary: dietary(DietaryFlag::Vegan, true),
        include_aggregations: true,
        facets: vec!["dietary_flags".to_string()],
        ..SearchRequest::text("pasta")
    };

    let events = Arc::new(CollectingEventSink::new());
    let filtered = search_service(seeded_engine(), QueryConfig::default(), events);
    let result = filtered.search(&request).await.unwrap();
    assert_eq!(result.total, 1);
    let facets = result.facets.unwrap();
    assert_eq!(facets.bucket_count("dietary_flags", "vegan"), Some(1));
    assert_eq!(facets.bucket_count("dietary_flags", "non_vegan"), Some(0));

    let events = Arc::new(CollectingEventSink::new());
    let config = QueryConfig {
        aggregation_scope: AggregationScope::TextMatches,
        ..QueryConfig::default()
    };
    let text_matches = search_service(seeded_engine(), config, events);
    let result = text_matches.search(&request).await.unwrap();
    assert_eq!(result.total, 1);
    assert_eq!(result.recipes[0].title, "Spaghetti Pomodoro");
    let facets = result.facets.unwrap();
    assert_eq!(facets.bucket_count("dietary_flags", "vegan"), Some(1));
    assert_eq!(facets.bucket_count("dietary_flags", "non_vegan"), Some(1));
}

#[tokio::test]
async fn test_extreme_minutes_do_not_break_search() {
    let engine = seeded_engine();
    let huge = BulkDocument {
        id: "banquet".to_string(),
        source: json!({
            "recipe_title": "Endless Banquet",
            "description": "A pasta bake that never ends",
            "est_prep_time_min": 9.0e18,
            "est_cook_time_min": 9.0e18
        }),
    };
    let response = engine.bulk(common::INDEX, &[huge]).unwrap();
    assert_eq!(response.failed(), 0);

    let events = Arc::new(CollectingEventSink::new());
    let service = search_service(engine, QueryConfig::default(), events);

    let request = SearchRequest {
        include_aggregations: true,
        facets: vec!["total_time_ranges".to_string()],
        ..SearchRequest::text("pasta")
    };
    let result = service.search(&request).await.unwrap();

    assert_eq!(result.total, 3);
    let banquet = result
        .recipes
        .iter()
        .find(|recipe| recipe.id == "banquet")
        .unwrap();
    assert_eq!(banquet.total_time_min, u32::MAX);
    assert_eq!(
        result
            .facets
            .unwrap()
            .bucket_count("total_time_ranges", "120+ min"),
        Some(2)
    );
}

#[tokio::test]
async fn test_unavailable_engine_is_reported() {
    let engine = seeded_engine();
    engine.set_available(false);
    let events = Arc::new(CollectingEventSink::new());
    let service = search_service(engine, QueryConfig::default(), Arc::clone(&events));

    let err = service.search(&SearchRequest::default()).await.unwrap_err();
    assert!(matches!(err, SearchError::EngineUnavailable { .. }));
    assert!(matches!(
        events.events()[0],
        SearchEvent::QueryCompleted {
            total_hits: None,
            outcome: QueryOutcome::Unavailable,
            ..
        }
    ));
}
