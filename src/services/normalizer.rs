// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Maps raw engine hits and aggregations onto the stable `SearchResult` contract.

use crate::models::search::{
    DietaryFlag, DietaryProfile, RecipeSummary, SearchResult, RESULT_SCHEMA_VERSION,
};
use crate::services::aggregations::{FacetRegistry, TOTAL_TIME};
use crate::services::engine::{RawHit, RawSearchResponse};
use crate::services::query::CompiledQuery;
use serde_json::Value;
use std::time::Duration;

pub struct ResponseNormalizer {
    registry: &'static FacetRegistry,
}

impl Default for ResponseNormalizer {
    fn default() -> Self {
        Self::new(FacetRegistry::global())
    }
}

impl ResponseNormalizer {
    pub fn new(registry: &'static FacetRegistry) -> Self {
        Self { registry }
    }

    /// `elapsed` is the wall-clock span of the bridge call only
    pub fn normalize(
        &self,
        raw: RawSearchResponse,
        query: &CompiledQuery,
        elapsed: Duration,
    ) -> SearchResult {
        let total = raw
            .hits
            .total
            .as_ref()
            .map_or(raw.hits.hits.len() as u64, |total| total.value);

        let facets = (!query.requested_facets().is_empty()).then(|| {
            self.registry
                .parse(query.requested_facets(), raw.aggregations.as_ref())
        });

        SearchResult {
            schema_version: RESULT_SCHEMA_VERSION,
            total,
            recipes: raw.hits.hits.into_iter().map(recipe_summary).collect(),
            facets,
            took_ms: raw.took,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Project a stored recipe; missing or mistyped fields become empty values
pub fn recipe_summary(hit: RawHit) -> RecipeSummary {
    let source = &hit.source;

    let mut dietary = DietaryProfile::default();
    for flag in DietaryFlag::ALL {
        dietary.set(
            flag,
            source
                .get(flag.field())
                .and_then(Value::as_bool)
                .unwrap_or(false),
        );
    }

    RecipeSummary {
        score: hit.score,
        title: text(source, "recipe_title"),
        description: text(source, "description"),
        cuisines: strings(source, "cuisine_list"),
        difficulty: source
            .get("difficulty")
            .and_then(Value::as_str)
            .map(str::to_string),
        prep_time_min: minutes(source, "est_prep_time_min"),
        cook_time_min: minutes(source, "est_cook_time_min"),
        total_time_min: u32::try_from(TOTAL_TIME.evaluate(source).max(0)).unwrap_or(u32::MAX),
        dietary,
        healthiness_score: minutes(source, "healthiness_score"),
        ingredients: strings(source, "ingredients_raw"),
        directions: strings(source, "directions_raw"),
        id: hit.id,
    }
}

fn text(source: &Value, field: &str) -> String {
    source
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// A list of strings; a lone string is a list of one
fn strings(source: &Value, field: &str) -> Vec<String> {
    match source.get(field) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(single)) => vec![single.clone()],
        _ => Vec::new(),
    }
}

fn minutes(source: &Value, field: &str) -> Option<u32> {
    let value = source.get(field)?;
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
        .and_then(|v| u32::try_from(v).ok())
}
