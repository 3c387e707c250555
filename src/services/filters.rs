// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Filter compiler: turns the filter-bearing fields of a request into engine clauses.

use crate::error::Result;
use crate::models::search::{Bounds, DietaryFlag, Difficulty, FalseFlagPolicy, SearchRequest};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Keyword sub-field of the multi-valued cuisine list
pub const CUISINE_FIELD: &str = "cuisine_list.keyword";

pub const DIFFICULTY_FIELD: &str = "difficulty.keyword";

pub struct FilterCompiler;

impl FilterCompiler {
    /// One clause per non-empty filter. No filters yields an empty list.
    pub fn compile(request: &SearchRequest) -> Result<Vec<Value>> {
        let mut clauses = Vec::new();

        if let Some(clause) = Self::cuisines(&request.cuisines) {
            clauses.push(clause);
        }

        clauses.extend(Self::dietary(&request.dietary, request.false_flag_policy));

        for bounds in request.bounds() {
            if let Some(clause) = Self::range(&bounds)? {
                clauses.push(clause);
            }
        }

        if let Some(difficulty) = request.difficulty {
            clauses.push(Self::difficulty(difficulty));
        }

        Ok(clauses)
    }

    fn cuisines(cuisines: &[String]) -> Option<Value> {
        let mut values: Vec<&str> = Vec::with_capacity(cuisines.len());
        for cuisine in cuisines.iter().map(|c| c.trim()) {
            if !cuisine.is_empty() && !values.contains(&cuisine) {
                values.push(cuisine);
            }
        }

        if values.is_empty() {
            return None;
        }

        Some(json!({ "terms": { CUISINE_FIELD: values } }))
    }

    fn dietary(flags: &BTreeMap<DietaryFlag, bool>, policy: FalseFlagPolicy) -> Vec<Value> {
        flags
            .iter()
            .filter(|(_, wanted)| **wanted || policy == FalseFlagPolicy::Exclude)
            .map(|(flag, wanted)| json!({ "term": { flag.field(): *wanted } }))
            .collect()
    }

    fn range(bounds: &Bounds) -> Result<Option<Value>> {
        bounds.check()?;
        if bounds.is_empty() {
            return Ok(None);
        }

        let mut range = serde_json::Map::new();
        if let Some(min) = bounds.min {
            range.insert("gte".to_string(), json!(min));
        }
        if let Some(max) = bounds.max {
            range.insert("lte".to_string(), json!(max));
        }

        Ok(Some(json!({ "range": { bounds.field.field(): range } })))
    }

    fn difficulty(difficulty: Difficulty) -> Value {
        json!({ "term": { DIFFICULTY_FIELD: difficulty.as_str() } })
    }
}
