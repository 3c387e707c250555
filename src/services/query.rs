// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Query assembler: text match in scoring context, exact filters in filter context,
//! pagination and optional aggregations, combined into one request body.

use crate::error::Result;
use crate::models::search::SearchRequest;
use crate::services::aggregations::{FacetRegistry, FacetSpec};
use crate::services::filters::FilterCompiler;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Largest page a caller may ask for
pub const MAX_PAGE_SIZE: u32 = 100;

/// Engine limit on `from + size`
pub const MAX_RESULT_WINDOW: u32 = 10_000;

/// Which hit set the facets describe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AggregationScope {
    /// Facets count documents matching both text and filters
    #[default]
    FilteredResults,
    /// Facets count documents matching the text; filters only narrow the hits
    TextMatches,
}

/// A searchable text field and its relevance boost
#[derive(Debug, Clone, PartialEq)]
pub struct TextField {
    pub name: String,
    pub boost: f32,
}

impl TextField {
    pub fn new(name: impl Into<String>, boost: f32) -> Self {
        Self {
            name: name.into(),
            boost,
        }
    }

    fn descriptor(&self) -> String {
        if self.boost == 1.0 {
            self.name.clone()
        } else {
            format!("{}^{}", self.name, self.boost)
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub max_page_size: u32,
    pub max_result_window: u32,
    pub aggregation_scope: AggregationScope,
    pub text_fields: Vec<TextField>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_page_size: MAX_PAGE_SIZE,
            max_result_window: MAX_RESULT_WINDOW,
            aggregation_scope: AggregationScope::default(),
            text_fields: vec![
                TextField::new("recipe_title", 4.0),
                TextField::new("description", 2.0),
                TextField::new("ingredient_text", 1.0),
                TextField::new("directions_text", 1.0),
            ],
        }
    }
}

/// Engine request body for one search. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    body: Value,
    facets: Vec<&'static FacetSpec>,
    from: u32,
    size: u32,
}

impl CompiledQuery {
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Facets whose aggregations are part of the body, empty when none were requested
    pub fn requested_facets(&self) -> &[&'static FacetSpec] {
        &self.facets
    }

    /// Effective offset after clamping to the result window
    pub fn from(&self) -> u32 {
        self.from
    }

    /// Effective page size after clamping to the result window
    pub fn size(&self) -> u32 {
        self.size
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.body)
    }
}

pub struct QueryAssembler {
    config: QueryConfig,
    registry: &'static FacetRegistry,
}

impl QueryAssembler {
    pub fn new(config: QueryConfig) -> Self {
        Self::with_registry(config, FacetRegistry::global())
    }

    pub fn with_registry(config: QueryConfig, registry: &'static FacetRegistry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Compile a validated request. Pure: no engine call, no shared state touched.
    pub fn assemble(&self, request: &SearchRequest) -> Result<CompiledQuery> {
        let filters = FilterCompiler::compile(request)?;
        let facets = if request.include_aggregations {
            self.registry.select(&request.facets)?
        } else {
            Vec::new()
        };

        let text = request.query.trim();
        let must = if text.is_empty() {
            Vec::new()
        } else {
            vec![self.text_clause(text, request)]
        };

        let filters_as_post_filter = !facets.is_empty()
            && !filters.is_empty()
            && self.config.aggregation_scope == AggregationScope::TextMatches;

        let (query_filters, post_filter) = if filters_as_post_filter {
            (Vec::new(), Some(json!({ "bool": { "filter": filters } })))
        } else {
            (filters, None)
        };

        let (from, size) = self.clamp_page(request.from, request.size);

        let mut body = Map::new();
        body.insert("query".to_string(), Self::bool_query(must, query_filters));
        body.insert("from".to_string(), json!(from));
        body.insert("size".to_string(), json!(size));
        body.insert("track_total_hits".to_string(), json!(true));

        if let Some(post_filter) = post_filter {
            body.insert("post_filter".to_string(), post_filter);
        }

        if !facets.is_empty() {
            let aggregations = self.registry.build(&facets);
            if let Some(runtime) = aggregations.runtime_mappings {
                body.insert("runtime_mappings".to_string(), runtime);
            }
            body.insert("aggs".to_string(), aggregations.aggs);
        }

        Ok(CompiledQuery {
            body: Value::Object(body),
            facets,
            from,
            size,
        })
    }

    fn text_clause(&self, text: &str, request: &SearchRequest) -> Value {
        let fields: Vec<String> = self
            .config
            .text_fields
            .iter()
            .map(TextField::descriptor)
            .collect();

        json!({
            "multi_match": {
                "query": text,
                "fields": fields,
                "type": "best_fields",
                "fuzziness": request.fuzziness.to_string(),
            }
        })
    }

    fn bool_query(must: Vec<Value>, filter: Vec<Value>) -> Value {
        if must.is_empty() && filter.is_empty() {
            return json!({ "match_all": {} });
        }

        let mut clauses = Map::new();
        if !must.is_empty() {
            clauses.insert("must".to_string(), Value::Array(must));
        }
        if !filter.is_empty() {
            clauses.insert("filter".to_string(), Value::Array(filter));
        }
        json!({ "bool": clauses })
    }

    /// Keep `from + size` inside the result window so deep pages come back empty instead of
    /// failing at the engine
    fn clamp_page(&self, from: u32, size: u32) -> (u32, u32) {
        let window = self.config.max_result_window;
        let from = from.min(window);
        let size = size.min(window - from);
        (from, size)
    }
}
