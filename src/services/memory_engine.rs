// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! In-process search engine for tests and local runs.
//!
//! Evaluates the part of the Elasticsearch query DSL this crate emits: `bool`, `match_all`,
//! `multi_match` (with fuzziness), `term`, `terms`, `range`, `post_filter`, runtime fields known
//! to the facet registry, and `terms` / `range` / `stats` / `filters` aggregations. Anything else
//! is rejected with status 400, the way a real engine rejects an unknown clause.

use crate::error::EngineError;
use crate::models::health::ClusterHealth;
use crate::models::ingestion::BulkDocument;
use crate::models::search::{DietaryFlag, Fuzziness};
use crate::services::aggregations::{range_contains, DerivedField, FacetRegistry};
use crate::services::engine::{
    BulkItem, BulkItemError, BulkResponse, RawHit, RawHits, RawSearchResponse, SearchEngine,
    TotalHits,
};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

const TITLE_FIELD: &str = "recipe_title";

const NUMERIC_FIELDS: [&str; 3] = ["est_prep_time_min", "est_cook_time_min", "healthiness_score"];

const DEFAULT_HITS: usize = 10;

/// Documents of one index, in insertion order
type MemoryIndex = IndexMap<String, Value>;

pub struct InMemoryEngine {
    indices: RwLock<HashMap<String, MemoryIndex>>,
    registry: &'static FacetRegistry,
    available: AtomicBool,
    latency_ms: AtomicU64,
    cluster_status: RwLock<String>,
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self {
            indices: RwLock::new(HashMap::new()),
            registry: FacetRegistry::global(),
            available: AtomicBool::new(true),
            latency_ms: AtomicU64::new(0),
            cluster_status: RwLock::new("green".to_string()),
        }
    }

    /// Delay every call by `latency`
    pub fn with_latency(self, latency: Duration) -> Self {
        self.set_latency(latency);
        self
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// An unavailable engine fails every call with a transport error
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Cluster status reported by `cluster_health`: "green", "yellow" or "red"
    pub fn set_cluster_status(&self, status: &str) {
        *self
            .cluster_status
            .write()
            .unwrap_or_else(PoisonError::into_inner) = status.to_string();
    }

    pub fn create_index(&self, index: &str) {
        self.indices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(index.to_string())
            .or_default();
    }

    pub fn document_count(&self, index: &str) -> usize {
        self.indices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .map_or(0, IndexMap::len)
    }

    fn simulate_network(&self) -> Result<(), EngineError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            std::thread::sleep(Duration::from_millis(latency));
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(EngineError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

impl SearchEngine for InMemoryEngine {
    fn search(&self, index: &str, body: &Value) -> Result<RawSearchResponse, EngineError> {
        self.simulate_network()?;
        let started = Instant::now();

        let evaluator = Evaluator::new(self.registry, body.get("runtime_mappings"))?;
        let indices = self.indices.read().unwrap_or_else(PoisonError::into_inner);
        let documents = indices.get(index).ok_or_else(|| EngineError::Rejected {
            status: 404,
            reason: format!("index_not_found_exception: no such index [{}]", index),
        })?;

        let match_all = json!({ "match_all": {} });
        let query = body.get("query").unwrap_or(&match_all);

        let mut matched: Vec<(&String, &Value, f64)> = Vec::new();
        for (id, source) in documents {
            if let Some(score) = evaluator.matches(query, source)? {
                matched.push((id, source, score));
            }
        }

        let aggregations = match body.get("aggs").or_else(|| body.get("aggregations")) {
            Some(Value::Object(aggs)) => {
                let sources: Vec<&Value> = matched.iter().map(|(_, source, _)| *source).collect();
                Some(evaluator.aggregate(aggs, &sources)?)
            }
            Some(_) => return Err(rejected("aggregations must be an object")),
            None => None,
        };

        if let Some(post_filter) = body.get("post_filter") {
            let mut kept = Vec::with_capacity(matched.len());
            for hit in matched {
                if evaluator.matches(post_filter, hit.1)?.is_some() {
                    kept.push(hit);
                }
            }
            matched = kept;
        }

        matched.sort_by(|a, b| b.2.total_cmp(&a.2));

        let total = matched.len() as u64;
        let from = body.get("from").and_then(Value::as_u64).unwrap_or(0) as usize;
        let size = body
            .get("size")
            .and_then(Value::as_u64)
            .map_or(DEFAULT_HITS, |size| size as usize);

        let hits = matched
            .into_iter()
            .skip(from)
            .take(size)
            .map(|(id, source, score)| RawHit {
                id: id.clone(),
                score: Some(score),
                source: source.clone(),
            })
            .collect();

        Ok(RawSearchResponse {
            took: started.elapsed().as_millis() as u64,
            timed_out: false,
            hits: RawHits {
                total: Some(TotalHits { value: total }),
                hits,
            },
            aggregations,
        })
    }

    fn bulk(&self, index: &str, documents: &[BulkDocument]) -> Result<BulkResponse, EngineError> {
        self.simulate_network()?;
        let started = Instant::now();

        let mut indices = self.indices.write().unwrap_or_else(PoisonError::into_inner);
        let target = indices.entry(index.to_string()).or_default();

        let items = documents
            .iter()
            .map(|document| match check_shape(&document.source) {
                Ok(()) => {
                    let replaced = target
                        .insert(document.id.clone(), document.source.clone())
                        .is_some();
                    BulkItem {
                        id: document.id.clone(),
                        status: if replaced { 200 } else { 201 },
                        error: None,
                    }
                }
                Err(error) => BulkItem {
                    id: document.id.clone(),
                    status: 400,
                    error: Some(error),
                },
            })
            .collect();

        Ok(BulkResponse::from_items(
            started.elapsed().as_millis() as u64,
            items,
        ))
    }

    fn cluster_health(&self) -> Result<ClusterHealth, EngineError> {
        self.simulate_network()?;
        let status = self
            .cluster_status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Ok(ClusterHealth {
            status,
            cluster_name: "in-memory".to_string(),
            number_of_nodes: 1,
        })
    }

    fn index_exists(&self, index: &str) -> Result<bool, EngineError> {
        self.simulate_network()?;
        Ok(self
            .indices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(index))
    }
}

fn rejected(reason: impl Into<String>) -> EngineError {
    EngineError::Rejected {
        status: 400,
        reason: reason.into(),
    }
}

fn parse_failure(field: &str) -> BulkItemError {
    BulkItemError {
        kind: "mapper_parsing_exception".to_string(),
        reason: Some(format!("failed to parse field [{}]", field)),
    }
}

/// Basic mapping checks: string title, numeric times and score, boolean flags
fn check_shape(source: &Value) -> Result<(), BulkItemError> {
    let Some(fields) = source.as_object() else {
        return Err(BulkItemError {
            kind: "mapper_parsing_exception".to_string(),
            reason: Some("document must be a JSON object".to_string()),
        });
    };

    if !matches!(fields.get(TITLE_FIELD), Some(Value::String(_))) {
        return Err(parse_failure(TITLE_FIELD));
    }

    for field in NUMERIC_FIELDS {
        if !matches!(fields.get(field), None | Some(Value::Null) | Some(Value::Number(_))) {
            return Err(parse_failure(field));
        }
    }

    for flag in DietaryFlag::ALL {
        if !matches!(fields.get(flag.field()), None | Some(Value::Null) | Some(Value::Bool(_))) {
            return Err(parse_failure(flag.field()));
        }
    }

    Ok(())
}

/// Query and aggregation evaluation for one search call
struct Evaluator {
    runtime: HashMap<String, &'static DerivedField>,
}

impl Evaluator {
    fn new(
        registry: &FacetRegistry,
        runtime_mappings: Option<&Value>,
    ) -> Result<Self, EngineError> {
        let mut runtime = HashMap::new();
        if let Some(mappings) = runtime_mappings {
            let mappings = mappings
                .as_object()
                .ok_or_else(|| rejected("runtime_mappings must be an object"))?;
            for name in mappings.keys() {
                let derived = registry
                    .derived_field(name)
                    .ok_or_else(|| rejected(format!("unsupported runtime field [{}]", name)))?;
                runtime.insert(name.clone(), derived);
            }
        }
        Ok(Self { runtime })
    }

    /// Stored or runtime values of a field; arrays are flattened and nulls dropped
    fn field_values(&self, source: &Value, field: &str) -> Vec<Value> {
        let field = field.strip_suffix(".keyword").unwrap_or(field);
        if let Some(derived) = self.runtime.get(field) {
            return vec![json!(derived.evaluate(source))];
        }
        match source.get(field) {
            Some(Value::Array(items)) => items.iter().filter(|v| !v.is_null()).cloned().collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(value) => vec![value.clone()],
        }
    }

    fn numbers(&self, source: &Value, field: &str) -> Vec<f64> {
        self.field_values(source, field)
            .iter()
            .filter_map(Value::as_f64)
            .collect()
    }

    /// Score of the document if it matches
    fn matches(&self, query: &Value, source: &Value) -> Result<Option<f64>, EngineError> {
        let (kind, params) = single_entry(query)?;
        match kind.as_str() {
            "match_all" => Ok(Some(1.0)),
            "bool" => self.bool_matches(params, source),
            "multi_match" => self.multi_match(params, source),
            "term" => {
                let (field, expected) = single_entry(params)?;
                let expected = expected.get("value").unwrap_or(expected);
                Ok(self
                    .field_values(source, field)
                    .iter()
                    .any(|value| values_equal(value, expected))
                    .then_some(1.0))
            }
            "terms" => {
                let (field, expected) = single_entry(params)?;
                let expected = expected
                    .as_array()
                    .ok_or_else(|| rejected("[terms] expects an array of values"))?;
                Ok(self
                    .field_values(source, field)
                    .iter()
                    .any(|value| expected.iter().any(|e| values_equal(value, e)))
                    .then_some(1.0))
            }
            "range" => {
                let (field, bounds) = single_entry(params)?;
                let bound = |name: &str| bounds.get(name).and_then(Value::as_f64);
                let (gte, lte, gt, lt) = (bound("gte"), bound("lte"), bound("gt"), bound("lt"));
                Ok(self
                    .numbers(source, field)
                    .into_iter()
                    .any(|v| {
                        gte.is_none_or(|b| v >= b)
                            && lte.is_none_or(|b| v <= b)
                            && gt.is_none_or(|b| v > b)
                            && lt.is_none_or(|b| v < b)
                    })
                    .then_some(1.0))
            }
            other => Err(rejected(format!("unsupported query [{}]", other))),
        }
    }

    fn bool_matches(&self, params: &Value, source: &Value) -> Result<Option<f64>, EngineError> {
        let must = clauses(params, "must");
        let filter = clauses(params, "filter");
        let should = clauses(params, "should");
        let mut score = 0.0;

        for clause in &must {
            match self.matches(clause, source)? {
                Some(s) => score += s,
                None => return Ok(None),
            }
        }
        for clause in &filter {
            if self.matches(clause, source)?.is_none() {
                return Ok(None);
            }
        }
        for clause in clauses(params, "must_not") {
            if self.matches(clause, source)?.is_some() {
                return Ok(None);
            }
        }

        let mut should_matched = false;
        for clause in &should {
            if let Some(s) = self.matches(clause, source)? {
                score += s;
                should_matched = true;
            }
        }

        // Without must/filter at least one should clause has to match
        if !should.is_empty() && must.is_empty() && filter.is_empty() && !should_matched {
            return Ok(None);
        }

        Ok(Some(score))
    }

    /// `best_fields`: the score of the best matching field, boost times matched terms
    fn multi_match(&self, params: &Value, source: &Value) -> Result<Option<f64>, EngineError> {
        let text = params
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| rejected("[multi_match] requires a query"))?;

        let fuzziness: Fuzziness = match params.get("fuzziness") {
            None => Ok(Fuzziness::Edits(0)),
            Some(Value::String(s)) => s.parse(),
            Some(other) => other.to_string().parse(),
        }
        .map_err(|e| rejected(format!("[multi_match] {}", e)))?;

        let terms = tokenize(text);
        if terms.is_empty() {
            return Ok(None);
        }

        let fields = params
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| rejected("[multi_match] requires fields"))?;

        let mut best: f64 = 0.0;
        for descriptor in fields.iter().filter_map(Value::as_str) {
            let (field, boost) = match descriptor.split_once('^') {
                Some((field, boost)) => (field, boost.parse::<f64>().unwrap_or(1.0)),
                None => (descriptor, 1.0),
            };

            let tokens: Vec<String> = self
                .field_values(source, field)
                .iter()
                .filter_map(|value| match value {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .flat_map(|text| tokenize(&text))
                .collect();

            let matched = terms
                .iter()
                .filter(|term| tokens.iter().any(|token| fuzzy_eq(term, token, fuzziness)))
                .count();

            best = best.max(boost * matched as f64);
        }

        Ok((best > 0.0).then_some(best))
    }

    fn aggregate(
        &self,
        aggs: &Map<String, Value>,
        sources: &[&Value],
    ) -> Result<Map<String, Value>, EngineError> {
        let mut results = Map::new();
        for (name, spec) in aggs {
            let (kind, params) = single_entry(spec)?;
            let result = match kind.as_str() {
                "terms" => self.terms_aggregation(params, sources)?,
                "range" => self.range_aggregation(params, sources)?,
                "stats" => self.stats_aggregation(params, sources)?,
                "filters" => self.filters_aggregation(params, sources)?,
                other => return Err(rejected(format!("unsupported aggregation [{}]", other))),
            };
            results.insert(name.clone(), result);
        }
        Ok(results)
    }

    fn terms_aggregation(&self, params: &Value, sources: &[&Value]) -> Result<Value, EngineError> {
        let field = agg_field(params)?;
        let size = params.get("size").and_then(Value::as_u64).unwrap_or(10) as usize;

        let mut counts: IndexMap<String, (Value, u64)> = IndexMap::new();
        for source in sources {
            let mut seen = Vec::new();
            for value in self.field_values(source, field) {
                let key = match &value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                if seen.contains(&key) {
                    continue;
                }
                counts.entry(key.clone()).or_insert((value, 0)).1 += 1;
                seen.push(key);
            }
        }

        let mut entries: Vec<(String, Value, u64)> = counts
            .into_iter()
            .map(|(key, (value, count))| (key, value, count))
            .collect();
        entries.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(&b.0)));

        let buckets: Vec<Value> = entries
            .into_iter()
            .take(size)
            .map(|(key, value, count)| match value {
                Value::Bool(flag) => json!({
                    "key": u8::from(flag),
                    "key_as_string": key,
                    "doc_count": count
                }),
                value => json!({ "key": value, "doc_count": count }),
            })
            .collect();

        Ok(json!({ "buckets": buckets }))
    }

    fn range_aggregation(&self, params: &Value, sources: &[&Value]) -> Result<Value, EngineError> {
        let field = agg_field(params)?;
        let ranges = params
            .get("ranges")
            .and_then(Value::as_array)
            .ok_or_else(|| rejected("[range] aggregation requires ranges"))?;

        let values: Vec<Vec<f64>> = sources.iter().map(|s| self.numbers(s, field)).collect();

        let buckets: Vec<Value> = ranges
            .iter()
            .map(|range| {
                let from = range.get("from").and_then(Value::as_f64);
                let to = range.get("to").and_then(Value::as_f64);
                let count = values
                    .iter()
                    .filter(|doc| doc.iter().any(|&v| range_contains(from, to, v)))
                    .count();

                let end = |bound: Option<f64>| bound.map_or("*".to_string(), |b| b.to_string());
                let key = range
                    .get("key")
                    .and_then(Value::as_str)
                    .map_or_else(|| format!("{}-{}", end(from), end(to)), str::to_string);

                let mut bucket = Map::new();
                bucket.insert("key".to_string(), json!(key));
                if let Some(from) = from {
                    bucket.insert("from".to_string(), json!(from));
                }
                if let Some(to) = to {
                    bucket.insert("to".to_string(), json!(to));
                }
                bucket.insert("doc_count".to_string(), json!(count));
                Value::Object(bucket)
            })
            .collect();

        Ok(json!({ "buckets": buckets }))
    }

    fn stats_aggregation(&self, params: &Value, sources: &[&Value]) -> Result<Value, EngineError> {
        let field = agg_field(params)?;
        let values: Vec<f64> = sources
            .iter()
            .flat_map(|source| self.numbers(source, field))
            .collect();

        if values.is_empty() {
            return Ok(json!({ "count": 0, "min": null, "max": null, "avg": null, "sum": 0.0 }));
        }

        let sum: f64 = values.iter().sum();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Ok(json!({
            "count": values.len(),
            "min": min,
            "max": max,
            "avg": sum / values.len() as f64,
            "sum": sum
        }))
    }

    fn filters_aggregation(
        &self,
        params: &Value,
        sources: &[&Value],
    ) -> Result<Value, EngineError> {
        let filters = params
            .get("filters")
            .and_then(Value::as_object)
            .ok_or_else(|| rejected("[filters] aggregation requires named filters"))?;

        let mut buckets = Map::new();
        for (name, filter) in filters {
            let mut count = 0u64;
            for source in sources {
                if self.matches(filter, source)?.is_some() {
                    count += 1;
                }
            }
            buckets.insert(name.clone(), json!({ "doc_count": count }));
        }

        Ok(json!({ "buckets": buckets }))
    }
}

/// A clause is an object with exactly one key naming its kind
fn single_entry(clause: &Value) -> Result<(&String, &Value), EngineError> {
    match clause.as_object() {
        Some(map) if map.len() == 1 => map
            .iter()
            .next()
            .ok_or_else(|| rejected("empty clause")),
        _ => Err(rejected(format!("malformed clause {}", clause))),
    }
}

/// Clauses under a bool occurrence key, given either as one object or as an array
fn clauses<'a>(params: &'a Value, key: &str) -> Vec<&'a Value> {
    match params.get(key) {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(clause) => vec![clause],
        None => Vec::new(),
    }
}

fn agg_field(params: &Value) -> Result<&str, EngineError> {
    params
        .get("field")
        .and_then(Value::as_str)
        .ok_or_else(|| rejected("aggregation requires a field"))
}

fn values_equal(stored: &Value, expected: &Value) -> bool {
    match (stored, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (a, b) => a == b,
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Edit distance with adjacent transpositions counted as one edit
fn fuzzy_eq(term: &str, token: &str, fuzziness: Fuzziness) -> bool {
    if term == token {
        return true;
    }
    let allowed = fuzziness.max_edits(term.chars().count()) as usize;
    allowed > 0 && strsim::osa_distance(term, token) <= allowed
}
