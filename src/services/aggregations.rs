// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Facet registry: the single table both the aggregation request builder and the response
//! parser read from, so what is requested and what is parsed cannot drift apart.

use crate::error::{Result, SearchError};
use crate::models::facets::{FacetBucket, FacetStats, FacetSummary, FacetValue};
use crate::models::search::DietaryFlag;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::LazyLock;

/// One bucket of a range facet. `from` is inclusive, `to` exclusive.
#[derive(Debug)]
pub struct RangeSpec {
    pub key: &'static str,
    pub from: Option<f64>,
    pub to: Option<f64>,
}

/// Range bucket membership: `from` inclusive, `to` exclusive, a missing end is unbounded
pub fn range_contains(from: Option<f64>, to: Option<f64>, value: f64) -> bool {
    from.is_none_or(|from| value >= from) && to.is_none_or(|to| value < to)
}

#[derive(Debug)]
pub enum FacetKind {
    /// Distinct values, most frequent first
    Terms { size: u32 },
    Range { ranges: &'static [RangeSpec] },
    Stats,
    /// `<flag>` / `non_<flag>` counts per dietary flag
    Flags { flags: &'static [DietaryFlag] },
}

/// A numeric field computed at query time as the sum of stored fields.
/// Missing or non-numeric addends count as zero; the sum saturates instead of overflowing.
#[derive(Debug)]
pub struct DerivedField {
    pub name: &'static str,
    pub addends: &'static [&'static str],
}

impl DerivedField {
    /// Evaluate against a stored document
    pub fn evaluate(&self, source: &Value) -> i64 {
        self.addends
            .iter()
            .map(|field| match source.get(*field) {
                Some(Value::Number(n)) => n
                    .as_i64()
                    .or_else(|| n.as_f64().map(|f| f.round() as i64))
                    .unwrap_or(0),
                _ => 0,
            })
            .fold(0i64, i64::saturating_add)
    }

    /// Same derivation as `evaluate`, expressed as an engine runtime field
    pub fn runtime_mapping(&self) -> Value {
        let terms = self
            .addends
            .iter()
            .map(|field| format!("(doc['{f}'].size() > 0 ? doc['{f}'].value : 0)", f = field))
            .collect::<Vec<_>>()
            .join(" + ");

        json!({
            "type": "long",
            "script": { "source": format!("emit({})", terms) }
        })
    }
}

#[derive(Debug)]
pub struct FacetSpec {
    /// Stable name used both as aggregation name and as key of the facet summary
    pub name: &'static str,
    /// Engine field path; for flag facets, the pattern of the flag fields
    pub field: &'static str,
    pub kind: FacetKind,
    pub derived: Option<&'static DerivedField>,
}

pub static TOTAL_TIME: DerivedField = DerivedField {
    name: "total_time_min",
    addends: &["est_prep_time_min", "est_cook_time_min"],
};

static PREP_TIME_RANGES: [RangeSpec; 4] = [
    RangeSpec {
        key: "0-15 min",
        from: None,
        to: Some(15.0),
    },
    RangeSpec {
        key: "15-30 min",
        from: Some(15.0),
        to: Some(30.0),
    },
    RangeSpec {
        key: "30-60 min",
        from: Some(30.0),
        to: Some(60.0),
    },
    RangeSpec {
        key: "60+ min",
        from: Some(60.0),
        to: None,
    },
];

static COOK_TIME_RANGES: [RangeSpec; 7] = [
    RangeSpec {
        key: "0-15 min",
        from: None,
        to: Some(15.0),
    },
    RangeSpec {
        key: "15-30 min",
        from: Some(15.0),
        to: Some(30.0),
    },
    RangeSpec {
        key: "30-45 min",
        from: Some(30.0),
        to: Some(45.0),
    },
    RangeSpec {
        key: "45-60 min",
        from: Some(45.0),
        to: Some(60.0),
    },
    RangeSpec {
        key: "60-90 min",
        from: Some(60.0),
        to: Some(90.0),
    },
    RangeSpec {
        key: "90-120 min",
        from: Some(90.0),
        to: Some(120.0),
    },
    RangeSpec {
        key: "120+ min",
        from: Some(120.0),
        to: None,
    },
];

static TOTAL_TIME_RANGES: [RangeSpec; 5] = [
    RangeSpec {
        key: "0-30 min",
        from: None,
        to: Some(30.0),
    },
    RangeSpec {
        key: "30-60 min",
        from: Some(30.0),
        to: Some(60.0),
    },
    RangeSpec {
        key: "60-90 min",
        from: Some(60.0),
        to: Some(90.0),
    },
    RangeSpec {
        key: "90-120 min",
        from: Some(90.0),
        to: Some(120.0),
    },
    RangeSpec {
        key: "120+ min",
        from: Some(120.0),
        to: None,
    },
];

/// Built-in facets, in the order they are requested
pub static FACET_SPECS: [FacetSpec; 8] = [
    FacetSpec {
        name: "cuisines",
        field: "cuisine_list.keyword",
        kind: FacetKind::Terms { size: 1000 },
        derived: None,
    },
    FacetSpec {
        name: "difficulty_levels",
        field: "difficulty.keyword",
        kind: FacetKind::Terms { size: 50 },
        derived: None,
    },
    FacetSpec {
        name: "dietary_profiles",
        field: "dietary_profile.keyword",
        kind: FacetKind::Terms { size: 50 },
        derived: None,
    },
    FacetSpec {
        name: "dietary_flags",
        field: "is_*",
        kind: FacetKind::Flags {
            flags: &DietaryFlag::ALL,
        },
        derived: None,
    },
    FacetSpec {
        name: "healthiness_stats",
        field: "healthiness_score",
        kind: FacetKind::Stats,
        derived: None,
    },
    FacetSpec {
        name: "prep_time_ranges",
        field: "est_prep_time_min",
        kind: FacetKind::Range {
            ranges: &PREP_TIME_RANGES,
        },
        derived: None,
    },
    FacetSpec {
        name: "cook_time_ranges",
        field: "est_cook_time_min",
        kind: FacetKind::Range {
            ranges: &COOK_TIME_RANGES,
        },
        derived: None,
    },
    FacetSpec {
        name: "total_time_ranges",
        field: "total_time_min",
        kind: FacetKind::Range {
            ranges: &TOTAL_TIME_RANGES,
        },
        derived: Some(&TOTAL_TIME),
    },
];

static GLOBAL: LazyLock<FacetRegistry> = LazyLock::new(|| {
    FacetRegistry::new(&FACET_SPECS).expect("built-in facet table must be consistent")
});

/// Aggregation clauses for a set of facets, plus the runtime fields they depend on
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationRequest {
    pub aggs: Value,
    pub runtime_mappings: Option<Value>,
}

/// Read-only table of facets, built once per process
#[derive(Debug)]
pub struct FacetRegistry {
    specs: &'static [FacetSpec],
}

impl FacetRegistry {
    /// Check the table: names unique, derived fields named after the field they back
    pub fn new(specs: &'static [FacetSpec]) -> Result<Self> {
        let mut names = HashSet::new();
        for spec in specs {
            if !names.insert(spec.name) {
                return Err(SearchError::Compilation(format!(
                    "facet '{}' is registered twice",
                    spec.name
                )));
            }
            if let Some(derived) = spec.derived {
                if derived.name != spec.field {
                    return Err(SearchError::Compilation(format!(
                        "facet '{}' reads '{}' but derives '{}'",
                        spec.name, spec.field, derived.name
                    )));
                }
            }
        }
        Ok(Self { specs })
    }

    /// The process-wide registry of built-in facets
    pub fn global() -> &'static FacetRegistry {
        &GLOBAL
    }

    pub fn specs(&self) -> &'static [FacetSpec] {
        self.specs
    }

    pub fn get(&self, name: &str) -> Option<&'static FacetSpec> {
        self.specs.iter().find(|spec| spec.name == name)
    }

    pub fn derived_field(&self, name: &str) -> Option<&'static DerivedField> {
        self.specs
            .iter()
            .filter_map(|spec| spec.derived)
            .find(|derived| derived.name == name)
    }

    /// Resolve requested facet names; an empty selection means every facet
    pub fn select(&self, names: &[String]) -> Result<Vec<&'static FacetSpec>> {
        if names.is_empty() {
            return Ok(self.specs.iter().collect());
        }

        let mut selected: Vec<&'static FacetSpec> = Vec::with_capacity(names.len());
        for name in names {
            let spec = self
                .get(name)
                .ok_or_else(|| SearchError::Compilation(format!("unknown facet '{}'", name)))?;
            if !selected.iter().any(|s| s.name == spec.name) {
                selected.push(spec);
            }
        }
        Ok(selected)
    }

    /// One aggregation clause per facet, tagged with the facet name
    pub fn build(&self, selected: &[&'static FacetSpec]) -> AggregationRequest {
        let mut aggs = Map::new();
        let mut runtime = Map::new();

        for spec in selected {
            aggs.insert(spec.name.to_string(), aggregation_clause(spec));
            if let Some(derived) = spec.derived {
                runtime.insert(derived.name.to_string(), derived.runtime_mapping());
            }
        }

        AggregationRequest {
            aggs: Value::Object(aggs),
            runtime_mappings: (!runtime.is_empty()).then_some(Value::Object(runtime)),
        }
    }

    /// Parse the engine's aggregation tree. Facets missing from the response come back empty;
    /// facets that cannot be parsed are logged and left out.
    pub fn parse(
        &self,
        selected: &[&'static FacetSpec],
        aggregations: Option<&Map<String, Value>>,
    ) -> FacetSummary {
        let mut summary = FacetSummary::default();

        for spec in selected {
            let Some(raw) = aggregations.and_then(|aggs| aggs.get(spec.name)) else {
                summary.insert(spec.name, empty_value(&spec.kind));
                continue;
            };

            match parse_facet(spec, raw) {
                Ok(value) => summary.insert(spec.name, value),
                Err(reason) => {
                    tracing::warn!(facet = spec.name, %reason, "Omitting unparseable facet");
                }
            }
        }

        summary
    }
}

fn aggregation_clause(spec: &FacetSpec) -> Value {
    match &spec.kind {
        FacetKind::Terms { size } => json!({
            "terms": { "field": spec.field, "size": size }
        }),
        FacetKind::Range { ranges } => {
            let ranges = ranges
                .iter()
                .map(|range| {
                    let mut clause = Map::new();
                    clause.insert("key".to_string(), json!(range.key));
                    if let Some(from) = range.from {
                        clause.insert("from".to_string(), json!(from));
                    }
                    if let Some(to) = range.to {
                        clause.insert("to".to_string(), json!(to));
                    }
                    Value::Object(clause)
                })
                .collect::<Vec<_>>();
            json!({ "range": { "field": spec.field, "ranges": ranges } })
        }
        FacetKind::Stats => json!({ "stats": { "field": spec.field } }),
        FacetKind::Flags { flags } => {
            let mut filters = Map::new();
            for flag in flags.iter() {
                filters.insert(
                    flag.label().to_string(),
                    json!({ "term": { flag.field(): true } }),
                );
                filters.insert(
                    flag.negated_label().to_string(),
                    json!({ "bool": { "must_not": [{ "term": { flag.field(): true } }] } }),
                );
            }
            json!({ "filters": { "filters": filters } })
        }
    }
}

fn empty_value(kind: &FacetKind) -> FacetValue {
    match kind {
        FacetKind::Stats => FacetValue::Stats(FacetStats::default()),
        _ => FacetValue::Buckets {
            buckets: Vec::new(),
        },
    }
}

fn parse_facet(spec: &FacetSpec, raw: &Value) -> std::result::Result<FacetValue, String> {
    match &spec.kind {
        FacetKind::Terms { .. } | FacetKind::Range { .. } => {
            let buckets = raw
                .get("buckets")
                .and_then(Value::as_array)
                .ok_or("missing bucket array")?
                .iter()
                .map(parse_bucket)
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(FacetValue::Buckets { buckets })
        }
        FacetKind::Stats => parse_stats(raw).map(FacetValue::Stats),
        FacetKind::Flags { flags } => {
            let raw_buckets = raw.get("buckets").ok_or("missing buckets")?;
            let mut buckets = Vec::with_capacity(flags.len() * 2);
            for flag in flags.iter() {
                for label in [flag.label(), flag.negated_label()] {
                    let count = named_bucket_count(raw_buckets, label)
                        .ok_or_else(|| format!("missing bucket '{}'", label))?;
                    buckets.push(FacetBucket::new(label, count));
                }
            }
            Ok(FacetValue::Buckets { buckets })
        }
    }
}

fn parse_bucket(bucket: &Value) -> std::result::Result<FacetBucket, String> {
    let label = match bucket.get("key") {
        Some(Value::String(key)) => key.clone(),
        Some(key) => bucket
            .get("key_as_string")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| key.to_string()),
        None => return Err("bucket without key".to_string()),
    };
    let count = bucket
        .get("doc_count")
        .and_then(Value::as_u64)
        .ok_or_else(|| format!("bucket '{}' without doc_count", label))?;
    Ok(FacetBucket::new(label, count))
}

/// Named filter buckets arrive keyed (`{"vegan": {"doc_count": 3}}`) or as an array with keys
fn named_bucket_count(buckets: &Value, label: &str) -> Option<u64> {
    match buckets {
        Value::Object(map) => map.get(label)?.get("doc_count")?.as_u64(),
        Value::Array(items) => items
            .iter()
            .find(|b| b.get("key").and_then(Value::as_str) == Some(label))?
            .get("doc_count")?
            .as_u64(),
        _ => None,
    }
}

fn parse_stats(raw: &Value) -> std::result::Result<FacetStats, String> {
    let count = raw
        .get("count")
        .and_then(Value::as_u64)
        .ok_or("stats without count")?;
    let number = |name: &str| raw.get(name).and_then(Value::as_f64);

    Ok(FacetStats {
        count,
        min: number("min"),
        max: number("max"),
        avg: number("avg").map(|avg| (avg * 10.0).round() / 10.0),
        sum: number("sum"),
    })
}
