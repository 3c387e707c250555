// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// One entry of a bucketed facet, e.g. `("italian", 12)` or `("15-30 min", 4)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FacetBucket {
    pub label: String,
    pub count: u64,
}

impl FacetBucket {
    pub fn new(label: impl Into<String>, count: u64) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

/// Summary statistics of a numeric facet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FacetStats {
    pub count: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Rounded to one decimal place
    pub avg: Option<f64>,
    pub sum: Option<f64>,
}

/// Parsed value of one facet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FacetValue {
    /// Buckets in the order the engine returned them
    Buckets { buckets: Vec<FacetBucket> },
    Stats(FacetStats),
}

impl FacetValue {
    pub fn buckets(&self) -> Option<&[FacetBucket]> {
        match self {
            FacetValue::Buckets { buckets } => Some(buckets),
            FacetValue::Stats(_) => None,
        }
    }

    pub fn stats(&self) -> Option<&FacetStats> {
        match self {
            FacetValue::Stats(stats) => Some(stats),
            FacetValue::Buckets { .. } => None,
        }
    }
}

/// Facet name to parsed facet value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct FacetSummary(pub BTreeMap<String, FacetValue>);

impl FacetSummary {
    pub fn get(&self, name: &str) -> Option<&FacetValue> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FacetValue) {
        self.0.insert(name.into(), value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Count of the bucket labelled `label` within facet `name`
    pub fn bucket_count(&self, name: &str, label: &str) -> Option<u64> {
        self.get(name)?
            .buckets()?
            .iter()
            .find(|bucket| bucket.label == label)
            .map(|bucket| bucket.count)
    }
}
