// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Blocking search engine seam and the wire types it speaks.

use crate::error::EngineError;
use crate::models::health::ClusterHealth;
use crate::models::ingestion::BulkDocument;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A search engine client. Calls block the current thread; the execution bridge keeps them off
/// the request-handling scheduler. Implementations must allow concurrent independent calls.
pub trait SearchEngine: Send + Sync {
    fn search(&self, index: &str, body: &Value) -> Result<RawSearchResponse, EngineError>;

    /// Index documents, overwriting any with the same id
    fn bulk(&self, index: &str, documents: &[BulkDocument]) -> Result<BulkResponse, EngineError>;

    fn cluster_health(&self) -> Result<ClusterHealth, EngineError>;

    fn index_exists(&self, index: &str) -> Result<bool, EngineError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSearchResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    pub hits: RawHits,
    #[serde(default)]
    pub aggregations: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawHits {
    #[serde(default)]
    pub total: Option<TotalHits>,
    #[serde(default)]
    pub hits: Vec<RawHit>,
}

/// Queries set `track_total_hits`, so the reported total is always exact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalHits {
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: Value,
}

/// Per-document outcome of a bulk write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkItem {
    pub id: String,
    pub status: u16,
    #[serde(default)]
    pub error: Option<BulkItemError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkItemError {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl std::fmt::Display for BulkItemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{}: {}", self.kind, reason),
            None => write!(f, "{}", self.kind),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub took: u64,
    pub errors: bool,
    pub items: Vec<BulkItem>,
}

impl BulkResponse {
    pub fn from_items(took: u64, items: Vec<BulkItem>) -> Self {
        Self {
            took,
            errors: items.iter().any(|item| item.error.is_some()),
            items,
        }
    }

    pub fn succeeded(&self) -> u64 {
        self.items.iter().filter(|item| item.error.is_none()).count() as u64
    }

    pub fn failed(&self) -> u64 {
        self.items.iter().filter(|item| item.error.is_some()).count() as u64
    }

    pub fn first_error(&self) -> Option<String> {
        self.items
            .iter()
            .find_map(|item| item.error.as_ref().map(|e| format!("{}: {}", item.id, e)))
    }
}
