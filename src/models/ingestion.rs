// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Stages of one bulk ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IngestionState {
    Idle,
    Streaming,
    Indexing,
    Completed,
    Aborted,
}

impl IngestionState {
    /// Legal transitions of the ingestion state machine
    pub fn can_transition_to(&self, next: IngestionState) -> bool {
        use IngestionState::*;
        matches!(
            (self, next),
            (Idle, Streaming)
                | (Streaming, Indexing)
                | (Streaming, Completed)
                | (Indexing, Streaming)
                | (Indexing, Aborted)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, IngestionState::Completed | IngestionState::Aborted)
    }
}

impl std::fmt::Display for IngestionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestionState::Idle => write!(f, "idle"),
            IngestionState::Streaming => write!(f, "streaming"),
            IngestionState::Indexing => write!(f, "indexing"),
            IngestionState::Completed => write!(f, "completed"),
            IngestionState::Aborted => write!(f, "aborted"),
        }
    }
}

/// A document ready for a bulk write, keyed by its upsert id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkDocument {
    pub id: String,
    pub source: serde_json::Value,
}

/// Result of writing one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BatchOutcome {
    pub succeeded: u64,
    pub failed: u64,
    pub first_error: Option<String>,
}

/// A fixed-size slice of the corpus on its way to the engine
#[derive(Debug, Clone)]
pub struct BulkBatch {
    pub index: u64,
    pub documents: Vec<BulkDocument>,
    pub outcome: Option<BatchOutcome>,
}

impl BulkBatch {
    pub fn new(index: u64, documents: Vec<BulkDocument>) -> Self {
        Self {
            index,
            documents,
            outcome: None,
        }
    }
}

/// Aggregate of every batch outcome of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IngestionReport {
    pub started_at: DateTime<Utc>,
    pub state: IngestionState,
    /// Documents in batches the engine answered for
    pub total_attempted: u64,
    pub total_indexed: u64,
    pub total_failed: u64,
    pub batches_completed: u64,
    pub duration_ms: u64,
    /// Why the run stopped early, if it did
    pub error: Option<String>,
}

impl IngestionReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            state: IngestionState::Idle,
            total_attempted: 0,
            total_indexed: 0,
            total_failed: 0,
            batches_completed: 0,
            duration_ms: 0,
            error: None,
        }
    }

    pub fn record(&mut self, outcome: &BatchOutcome) {
        self.total_attempted += outcome.succeeded + outcome.failed;
        self.total_indexed += outcome.succeeded;
        self.total_failed += outcome.failed;
        self.batches_completed += 1;
    }

    pub fn is_aborted(&self) -> bool {
        self.state == IngestionState::Aborted
    }
}
