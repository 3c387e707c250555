// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Timing and outcome events for an external metrics collector.

use crate::error::SearchError;
use crate::models::health::HealthStatus;
use crate::models::ingestion::IngestionState;
use serde::Serialize;
use std::sync::{Mutex, PoisonError};

pub const EVENTS_TARGET: &str = "dishcovery::events";

/// How a search call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOutcome {
    Success,
    Validation,
    Compilation,
    Timeout,
    Unavailable,
    Rejected,
    Internal,
}

impl From<&SearchError> for QueryOutcome {
    fn from(error: &SearchError) -> Self {
        match error {
            SearchError::Validation(_) => QueryOutcome::Validation,
            SearchError::Compilation(_) => QueryOutcome::Compilation,
            SearchError::Timeout { .. } => QueryOutcome::Timeout,
            SearchError::EngineUnavailable { .. } => QueryOutcome::Unavailable,
            SearchError::EngineRejected { .. } => QueryOutcome::Rejected,
            SearchError::Internal(_) => QueryOutcome::Internal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SearchEvent {
    QueryCompleted {
        latency_ms: u64,
        total_hits: Option<u64>,
        outcome: QueryOutcome,
    },
    BulkBatchCompleted {
        batch_index: u64,
        succeeded: u64,
        failed: u64,
        latency_ms: u64,
    },
    BulkRunFinished {
        state: IngestionState,
        total_indexed: u64,
        total_failed: u64,
        duration_ms: u64,
    },
    HealthChecked {
        status: HealthStatus,
        latency_ms: u64,
    },
}

/// Receives events; must not block
pub trait EventSink: Send + Sync {
    fn record(&self, event: SearchEvent);
}

/// Emits every event as a structured `tracing` event on `dishcovery::events`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record(&self, event: SearchEvent) {
        match event {
            SearchEvent::QueryCompleted {
                latency_ms,
                total_hits,
                outcome,
            } => tracing::info!(
                target: EVENTS_TARGET,
                event = "query_completed",
                latency_ms,
                total_hits,
                outcome = ?outcome,
            ),
            SearchEvent::BulkBatchCompleted {
                batch_index,
                succeeded,
                failed,
                latency_ms,
            } => tracing::info!(
                target: EVENTS_TARGET,
                event = "bulk_batch_completed",
                batch_index,
                succeeded,
                failed,
                latency_ms,
            ),
            SearchEvent::BulkRunFinished {
                state,
                total_indexed,
                total_failed,
                duration_ms,
            } => tracing::info!(
                target: EVENTS_TARGET,
                event = "bulk_run_finished",
                state = %state,
                total_indexed,
                total_failed,
                duration_ms,
            ),
            SearchEvent::HealthChecked { status, latency_ms } => tracing::info!(
                target: EVENTS_TARGET,
                event = "health_checked",
                status = %status,
                latency_ms,
            ),
        }
    }
}

/// Keeps events in memory, in arrival order
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<SearchEvent>>,
}

impl CollectingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SearchEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EventSink for CollectingEventSink {
    fn record(&self, event: SearchEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
