// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Error taxonomy for the search core.
//!
//! `SearchError` is what callers see. `EngineError` is what a concrete engine client reports;
//! the execution bridge classifies it into a `SearchError` so raw engine internals never reach
//! the caller.

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

/// Operation kind passed through the execution bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Search,
    Bulk,
    Health,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Search => write!(f, "search"),
            Operation::Bulk => write!(f, "bulk"),
            Operation::Health => write!(f, "health"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    /// Malformed request, rejected before any query is compiled.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Request references something the facet registry or filter compiler does not know.
    #[error("Query compilation failed: {0}")]
    Compilation(String),

    #[error("{operation} call exceeded its deadline of {}ms", deadline.as_millis())]
    Timeout {
        operation: Operation,
        deadline: Duration,
    },

    #[error("Search engine unavailable during {operation} call")]
    EngineUnavailable { operation: Operation },

    /// The engine answered but refused the call. Only the status is surfaced.
    #[error("Search engine rejected {operation} call with status {status}")]
    EngineRejected { operation: Operation, status: u16 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SearchError {
    /// Timeouts and unavailability may succeed if the caller tries again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SearchError::Timeout { .. } | SearchError::EngineUnavailable { .. }
        )
    }
}

/// Failure reported by a blocking engine client.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("engine call timed out")]
    Timeout,

    #[error("engine rejected request with status {status}: {reason}")]
    Rejected { status: u16, reason: String },

    #[error("could not decode engine response: {0}")]
    Decode(String),
}

impl EngineError {
    /// Classify into the caller-facing taxonomy, logging the raw cause.
    pub fn classify(self, operation: Operation, deadline: Duration) -> SearchError {
        match self {
            EngineError::Transport(cause) => {
                tracing::error!(%operation, %cause, "Search engine unreachable");
                SearchError::EngineUnavailable { operation }
            }
            EngineError::Timeout => {
                tracing::warn!(%operation, "Search engine client timed out");
                SearchError::Timeout {
                    operation,
                    deadline,
                }
            }
            EngineError::Rejected { status, reason } => {
                tracing::warn!(%operation, status, %reason, "Search engine rejected call");
                SearchError::EngineRejected { operation, status }
            }
            EngineError::Decode(cause) => {
                tracing::error!(%operation, %cause, "Unexpected search engine response");
                SearchError::Internal(format!("unexpected engine response for {operation} call"))
            }
        }
    }
}
