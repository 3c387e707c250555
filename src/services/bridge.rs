// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Execution bridge between the async request layer and the blocking engine client.
//!
//! Every call takes a slot from a fixed-size pool, runs the blocking engine call on tokio's
//! blocking threads and is bounded by a deadline that also covers waiting for a slot. When the
//! deadline passes, or the caller drops the future, the slot is released and whatever the engine
//! eventually returns is discarded. The in-flight engine call itself is not interrupted.

use crate::error::{EngineError, Operation, Result, SearchError};
use crate::models::ingestion::BulkDocument;
use crate::services::engine::{BulkResponse, RawSearchResponse, SearchEngine};
use crate::services::query::CompiledQuery;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

pub const DEFAULT_WORKERS: usize = 8;

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Engine calls allowed in flight at once
    pub workers: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
        }
    }
}

#[derive(Clone)]
pub struct ExecutionBridge {
    engine: Arc<dyn SearchEngine>,
    slots: Arc<Semaphore>,
}

impl ExecutionBridge {
    pub fn new(engine: Arc<dyn SearchEngine>, config: BridgeConfig) -> Self {
        Self {
            engine,
            slots: Arc::new(Semaphore::new(config.workers.max(1))),
        }
    }

    /// Slots not currently held by a call
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Run `call` against the engine on a worker, bounded by `deadline`. No retries.
    pub async fn execute<T, F>(
        &self,
        operation: Operation,
        deadline: Duration,
        call: F,
    ) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn SearchEngine) -> std::result::Result<T, EngineError> + Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        let slots = Arc::clone(&self.slots);

        let run = async move {
            // Held by this future, so dropping the future frees the slot
            let _permit = slots
                .acquire_owned()
                .await
                .map_err(|_| SearchError::Internal("execution bridge is closed".to_string()))?;

            match tokio::task::spawn_blocking(move || call(engine.as_ref())).await {
                Ok(result) => result.map_err(|e| e.classify(operation, deadline)),
                Err(join_error) => {
                    tracing::error!(%operation, error = %join_error, "Engine worker failed");
                    Err(SearchError::Internal(format!(
                        "{} worker terminated unexpectedly",
                        operation
                    )))
                }
            }
        };

        match tokio::time::timeout(deadline, run).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    %operation,
                    deadline_ms = deadline.as_millis() as u64,
                    "Engine call exceeded its deadline"
                );
                Err(SearchError::Timeout {
                    operation,
                    deadline,
                })
            }
        }
    }

    pub async fn search(
        &self,
        index: &str,
        query: &CompiledQuery,
        deadline: Duration,
    ) -> Result<RawSearchResponse> {
        let index = index.to_string();
        let body = query.body().clone();
        self.execute(Operation::Search, deadline, move |engine| {
            engine.search(&index, &body)
        })
        .await
    }

    pub async fn bulk(
        &self,
        index: &str,
        documents: Vec<BulkDocument>,
        deadline: Duration,
    ) -> Result<BulkResponse> {
        let index = index.to_string();
        self.execute(Operation::Bulk, deadline, move |engine| {
            engine.bulk(&index, &documents)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory_engine::InMemoryEngine;

    fn bridge(engine: InMemoryEngine, workers: usize) -> ExecutionBridge {
        ExecutionBridge::new(Arc::new(engine), BridgeConfig { workers })
    }

    #[tokio::test]
    async fn test_successful_call_returns_result() {
        let bridge = bridge(InMemoryEngine::new(), 2);
        let health = bridge
            .execute(Operation::Health, Duration::from_secs(1), |engine| {
                engine.cluster_health()
            })
            .await
            .unwrap();
        assert_eq!(health.status, "green");
        assert_eq!(bridge.available_slots(), 2);
    }

    #[tokio::test]
    async fn test_engine_failure_is_classified() {
        let engine = InMemoryEngine::new();
        engine.set_available(false);
        let bridge = bridge(engine, 1);

        let err = bridge
            .execute(Operation::Health, Duration::from_secs(1), |engine| {
                engine.cluster_health()
            })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SearchError::EngineUnavailable {
                operation: Operation::Health
            }
        );
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_worker_panic_becomes_internal_error() {
        let bridge = bridge(InMemoryEngine::new(), 1);
        let err = bridge
            .execute::<(), _>(Operation::Search, Duration::from_secs(1), |_| {
                panic!("engine client bug")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Internal(_)));
        assert_eq!(bridge.available_slots(), 1);
    }
}
