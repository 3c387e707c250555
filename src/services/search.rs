// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::error::Result;
use crate::models::search::{SearchRequest, SearchResult};
use crate::services::bridge::ExecutionBridge;
use crate::services::events::{EventSink, QueryOutcome, SearchEvent};
use crate::services::normalizer::ResponseNormalizer;
use crate::services::query::{CompiledQuery, QueryAssembler, QueryConfig};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Recipe search: validate, compile, execute through the bridge, normalize
pub struct SearchService {
    bridge: ExecutionBridge,
    index: String,
    assembler: QueryAssembler,
    normalizer: ResponseNormalizer,
    deadline: Duration,
    events: Arc<dyn EventSink>,
}

impl SearchService {
    pub fn new(
        bridge: ExecutionBridge,
        index: impl Into<String>,
        config: QueryConfig,
        deadline: Duration,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            bridge,
            index: index.into(),
            assembler: QueryAssembler::new(config),
            normalizer: ResponseNormalizer::default(),
            deadline,
            events,
        }
    }

    /// Search recipes. Malformed requests are rejected before anything reaches the engine.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResult> {
        let request_id = Uuid::now_v7();
        let span = tracing::info_span!("search", %request_id, index = %self.index);

        async {
            request.validate(self.assembler.config().max_page_size)?;
            let query = self.assembler.assemble(request)?;
            self.execute(&query).await
        }
        .instrument(span)
        .await
    }

    /// Aggregations over the whole index, no hits
    pub async fn facet_overview(&self) -> Result<SearchResult> {
        let request = SearchRequest {
            size: 0,
            include_aggregations: true,
            ..SearchRequest::default()
        };
        let query = self.assembler.assemble(&request)?;
        self.execute(&query)
            .instrument(tracing::info_span!("facet_overview", index = %self.index))
            .await
    }

    async fn execute(&self, query: &CompiledQuery) -> Result<SearchResult> {
        tracing::debug!(query = %query, "Compiled search query");

        let started = Instant::now();
        let outcome = self.bridge.search(&self.index, query, self.deadline).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(raw) => {
                if raw.timed_out {
                    tracing::warn!("Engine reported a partial result after timing out");
                }
                let result = self.normalizer.normalize(raw, query, elapsed);
                self.events.record(SearchEvent::QueryCompleted {
                    latency_ms: result.elapsed_ms,
                    total_hits: Some(result.total),
                    outcome: QueryOutcome::Success,
                });
                tracing::info!(
                    total = result.total,
                    returned = result.recipes.len(),
                    elapsed_ms = result.elapsed_ms,
                    "Search completed"
                );
                Ok(result)
            }
            Err(e) => {
                self.events.record(SearchEvent::QueryCompleted {
                    latency_ms: elapsed.as_millis() as u64,
                    total_hits: None,
                    outcome: QueryOutcome::from(&e),
                });
                Err(e)
            }
        }
    }
}
