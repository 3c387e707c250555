// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::models::ingestion::{
    BatchOutcome, BulkBatch, BulkDocument, IngestionReport, IngestionState,
};
use crate::services::bridge::ExecutionBridge;
use crate::services::events::{EventSink, SearchEvent};
use anyhow::{Context, Result};
use chrono::Utc;
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_BATCH_SIZE: usize = 500;

pub const DEFAULT_BULK_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct IngestionConfig {
    /// Documents per bulk call
    pub batch_size: usize,
    /// Deadline of each bulk call
    pub deadline: Duration,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            deadline: DEFAULT_BULK_TIMEOUT,
        }
    }
}

/// Streams a corpus into the index in fixed-size batches, one bulk call per batch.
///
/// Documents the engine refuses are counted and the run goes on. A failed bulk call aborts the
/// run; the report keeps whatever completed before. Documents are written by id, so re-running
/// the same corpus overwrites instead of duplicating.
pub struct BulkIngestionPipeline {
    bridge: ExecutionBridge,
    index: String,
    config: IngestionConfig,
    events: Arc<dyn EventSink>,
}

impl BulkIngestionPipeline {
    pub fn new(
        bridge: ExecutionBridge,
        index: impl Into<String>,
        config: IngestionConfig,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            bridge,
            index: index.into(),
            config,
            events,
        }
    }

    pub async fn run_iter<I>(&self, documents: I) -> IngestionReport
    where
        I: IntoIterator<Item = Value>,
    {
        self.run(futures::stream::iter(documents)).await
    }

    /// Batches are submitted and recorded in index order
    pub async fn run<S>(&self, documents: S) -> IngestionReport
    where
        S: Stream<Item = Value>,
    {
        let started = Instant::now();
        let mut report = IngestionReport::new(Utc::now());
        advance(&mut report, IngestionState::Streaming);

        let mut batches = std::pin::pin!(documents.chunks(self.config.batch_size.max(1)));
        let mut batch_index = 0u64;

        while let Some(chunk) = batches.next().await {
            let batch = BulkBatch::new(batch_index, chunk.into_iter().map(bulk_document).collect());
            advance(&mut report, IngestionState::Indexing);

            match self.index_batch(batch).await {
                Ok(batch) => {
                    if let Some(outcome) = &batch.outcome {
                        report.record(outcome);
                    }
                    advance(&mut report, IngestionState::Streaming);
                }
                Err(e) => {
                    tracing::error!(batch_index, error = %e, "Aborting bulk ingestion");
                    report.error = Some(e.to_string());
                    advance(&mut report, IngestionState::Aborted);
                    break;
                }
            }

            batch_index += 1;
        }

        if !report.state.is_terminal() {
            advance(&mut report, IngestionState::Completed);
        }
        report.duration_ms = started.elapsed().as_millis() as u64;

        self.events.record(SearchEvent::BulkRunFinished {
            state: report.state,
            total_indexed: report.total_indexed,
            total_failed: report.total_failed,
            duration_ms: report.duration_ms,
        });
        tracing::info!(
            state = %report.state,
            indexed = report.total_indexed,
            failed = report.total_failed,
            batches = report.batches_completed,
            duration_ms = report.duration_ms,
            "Bulk ingestion finished"
        );

        report
    }

    async fn index_batch(&self, mut batch: BulkBatch) -> crate::error::Result<BulkBatch> {
        let started = Instant::now();
        let documents = std::mem::take(&mut batch.documents);
        let attempted = documents.len();

        let response = self
            .bridge
            .bulk(&self.index, documents, self.config.deadline)
            .await?;

        let outcome = BatchOutcome {
            succeeded: response.succeeded(),
            failed: response.failed(),
            first_error: response.first_error(),
        };

        if outcome.failed > 0 {
            tracing::warn!(
                batch_index = batch.index,
                failed = outcome.failed,
                first_error = outcome.first_error.as_deref().unwrap_or_default(),
                "Some documents were not indexed"
            );
        }
        tracing::debug!(
            batch_index = batch.index,
            attempted,
            succeeded = outcome.succeeded,
            "Indexed batch"
        );

        self.events.record(SearchEvent::BulkBatchCompleted {
            batch_index: batch.index,
            succeeded: outcome.succeeded,
            failed: outcome.failed,
            latency_ms: started.elapsed().as_millis() as u64,
        });

        batch.outcome = Some(outcome);
        Ok(batch)
    }
}

fn advance(report: &mut IngestionReport, next: IngestionState) {
    debug_assert!(
        report.state.can_transition_to(next),
        "illegal ingestion transition {} -> {}",
        report.state,
        next
    );
    report.state = next;
}

fn bulk_document(source: Value) -> BulkDocument {
    BulkDocument {
        id: document_id(&source),
        source,
    }
}

/// The document's own `id`, or an MD5 of its lower-cased title and sorted lower-cased
/// ingredients so that duplicates of one recipe share an id
pub fn document_id(source: &Value) -> String {
    match source.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => return id.trim().to_string(),
        Some(Value::Number(id)) => return id.to_string(),
        _ => {}
    }

    let title = source
        .get("recipe_title")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    let mut ingredients: Vec<String> = source
        .get("ingredients")
        .or_else(|| source.get("ingredients_raw"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|i| i.trim().to_lowercase())
                .collect()
        })
        .unwrap_or_default();
    ingredients.sort();

    let key = format!("{}|{}", title, ingredients.join("||"));
    format!("{:x}", md5::compute(key.as_bytes()))
}

/// Read a corpus file holding a JSON array of recipes
pub fn load_corpus(path: &Path) -> Result<Vec<Value>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file {}", path.display()))?;
    let documents: Vec<Value> = serde_json::from_str(&raw)
        .with_context(|| format!("Corpus file {} is not a JSON array", path.display()))?;
    tracing::info!(path = %path.display(), documents = documents.len(), "Loaded corpus");
    Ok(documents)
}
