// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::error::Operation;
use crate::models::health::{HealthReport, HealthStatus};
use crate::services::bridge::ExecutionBridge;
use crate::services::events::{EventSink, SearchEvent};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Kept well below the search deadline so probes fail fast
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

pub struct HealthProbe {
    bridge: ExecutionBridge,
    index: String,
    deadline: Duration,
    events: Arc<dyn EventSink>,
}

impl HealthProbe {
    pub fn new(
        bridge: ExecutionBridge,
        index: impl Into<String>,
        deadline: Duration,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            bridge,
            index: index.into(),
            deadline,
            events,
        }
    }

    /// Never fails: an engine that cannot be asked is reported as unreachable
    pub async fn check(&self) -> HealthReport {
        let started = Instant::now();
        let index = self.index.clone();

        let outcome = self
            .bridge
            .execute(Operation::Health, self.deadline, move |engine| {
                let cluster = engine.cluster_health()?;
                let index_exists = engine.index_exists(&index)?;
                Ok((cluster, index_exists))
            })
            .await;

        let latency_ms = started.elapsed().as_millis() as u64;

        let report = match outcome {
            Ok((cluster, index_exists)) => {
                let (status, detail) = classify(&cluster.status);
                HealthReport {
                    status,
                    cluster_name: Some(cluster.cluster_name),
                    number_of_nodes: Some(cluster.number_of_nodes),
                    index_exists: Some(index_exists),
                    detail,
                    latency_ms,
                }
            }
            Err(e) => HealthReport {
                status: HealthStatus::Unreachable,
                cluster_name: None,
                number_of_nodes: None,
                index_exists: None,
                detail: Some(e.to_string()),
                latency_ms,
            },
        };

        self.events.record(SearchEvent::HealthChecked {
            status: report.status,
            latency_ms,
        });
        if report.status != HealthStatus::Healthy {
            tracing::warn!(
                status = %report.status,
                detail = ?report.detail,
                "Search engine not healthy"
            );
        }

        report
    }
}

/// Map the engine's cluster color onto the three-level classification
fn classify(cluster_status: &str) -> (HealthStatus, Option<String>) {
    match cluster_status {
        "green" => (HealthStatus::Healthy, None),
        "yellow" => (
            HealthStatus::Degraded,
            Some("replica shards are unassigned".to_string()),
        ),
        "red" => (
            HealthStatus::Degraded,
            Some("primary shards are unassigned; some data is unavailable".to_string()),
        ),
        other => (
            HealthStatus::Degraded,
            Some(format!("unknown cluster status '{}'", other)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_cluster_colors() {
        assert_eq!(classify("green"), (HealthStatus::Healthy, None));
        assert_eq!(classify("yellow").0, HealthStatus::Degraded);
        let (status, detail) = classify("red");
        assert_eq!(status, HealthStatus::Degraded);
        assert!(detail.unwrap().contains("primary"));
        assert_eq!(classify("purple").0, HealthStatus::Degraded);
    }
}
