// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::error::EngineError;
use crate::models::health::ClusterHealth;
use crate::models::ingestion::BulkDocument;
use crate::services::engine::{
    BulkItem, BulkItemError, BulkResponse, RawSearchResponse, SearchEngine,
};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Longest engine error body kept in a rejection reason
const MAX_REASON_LEN: usize = 512;

#[derive(Debug, Clone)]
pub struct ElasticsearchConfig {
    pub url: Url,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Client-side timeout of a single HTTP call
    pub request_timeout: Duration,
}

impl ElasticsearchConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            username: None,
            password: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Blocking Elasticsearch REST client.
///
/// The underlying `reqwest` blocking client owns its own runtime, so it must be created and
/// dropped outside of any async context.
pub struct ElasticsearchClient {
    http: Client,
    base: Url,
    username: Option<String>,
    password: Option<String>,
}

impl ElasticsearchClient {
    pub fn new(config: ElasticsearchConfig) -> Result<Self, EngineError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| EngineError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        // `Url::join` replaces the last path segment unless the base ends with a slash
        let mut base = config.url;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        tracing::info!(url = %base, "Configured Elasticsearch client");

        Ok(Self {
            http,
            base,
            username: config.username,
            password: config.password,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, EngineError> {
        self.base
            .join(path)
            .map_err(|e| EngineError::Transport(format!("Invalid endpoint '{}': {}", path, e)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(username) => request.basic_auth(username, self.password.as_deref()),
            None => request,
        }
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, EngineError> {
        let response = self.authorize(request).send().map_err(transport_error)?;
        check_status(response)
    }
}

impl SearchEngine for ElasticsearchClient {
    fn search(&self, index: &str, body: &Value) -> Result<RawSearchResponse, EngineError> {
        let url = self.endpoint(&format!("{}/_search", index))?;
        let response = self.send(self.http.post(url).json(body))?;
        response
            .json::<RawSearchResponse>()
            .map_err(|e| EngineError::Decode(e.to_string()))
    }

    fn bulk(&self, index: &str, documents: &[BulkDocument]) -> Result<BulkResponse, EngineError> {
        let url = self.endpoint(&format!("{}/_bulk", index))?;

        let mut payload = String::new();
        for document in documents {
            let action = serde_json::json!({ "index": { "_id": document.id } });
            payload.push_str(&action.to_string());
            payload.push('\n');
            payload.push_str(&document.source.to_string());
            payload.push('\n');
        }

        let response = self.send(
            self.http
                .post(url)
                .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
                .body(payload),
        )?;

        let raw = response
            .json::<EsBulkResponse>()
            .map_err(|e| EngineError::Decode(e.to_string()))?;

        let items = raw
            .items
            .into_iter()
            .filter_map(|mut entry| entry.drain().next().map(|(_, item)| item))
            .map(|item| BulkItem {
                id: item.id.unwrap_or_default(),
                status: item.status,
                error: item.error,
            })
            .collect();

        Ok(BulkResponse::from_items(raw.took, items))
    }

    fn cluster_health(&self) -> Result<ClusterHealth, EngineError> {
        let url = self.endpoint("_cluster/health")?;
        let response = self.send(self.http.get(url))?;
        response
            .json::<ClusterHealth>()
            .map_err(|e| EngineError::Decode(e.to_string()))
    }

    fn index_exists(&self, index: &str) -> Result<bool, EngineError> {
        let url = self.endpoint(index)?;
        let response = self
            .authorize(self.http.head(url))
            .send()
            .map_err(transport_error)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => check_status(response).map(|_| true),
        }
    }
}

/// One entry of the bulk `items` array: `{"index": {...}}`
#[derive(Deserialize)]
struct EsBulkResponse {
    #[serde(default)]
    took: u64,
    items: Vec<HashMap<String, EsBulkItem>>,
}

#[derive(Deserialize)]
struct EsBulkItem {
    #[serde(rename = "_id")]
    id: Option<String>,
    status: u16,
    #[serde(default)]
    error: Option<BulkItemError>,
}

fn transport_error(error: reqwest::Error) -> EngineError {
    if error.is_timeout() {
        EngineError::Timeout
    } else {
        EngineError::Transport(error.to_string())
    }
}

fn check_status(response: Response) -> Result<Response, EngineError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    let reason: String = body.chars().take(MAX_REASON_LEN).collect();

    if status.is_server_error() {
        Err(EngineError::Transport(format!("HTTP {}: {}", status, reason)))
    } else {
        Err(EngineError::Rejected {
            status: status.as_u16(),
            reason,
        })
    }
}
