// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use dishcovery_search::app::{create_router, AppState, VERSION};
use dishcovery_search::models::health::HealthStatus;
use dishcovery_search::models::search::SearchRequest;
use dishcovery_search::services::bridge::{BridgeConfig, ExecutionBridge, DEFAULT_WORKERS};
use dishcovery_search::services::elasticsearch::{ElasticsearchClient, ElasticsearchConfig};
use dishcovery_search::services::engine::SearchEngine;
use dishcovery_search::services::events::{EventSink, TracingEventSink};
use dishcovery_search::services::health::HealthProbe;
use dishcovery_search::services::ingestion::{
    load_corpus, BulkIngestionPipeline, IngestionConfig, DEFAULT_BATCH_SIZE,
};
use dishcovery_search::services::logging::init_tracing;
use dishcovery_search::services::memory_engine::InMemoryEngine;
use dishcovery_search::services::query::{AggregationScope, QueryConfig};
use dishcovery_search::services::search::SearchService;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EngineKind {
    Elasticsearch,
    /// In-process engine, nothing persisted
    Memory,
}

#[derive(Debug, Parser)]
#[command(name = "dishcovery-search", version = VERSION, about = "Recipe search service")]
struct Cli {
    #[arg(
        long,
        global = true,
        value_enum,
        env = "SEARCH_ENGINE",
        default_value_t = EngineKind::Elasticsearch
    )]
    engine: EngineKind,

    #[arg(long, global = true, env = "ELASTICSEARCH_URL", default_value = "http://localhost:9200")]
    elasticsearch_url: Url,

    #[arg(long, global = true, env = "ELASTICSEARCH_INDEX", default_value = "recipes")]
    index: String,

    #[arg(long, global = true, env = "ELASTICSEARCH_USERNAME")]
    username: Option<String>,

    #[arg(long, global = true, env = "ELASTICSEARCH_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Engine calls allowed in flight at once
    #[arg(long, global = true, env = "ENGINE_WORKERS", default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    #[arg(long, global = true, env = "SEARCH_TIMEOUT_MS", default_value_t = 10_000)]
    search_timeout_ms: u64,

    #[arg(long, global = true, env = "BULK_TIMEOUT_MS", default_value_t = 60_000)]
    bulk_timeout_ms: u64,

    #[arg(long, global = true, env = "HEALTH_TIMEOUT_MS", default_value_t = 2_000)]
    health_timeout_ms: u64,

    #[arg(long, global = true, env = "BULK_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    bulk_batch_size: usize,

    /// Which hit set facets describe
    #[arg(
        long,
        global = true,
        value_enum,
        env = "AGGREGATION_SCOPE",
        default_value_t = AggregationScope::FilteredResults
    )]
    aggregation_scope: AggregationScope,

    /// Log one JSON object per line
    #[arg(long, global = true, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve {
        #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
        bind: SocketAddr,

        /// Load this corpus at startup when the index is missing or empty
        #[arg(long, env = "BOOTSTRAP_CORPUS")]
        bootstrap_corpus: Option<PathBuf>,
    },
    /// Index a JSON array of recipes and print the ingestion report
    BulkLoad {
        #[arg(long)]
        file: PathBuf,
    },
    /// Check the engine and print the health report
    Health,
}

struct Services {
    search: Arc<SearchService>,
    ingestion: Arc<BulkIngestionPipeline>,
    health: Arc<HealthProbe>,
}

// The blocking HTTP client owns a runtime of its own, so it is built here and dropped here,
// outside of the async runtime below
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json)?;

    let engine = build_engine(&cli)?;

    // Requests are handled on one cooperative thread; engine calls go to the blocking pool
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .max_blocking_threads(cli.workers.max(1))
        .build()
        .context("Failed to build tokio runtime")?;

    let result = runtime.block_on(run(cli, Arc::clone(&engine)));
    drop(runtime);
    result
}

fn build_engine(cli: &Cli) -> anyhow::Result<Arc<dyn SearchEngine>> {
    match cli.engine {
        EngineKind::Elasticsearch => {
            let config = ElasticsearchConfig {
                url: cli.elasticsearch_url.clone(),
                username: cli.username.clone(),
                password: cli.password.clone(),
                request_timeout: Duration::from_millis(
                    cli.search_timeout_ms.max(cli.bulk_timeout_ms),
                ),
            };
            let client = ElasticsearchClient::new(config)
                .map_err(|e| anyhow::anyhow!("Failed to create Elasticsearch client: {}", e))?;
            Ok(Arc::new(client))
        }
        EngineKind::Memory => {
            tracing::info!("Using in-memory search engine");
            let engine = InMemoryEngine::new();
            engine.create_index(&cli.index);
            Ok(Arc::new(engine))
        }
    }
}

fn build_services(cli: &Cli, engine: Arc<dyn SearchEngine>) -> Services {
    let events: Arc<dyn EventSink> = Arc::new(TracingEventSink);
    let bridge = ExecutionBridge::new(
        engine,
        BridgeConfig {
            workers: cli.workers,
        },
    );

    let query_config = QueryConfig {
        aggregation_scope: cli.aggregation_scope,
        ..QueryConfig::default()
    };

    Services {
        search: Arc::new(SearchService::new(
            bridge.clone(),
            cli.index.clone(),
            query_config,
            Duration::from_millis(cli.search_timeout_ms),
            Arc::clone(&events),
        )),
        ingestion: Arc::new(BulkIngestionPipeline::new(
            bridge.clone(),
            cli.index.clone(),
            IngestionConfig {
                batch_size: cli.bulk_batch_size,
                deadline: Duration::from_millis(cli.bulk_timeout_ms),
            },
            Arc::clone(&events),
        )),
        health: Arc::new(HealthProbe::new(
            bridge,
            cli.index.clone(),
            Duration::from_millis(cli.health_timeout_ms),
            events,
        )),
    }
}

async fn run(cli: Cli, engine: Arc<dyn SearchEngine>) -> anyhow::Result<()> {
    let services = build_services(&cli, engine);

    match cli.command {
        Command::Serve {
            bind,
            bootstrap_corpus,
        } => {
            if let Some(corpus) = bootstrap_corpus {
                bootstrap(&services, &corpus).await?;
            }
            serve(services, bind).await
        }
        Command::BulkLoad { file } => {
            let documents = load_corpus(&file)?;
            let report = services.ingestion.run_iter(documents).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.is_aborted() {
                anyhow::bail!("Bulk load aborted: {}", report.error.unwrap_or_default());
            }
            Ok(())
        }
        Command::Health => {
            let report = services.health.check().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.status == HealthStatus::Unreachable {
                anyhow::bail!("Search engine unreachable");
            }
            Ok(())
        }
    }
}

/// Load `corpus` unless the index already holds documents
async fn bootstrap(services: &Services, corpus: &Path) -> anyhow::Result<()> {
    let health = services.health.check().await;

    let populated = if health.index_exists == Some(true) {
        let count_only = SearchRequest {
            size: 0,
            ..SearchRequest::default()
        };
        match services.search.search(&count_only).await {
            Ok(result) => result.total > 0,
            Err(e) => {
                tracing::warn!(error = %e, "Could not count indexed recipes");
                false
            }
        }
    } else {
        false
    };

    if populated {
        tracing::info!("Index already populated, skipping bootstrap");
        return Ok(());
    }

    let documents = load_corpus(corpus)?;
    let report = services.ingestion.run_iter(documents).await;
    if report.is_aborted() {
        tracing::warn!(
            error = report.error.as_deref().unwrap_or_default(),
            indexed = report.total_indexed,
            "Bootstrap load aborted, serving what was indexed"
        );
    }
    Ok(())
}

async fn serve(services: Services, bind: SocketAddr) -> anyhow::Result<()> {
    let state = AppState {
        search: services.search,
        ingestion: services.ingestion,
        health: services.health,
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;

    tracing::info!(version = VERSION, %bind, "dishcovery-search listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
