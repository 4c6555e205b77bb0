//! # callintel: Call Analytics Backend
//!
//! `callintel` is the HTTP backend behind a call-analytics dashboard. It lists call transcripts
//! from an upstream transcript intelligence service, enriches the visible page with per-call
//! details, serves cached per-call analyses and folds them into an aggregate summary produced by
//! a single text-generation call.
//!
//! ## Architecture
//!
//! - **Listing**: [`listing`] over-fetches recent records from the [`upstream::RecordSource`],
//!   filters and paginates them locally, then enriches only the returned page.
//! - **Analyses**: per-record analyses are written by a separate pipeline into an
//!   [`store::AnalysisStore`]. The [`analysis::AnalysisAggregator`] joins recent records against
//!   that store (cache-aside, misses skipped) and writes the aggregate summary back.
//! - **Cross-view filters**: [`filter_context`] hands out one-shot tokens so a chart selection
//!   can restrict the list view.
//! - **Export**: [`export`] renders the full filtered set as CSV.
//!
//! ## Endpoints
//!
//! All application routes live under `/api`:
//!
//! | Method | Path | |
//! |--------|------|---|
//! | POST | `/api/transcriptions` | One page of filtered, enriched records |
//! | GET | `/api/transcriptions/export` | Filtered records as CSV |
//! | GET | `/api/fetch-operator-results` | Operator results for one transcript |
//! | GET | `/api/fetch-individual-analyses` | Recent records joined with cached analyses |
//! | GET | `/api/aggregate-analysis-openai` | Recompute and store the aggregate summary |
//! | GET | `/api/analysis-breakdown` | Chart data over the individual analyses |
//! | GET | `/api/fetch-analysis-openai`, `/api/fetch-analysis-humeai` | One cached analysis |
//! | POST | `/api/view-token` | Annotator view token |
//! | POST, GET | `/api/filter-context`, `/api/filter-context/{token}` | One-shot filter contexts |
//!
//! `/healthz` answers `OK`, and `/internal/metrics` exposes Prometheus metrics when
//! `enable_metrics` is set.
//!
//! ## Getting Started
//!
//! ```no_run
//! use callintel::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.ok();
//!     })
//!     .await
//! }
//! ```

pub mod analysis;
pub mod api;
pub mod config;
pub mod errors;
pub mod export;
pub mod filter_context;
pub mod listing;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod upstream;

#[cfg(test)]
pub mod test_utils;

pub use config::Config;

use axum::http::{self, HeaderValue, Method};
use axum::{
    Router,
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};

use crate::analysis::AnalysisAggregator;
use crate::api::handlers;
use crate::config::{CorsOrigin, StoreConfig};
use crate::filter_context::FilterContexts;
use crate::store::{AnalysisStore, InMemoryStore, SyncMapStore};
use crate::upstream::{ChatCompletions, IntelligenceClient, RecordSource, TextGeneration, TranscriptService};

/// Shared state handed to every handler.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .records(records)
///     .transcripts(transcripts)
///     .store(store)
///     .aggregator(aggregator)
///     .filter_contexts(filter_contexts)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub records: Arc<dyn RecordSource>,
    pub transcripts: Arc<dyn TranscriptService>,
    pub store: Arc<dyn AnalysisStore>,
    pub aggregator: Arc<AnalysisAggregator>,
    pub filter_contexts: FilterContexts,
}

impl AppState {
    /// Wire the collaborators together: the aggregator reads from the same record source and
    /// store the handlers use.
    pub fn assemble(
        config: Config,
        records: Arc<dyn RecordSource>,
        transcripts: Arc<dyn TranscriptService>,
        store: Arc<dyn AnalysisStore>,
        generator: Arc<dyn TextGeneration>,
    ) -> Self {
        let aggregator = AnalysisAggregator::new(records.clone(), store.clone(), generator, &config.aggregation);
        let filter_contexts = FilterContexts::new(&config.filter_context);

        Self::builder()
            .records(records)
            .transcripts(transcripts)
            .store(store)
            .aggregator(Arc::new(aggregator))
            .filter_contexts(filter_contexts)
            .config(config)
            .build()
    }
}

/// Build the configured analysis store.
fn create_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn AnalysisStore>> {
    Ok(match config {
        StoreConfig::Memory => {
            info!("Using in-memory analysis store");
            Arc::new(InMemoryStore::new())
        }
        StoreConfig::Sync {
            base_url,
            service_sid,
            account_sid,
            auth_token,
            request_timeout,
        } => {
            info!(%base_url, %service_sid, "Using sync-map analysis store");
            Arc::new(SyncMapStore::new(
                base_url,
                service_sid,
                account_sid,
                auth_token.clone(),
                *request_timeout,
            )?)
        }
    })
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let allow_origin = if config.cors.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // browsers send the origin without a trailing slash
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::OPTIONS, Method::GET, Method::POST])
        .allow_headers([http::header::CONTENT_TYPE]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// Adds CORS, optional Prometheus metrics (`/internal/metrics`) and request tracing on top of
/// the `/api` routes.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        // Listing
        .route("/transcriptions", post(handlers::transcriptions::list_transcriptions))
        .route("/transcriptions/export", get(handlers::transcriptions::export_transcriptions))
        .route(
            "/fetch-operator-results",
            get(handlers::operator_results::fetch_operator_results),
        )
        // Analyses
        .route(
            "/fetch-individual-analyses",
            get(handlers::analyses::fetch_individual_analyses),
        )
        .route("/aggregate-analysis-openai", get(handlers::analyses::aggregate_analysis))
        .route("/analysis-breakdown", get(handlers::analyses::analysis_breakdown))
        .route("/fetch-analysis-openai", get(handlers::analyses::fetch_analysis_openai))
        .route("/fetch-analysis-humeai", get(handlers::analyses::fetch_analysis_humeai))
        // Annotator
        .route("/view-token", post(handlers::view_token::create_view_token))
        // Cross-view filters
        .route("/filter-context", post(handlers::filter_context::create_filter_context))
        .route(
            "/filter-context/{token}",
            get(handlers::filter_context::take_filter_context),
        )
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api", api_routes);

    let cors_layer = create_cors_layer(&state.config)?;
    let mut router = router.layer(cors_layer);

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// The assembled service.
///
/// 1. **Create**: [`Application::new`] builds the upstream clients, the store and the router
/// 2. **Serve**: [`Application::serve`] binds to the configured address and handles requests
///    until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with all collaborators built from `config`
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting callintel with configuration: {:#?}", config);

        let intelligence = Arc::new(IntelligenceClient::new(&config.intelligence)?);
        let store = create_store(&config.store)?;
        let generator = Arc::new(ChatCompletions::new(&config.completion)?);

        let state = AppState::assemble(config, intelligence.clone(), intelligence, store, generator);
        Self::with_state(state)
    }

    /// Create an application around pre-built state
    pub fn with_state(state: AppState) -> anyhow::Result<Self> {
        let router = build_router(&state)?;
        Ok(Self {
            router,
            config: state.config,
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "callintel listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
