//! HTTP server setup and handlers.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener and shut down on signal
//! - Load profiles, compose them off the async runtime, respond
//!
//! # Endpoints
//! - `GET /config` composed profile as YAML
//! - `GET /config/report` composition report as JSON
//! - `GET /hello` liveness probe

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Query, Request, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::compose::{ComposeError, ComposeOutcome, ComposeReport, Composer, MergeMode};
use crate::config::ComposerConfig;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer, ComposeQuery};
use crate::http::response::{yaml_response, ApiError};
use crate::lifecycle::signals::shutdown_signal;
use crate::observability::metrics;
use crate::script::Cancellation;
use crate::source::{self, codec, DocumentFetcher, FetchError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ComposerConfig>,
    pub fetcher: DocumentFetcher,
    pub composer: Arc<Composer>,
}

impl AppState {
    pub fn new(config: ComposerConfig) -> Result<Self, FetchError> {
        let fetcher = DocumentFetcher::new(&config.fetch)?;
        let composer = Arc::new(Composer::from_config(&config.script));
        Ok(Self {
            config: Arc::new(config),
            fetcher,
            composer,
        })
    }
}

/// HTTP server for the composer.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ComposerConfig) -> Result<Self, FetchError> {
        let state = AppState::new(config)?;
        let config = state.config.clone();
        let router = Self::build_router(&config, state);
        Ok(Self { router })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ComposerConfig, state: AppState) -> Router {
        let trace = TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "request",
                request_id = %request_id(request),
                method = %request.method(),
                path = %request.uri().path(),
            )
        });

        Router::new()
            .route("/config", get(config_handler))
            .route("/config/report", get(report_handler))
            .route("/hello", get(hello))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(trace)
                    .layer(propagate_request_id_layer())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Run the server until a shutdown signal or `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn hello() -> Json<serde_json::Value> {
    Json(json!({ "hello": "world" }))
}

/// Composed profile as YAML.
async fn config_handler(State(state): State<AppState>, Query(query): Query<ComposeQuery>) -> Response {
    let start = Instant::now();
    let mode = MergeMode::parse(query.mode_or(&state.config.sources.default_mode));
    let recorded = mode.clone();

    let result = compose_request(&state, &query, mode).await;
    let response = match result {
        Ok(Composed { yaml, report }) => yaml_response(yaml, &report),
        Err(e) => {
            tracing::error!(error = %e, "Compose request failed");
            e.into_response()
        }
    };

    metrics::record_request(&recorded, response.status().as_u16(), start);
    response
}

/// Serialized view of a compose run.
#[derive(Serialize)]
struct ReportBody {
    #[serde(flatten)]
    report: ComposeReport,
    groups: Vec<String>,
    rules: usize,
}

/// Composition report as JSON.
async fn report_handler(State(state): State<AppState>, Query(query): Query<ComposeQuery>) -> Response {
    let start = Instant::now();
    let mode = MergeMode::parse(query.mode_or(&state.config.sources.default_mode));
    let recorded = mode.clone();

    let response = match load_and_compose(&state, &query, mode).await {
        Ok(outcome) => Json(ReportBody {
            groups: outcome
                .document
                .proxy_groups
                .iter()
                .map(|g| g.name.clone())
                .collect(),
            rules: outcome.document.rules.len(),
            report: outcome.report,
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Compose report failed");
            e.into_response()
        }
    };

    metrics::record_request(&recorded, response.status().as_u16(), start);
    response
}

struct Composed {
    yaml: Vec<u8>,
    report: ComposeReport,
}

async fn compose_request(state: &AppState, query: &ComposeQuery, mode: MergeMode) -> Result<Composed, ApiError> {
    let outcome = load_and_compose(state, query, mode).await?;
    let yaml = codec::serialize(&outcome.document).map_err(ComposeError::Serialize)?;
    Ok(Composed {
        yaml,
        report: outcome.report,
    })
}

async fn load_and_compose(
    state: &AppState,
    query: &ComposeQuery,
    mode: MergeMode,
) -> Result<ComposeOutcome, ApiError> {
    let (baseline, addon) = source::load_profiles(&state.fetcher, &state.config.sources, &query.sources()).await?;
    let composer = state.composer.clone();
    let cancel = Cancellation::new();
    // Fires when the request is dropped, e.g. by the timeout layer.
    let _cancel_guard = cancel.cancel_on_drop();

    // Snippet evaluation blocks; keep it off the async workers.
    let outcome = tokio::task::spawn_blocking(move || composer.compose_with(baseline, addon, mode, &cancel))
        .await
        .map_err(|e| ApiError::Task(e.to_string()))??;

    Ok(outcome)
}
