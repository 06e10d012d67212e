//! Groq Relay
//!
//! Single-binary Rust service that:
//! 1. Proxies chat completions to Groq, rotating across a pool of API keys
//! 2. Reports per-key usage and upstream health
//! 3. Forwards Paystack payment initialization and verification
//! 4. Acknowledges Paystack webhooks

mod chat;
mod config;
mod error;
mod metrics;
mod payments;
mod status;

use anyhow::{Context, Result};
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use groq_client::GroqClient;
use key_pool::{Dispatcher, KeyPool};
use paystack::PaystackClient;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::{Config, ServerConfig};

/// How long in-flight requests get to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    dispatcher: Dispatcher,
    paystack: PaystackClient,
    prometheus: PrometheusHandle,
}

/// Build the axum router with all routes and shared state.
///
/// Applies a concurrency limit layer based on `max_connections`; excess
/// requests queue rather than fail.
fn build_router(state: AppState, server: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/", get(root_handler))
        .route("/api/groq-proxy", post(chat_handler))
        .route("/api/keys-status", get(keys_status_handler))
        .route("/api/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/create-payment", post(create_payment_handler))
        .route("/verify-payment/{reference}", get(verify_payment_handler))
        .route("/webhook/paystack", post(webhook_handler));

    if server.debug_routes {
        router = router.route("/api/debug/next-key", get(next_key_handler));
    }

    router
        .layer(cors_layer(&server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .layer(tower::limit::ConcurrencyLimitLayer::new(server.max_connections))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting groq-relay");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle =
        metrics::install_recorder().context("failed to install Prometheus recorder")?;

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let source = Config::resolve_path(cli_config_path);
    info!(path = %source.path.display(), explicit = source.explicit, "loading configuration");

    let mut config = Config::load_from(&source)
        .with_context(|| format!("failed to load config from {}", source.path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        groq_base_url = %config.groq.base_url,
        keys = config.groq.api_keys.len(),
        paystack_configured = config.paystack.secret_key.is_some(),
        debug_routes = config.server.debug_routes,
        "configuration loaded"
    );
    if config.groq.api_keys.is_empty() {
        warn!("no Groq API keys configured (GROQ_API_KEYS); chat requests will be refused");
    }
    if config.paystack.secret_key.is_none() {
        warn!("no Paystack secret configured (PAYSTACK_SECRET_KEY); payment routes will be refused");
    }

    let groq = GroqClient::new(&config.groq.base_url, config.groq.timeout())
        .context("failed to build Groq client")?;
    let pool = Arc::new(KeyPool::new(std::mem::take(&mut config.groq.api_keys)));
    let dispatcher = Dispatcher::new(pool, Arc::new(groq), config.groq.dispatch_options());

    let paystack = PaystackClient::new(
        &config.paystack.base_url,
        config.paystack.timeout(),
        config.paystack.secret_key.take(),
    )
    .context("failed to build Paystack client")?
    .with_currency(config.paystack.currency.clone());

    let app_state = AppState {
        dispatcher,
        paystack,
        prometheus: prometheus_handle,
    };
    let app = build_router(app_state, &config.server);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    // The drain timeout starts when the shutdown signal fires, not when the
    // server starts: signal the server to drain, then race it against the timer.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => {
            info!("all in-flight requests drained");
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "server error during shutdown");
        }
        Ok(Err(e)) => {
            error!(error = %e, "server task panicked");
        }
        Err(_) => {
            warn!(
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!("shutdown complete");
    Ok(())
}

fn request_id() -> String {
    format!("req_{}", uuid::Uuid::new_v4().as_simple())
}

/// Run a handler body and record its status and latency under `route`.
async fn timed(route: &'static str, handler: impl Future<Output = Response>) -> Response {
    let started = Instant::now();
    let response = handler.await;
    metrics::record_request(
        route,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

async fn root_handler() -> &'static str {
    "groq-relay is running"
}

async fn chat_handler(State(state): State<AppState>, body: Bytes) -> Response {
    timed("chat", chat::relay_chat(&state.dispatcher, body, request_id())).await
}

async fn keys_status_handler(State(state): State<AppState>) -> Response {
    timed("keys_status", status::keys_status(&state.dispatcher)).await
}

async fn health_handler(State(state): State<AppState>) -> Response {
    timed("health", status::health(&state.dispatcher)).await
}

async fn next_key_handler(State(state): State<AppState>) -> Response {
    timed("debug_next_key", status::next_key(&state.dispatcher)).await
}

async fn create_payment_handler(State(state): State<AppState>, body: Bytes) -> Response {
    timed(
        "create_payment",
        payments::create_payment(&state.paystack, body, request_id()),
    )
    .await
}

async fn verify_payment_handler(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Response {
    timed(
        "verify_payment",
        payments::verify_payment(&state.paystack, &reference, request_id()),
    )
    .await
}

async fn webhook_handler(body: Bytes) -> Response {
    timed("webhook", payments::webhook(body)).await
}

/// Prometheus metrics endpoint, text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
