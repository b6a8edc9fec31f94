//! Model Lineage Graph Server
//!
//! Serves the validated lineage graph to the visualization front-end.
//! Handles:
//! - Graph validation at startup
//! - Graph and lineage traversal endpoints
//! - Static front-end files
//! - Observability (logging, metrics, request ids)

mod handlers;
mod middleware;
mod state;

use axum::{middleware::from_fn, routing::get, Router};
use lineage_common::{
    config::AppConfig,
    metrics::{self, GENERATION_BUCKETS, LATENCY_BUCKETS, METRICS_PREFIX},
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

use crate::state::ServedGraph;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub graph: Arc<ServedGraph>,
    pub metrics: Option<PrometheusHandle>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    metrics::init_tracing(&config.observability);

    info!("Starting lineage graph server v{}", lineage_common::VERSION);

    let config = Arc::new(config);

    // Initialize metrics
    let handle = install_prometheus()?;
    metrics::register_metrics();

    // Load and validate the graph
    let graph = ServedGraph::load(&config.data.graph_path).map_err(|e| {
        error!(
            error = %e,
            path = %config.data.graph_path.display(),
            "Failed to load graph data, check the graph file format and content"
        );
        e
    })?;

    // Create app state
    let state = AppState {
        config: config.clone(),
        graph: Arc::new(graph),
        metrics: Some(handle),
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn install_prometheus() -> Result<PrometheusHandle, Box<dyn std::error::Error>> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_request_duration_seconds", METRICS_PREFIX)),
            LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_generation_duration_seconds", METRICS_PREFIX)),
            GENERATION_BUCKETS,
        )?
        .install_recorder()?;
    Ok(handle)
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let timeout = TimeoutLayer::new(state.config.request_timeout());
    let static_files = ServeDir::new(&state.config.server.static_dir);

    // API routes
    let api_routes = Router::new()
        .route("/graph", get(handlers::graph::get_graph))
        .route("/graph/{id}/lineage", get(handlers::graph::get_lineage))
        .route_layer(from_fn(middleware::metrics::track_requests));

    // Compose the app
    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(handlers::health::metrics))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .layer(timeout)
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use lineage_common::models::{EdgeCandidate, GraphDocument, Node};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(static_dir: &std::path::Path) -> Router {
        let graph = ServedGraph::from_document(GraphDocument::new(
            vec![
                Node::new("gpt-2", "2019-02-14").with_field("name", "GPT-2"),
                Node::new("transformer", "2017-06-12"),
                Node::new("gpt", "2018-06-11"),
                Node::new("bert", "2018-10-11"),
            ],
            vec![
                EdgeCandidate::new("transformer", "gpt"),
                EdgeCandidate::new("transformer", "bert"),
                EdgeCandidate::new("gpt", "gpt-2"),
                EdgeCandidate::new("gpt-2", "gpt"),
            ],
        ))
        .unwrap();

        let mut config = AppConfig::default();
        config.server.static_dir = static_dir.to_path_buf();
        config.server.max_traversal_depth = 3;

        create_router(AppState {
            config: Arc::new(config),
            graph: Arc::new(graph),
            metrics: None,
        })
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_graph_sorted_by_date() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get_json(app(dir.path()), "/api/graph").await;

        assert_eq!(status, StatusCode::OK);
        let ids: Vec<&str> = body["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["transformer", "gpt", "bert", "gpt-2"]);
        assert_eq!(body["nodes"][3]["name"], json!("GPT-2"));
        // The backward gpt-2 -> gpt link is dropped
        assert_eq!(body["links"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_lineage_descendants() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get_json(app(dir.path()), "/api/graph/transformer/lineage?depth=1").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["direction"], json!("descendants"));
        assert_eq!(
            body["nodes"],
            json!([{"id": "gpt", "hop": 1}, {"id": "bert", "hop": 1}])
        );
        assert_eq!(body["links"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_lineage_depth_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) =
            get_json(app(dir.path()), "/api/graph/gpt-2/lineage?direction=ancestors&depth=50").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["depth"], json!(3));
        assert_eq!(
            body["nodes"],
            json!([{"id": "gpt", "hop": 1}, {"id": "transformer", "hop": 2}])
        );
    }

    #[tokio::test]
    async fn test_lineage_unknown_node() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get_json(app(dir.path()), "/api/graph/t5/lineage").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], json!("Node not found: t5"));
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get_json(app(dir.path()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "healthy"}));

        let (_, body) = get_json(app(dir.path()), "/ready").await;
        assert_eq!(body["checks"]["graph"]["nodes"], json!(4));
    }

    #[tokio::test]
    async fn test_static_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>lineage</html>").unwrap();

        let response = app(dir.path())
            .oneshot(Request::builder().uri("/index.html").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<html>lineage</html>");
    }

    #[tokio::test]
    async fn test_metrics_without_recorder() {
        let dir = tempfile::tempdir().unwrap();
        let (status, _) = get_json(app(dir.path()), "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
