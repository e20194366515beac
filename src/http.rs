//! Network transport: HTTP API over axum.
//!
//! Three routes: `GET /health` (open), `GET /tools` and `POST /execute`
//! (both behind the API-key gate). Tool-level failures come back as error
//! envelopes with a 200 status; only authorization and malformed requests
//! produce non-2xx responses.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::protocol::ListToolsResult;
use crate::server::SERVER_NAME;
use crate::tools::ToolRegistry;

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Shared router state.
#[derive(Clone)]
pub struct AppState {
    registry: Arc<ToolRegistry>,
    api_key: Option<String>,
}

/// Build the HTTP router.
pub fn router(
    registry: Arc<ToolRegistry>,
    api_key: Option<String>,
    allowed_origins: &[String],
) -> Router {
    let state = AppState { registry, api_key };

    let gated = Router::new()
        .route("/tools", get(list_tools))
        .route("/execute", post(execute))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(gated)
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until a shutdown signal arrives.
pub async fn serve(registry: Arc<ToolRegistry>, config: &Config) -> anyhow::Result<()> {
    if config.api_key.is_none() {
        warn!("API_KEY is not set; /tools and /execute are unauthenticated");
    }

    let app = router(registry, config.api_key.clone(), &config.allowed_origins);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(API_KEY_HEADER),
        ]);

    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer.allow_origin(origins)
    }
}

/// The API-key gate. With no key configured every request passes; with a
/// key, the `X-API-Key` header must match it exactly.
async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(ref expected) = state.api_key else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if provided == Some(expected.as_str()) {
        next.run(request).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Unauthorized: invalid or missing API key"})),
        )
            .into_response()
    }
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok", "service": SERVER_NAME}))
}

async fn list_tools(State(state): State<AppState>) -> Json<ListToolsResult> {
    Json(ListToolsResult {
        tools: state.registry.list_tools(),
    })
}

#[derive(Debug, Deserialize)]
struct ExecuteRequest {
    tool: Option<String>,
    #[serde(default)]
    arguments: Value,
}

async fn execute(State(state): State<AppState>, Json(request): Json<ExecuteRequest>) -> Response {
    let Some(tool) = request.tool else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Tool name is required"})),
        )
            .into_response();
    };

    let result = state.registry.execute(&tool, request.arguments).await;
    Json(result).into_response()
}
