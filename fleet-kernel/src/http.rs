/*!
 * FLEET HTTP API - JSON surface consumed by the dashboard / CLI
 *
 * ROUTES:
 * - GET  /health               liveness of the kernel itself
 * - GET  /api/nodes            registry listing
 * - GET  /api/health/all       fleet snapshot (one entry per node)
 * - GET  /api/health/{node}    single-node snapshot
 * - GET  /api/fleet/summary    "2/3 nodes online"
 * - GET  /api/metrics          local host metrics
 * - POST /api/generate         {node, model, prompt}
 * - POST /api/chat             {node, model, messages}
 * - POST /api/pull             {node, model}
 *
 * Errors are JSON `{error, kind}` with a status derived from the error kind,
 * unreadable request bodies included (400, kind `bad_request`).
 * Every response carries permissive CORS headers; preflights get 204.
 */

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

use crate::config::TimeoutsConf;
use crate::error::FleetError;
use crate::fleet::FleetAggregator;
use crate::health::{HealthProber, ProbeSettings};
use crate::metrics::LocalMetrics;
use crate::models::{ChatMessage, FleetSnapshot, FleetSummary, HealthSnapshot, InferenceResult, NodeDescriptor, PullOutcome};
use crate::proxy::{InferenceProxy, ProxySettings};
use crate::registry::NodeRegistry;
use crate::transport::{HttpTransport, RemoteShell};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<NodeRegistry>,
    pub fleet: FleetAggregator,
    pub proxy: InferenceProxy,
}

impl AppState {
    pub fn new(
        registry: Arc<NodeRegistry>,
        http: HttpTransport,
        shell: Arc<dyn RemoteShell>,
        timeouts: &TimeoutsConf,
    ) -> Self {
        let prober = HealthProber::new(registry.clone(), http.clone(), shell, ProbeSettings::from(timeouts));
        Self {
            fleet: FleetAggregator::new(prober),
            proxy: InferenceProxy::new(registry.clone(), http, ProxySettings::from(timeouts)),
            registry,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateBody {
    node: String,
    model: String,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct ChatBody {
    node: String,
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct PullBody {
    node: String,
    model: String,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/nodes", get(list_nodes))
        .route("/api/health/all", get(get_fleet_health))
        .route("/api/health/{node}", get(get_node_health))
        .route("/api/fleet/summary", get(get_fleet_summary))
        .route("/api/metrics", get(get_local_metrics))
        .route("/api/generate", post(generate))
        .route("/api/chat", post(chat))
        .route("/api/pull", post(pull))
        .with_state(app_state)
        .layer(middleware::from_fn(cors))
}

impl IntoResponse for FleetError {
    fn into_response(self) -> Response {
        let code = match &self {
            FleetError::UnknownNode(_) => StatusCode::NOT_FOUND,
            FleetError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            FleetError::Network(_) | FleetError::Execution(_) | FleetError::Parse(_) => StatusCode::BAD_GATEWAY,
            FleetError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FleetError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        let body = serde_json::json!({ "error": self.to_string(), "kind": self.kind() });
        (code, Json(body)).into_response()
    }
}

impl From<JsonRejection> for FleetError {
    fn from(rejection: JsonRejection) -> Self {
        FleetError::BadRequest(rejection.body_text())
    }
}

async fn cors(req: Request, next: Next) -> Response {
    let mut resp = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };
    let headers = resp.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("GET, POST, OPTIONS"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Content-Type"));
    resp
}

// GET /api/nodes
async fn list_nodes(State(app): State<AppState>) -> Json<Vec<NodeDescriptor>> {
    Json(app.registry.nodes().cloned().collect())
}

// GET /api/health/all
async fn get_fleet_health(State(app): State<AppState>) -> Json<FleetSnapshot> {
    Json(app.fleet.probe_all().await)
}

// GET /api/health/{node}
async fn get_node_health(
    State(app): State<AppState>,
    Path(node): Path<String>,
) -> Result<Json<HealthSnapshot>, FleetError> {
    app.registry.resolve(&node)?;
    Ok(Json(app.fleet.probe(&node).await))
}

// GET /api/fleet/summary
async fn get_fleet_summary(State(app): State<AppState>) -> Json<FleetSummary> {
    Json(app.fleet.probe_all().await.summary())
}

// GET /api/metrics
async fn get_local_metrics() -> Json<LocalMetrics> {
    Json(LocalMetrics::collect().await)
}

// POST /api/generate
async fn generate(
    State(app): State<AppState>,
    payload: Result<Json<GenerateBody>, JsonRejection>,
) -> Result<Json<InferenceResult>, FleetError> {
    let Json(body) = payload?;
    let result = app.proxy.generate(&body.node, &body.model, &body.prompt).await?;
    Ok(Json(result))
}

// POST /api/chat
async fn chat(
    State(app): State<AppState>,
    payload: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<InferenceResult>, FleetError> {
    let Json(body) = payload?;
    let result = app.proxy.chat(&body.node, &body.model, &body.messages).await?;
    Ok(Json(result))
}

// POST /api/pull
async fn pull(
    State(app): State<AppState>,
    payload: Result<Json<PullBody>, JsonRejection>,
) -> Result<Json<PullOutcome>, FleetError> {
    let Json(body) = payload?;
    let outcome = app.proxy.pull_model(&body.node, &body.model).await?;
    Ok(Json(outcome))
}
