//! HTTP transport for MCP server.
//!
//! `POST /mcp` carries JSON-RPC messages. Clients that opened an event
//! stream with `GET /mcp` pass its `session_id` and receive responses as
//! `message` events instead of in the POST body.

use crate::error::{McpError, codes};
use crate::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::server::McpServer;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response, Sse,
        sse::{Event, KeepAlive},
    },
    routing::get,
};
use futures::Stream;
use serde::Deserialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc, oneshot};
use tower_http::trace::TraceLayer;

/// A request paired with the slot its response is delivered to.
pub type Dispatch = (JsonRpcRequest, oneshot::Sender<Option<JsonRpcResponse>>);

/// HTTP transport handler state.
pub struct HttpTransportState {
    /// Channel for sending requests to the MCP server.
    request_tx: mpsc::Sender<Dispatch>,
    /// Open event streams, keyed by session id.
    sse_connections: RwLock<HashMap<String, mpsc::Sender<Event>>>,
}

impl HttpTransportState {
    /// Create a new HTTP transport state.
    pub fn new(request_tx: mpsc::Sender<Dispatch>) -> Self {
        Self {
            request_tx,
            sse_connections: RwLock::new(HashMap::new()),
        }
    }

    /// Number of open event streams.
    pub async fn session_count(&self) -> usize {
        self.sse_connections.read().await.len()
    }
}

/// Query parameters for MCP endpoint.
#[derive(Debug, Deserialize)]
pub struct McpQuery {
    /// Session ID for SSE connections.
    session_id: Option<String>,
}

/// Create the HTTP router for MCP.
pub fn create_router(state: Arc<HttpTransportState>) -> Router {
    Router::new()
        .route("/mcp", get(handle_mcp_sse).post(handle_mcp_post))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Forward every dispatched request to the server, one task per request.
pub fn spawn_dispatcher(server: McpServer, mut request_rx: mpsc::Receiver<Dispatch>) {
    tokio::spawn(async move {
        while let Some((request, response_tx)) = request_rx.recv().await {
            let server = server.clone();
            tokio::spawn(async move {
                let response = server.handle_request(request).await;
                // The client may have gone away.
                let _ = response_tx.send(response);
            });
        }
        tracing::debug!("MCP request channel closed");
    });
}

/// Handle POST requests to /mcp (JSON-RPC over HTTP).
async fn handle_mcp_post(
    State(state): State<Arc<HttpTransportState>>,
    Query(query): Query<McpQuery>,
    Json(request): Json<JsonRpcRequest>,
) -> Response {
    let (response_tx, response_rx) = oneshot::channel();

    if state.request_tx.send((request, response_tx)).await.is_err() {
        return internal_error("MCP server unavailable");
    }

    let response = match response_rx.await {
        Ok(Some(response)) => response,
        Ok(None) => return StatusCode::ACCEPTED.into_response(),
        Err(_) => return internal_error("No response from MCP server"),
    };

    if let Some(session_id) = query.session_id {
        let sender = state.sse_connections.read().await.get(&session_id).cloned();
        if let Some(sender) = sender {
            let delivered = match message_event(&response) {
                Ok(event) => sender.send(event).await.is_ok(),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to encode MCP event");
                    false
                }
            };
            if delivered {
                return StatusCode::ACCEPTED.into_response();
            }
            tracing::debug!(session_id = %session_id, "Event stream closed");
            state.sse_connections.write().await.remove(&session_id);
        }
    }

    (StatusCode::OK, Json(response)).into_response()
}

/// Handle GET requests to /mcp (SSE streaming).
async fn handle_mcp_sse(State(state): State<Arc<HttpTransportState>>) -> impl IntoResponse {
    let session_id = uuid::Uuid::new_v4().to_string();
    let (event_tx, event_rx) = mpsc::channel(100);

    state
        .sse_connections
        .write()
        .await
        .insert(session_id.clone(), event_tx);

    tracing::info!(session_id = %session_id, "Opened MCP event stream");

    let guard = SessionGuard {
        state: state.clone(),
        session_id,
    };
    Sse::new(session_stream(guard, event_rx)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}

/// Unregisters an event stream when the client disconnects.
struct SessionGuard {
    state: Arc<HttpTransportState>,
    session_id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        tracing::info!(session_id = %self.session_id, "Closed MCP event stream");

        if let Ok(mut connections) = self.state.sse_connections.try_write() {
            connections.remove(&self.session_id);
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let state = self.state.clone();
        let session_id = std::mem::take(&mut self.session_id);
        runtime.spawn(async move {
            state.sse_connections.write().await.remove(&session_id);
        });
    }
}

fn session_stream(
    guard: SessionGuard,
    mut event_rx: mpsc::Receiver<Event>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        let guard = guard;
        yield Ok(Event::default()
            .event("endpoint")
            .data(format!("/mcp?session_id={}", guard.session_id)));

        while let Some(event) = event_rx.recv().await {
            yield Ok(event);
        }
    }
}

fn message_event(response: &JsonRpcResponse) -> Result<Event, serde_json::Error> {
    Ok(Event::default()
        .event("message")
        .data(serde_json::to_string(response)?))
}

fn internal_error(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(JsonRpcResponse::error(None, codes::INTERNAL_ERROR, message)),
    )
        .into_response()
}

/// Handle health check requests.
async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "hipeac-mcp",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// HTTP server for MCP transport.
pub struct HttpServer {
    address: String,
    state: Arc<HttpTransportState>,
}

impl HttpServer {
    /// Create a new HTTP server dispatching to `server`.
    pub fn new(address: impl Into<String>, server: McpServer) -> Self {
        let (request_tx, request_rx) = mpsc::channel(64);
        spawn_dispatcher(server, request_rx);
        Self {
            address: address.into(),
            state: Arc::new(HttpTransportState::new(request_tx)),
        }
    }

    /// Run the HTTP server until ctrl-c.
    pub async fn run(self) -> Result<(), McpError> {
        let app = create_router(self.state);

        let listener = tokio::net::TcpListener::bind(&self.address)
            .await
            .map_err(|e| {
                McpError::StartupFailed(format!("Failed to bind to {}: {}", self.address, e))
            })?;

        tracing::info!(address = %self.address, "MCP HTTP server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutting down MCP HTTP server");
            })
            .await
            .map_err(|e| McpError::TransportError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use hipeac_core::{DirectoryConfig, McpConfig, MetadataType};
    use hipeac_directory::Directory;
    use hipeac_directory::memory::InMemoryDirectory;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app() -> (Arc<HttpTransportState>, Router) {
        let store = Arc::new(InMemoryDirectory::new());
        store.add_metadata(1, MetadataType::Topic, "AI", 0);
        let directory = Directory::new(store, DirectoryConfig::default());
        let server = McpServer::new(McpConfig::default(), Arc::new(directory));

        let (tx, rx) = mpsc::channel(8);
        spawn_dispatcher(server, rx);
        let state = Arc::new(HttpTransportState::new(tx));
        (state.clone(), create_router(state))
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (_, app) = app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let health: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(health["status"], "ok");
        assert_eq!(health["service"], "hipeac-mcp");
    }

    #[tokio::test]
    async fn test_post_returns_json_response() {
        let (_, app) = app();

        let response = app
            .oneshot(post(
                "/mcp",
                json!({
                    "jsonrpc": "2.0",
                    "id": 7,
                    "method": "tools/call",
                    "params": {"name": "get_metadata", "arguments": {}}
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let rpc: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(rpc["id"], 7);
        assert_eq!(
            rpc["result"]["structuredContent"]["topics"],
            json!([{"id": 1, "value": "AI"}])
        );
    }

    #[tokio::test]
    async fn test_notification_is_accepted() {
        let (_, app) = app();

        let response = app
            .oneshot(post(
                "/mcp",
                json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_unknown_session_falls_back_to_json() {
        let (state, app) = app();

        let response = app
            .oneshot(post(
                "/mcp?session_id=missing",
                json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_event_stream_registers_session() {
        let (state, app) = app();

        let response = app
            .oneshot(Request::builder().uri("/mcp").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        assert_eq!(state.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_disconnected_event_streams_are_unregistered() {
        let (state, app) = app();

        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(Request::builder().uri("/mcp").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            drop(response);
        }

        for _ in 0..10 {
            if state.session_count().await == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(state.session_count().await, 0);
    }
}
