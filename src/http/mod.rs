//! HTTP server for MCP over HTTP, SSE and WebSocket transports.
//!
//! `POST /mcp` answers with a single JSON body, `POST /mcp/stream` wraps the
//! same response in one `text/event-stream` frame and `/ws` upgrades to a
//! WebSocket. A few REST helpers sit alongside for browsers and probes.

pub mod ws;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::{any, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::mcp::codec::{self, ResponseOptions};
use crate::mcp::protocol::*;
use crate::mcp::server::McpServer;

/// HTTP server state.
#[derive(Clone)]
pub struct HttpState {
    server: Arc<McpServer>,
    options: ResponseOptions,
}

impl HttpState {
    pub fn new(server: Arc<McpServer>, options: ResponseOptions) -> Self {
        Self { server, options }
    }
}

/// Slack on top of the encoded upload for the JSON-RPC envelope.
const ENVELOPE_SLACK_BYTES: usize = 64 * 1024;

/// Largest request body accepted: a base64-encoded upload of
/// `max_upload_bytes` plus its envelope.
pub fn request_body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes
        .div_ceil(3)
        .saturating_mul(4)
        .saturating_add(ENVELOPE_SLACK_BYTES)
}

/// Build the application router.
pub fn router(state: HttpState, max_concurrent_requests: usize, body_limit: usize) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health_check))
        .route("/mcp", post(mcp_unary))
        .route("/mcp/stream", post(mcp_stream))
        .route("/ws", any(ws::ws_handler))
        .route("/tools", get(list_tools))
        .route("/tools/call", post(call_tool))
        .route("/metrics", get(metrics))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(ConcurrencyLimitLayer::new(max_concurrent_requests.max(1)))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server and serve until Ctrl-C.
pub async fn start_server(config: &Config, server: Arc<McpServer>) -> Result<()> {
    let state = HttpState::new(server, config.response_options());
    let app = router(
        state,
        config.max_concurrent_requests,
        request_body_limit(config.max_upload_bytes),
    );

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::HttpServer(format!("failed to bind {}: {}", addr, e)))?;
    info!("Starting HTTP server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Decode and dispatch one frame. Returns the HTTP status the unary
/// endpoint should use together with the response, or `None` for a
/// notification.
pub(crate) async fn dispatch_frame(
    server: &McpServer,
    raw: &[u8],
) -> Option<(StatusCode, JsonRpcResponse)> {
    match codec::decode_request_bytes(raw) {
        Ok(req) => server.handle(req).await.map(|r| (StatusCode::OK, r)),
        Err(e) => {
            let status = if e.is_parse() {
                StatusCode::INTERNAL_SERVER_ERROR
            } else {
                StatusCode::BAD_REQUEST
            };
            Some((status, server.reject(e)))
        }
    }
}

fn json_body(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

fn encode_failed(e: Error) -> Response {
    error!("Failed to serialize response: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_jsonrpc() })),
    )
        .into_response()
}

/// `POST /mcp`.
async fn mcp_unary(State(state): State<HttpState>, body: Bytes) -> Response {
    let Some((status, response)) = dispatch_frame(&state.server, &body).await else {
        return StatusCode::ACCEPTED.into_response();
    };
    match codec::encode_response(&response, state.options) {
        Ok(json) => json_body(status, json),
        Err(e) => encode_failed(e),
    }
}

/// `POST /mcp/stream`: one `message` event, always HTTP 200.
async fn mcp_stream(State(state): State<HttpState>, body: Bytes) -> Response {
    let Some((_, response)) = dispatch_frame(&state.server, &body).await else {
        return StatusCode::ACCEPTED.into_response();
    };
    match codec::encode_response(&response, state.options) {
        Ok(json) => {
            let event = Event::default().event("message").data(json);
            Sse::new(tokio_stream::once(Ok::<_, Infallible>(event))).into_response()
        }
        Err(e) => encode_failed(e),
    }
}

/// Server banner and endpoint map.
async fn banner(State(state): State<HttpState>) -> impl IntoResponse {
    let info = state.server.info();
    Json(json!({
        "name": info.name,
        "version": info.version,
        "protocolVersion": MCP_VERSION,
        "endpoints": {
            "mcp": "POST /mcp",
            "stream": "POST /mcp/stream",
            "websocket": "GET /ws",
            "health": "GET /health",
            "tools": "GET /tools",
            "call_tool": "POST /tools/call",
            "metrics": "GET /metrics"
        }
    }))
}

/// Health check endpoint.
async fn health_check(State(state): State<HttpState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": state.server.info().version,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Run a request through the dispatcher for the REST helpers.
async fn rest_call(server: &McpServer, method: &str, params: Value) -> Response {
    let request = JsonRpcRequest::new("rest", method, params);
    let Some(response) = server.handle(request).await else {
        return StatusCode::ACCEPTED.into_response();
    };
    match response.outcome {
        Outcome::Result(result) => (StatusCode::OK, Json(result)).into_response(),
        Outcome::Error(err) => rest_error(err),
    }
}

fn rest_error(err: JsonRpcError) -> Response {
    let status = if err.code == error_codes::INTERNAL_ERROR {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(json!({ "error": err }))).into_response()
}

/// List tools endpoint.
async fn list_tools(State(state): State<HttpState>) -> Response {
    let response = rest_call(&state.server, "tools/list", json!({})).await;
    if response.status().is_server_error() {
        // listing never executes a tool, so any failure is reported as 400
        let (mut parts, body) = response.into_parts();
        parts.status = StatusCode::BAD_REQUEST;
        return Response::from_parts(parts, body);
    }
    response
}

/// Call tool endpoint: body is `{name, arguments}`.
async fn call_tool(State(state): State<HttpState>, body: Bytes) -> Response {
    let params: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => return rest_error(Error::Parse(e.to_string()).to_jsonrpc()),
    };
    if !params.is_object() {
        return rest_error(
            Error::InvalidRequest("body must be a JSON object".to_string()).to_jsonrpc(),
        );
    }
    rest_call(&state.server, "tools/call", params).await
}

/// Prometheus metrics endpoint.
async fn metrics(State(state): State<HttpState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.server.metrics().to_prometheus(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::handler::ToolRegistry;
    use crate::mcp::resources::ResourceRegistry;
    use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
    use crate::service::UploadStore;
    use crate::tools::basic::EchoTool;
    use crate::tools::documents::UploadPdfTool;
    use axum::body::Body;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app_with_limit(body_limit: usize) -> Router {
        let store = Arc::new(UploadStore::new());
        let mut tools = ToolRegistry::new();
        tools.register(EchoTool).unwrap();
        tools
            .register(UploadPdfTool::new(store.clone(), DEFAULT_MAX_UPLOAD_BYTES))
            .unwrap();
        let server = McpServer::new(
            tools,
            ResourceRegistry::new(store),
            ServerInfo {
                name: "http-test".to_string(),
                version: "1.0.0".to_string(),
            },
        )
        .unwrap();
        router(
            HttpState::new(Arc::new(server), ResponseOptions::default()),
            8,
            body_limit,
        )
    }

    fn app() -> Router {
        app_with_limit(request_body_limit(DEFAULT_MAX_UPLOAD_BYTES))
    }

    async fn post_bytes(app: Router, uri: &str, body: Vec<u8>) -> (StatusCode, String) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn post(app: Router, uri: &str, body: &str) -> (StatusCode, String) {
        post_bytes(app, uri, body.as_bytes().to_vec()).await
    }

    fn upload_request(size: usize) -> String {
        let mut pdf = b"%PDF-1.7\n".to_vec();
        pdf.resize(size, b'x');
        json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": {
                "name": "upload_pdf",
                "arguments": { "filename": "big.pdf", "content": STANDARD.encode(&pdf) }
            }
        })
        .to_string()
    }

    const NON_UTF8_FRAME: &[u8] = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"\xff\xfe\"}";

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_mcp_unary_request() {
        let (status, body) = post(
            app(),
            "/mcp",
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"echo","arguments":{"message":"Hello World"}}}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["result"]["content"][0]["text"], "Echo: Hello World");
    }

    #[tokio::test]
    async fn test_mcp_unary_method_error_is_200() {
        let (status, body) = post(app(), "/mcp", r#"{"jsonrpc":"2.0","id":1,"method":"nope"}"#).await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_mcp_unary_decode_failures() {
        let (status, body) = post(app(), "/mcp", "{oops").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["error"]["code"], -32700);
        assert!(value["id"].is_null());

        let (status, body) = post(app(), "/mcp", r#"[{"id":1,"method":"ping"}]"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn test_mcp_unary_non_utf8_body_is_parse_error() {
        let (status, body) = post_bytes(app(), "/mcp", NON_UTF8_FRAME.to_vec()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["error"]["code"], -32700);
        assert!(value["id"].is_null());
    }

    #[tokio::test]
    async fn test_mcp_stream_non_utf8_body_is_parse_error() {
        let (status, body) = post_bytes(app(), "/mcp/stream", NON_UTF8_FRAME.to_vec()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("event: message\ndata: "));
        assert!(body.contains("-32700"));
    }

    #[tokio::test]
    async fn test_rest_call_non_utf8_body_is_400() {
        let (status, body) = post_bytes(
            app(),
            "/tools/call",
            b"{\"name\":\"echo\",\"arguments\":{\"message\":\"\xff\"}}".to_vec(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("-32700"));
    }

    #[test]
    fn test_request_body_limit_covers_encoded_upload() {
        let limit = request_body_limit(DEFAULT_MAX_UPLOAD_BYTES);
        assert!(limit > DEFAULT_MAX_UPLOAD_BYTES / 3 * 4);
        assert!(limit > 2 * 1024 * 1024);
        assert_eq!(request_body_limit(3), 4 + 64 * 1024);
    }

    #[tokio::test]
    async fn test_mcp_accepts_upload_larger_than_axum_default() {
        // 3 MiB of PDF is 4 MiB of base64, over axum's 2 MB default
        let (status, body) = post(app(), "/mcp", &upload_request(3 * 1024 * 1024)).await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["id"], 7);
        let text = value["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("PDF uploaded successfully: big.pdf"));
    }

    #[tokio::test]
    async fn test_body_over_limit_is_rejected() {
        let (status, _) = post(app_with_limit(1024), "/mcp", &upload_request(4096)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_mcp_notification_is_accepted() {
        let (status, body) = post(
            app(),
            "/mcp",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(body.is_empty());

        let (status, _) = post(app(), "/mcp/stream", r#"{"method":"notifications/initialized"}"#).await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_mcp_stream_single_event() {
        let (status, body) = post(app(), "/mcp/stream", r#"{"jsonrpc":"2.0","id":"s","method":"ping"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            "event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":\"s\",\"result\":{\"pong\":true}}\n\n"
        );
    }

    #[tokio::test]
    async fn test_mcp_stream_parse_error_is_200() {
        let (status, body) = post(app(), "/mcp/stream", "not json").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("event: message\ndata: "));
        assert!(body.contains("-32700"));
    }

    #[tokio::test]
    async fn test_health() {
        let (status, value) = get_json(app(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["status"], "healthy");
        assert_eq!(value["version"], "1.0.0");
        assert!(value["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_banner() {
        let (status, value) = get_json(app(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["name"], "http-test");
        assert_eq!(value["endpoints"]["mcp"], "POST /mcp");
    }

    #[tokio::test]
    async fn test_rest_tools() {
        let (status, value) = get_json(app(), "/tools").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["tools"][0]["name"], "echo");

        let (status, body) = post(
            app(),
            "/tools/call",
            r#"{"name":"echo","arguments":{"message":"rest"}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["content"][0]["text"], "Echo: rest");
    }

    #[tokio::test]
    async fn test_rest_call_errors() {
        let (status, _) = post(app(), "/tools/call", r#"{"arguments":{}}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = post(app(), "/tools/call", r#"{"name":"missing"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("Tool not found: missing"));

        let (status, _) = post(app(), "/tools/call", "garbage").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = app();
        let _ = post(app.clone(), "/mcp", r#"{"id":1,"method":"ping"}"#).await;

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("mcp_requests_total 1"));
    }
}
