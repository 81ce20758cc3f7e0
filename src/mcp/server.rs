//! MCP server implementation.
//!
//! [`McpServer`] is the dispatcher: it routes one request at a time to a
//! built-in method and turns every internal error into a JSON-RPC error
//! object. Transports own framing only.

use futures::FutureExt;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::mcp::codec::DecodeError;
use crate::mcp::handler::{ToolHandler, ToolRegistry};
use crate::mcp::protocol::*;
use crate::mcp::resources::{ListResourcesResult, ReadResourceResult, ResourceRegistry};
use crate::mcp::transport::{Incoming, Transport};
use crate::metrics::{Metrics, Timer};

/// Built-in methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Initialize,
    ListTools,
    CallTool,
    ListResources,
    ReadResource,
    Ping,
}

impl Method {
    pub const ALL: [Method; 6] = [
        Method::Initialize,
        Method::ListTools,
        Method::CallTool,
        Method::ListResources,
        Method::ReadResource,
        Method::Ping,
    ];

    /// Wire names routed to this method; the first is canonical.
    pub fn wire_names(self) -> &'static [&'static str] {
        match self {
            Method::Initialize => &["initialize"],
            Method::ListTools => &["tools/list", "tools"],
            Method::CallTool => &["tools/call"],
            Method::ListResources => &["resources/list"],
            Method::ReadResource => &["resources/read"],
            Method::Ping => &["ping"],
        }
    }
}

/// Build the method table, checking that every method is reachable and no
/// wire name is claimed twice.
fn build_method_table() -> Result<HashMap<&'static str, Method>> {
    let mut table = HashMap::new();
    for method in Method::ALL {
        let names = method.wire_names();
        if names.is_empty() {
            return Err(Error::Internal(format!("method {:?} has no wire name", method)));
        }
        for name in names {
            if let Some(previous) = table.insert(*name, method) {
                return Err(Error::Internal(format!(
                    "wire name {} routed to both {:?} and {:?}",
                    name, previous, method
                )));
            }
        }
    }
    Ok(table)
}

/// MCP server.
pub struct McpServer {
    tools: Arc<ToolRegistry>,
    resources: Arc<ResourceRegistry>,
    methods: HashMap<&'static str, Method>,
    info: ServerInfo,
    tool_timeout: Option<Duration>,
    metrics: Arc<Metrics>,
}

impl McpServer {
    /// Create a new MCP server.
    pub fn new(tools: ToolRegistry, resources: ResourceRegistry, info: ServerInfo) -> Result<Self> {
        Ok(Self {
            tools: Arc::new(tools),
            resources: Arc::new(resources),
            methods: build_method_table()?,
            info,
            tool_timeout: None,
            metrics: Metrics::new(),
        })
    }

    /// Bound each tool call; `None` disables the limit.
    pub fn with_tool_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Resolve a wire method name.
    pub fn route(&self, method: &str) -> Option<Method> {
        self.methods.get(method).copied()
    }

    /// Run the server with the given transport until its input ends.
    pub async fn run<T: Transport>(&self, mut transport: T) -> Result<()> {
        info!("Starting MCP server: {} v{}", self.info.name, self.info.version);

        let (mut incoming, outgoing) = transport.start().await?;

        while let Some(msg) = incoming.recv().await {
            let response = match msg {
                Incoming::Request(req) => self.handle(req).await,
                Incoming::Malformed(e) if e.is_parse() => {
                    self.metrics.inc_decode_errors();
                    error!("Skipping malformed message: {}", e);
                    None
                }
                Incoming::Malformed(e) => Some(self.reject(e)),
            };

            if let Some(response) = response {
                if outgoing.send(response).await.is_err() {
                    error!("Failed to send response");
                    break;
                }
            }
        }

        drop(outgoing);
        transport.stop().await?;
        info!("MCP server stopped");
        Ok(())
    }

    /// Error response for a frame that could not be decoded.
    pub fn reject(&self, err: DecodeError) -> JsonRpcResponse {
        self.metrics.inc_decode_errors();
        warn!("Rejecting frame: {}", err);
        err.into_response()
    }

    /// Handle a request. Returns `None` for notifications.
    pub async fn handle(&self, req: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = req.id.clone() else {
            self.handle_notification(&req);
            return None;
        };

        debug!("Handling request: {} (id: {})", req.method, id);
        self.metrics.inc_requests();
        let timer = Timer::start();

        let result = match self.route(&req.method) {
            Some(method) => self.dispatch(method, req.params).await,
            None => Err(Error::MethodNotFound(req.method.clone())),
        };

        match result {
            Ok(value) => {
                self.metrics.inc_success();
                debug!("{} (id: {}) completed in {}ms", req.method, id, timer.elapsed_ms());
                Some(JsonRpcResponse::success(Some(id), value))
            }
            Err(e) => {
                self.metrics.inc_failed();
                if e.is_client_error() {
                    warn!("{} (id: {}) rejected: {}", req.method, id, e);
                } else {
                    error!("{} (id: {}) failed: {}", req.method, id, e);
                }
                Some(JsonRpcResponse::failure(Some(id), e.to_jsonrpc()))
            }
        }
    }

    async fn dispatch(&self, method: Method, params: Option<Value>) -> Result<Value> {
        match method {
            Method::Initialize => self.handle_initialize(),
            Method::ListTools => self.handle_list_tools(),
            Method::CallTool => self.handle_call_tool(params).await,
            Method::ListResources => self.handle_list_resources().await,
            Method::ReadResource => self.handle_read_resource(params).await,
            Method::Ping => Ok(json!({ "pong": true })),
        }
    }

    /// Handle a notification. Nothing is dispatched and nothing is returned.
    fn handle_notification(&self, notif: &JsonRpcRequest) {
        self.metrics.inc_notifications();

        match notif.method.as_str() {
            "notifications/initialized" => {
                info!("Client initialized");
            }
            "notifications/cancelled" => {
                let request_id = notif
                    .params
                    .as_ref()
                    .and_then(|p| p.get("requestId"))
                    .cloned()
                    .unwrap_or(Value::Null);
                info!("Client cancelled request {}", request_id);
            }
            other => {
                debug!("Ignoring notification: {}", other);
            }
        }
    }

    /// Handle initialize request.
    fn handle_initialize(&self) -> Result<Value> {
        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
                resources: Some(ResourcesCapability {
                    subscribe: false,
                    list_changed: false,
                }),
            },
            server_info: self.info.clone(),
        };

        Ok(serde_json::to_value(result)?)
    }

    /// Handle list tools request.
    fn handle_list_tools(&self) -> Result<Value> {
        let tools = self.tools.list_tools();
        let result = ListToolsResult { tools };
        Ok(serde_json::to_value(result)?)
    }

    /// Handle call tool request.
    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value> {
        let mut params = params_object(params)?;

        let name = match params.remove("name") {
            Some(Value::String(name)) => name,
            Some(_) => return Err(Error::InvalidParams("name must be a string".to_string())),
            None => return Err(Error::MissingParameter("name".to_string())),
        };

        let arguments: HashMap<String, Value> = match params.remove("arguments") {
            None | Some(Value::Null) => HashMap::new(),
            Some(Value::Object(map)) => map.into_iter().collect(),
            Some(_) => {
                return Err(Error::InvalidParams("arguments must be an object".to_string()))
            }
        };

        let handler = self
            .tools
            .lookup_tool(&name)
            .ok_or_else(|| Error::ToolNotFound(name.clone()))?;

        if let Some(tool) = self.tools.definition(&name) {
            let missing: Vec<&str> = tool
                .required_arguments()
                .into_iter()
                .filter(|arg| !arguments.contains_key(*arg))
                .collect();
            if !missing.is_empty() {
                warn!("Tool {} called without required arguments: {:?}", name, missing);
            }
        }

        self.metrics.inc_tool_calls();
        let result = self.execute_tool(&name, handler, arguments).await?;
        Ok(serde_json::to_value(result)?)
    }

    /// Run a tool handler, converting errors, panics and timeouts into
    /// [`Error::ToolExecutionFailed`] / [`Error::Timeout`].
    async fn execute_tool(
        &self,
        name: &str,
        handler: Arc<dyn ToolHandler>,
        arguments: HashMap<String, Value>,
    ) -> Result<ToolResult> {
        let execution = AssertUnwindSafe(handler.execute(arguments)).catch_unwind();

        let outcome = match self.tool_timeout {
            Some(limit) => tokio::time::timeout(limit, execution)
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => execution.await,
        };

        match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e @ Error::ToolExecutionFailed(_))) => Err(e),
            Ok(Err(e)) => Err(Error::ToolExecutionFailed(e.to_string())),
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(Error::ToolExecutionFailed(format!(
                    "tool {} panicked: {}",
                    name, detail
                )))
            }
        }
    }

    /// Handle list resources request.
    async fn handle_list_resources(&self) -> Result<Value> {
        let resources = self.resources.list_resources().await;
        Ok(serde_json::to_value(ListResourcesResult { resources })?)
    }

    /// Handle read resource request.
    async fn handle_read_resource(&self, params: Option<Value>) -> Result<Value> {
        let params = params_object(params)?;

        let uri = match params.get("uri") {
            Some(Value::String(uri)) if !uri.is_empty() => uri.clone(),
            _ => return Err(Error::MissingParameter("uri".to_string())),
        };

        let contents = self.resources.read(&uri).await?;
        Ok(serde_json::to_value(ReadResourceResult {
            contents: vec![contents],
        })?)
    }
}

/// Params as an object; absent params are an empty object.
fn params_object(params: Option<Value>) -> Result<Map<String, Value>> {
    match params {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(Error::InvalidParams("params must be an object".to_string())),
    }
}
