//! MCP JSON-RPC dispatcher.
//!
//! A Model Context Protocol server that routes JSON-RPC 2.0 requests to a
//! registry of tools and resources. The same dispatcher is served over
//! several transports.
//!
//! # Architecture
//!
//! 1. **MCP Layer** (`mcp`) - Protocol types, codec, registries, dispatcher, stdio transport
//! 2. **HTTP Layer** (`http`) - axum adapters for unary HTTP, SSE and WebSocket
//! 3. **Tools Layer** (`tools`) - Built-in tools
//! 4. **Service Layer** (`service`) - Shared upload store
//!
//! Configuration, errors and metrics live in `config`, `error` and `metrics`.

pub mod config;
pub mod error;
pub mod http;
pub mod mcp;
pub mod metrics;
pub mod service;
pub mod tools;

use std::sync::Arc;

use crate::config::Config;
use crate::mcp::handler::ToolRegistry;
use crate::mcp::resources::{FileResource, Resource, ResourceRegistry, UploadCollectionResource};
use crate::mcp::server::McpServer;
use crate::service::uploads::PDF_MIME_TYPE;
use crate::service::UploadStore;

pub use error::{Error, Result};

/// Server version.
pub const VERSION: &str = "1.0.0";

/// URI of the bundled sample document.
pub const SAMPLE_PDF_URI: &str = "file://documents/sample.pdf";

/// Build a server with the built-in tools and resources described by
/// `config`.
pub fn build_server(config: &Config) -> Result<McpServer> {
    let uploads = Arc::new(UploadStore::new());

    let mut resources = ResourceRegistry::new(uploads.clone());
    resources.register(
        FileResource::new(
            Resource {
                uri: SAMPLE_PDF_URI.to_string(),
                name: "Sample PDF Document".to_string(),
                description: Some("A fixed PDF file included with the server".to_string()),
                mime_type: Some(PDF_MIME_TYPE.to_string()),
            },
            config.documents_dir.join("sample.pdf"),
        )
        .with_preview_chars(config.preview_chars),
    )?;
    resources.register(UploadCollectionResource::new(uploads.clone()))?;

    for entry in &config.file_resources {
        let mime_type = entry
            .mime_type
            .clone()
            .or_else(|| mcp::resources::guess_mime_type(&entry.path));
        resources.register(
            FileResource::new(
                Resource {
                    uri: entry.uri.clone(),
                    name: entry.name.clone(),
                    description: entry.description.clone(),
                    mime_type,
                },
                entry.path.clone(),
            )
            .with_preview_chars(config.preview_chars),
        )?;
    }

    let mut tools = ToolRegistry::new();
    tools::register_all_tools(&mut tools, uploads, config.max_upload_bytes)?;

    Ok(McpServer::new(tools, resources, config.server_info())?
        .with_tool_timeout(config.tool_timeout()))
}
