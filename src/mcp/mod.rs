//! Model Context Protocol (MCP) implementation.
//!
//! # Architecture
//!
//! - `protocol` - JSON-RPC envelopes and MCP payload types
//! - `codec` - Frame decoding and response encoding
//! - `handler` - Tool handler trait and registry
//! - `resources` - Resource handler trait and registry
//! - `server` - Method dispatcher
//! - `transport` - Line-delimited stdio transport

pub mod codec;
pub mod handler;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod transport;

pub use handler::{ToolHandler, ToolRegistry};
pub use protocol::*;
pub use resources::{ResourceHandler, ResourceRegistry};
pub use server::McpServer;
pub use transport::{StdioTransport, Transport};
