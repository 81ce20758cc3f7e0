//! Built-in MCP tools.
//!
//! - `basic` - echo, server time, placeholder
//! - `math` - addition, multiplication, castellonian value
//! - `documents` - PDF upload into the shared upload store

pub mod basic;
pub mod documents;
pub mod math;

use std::sync::Arc;

use crate::error::Result;
use crate::mcp::handler::ToolRegistry;
use crate::service::UploadStore;

/// Register all built-in tools with the registry.
pub fn register_all_tools(
    registry: &mut ToolRegistry,
    uploads: Arc<UploadStore>,
    max_upload_bytes: usize,
) -> Result<()> {
    registry.register(basic::EchoTool)?;
    registry.register(basic::GetTimeTool)?;
    registry.register(math::AddNumbersTool)?;
    registry.register(math::MultiplyNumbersTool)?;
    registry.register(documents::UploadPdfTool::new(uploads, max_upload_bytes))?;
    registry.register(math::CastellonianTool)?;
    registry.register(basic::PlaceholderTool)?;
    Ok(())
}
