//! General-purpose tools: echo, server time and a placeholder.

use async_trait::async_trait;
use chrono::{Local, SecondsFormat};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::Result;
use crate::mcp::handler::{get_display_arg, success_result, ToolHandler};
use crate::mcp::protocol::{Tool, ToolResult};
use crate::tool_schema;

/// Echo tool.
pub struct EchoTool;

#[async_trait]
impl ToolHandler for EchoTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "echo".to_string(),
            description: "Echo back the input message".to_string(),
            input_schema: tool_schema!(["message"],
                "message": {
                    "type": "string",
                    "description": "Message to echo back"
                }
            ),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let message = get_display_arg(&args, "message");
        Ok(success_result(format!("Echo: {}", message)))
    }
}

/// Current server time tool.
pub struct GetTimeTool;

#[async_trait]
impl ToolHandler for GetTimeTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "get_time".to_string(),
            description: "Get current server time".to_string(),
            input_schema: tool_schema!([]),
        }
    }

    async fn execute(&self, _args: HashMap<String, Value>) -> Result<ToolResult> {
        let now = Local::now().to_rfc3339_opts(SecondsFormat::Micros, false);
        Ok(success_result(format!("Current server time: {}", now)))
    }
}

/// Placeholder for a custom tool.
pub struct PlaceholderTool;

#[async_trait]
impl ToolHandler for PlaceholderTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "placeholder_tool".to_string(),
            description: "A placeholder tool for your custom implementation".to_string(),
            input_schema: tool_schema!(["input"],
                "input": {
                    "type": "string",
                    "description": "Input parameter for your custom tool"
                }
            ),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let input = get_display_arg(&args, "input");
        Ok(success_result(format!(
            "Placeholder tool executed with input: {}",
            input
        )))
    }
}
