//! Tool handler trait and the registry that holds them.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::mcp::protocol::{ContentBlock, Tool, ToolResult};

/// Handler for MCP tool calls.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Get the tool definition.
    fn definition(&self) -> Tool;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: HashMap<String, Value>) -> Result<ToolResult>;
}

/// Registry of tool handlers, listed in registration order.
pub struct ToolRegistry {
    tools: Vec<(Tool, Arc<dyn ToolHandler>)>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool handler.
    pub fn register<T: ToolHandler + 'static>(&mut self, handler: T) -> Result<()> {
        self.register_arc(Arc::new(handler))
    }

    /// Register a tool handler (Arc version).
    ///
    /// Fails with [`Error::DuplicateName`] if a tool with the same name is
    /// already registered; the existing entry is kept.
    pub fn register_arc(&mut self, handler: Arc<dyn ToolHandler>) -> Result<()> {
        let tool = handler.definition();
        if self.index.contains_key(&tool.name) {
            return Err(Error::DuplicateName(tool.name));
        }
        self.index.insert(tool.name.clone(), self.tools.len());
        self.tools.push((tool, handler));
        Ok(())
    }

    /// Get all registered tools.
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(|(tool, _)| tool.clone()).collect()
    }

    /// Get a tool by name.
    pub fn lookup_tool(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.index
            .get(name)
            .map(|&i| Arc::clone(&self.tools[i].1))
    }

    /// Get a tool definition by name.
    pub fn definition(&self, name: &str) -> Option<&Tool> {
        self.index.get(name).map(|&i| &self.tools[i].0)
    }

    /// Check if a tool exists.
    pub fn has_tool(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Get the number of registered tools.
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper macro for creating tool input schemas.
///
/// ```
/// let schema = mcp_dispatch::tool_schema!(["message"], "message": { "type": "string" });
/// assert_eq!(schema["required"][0], "message");
/// ```
#[macro_export]
macro_rules! tool_schema {
    ([$($required:expr),* $(,)?] $(, $($json:tt)+)?) => {
        serde_json::json!({
            "type": "object",
            "properties": {
                $($($json)+)?
            },
            "required": [$($required),*]
        })
    };
}

/// Helper to create a text content block.
pub fn text_content(text: impl Into<String>) -> ContentBlock {
    ContentBlock::Text { text: text.into() }
}

/// Helper to create a successful tool result.
pub fn success_result(text: impl Into<String>) -> ToolResult {
    ToolResult {
        content: vec![text_content(text)],
        is_error: false,
    }
}

/// Helper to create an error tool result.
pub fn error_result(text: impl Into<String>) -> ToolResult {
    ToolResult {
        content: vec![text_content(text)],
        is_error: true,
    }
}

/// String argument that renders non-string values as JSON text and falls
/// back to an empty string when missing.
pub fn get_display_arg(args: &HashMap<String, Value>, name: &str) -> String {
    match args.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct TestTool {
        name: String,
    }

    #[async_trait]
    impl ToolHandler for TestTool {
        fn definition(&self) -> Tool {
            Tool {
                name: self.name.clone(),
                description: format!("Test tool: {}", self.name),
                input_schema: crate::tool_schema!(["input"], "input": { "type": "string" }),
            }
        }

        async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
            let input = get_display_arg(&args, "input");
            Ok(success_result(format!("Executed {} with: {}", self.name, input)))
        }
    }

    fn tool(name: &str) -> TestTool {
        TestTool {
            name: name.to_string(),
        }
    }

    #[test]
    fn test_registry_registration() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("test_tool")).unwrap();

        assert_eq!(registry.tool_count(), 1);
        assert!(registry.has_tool("test_tool"));
        assert!(!registry.has_tool("nonexistent"));
        assert!(registry.lookup_tool("nonexistent").is_none());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("echo")).unwrap();

        let err = registry.register(tool("echo")).unwrap_err();
        assert!(matches!(err, Error::DuplicateName(ref name) if name == "echo"));
        assert_eq!(registry.tool_count(), 1);
    }

    #[test]
    fn test_list_tools_in_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(tool(name)).unwrap();
        }

        let names: Vec<_> = registry.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(
            registry.definition("alpha").unwrap().required_arguments(),
            vec!["input"]
        );
    }

    #[tokio::test]
    async fn test_tool_execution() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("echo")).unwrap();

        let handler = registry.lookup_tool("echo").unwrap();
        let mut args = HashMap::new();
        args.insert("input".to_string(), json!("hello"));

        let result = handler.execute(args).await.unwrap();
        assert!(!result.is_error);

        let ContentBlock::Text { text } = &result.content[0];
        assert!(text.contains("Executed echo with: hello"));
    }

    #[test]
    fn test_get_display_arg() {
        let mut args = HashMap::new();
        args.insert("text".to_string(), json!("hi"));
        args.insert("num".to_string(), json!(3));
        args.insert("nothing".to_string(), Value::Null);

        assert_eq!(get_display_arg(&args, "text"), "hi");
        assert_eq!(get_display_arg(&args, "num"), "3");
        assert_eq!(get_display_arg(&args, "nothing"), "");
        assert_eq!(get_display_arg(&args, "missing"), "");
    }

    #[test]
    fn test_tool_schema_macro() {
        let schema = crate::tool_schema!([]);
        assert_eq!(schema["type"], "object");
        assert!(schema["required"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_result_helpers() {
        assert!(!success_result("ok").is_error);
        assert!(error_result("bad").is_error);
        assert_eq!(error_result("bad").content.len(), 1);
    }
}
