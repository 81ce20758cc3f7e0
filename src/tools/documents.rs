//! Document upload tool.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::mcp::handler::{error_result, get_display_arg, success_result, ToolHandler};
use crate::mcp::protocol::{Tool, ToolResult};
use crate::service::UploadStore;
use crate::tool_schema;

/// Magic bytes every PDF starts with.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Upload PDF tool.
pub struct UploadPdfTool {
    store: Arc<UploadStore>,
    max_bytes: usize,
}

impl UploadPdfTool {
    pub fn new(store: Arc<UploadStore>, max_bytes: usize) -> Self {
        Self { store, max_bytes }
    }
}

#[async_trait]
impl ToolHandler for UploadPdfTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "upload_pdf".to_string(),
            description: "Upload a PDF file for processing (validates PDF format)".to_string(),
            input_schema: tool_schema!(["filename", "content"],
                "filename": {
                    "type": "string",
                    "description": "Name of the PDF file"
                },
                "content": {
                    "type": "string",
                    "description": "Base64 encoded PDF content"
                }
            ),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let filename = get_display_arg(&args, "filename");
        let content = get_display_arg(&args, "content");

        if !filename.to_lowercase().ends_with(".pdf") {
            return Ok(error_result("Error: File must have .pdf extension"));
        }

        let bytes = match STANDARD.decode(content.trim()) {
            Ok(bytes) => bytes,
            Err(e) => return Ok(error_result(format!("Error: Invalid base64 content - {}", e))),
        };

        if !bytes.starts_with(PDF_MAGIC) {
            return Ok(error_result("Error: File is not a valid PDF format"));
        }

        if bytes.len() > self.max_bytes {
            return Ok(error_result(format!(
                "Error: File exceeds maximum upload size ({} > {} bytes)",
                bytes.len(),
                self.max_bytes
            )));
        }

        let file = self.store.add(filename, bytes).await;

        Ok(success_result(format!(
            "PDF uploaded successfully: {} (ID: {}, Size: {} bytes)",
            file.filename, file.id, file.size
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::ContentBlock;
    use serde_json::json;

    fn text(result: &ToolResult) -> &str {
        match &result.content[0] {
            ContentBlock::Text { text } => text,
        }
    }

    fn upload_args(filename: &str, content: &str) -> HashMap<String, Value> {
        serde_json::from_value(json!({"filename": filename, "content": content})).unwrap()
    }

    fn tool() -> (UploadPdfTool, Arc<UploadStore>) {
        let store = Arc::new(UploadStore::new());
        (UploadPdfTool::new(store.clone(), 1024), store)
    }

    #[tokio::test]
    async fn test_upload_valid_pdf() {
        let (tool, store) = tool();
        let content = STANDARD.encode(b"%PDF-1.4 minimal");

        let result = tool.execute(upload_args("Report.PDF", &content)).await.unwrap();

        assert!(!result.is_error);
        assert_eq!(
            text(&result),
            "PDF uploaded successfully: Report.PDF (ID: uploaded_1, Size: 16 bytes)"
        );
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_upload_rejects_extension() {
        let (tool, store) = tool();
        let content = STANDARD.encode(b"%PDF-1.4");
        let result = tool.execute(upload_args("notes.txt", &content)).await.unwrap();

        assert!(result.is_error);
        assert_eq!(text(&result), "Error: File must have .pdf extension");
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_upload_rejects_bad_base64() {
        let (tool, _) = tool();
        let result = tool.execute(upload_args("a.pdf", "***")).await.unwrap();

        assert!(result.is_error);
        assert!(text(&result).starts_with("Error: Invalid base64 content - "));
    }

    #[tokio::test]
    async fn test_upload_rejects_non_pdf_bytes() {
        let (tool, _) = tool();
        let content = STANDARD.encode(b"GIF89a");
        let result = tool.execute(upload_args("a.pdf", &content)).await.unwrap();

        assert_eq!(text(&result), "Error: File is not a valid PDF format");
    }

    #[tokio::test]
    async fn test_upload_enforces_size_limit() {
        let (tool, store) = tool();
        let mut bytes = b"%PDF-".to_vec();
        bytes.resize(2048, b'0');
        let result = tool
            .execute(upload_args("big.pdf", &STANDARD.encode(&bytes)))
            .await
            .unwrap();

        assert!(result.is_error);
        assert!(text(&result).contains("maximum upload size"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_upload_missing_arguments() {
        let (tool, _) = tool();
        let result = tool.execute(HashMap::new()).await.unwrap();
        assert_eq!(text(&result), "Error: File must have .pdf extension");
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_upload_is_logged_once() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (tool, _) = tool();
        let content = STANDARD.encode(b"%PDF-1.4 once");
        let result = tool.execute(upload_args("once.pdf", &content)).await.unwrap();
        assert!(!result.is_error);

        let output = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.matches("Stored upload uploaded_1").count(), 1);
    }
}

