//! MCP Resources Support
//!
//! A fixed set of resources is registered at startup; uploaded documents are
//! appended at runtime through the shared [`UploadStore`].

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncReadExt;

use crate::error::{Error, Result};
use crate::service::uploads::{UploadStore, UPLOAD_COLLECTION_URI, UPLOAD_URI_PREFIX};

/// Upper bound for text resources returned inline (1MB).
pub const MAX_TEXT_RESOURCE_BYTES: usize = 1024 * 1024;

/// Default number of base64 characters kept when previewing binary content.
pub const DEFAULT_PREVIEW_CHARS: usize = 100;

/// A resource exposed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Resource contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>, // base64 encoded
}

/// Result of resources/list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResourcesResult {
    pub resources: Vec<Resource>,
}

/// Result of resources/read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResourceResult {
    pub contents: Vec<ResourceContents>,
}

/// A readable resource.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    fn definition(&self) -> Resource;

    async fn read(&self) -> Result<ResourceContents>;
}

/// A resource backed by a file on disk.
pub struct FileResource {
    resource: Resource,
    path: PathBuf,
    preview_chars: usize,
}

impl FileResource {
    pub fn new(resource: Resource, path: impl Into<PathBuf>) -> Self {
        Self {
            resource,
            path: path.into(),
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    /// Limit on base64 characters returned for binary files.
    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileResource {
    /// Read at most `limit` bytes, returning them with the full file size.
    async fn read_prefix(&self, limit: usize) -> Result<(Vec<u8>, usize)> {
        let file = match fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound(self.path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let total = usize::try_from(file.metadata().await?.len()).unwrap_or(usize::MAX);

        let mut bytes = Vec::with_capacity(limit.min(total));
        file.take(u64::try_from(limit).unwrap_or(u64::MAX))
            .read_to_end(&mut bytes)
            .await?;
        Ok((bytes, total))
    }
}

#[async_trait]
impl ResourceHandler for FileResource {
    fn definition(&self) -> Resource {
        self.resource.clone()
    }

    async fn read(&self) -> Result<ResourceContents> {
        let mime_type = self
            .resource
            .mime_type
            .clone()
            .or_else(|| guess_mime_type(&self.path));

        let text = if mime_type.as_deref().is_some_and(is_text_mime) {
            // one extra UTF-8 sequence so truncation can tell the file was longer
            let (bytes, _) = self.read_prefix(MAX_TEXT_RESOURCE_BYTES + 4).await?;
            truncate_text(String::from_utf8_lossy(&bytes).into_owned(), MAX_TEXT_RESOURCE_BYTES)
        } else {
            let (bytes, total) = self.read_prefix(preview_input_len(self.preview_chars)).await?;
            base64_preview(&bytes, total, self.preview_chars)
        };

        Ok(ResourceContents {
            uri: self.resource.uri.clone(),
            mime_type,
            text: Some(text),
            blob: None,
        })
    }
}

/// The `uploaded://pdfs` collection: reading it lists upload metadata.
pub struct UploadCollectionResource {
    uploads: Arc<UploadStore>,
}

impl UploadCollectionResource {
    pub fn new(uploads: Arc<UploadStore>) -> Self {
        Self { uploads }
    }
}

#[async_trait]
impl ResourceHandler for UploadCollectionResource {
    fn definition(&self) -> Resource {
        Resource {
            uri: UPLOAD_COLLECTION_URI.to_string(),
            name: "Uploaded PDF Files".to_string(),
            description: Some("User-uploaded PDF files (validated format)".to_string()),
            mime_type: Some("application/pdf".to_string()),
        }
    }

    async fn read(&self) -> Result<ResourceContents> {
        let files = self.uploads.list().await;
        Ok(ResourceContents {
            uri: UPLOAD_COLLECTION_URI.to_string(),
            mime_type: Some("application/json".to_string()),
            text: Some(serde_json::to_string_pretty(&files)?),
            blob: None,
        })
    }
}

/// Resource registry: static entries plus the dynamic upload subset.
pub struct ResourceRegistry {
    resources: Vec<(Resource, Arc<dyn ResourceHandler>)>,
    index: HashMap<String, usize>,
    uploads: Arc<UploadStore>,
}

impl ResourceRegistry {
    pub fn new(uploads: Arc<UploadStore>) -> Self {
        Self {
            resources: Vec::new(),
            index: HashMap::new(),
            uploads,
        }
    }

    /// Register a static resource.
    pub fn register<T: ResourceHandler + 'static>(&mut self, handler: T) -> Result<()> {
        self.register_arc(Arc::new(handler))
    }

    /// Register a static resource (Arc version).
    ///
    /// URIs under the upload prefix are reserved for the dynamic subset.
    pub fn register_arc(&mut self, handler: Arc<dyn ResourceHandler>) -> Result<()> {
        let resource = handler.definition();
        if resource.uri.starts_with(UPLOAD_URI_PREFIX) {
            return Err(Error::Config(format!(
                "URI prefix {} is reserved for uploads: {}",
                UPLOAD_URI_PREFIX, resource.uri
            )));
        }
        if self.index.contains_key(&resource.uri) {
            return Err(Error::DuplicateName(resource.uri));
        }
        self.index.insert(resource.uri.clone(), self.resources.len());
        self.resources.push((resource, handler));
        Ok(())
    }

    /// Number of static resources.
    pub fn static_count(&self) -> usize {
        self.resources.len()
    }

    pub fn uploads(&self) -> &Arc<UploadStore> {
        &self.uploads
    }

    /// Static resources followed by uploads.
    pub async fn list_resources(&self) -> Vec<Resource> {
        let mut resources: Vec<Resource> =
            self.resources.iter().map(|(r, _)| r.clone()).collect();
        resources.extend(self.uploads.descriptors().await);
        resources
    }

    /// Look up a resource descriptor by URI.
    pub async fn lookup_resource(&self, uri: &str) -> Option<Resource> {
        if let Some(&i) = self.index.get(uri) {
            return Some(self.resources[i].0.clone());
        }
        self.uploads.get_by_uri(uri).await.map(|f| f.descriptor())
    }

    /// Read a resource by URI.
    pub async fn read(&self, uri: &str) -> Result<ResourceContents> {
        if let Some(&i) = self.index.get(uri) {
            return self.resources[i].1.read().await;
        }
        if uri.starts_with(UPLOAD_URI_PREFIX) {
            return self.uploads.read(uri).await;
        }
        Err(Error::ResourceNotFound(uri.to_string()))
    }
}

fn is_text_mime(mime: &str) -> bool {
    mime.starts_with("text/")
        || matches!(mime, "application/json" | "application/xml" | "application/yaml")
}

/// Input bytes needed to produce `limit` base64 characters.
pub fn preview_input_len(limit: usize) -> usize {
    limit.div_ceil(4).saturating_mul(3)
}

/// Base64 encode the leading bytes of a `total_len`-byte payload. When the
/// full encoding would exceed `limit` characters only a `limit`-character
/// prefix is kept, and only the bytes that prefix needs are encoded.
pub fn base64_preview(bytes: &[u8], total_len: usize, limit: usize) -> String {
    let encoded_len = total_len.div_ceil(3).saturating_mul(4);
    if encoded_len <= limit && bytes.len() >= total_len {
        return STANDARD.encode(&bytes[..total_len]);
    }

    let needed = preview_input_len(limit).min(bytes.len());
    let mut encoded = STANDARD.encode(&bytes[..needed]);
    // base64 output is ASCII, any index is a char boundary
    encoded.truncate(limit);
    format!("Binary content (base64, {} bytes): {}...", total_len, encoded)
}

fn truncate_text(mut text: String, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
    text.push_str("\n... (truncated)");
    text
}

/// Infer a MIME type string for a file path based on its extension.
///
/// Returns `Some("application/octet-stream")` for unknown extensions and
/// `None` if the path has no extension.
pub fn guess_mime_type(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "json" => "application/json",
        "yaml" | "yml" => "application/yaml",
        "xml" => "application/xml",
        "md" => "text/markdown",
        "html" => "text/html",
        "csv" => "text/csv",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    };
    Some(mime.to_string())
}
