//! In-memory store for uploaded PDF documents.
//!
//! Uploads are exposed as dynamic resources under [`UPLOAD_URI_PREFIX`] and
//! live until the process exits.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::{Error, Result};
use crate::mcp::resources::{Resource, ResourceContents};

/// URI of the upload collection resource.
pub const UPLOAD_COLLECTION_URI: &str = "uploaded://pdfs";

/// Prefix of individual uploaded documents.
pub const UPLOAD_URI_PREFIX: &str = "uploaded://pdfs/";

/// MIME type of every upload.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// An uploaded document.
#[derive(Debug, Clone, Serialize)]
pub struct UploadedFile {
    /// Sequential id (`uploaded_<n>`)
    pub id: String,
    pub filename: String,
    /// Size in bytes
    pub size: usize,
    /// SHA-256 of the content, hex encoded
    pub sha256: String,
    /// Upload timestamp (RFC 3339)
    pub uploaded_at: String,
    #[serde(skip)]
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn uri(&self) -> String {
        format!("{}{}", UPLOAD_URI_PREFIX, self.id)
    }

    /// Resource descriptor for this upload.
    pub fn descriptor(&self) -> Resource {
        Resource {
            uri: self.uri(),
            name: self.filename.clone(),
            description: Some(format!("Uploaded PDF file (Size: {} bytes)", self.size)),
            mime_type: Some(PDF_MIME_TYPE.to_string()),
        }
    }

    /// Summary contents returned by `resources/read`.
    pub fn contents(&self) -> ResourceContents {
        ResourceContents {
            uri: self.uri(),
            mime_type: Some(PDF_MIME_TYPE.to_string()),
            text: Some(format!(
                "Uploaded PDF: {} (Size: {} bytes, Uploaded: {}, SHA-256: {})",
                self.filename, self.size, self.uploaded_at, self.sha256
            )),
            blob: None,
        }
    }
}

/// Upload store shared between the `upload_pdf` tool and the resource
/// registry.
#[derive(Debug, Default)]
pub struct UploadStore {
    files: RwLock<Vec<UploadedFile>>,
}

impl UploadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a document and return its metadata. Ids are assigned under the
    /// write lock, so concurrent uploads never share one.
    pub async fn add(&self, filename: impl Into<String>, content: Vec<u8>) -> UploadedFile {
        let mut hasher = Sha256::new();
        hasher.update(&content);
        let sha256 = hex::encode(hasher.finalize());

        let mut files = self.files.write().await;
        let file = UploadedFile {
            id: format!("uploaded_{}", files.len() + 1),
            filename: filename.into(),
            size: content.len(),
            sha256,
            uploaded_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            content,
        };
        files.push(file.clone());
        info!("Stored upload {} ({} bytes)", file.id, file.size);
        file
    }

    /// Look up an upload by id.
    pub async fn get(&self, id: &str) -> Option<UploadedFile> {
        self.files.read().await.iter().find(|f| f.id == id).cloned()
    }

    /// Look up an upload by its resource URI.
    pub async fn get_by_uri(&self, uri: &str) -> Option<UploadedFile> {
        let id = uri.strip_prefix(UPLOAD_URI_PREFIX)?;
        self.get(id).await
    }

    /// Resource descriptors in upload order.
    pub async fn descriptors(&self) -> Vec<Resource> {
        self.files.read().await.iter().map(UploadedFile::descriptor).collect()
    }

    /// Read an upload by URI.
    pub async fn read(&self, uri: &str) -> Result<ResourceContents> {
        self.get_by_uri(uri)
            .await
            .map(|f| f.contents())
            .ok_or_else(|| Error::ResourceNotFound(uri.to_string()))
    }

    /// Metadata of every upload, in upload order.
    pub async fn list(&self) -> Vec<UploadedFile> {
        self.files.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}
