//! Configuration management for the MCP dispatcher.
//!
//! Command-line flags (with environment fallbacks) are parsed into [`Args`],
//! converted into [`Config`], and optionally extended from a YAML file.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::mcp::codec::ResponseOptions;
use crate::mcp::protocol::ServerInfo;

/// Default server name reported by `initialize`.
pub const DEFAULT_SERVER_NAME: &str = "mcp-castellonian-server";

/// Default upload size limit (10MB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Command-line arguments for the MCP dispatcher.
#[derive(Parser, Debug, Clone)]
#[command(name = "mcp-dispatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP JSON-RPC server over HTTP, SSE, WebSocket and stdio")]
pub struct Args {
    /// Transport mode: stdio or http
    #[arg(short, long, default_value = "stdio", env = "MCP_TRANSPORT")]
    pub transport: Transport,

    /// HTTP bind address (only for http transport)
    #[arg(long, default_value = "0.0.0.0", env = "MCP_HOST")]
    pub host: String,

    /// HTTP port (only for http transport)
    #[arg(short, long, default_value = "8000", env = "PORT")]
    pub port: u16,

    /// Enable debug logging
    #[arg(short, long, env = "MCP_DEBUG")]
    pub debug: bool,

    /// Log output format
    #[arg(long, default_value = "text", env = "MCP_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Directory holding the built-in document resources
    #[arg(long, default_value = "documents", env = "MCP_DOCUMENTS_DIR")]
    pub documents_dir: PathBuf,

    /// YAML file with server identity and extra resources
    #[arg(short, long, env = "MCP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Server name reported to clients
    #[arg(long, default_value = DEFAULT_SERVER_NAME, env = "MCP_SERVER_NAME")]
    pub server_name: String,

    /// Server version reported to clients
    #[arg(long, default_value = crate::VERSION, env = "MCP_SERVER_VERSION")]
    pub server_version: String,

    /// Per-call tool timeout in seconds (0 disables)
    #[arg(long, default_value = "30", env = "MCP_TOOL_TIMEOUT")]
    pub tool_timeout_secs: u64,

    /// Base64 characters shown when previewing binary resources
    #[arg(long, default_value = "100", env = "MCP_PREVIEW_CHARS")]
    pub preview_chars: usize,

    /// Maximum decoded size of an uploaded PDF (bytes)
    #[arg(long, default_value = "10485760", env = "MCP_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: usize,

    /// Maximum in-flight HTTP requests
    #[arg(long, default_value = "256", env = "MCP_MAX_CONCURRENT_REQUESTS")]
    pub max_concurrent_requests: usize,

    /// Render numeric response ids as strings
    #[arg(long, env = "MCP_STRINGIFY_IDS")]
    pub stringify_ids: bool,
}

/// Transport mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Stdio,
    Http,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// A file-backed resource declared in the YAML config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileResourceConfig {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    pub path: PathBuf,
}

/// `server:` section of the YAML config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Layout of the YAML config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub resources: Vec<FileResourceConfig>,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Transport mode
    pub transport: Transport,
    /// HTTP bind address
    pub host: String,
    /// HTTP port
    pub port: u16,
    /// Debug mode
    pub debug: bool,
    /// Log format
    pub log_format: LogFormat,
    /// Built-in documents directory
    pub documents_dir: PathBuf,
    /// YAML config file
    pub config_file: Option<PathBuf>,
    /// Server name
    pub server_name: String,
    /// Server version
    pub server_version: String,
    /// Tool timeout in seconds, 0 for none
    pub tool_timeout_secs: u64,
    /// Binary preview length
    pub preview_chars: usize,
    /// Upload limit
    pub max_upload_bytes: usize,
    /// HTTP concurrency limit
    pub max_concurrent_requests: usize,
    /// Stringify numeric ids
    pub stringify_ids: bool,
    /// Extra file resources from the config file
    #[serde(default)]
    pub file_resources: Vec<FileResourceConfig>,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            transport: args.transport,
            host: args.host,
            port: args.port,
            debug: args.debug,
            log_format: args.log_format,
            documents_dir: args.documents_dir,
            config_file: args.config,
            server_name: args.server_name,
            server_version: args.server_version,
            tool_timeout_secs: args.tool_timeout_secs,
            preview_chars: args.preview_chars,
            max_upload_bytes: args.max_upload_bytes,
            max_concurrent_requests: args.max_concurrent_requests,
            stringify_ids: args.stringify_ids,
            file_resources: Vec::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: Transport::Stdio,
            host: "0.0.0.0".to_string(),
            port: 8000,
            debug: false,
            log_format: LogFormat::Text,
            documents_dir: PathBuf::from("documents"),
            config_file: None,
            server_name: DEFAULT_SERVER_NAME.to_string(),
            server_version: crate::VERSION.to_string(),
            tool_timeout_secs: 30,
            preview_chars: 100,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_concurrent_requests: 256,
            stringify_ids: false,
            file_resources: Vec::new(),
        }
    }
}

impl Config {
    /// Apply the YAML config file, if one is set.
    pub fn load_file(&mut self) -> Result<()> {
        let Some(path) = self.config_file.clone() else {
            return Ok(());
        };
        let text = std::fs::read_to_string(&path).map_err(|e| {
            Error::Config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        let file: FileConfig = serde_yaml::from_str(&text)?;
        self.apply_file(file, path.parent());
        Ok(())
    }

    /// Merge a parsed config file. Relative resource paths resolve against
    /// `base`.
    pub fn apply_file(&mut self, file: FileConfig, base: Option<&Path>) {
        if let Some(name) = file.server.name {
            self.server_name = name;
        }
        if let Some(version) = file.server.version {
            self.server_version = version;
        }
        for mut resource in file.resources {
            if let Some(base) = base {
                if resource.path.is_relative() {
                    resource.path = base.join(&resource.path);
                }
            }
            self.file_resources.push(resource);
        }
    }

    /// Server identity reported by `initialize`.
    pub fn server_info(&self) -> ServerInfo {
        ServerInfo {
            name: self.server_name.clone(),
            version: self.server_version.clone(),
        }
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        (self.tool_timeout_secs > 0).then(|| Duration::from_secs(self.tool_timeout_secs))
    }

    pub fn response_options(&self) -> ResponseOptions {
        ResponseOptions {
            stringify_ids: self.stringify_ids,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
