//! MCP dispatcher binary.
//!
//! Serves the built-in tools and resources over stdio (default) or HTTP.

use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mcp_dispatch::config::{Args, Config, LogFormat, Transport};
use mcp_dispatch::error::{Error, Result};
use mcp_dispatch::mcp::transport::StdioTransport;
use mcp_dispatch::VERSION;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_logging(args.debug, args.log_format)?;

    let mut config: Config = args.into();
    config.load_file()?;

    info!("MCP dispatcher v{}", VERSION);
    info!("Transport: {:?}", config.transport);

    let server = mcp_dispatch::build_server(&config)?;
    info!(
        "Registered {} tools and {} resources",
        server.tools().tool_count(),
        server.resources().static_count()
    );

    match config.transport {
        Transport::Stdio => {
            info!("Starting stdio transport...");
            let transport = StdioTransport::stdio().with_options(config.response_options());
            server.run(transport).await?;
        }
        Transport::Http => {
            info!("Starting HTTP transport on {}...", config.bind_addr());
            mcp_dispatch::http::start_server(&config, Arc::new(server)).await?;
        }
    }

    Ok(())
}

/// Logs always go to stderr so stdout carries only protocol traffic.
fn init_logging(debug: bool, format: LogFormat) -> Result<()> {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    installed.map_err(|e| Error::Internal(format!("failed to set tracing subscriber: {}", e)))
}
