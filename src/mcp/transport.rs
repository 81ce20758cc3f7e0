//! MCP transport layer implementations.
//!
//! The stdio transport is a [`LineTransport`] over stdin/stdout: one JSON
//! document per line in each direction.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

use crate::error::{Error, Result};
use crate::mcp::codec::{self, DecodeError, ResponseOptions};
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};

/// A decoded inbound frame.
#[derive(Debug, Clone)]
pub enum Incoming {
    Request(JsonRpcRequest),
    Malformed(DecodeError),
}

/// Transport trait for MCP communication.
#[async_trait]
pub trait Transport: Send {
    /// Start the transport, returning channels for messages.
    async fn start(
        &mut self,
    ) -> Result<(mpsc::Receiver<Incoming>, mpsc::Sender<JsonRpcResponse>)>;

    /// Stop the transport. Responses already queued are written first.
    async fn stop(&mut self) -> Result<()>;
}

/// Line-delimited JSON over any async reader/writer pair.
pub struct LineTransport<R, W> {
    reader: Option<R>,
    writer: Option<W>,
    options: ResponseOptions,
    reader_task: Option<JoinHandle<()>>,
    writer_task: Option<JoinHandle<()>>,
}

/// Stdio transport for MCP.
pub type StdioTransport = LineTransport<Stdin, Stdout>;

impl LineTransport<Stdin, Stdout> {
    /// Create a transport over the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: Some(reader),
            writer: Some(writer),
            options: ResponseOptions::default(),
            reader_task: None,
            writer_task: None,
        }
    }

    pub fn with_options(mut self, options: ResponseOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl<R, W> Transport for LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn start(
        &mut self,
    ) -> Result<(mpsc::Receiver<Incoming>, mpsc::Sender<JsonRpcResponse>)> {
        let reader = self
            .reader
            .take()
            .ok_or_else(|| Error::Internal("transport already started".to_string()))?;
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| Error::Internal("transport already started".to_string()))?;

        // Channel for incoming messages (from the reader)
        let (incoming_tx, incoming_rx) = mpsc::channel::<Incoming>(100);
        // Channel for outgoing messages (to the writer)
        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<JsonRpcResponse>(100);

        self.reader_task = Some(tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut line = Vec::new();

            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line).await {
                    Ok(0) => {
                        debug!("EOF on input, stopping transport");
                        break;
                    }
                    Ok(_) => {
                        let Some(msg) = decode_line(&line) else {
                            continue;
                        };
                        if incoming_tx.send(msg).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error reading input: {}", e);
                        break;
                    }
                }
            }
        }));

        let options = self.options;
        self.writer_task = Some(tokio::spawn(async move {
            while let Some(response) = outgoing_rx.recv().await {
                match codec::encode_response(&response, options) {
                    Ok(s) => {
                        trace!("Sending: {}", s);
                        if let Err(e) = writer.write_all(s.as_bytes()).await {
                            error!("Error writing output: {}", e);
                            break;
                        }
                        if let Err(e) = writer.write_all(b"\n").await {
                            error!("Error writing newline: {}", e);
                            break;
                        }
                        if let Err(e) = writer.flush().await {
                            error!("Error flushing output: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error serializing message: {}", e);
                    }
                }
            }
        }));

        Ok((incoming_rx, outgoing_tx))
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(reader) = self.reader_task.take() {
            reader.abort();
        }
        // ends once every sender is dropped and the queue is drained
        if let Some(writer) = self.writer_task.take() {
            writer
                .await
                .map_err(|e| Error::Internal(format!("writer task failed: {}", e)))?;
        }
        Ok(())
    }
}

/// Decode one raw input line. Blank lines yield `None`; bytes that are not
/// UTF-8 are a parse error like any other malformed frame.
fn decode_line(raw: &[u8]) -> Option<Incoming> {
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text.trim(),
        Err(e) => return Some(Incoming::Malformed(DecodeError::Parse(e.to_string()))),
    };
    if text.is_empty() {
        return None;
    }

    trace!("Received: {}", text);
    Some(match codec::decode_request(text) {
        Ok(req) => Incoming::Request(req),
        Err(e) => Incoming::Malformed(e),
    })
}
