//! Testing utilities for integration tests
//!
//! Provides two ways to drive an [`AnalysisService`] without a Dart SDK:
//!
//! - [`FakeServer`]: the far end of an in-memory pipe, speaking the real
//!   line protocol through a real [`StdioTransport`]
//! - [`RecordingTransport`]: a transport that records what is sent and lets
//!   the test push messages straight into the read side

use crate::error::Result;
use crate::service::AnalysisService;
use async_trait::async_trait;
use dartanalysis_protocol::{IncomingMessage, RequestId, ResponseMessage};
use dartanalysis_transport::reader::dispatch_line;
use dartanalysis_transport::{MessageHandler, StdioTransport, Transport, TransportError};
use serde_json::{Value, json};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::{
    AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf,
};

const PIPE_CAPACITY: usize = 64 * 1024;

/// The server end of an in-memory connection
pub struct FakeServer {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
}

/// Connect a [`StdioTransport`] to a [`FakeServer`]
///
/// The transport's read loop is not started.
pub fn fake_pair() -> (Arc<StdioTransport>, FakeServer) {
    let (client, server) = tokio::io::duplex(PIPE_CAPACITY);
    let (client_read, client_write) = tokio::io::split(client);
    let (server_read, server_write) = tokio::io::split(server);

    let transport = StdioTransport::from_streams(client_read, client_write);
    let server = FakeServer {
        lines: BufReader::new(server_read).lines(),
        writer: server_write,
    };
    (Arc::new(transport), server)
}

/// A running service connected to a [`FakeServer`]
pub fn fake_service() -> Result<(AnalysisService, FakeServer)> {
    let (transport, server) = fake_pair();
    let service = AnalysisService::with_transport(transport)?;
    Ok((service, server))
}

impl FakeServer {
    /// Read the next request the client wrote
    ///
    /// Returns `None` once the client side is closed.
    pub async fn next_request(&mut self) -> io::Result<Option<Value>> {
        match self.lines.next_line().await? {
            Some(line) => serde_json::from_str(&line)
                .map(Some)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            None => Ok(None),
        }
    }

    /// Read the next request, failing if the client closed instead
    pub async fn expect_request(&mut self) -> io::Result<Value> {
        self.next_request()
            .await?
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "client closed"))
    }

    /// Answer request `id` with `result`
    pub async fn respond(&mut self, id: &str, result: Value) -> io::Result<()> {
        self.send_value(&json!({ "id": id, "result": result })).await
    }

    /// Answer request `id` with an error
    pub async fn respond_error(&mut self, id: &str, code: i64, message: &str) -> io::Result<()> {
        self.send_value(&json!({
            "id": id,
            "error": { "code": code, "message": message }
        }))
        .await
    }

    /// Push a notification to the client
    pub async fn notify(&mut self, event: &str, params: Value) -> io::Result<()> {
        self.send_value(&json!({ "event": event, "params": params })).await
    }

    /// Write `line` verbatim, followed by a newline
    pub async fn send_raw(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    async fn send_value(&mut self, value: &Value) -> io::Result<()> {
        self.send_raw(&value.to_string()).await
    }

    /// Hang up, as if the server process exited
    pub async fn close(mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Transport that records writes instead of talking to a process
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Value>>,
    handler: Mutex<Option<Arc<dyn MessageHandler>>>,
    auto_result: Mutex<Option<Value>>,
    fail_writes: AtomicBool,
    hung_up: AtomicBool,
    closes: AtomicUsize,
}

impl RecordingTransport {
    /// Create an empty recording transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far
    pub fn sent(&self) -> Vec<Value> {
        lock(&self.sent).clone()
    }

    /// Make every following write fail
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Answer every following request immediately with `result`
    pub fn auto_respond(&self, result: Value) {
        *lock(&self.auto_result) = Some(result);
    }

    /// Whether the read side has been started
    pub fn is_started(&self) -> bool {
        lock(&self.handler).is_some()
    }

    /// How many times `close` was called
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn handler(&self) -> Option<Arc<dyn MessageHandler>> {
        lock(&self.handler).clone()
    }

    /// Deliver a decoded message as if the read loop had read it
    pub fn inject(&self, message: IncomingMessage) {
        if let Some(handler) = self.handler() {
            handler.handle_message(message);
        }
    }

    /// Deliver a raw line through the read loop's decoder
    ///
    /// Returns whether the line decoded into a message.
    pub fn inject_line(&self, line: &str) -> bool {
        match self.handler() {
            Some(handler) => dispatch_line(line.as_bytes(), handler.as_ref()),
            None => false,
        }
    }

    /// Signal a closed connection, as if the server exited
    pub fn hang_up(&self) {
        self.hung_up.store(true, Ordering::SeqCst);
        if let Some(handler) = self.handler() {
            handler.connection_closed();
        }
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn start(&self, handler: Arc<dyn MessageHandler>) -> dartanalysis_transport::Result<()> {
        let mut slot = lock(&self.handler);
        if slot.is_some() {
            return Err(TransportError::AlreadyStarted);
        }
        *slot = Some(handler);
        Ok(())
    }

    async fn send_message(&self, message: Value) -> dartanalysis_transport::Result<()> {
        if self.hung_up.load(Ordering::SeqCst) || self.closes.load(Ordering::SeqCst) > 0 {
            return Err(TransportError::Closed);
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TransportError::Io(io::Error::other("write failed")));
        }

        let id = message["id"].as_str().map(RequestId::from);
        lock(&self.sent).push(message);

        let auto_result = lock(&self.auto_result).clone();
        if let (Some(id), Some(result)) = (id, auto_result) {
            self.inject(IncomingMessage::Response(ResponseMessage {
                id,
                result: Some(result),
                error: None,
            }));
        }
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        !self.hung_up.load(Ordering::SeqCst) && self.closes.load(Ordering::SeqCst) == 0
    }

    async fn close(&self) -> dartanalysis_transport::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
