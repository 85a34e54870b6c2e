//! Stdio transport implementation
//!
//! Manages bidirectional communication with the analysis server process.
//! Outgoing messages go through a single write task, one complete line at
//! a time; incoming lines are handled by the read loop.

use crate::error::{Result, TransportError};
use crate::reader::run_read_loop;
use crate::subprocess::process::{ProcessConfig, spawn_process};
use crate::traits::{MessageHandler, Transport};
use crate::writer::{Frame, run_write_loop};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as SyncMutex};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::Child;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Write side of the connection
enum WriteSide {
    /// Not written to yet; the task starts on the first send
    Idle(BoxedWriter),
    Running {
        frames: mpsc::UnboundedSender<Frame>,
        task: JoinHandle<()>,
    },
    Closed,
}

/// Newline-delimited JSON over a pair of byte streams
///
/// Usually built with [`StdioTransport::spawn`], which owns the server
/// process. [`StdioTransport::from_streams`] runs the same framing over any
/// reader/writer pair, e.g. an in-memory duplex.
pub struct StdioTransport {
    writer: SyncMutex<WriteSide>,
    reader: SyncMutex<Option<BoxedReader>>,
    read_task: SyncMutex<Option<JoinHandle<()>>>,
    child: Arc<Mutex<Option<Child>>>,
    connected: Arc<AtomicBool>,
}

impl StdioTransport {
    /// Spawn the server process and wrap its stdin/stdout
    ///
    /// The read loop does not run until [`Transport::start`] is called.
    pub fn spawn(config: ProcessConfig) -> Result<Self> {
        let process = spawn_process(&config)?;
        let mut transport = Self::from_streams(process.stdout, process.stdin);
        transport.child = Arc::new(Mutex::new(Some(process.child)));
        Ok(transport)
    }

    /// Wrap an arbitrary reader/writer pair
    pub fn from_streams<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            writer: SyncMutex::new(WriteSide::Idle(Box::new(writer))),
            reader: SyncMutex::new(Some(Box::new(reader))),
            read_task: SyncMutex::new(None),
            child: Arc::new(Mutex::new(None)),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    /// OS process id of the server, if this transport owns one
    pub async fn pid(&self) -> Option<u32> {
        self.child.lock().await.as_ref().and_then(Child::id)
    }

    /// Queue a frame for the write task, starting it if needed
    fn enqueue(&self, frame: Frame) -> Result<()> {
        let mut side = lock(&self.writer);
        *side = match std::mem::replace(&mut *side, WriteSide::Closed) {
            WriteSide::Idle(writer) => {
                let (frames, rx) = mpsc::unbounded_channel();
                let task = tokio::spawn(run_write_loop(writer, rx));
                WriteSide::Running { frames, task }
            }
            other => other,
        };

        match &*side {
            WriteSide::Running { frames, .. } => {
                frames.send(frame).map_err(|_| TransportError::Closed)
            }
            _ => Err(TransportError::Closed),
        }
    }

    /// Stop the write task; a write stuck on a full pipe is abandoned
    fn stop_writer(&self) {
        let side = std::mem::replace(&mut *lock(&self.writer), WriteSide::Closed);
        if let WriteSide::Running { task, .. } = side {
            task.abort();
        }
    }

    async fn stop_child(&self) -> Result<()> {
        let Some(mut child) = self.child.lock().await.take() else {
            return Ok(());
        };

        match child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!(%status, "analysis server already exited");
                Ok(())
            }
            _ => child
                .kill()
                .await
                .map_err(|e| TransportError::Process(format!("Failed to kill process: {}", e))),
        }
    }
}

fn lock<T>(m: &SyncMutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Drop for StdioTransport {
    fn drop(&mut self) {
        // The read task holds the last other handle on the child; once it
        // is gone, kill_on_drop takes care of the process.
        if let Some(task) = lock(&self.read_task).take() {
            task.abort();
        }
        self.stop_writer();
    }
}

#[async_trait]
impl Transport for StdioTransport {
    fn start(&self, handler: Arc<dyn MessageHandler>) -> Result<()> {
        let reader = lock(&self.reader)
            .take()
            .ok_or(TransportError::AlreadyStarted)?;

        let child = Arc::clone(&self.child);
        let connected = Arc::clone(&self.connected);
        let task = tokio::spawn(async move {
            run_read_loop(reader, handler, connected).await;

            // Log how the server went away once its stdout is gone.
            if let Some(child) = child.lock().await.as_mut()
                && let Ok(Some(status)) = child.try_wait()
            {
                tracing::info!(%status, "analysis server exited");
            }
        });

        *lock(&self.read_task) = Some(task);
        Ok(())
    }

    async fn send_message(&self, message: Value) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        let mut line = serde_json::to_vec(&message)?;
        line.push(b'\n');

        let (done, written) = oneshot::channel();
        self.enqueue(Frame { line, done })?;
        match written.await {
            Ok(result) => Ok(result?),
            Err(_) => Err(TransportError::Closed),
        }
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);

        if let Some(task) = lock(&self.read_task).take() {
            task.abort();
        }
        let stopped = self.stop_child().await;
        // Dropping the writer closes the server's stdin.
        self.stop_writer();
        stopped
    }
}
