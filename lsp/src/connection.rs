//! JSON-RPC connection over a pair of async byte streams.
//!
//! A reader task routes responses to waiting requests, answers server
//! requests, and forwards server log notifications to the trace sink. A
//! writer task owns the outgoing stream; everything sent goes through its
//! channel so frames are never interleaved.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use asp_client_types::TraceLevel;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::codec::{FrameReader, FrameWriter};
use crate::protocol::{self, Incoming, LogMessageParams, Notification, ProtocolConfig, Request};
use crate::trace::{self, Direction, TraceSink};

const WRITER_CHANNEL_CAPACITY: usize = 64;

/// Waiters for in-flight requests; `None` once either stream has failed.
type PendingMap = Arc<Mutex<Option<HashMap<u64, oneshot::Sender<serde_json::Value>>>>>;

enum WriterCommand {
    Send(serde_json::Value),
    Shutdown,
}

/// Shared state of the reader task.
struct Inbound {
    name: String,
    pending: PendingMap,
    writer_tx: mpsc::Sender<WriterCommand>,
    trace: Arc<dyn TraceSink>,
    level: TraceLevel,
}

pub(crate) struct Connection {
    name: String,
    writer_tx: mpsc::Sender<WriterCommand>,
    pending: PendingMap,
    next_id: u64,
    reader_handle: JoinHandle<()>,
    writer_handle: JoinHandle<()>,
}

impl Connection {
    /// Start the reader and writer tasks for `reader`/`writer`.
    pub fn spawn<R, W>(name: &str, reader: R, writer: W, protocol: &ProtocolConfig) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let pending: PendingMap = Arc::new(Mutex::new(Some(HashMap::new())));
        let (writer_tx, writer_rx) = mpsc::channel(WRITER_CHANNEL_CAPACITY);

        let writer_handle = tokio::spawn(run_writer(
            name.to_string(),
            FrameWriter::new(writer),
            writer_rx,
            Arc::clone(&pending),
            Arc::clone(protocol.trace()),
            protocol.trace_level(),
        ));

        let inbound = Inbound {
            name: name.to_string(),
            pending: Arc::clone(&pending),
            writer_tx: writer_tx.clone(),
            trace: Arc::clone(protocol.trace()),
            level: protocol.trace_level(),
        };
        let reader_handle = tokio::spawn(run_reader(FrameReader::new(reader), inbound));

        Self {
            name: name.to_string(),
            writer_tx,
            pending,
            next_id: 1,
            reader_handle,
            writer_handle,
        }
    }

    /// Run `initialize` followed by `initialized`; returns the server's
    /// `InitializeResult`.
    pub async fn initialize(&mut self, params: serde_json::Value) -> Result<serde_json::Value> {
        let result = self
            .request("initialize", Some(params), None)
            .await
            .context("initialize handshake failed")?;
        self.notify("initialized", Some(serde_json::json!({})))
            .await?;
        Ok(result)
    }

    /// `shutdown` request (bounded by `timeout`), then `exit`.
    ///
    /// `exit` is sent even when `shutdown` fails: the server must go away
    /// either way.
    pub async fn shutdown(mut self, timeout: Duration) -> Result<()> {
        let outcome = self.request("shutdown", None, Some(timeout)).await;
        if let Err(e) = &outcome {
            tracing::debug!(server = %self.name, "shutdown request failed: {e:#}");
        }
        let exit = self.notify("exit", None).await;
        let _ = self.writer_tx.send(WriterCommand::Shutdown).await;
        let _ = self.writer_handle.await;
        self.reader_handle.abort();
        outcome.map(|_| ()).and(exit)
    }

    /// Send a request and wait for its result.
    ///
    /// JSON-RPC error responses become `Err`. With `timeout == None` the wait
    /// is bounded only by the connection staying open.
    pub async fn request(
        &mut self,
        method: &str,
        params: Option<serde_json::Value>,
        timeout: Option<Duration>,
    ) -> Result<serde_json::Value> {
        let id = self.next_id;
        self.next_id += 1;

        let (tx, rx) = oneshot::channel();
        match self.pending.lock().await.as_mut() {
            Some(waiters) => {
                waiters.insert(id, tx);
            }
            None => bail!("connection to '{}' is closed", self.name),
        }

        let frame = serde_json::to_value(Request::new(id, method, params))
            .context("serializing request")?;
        if self.writer_tx.send(WriterCommand::Send(frame)).await.is_err() {
            self.forget(id).await;
            bail!("connection to '{}' is closed", self.name);
        }

        let received = match timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(received) => received,
                Err(_) => {
                    self.forget(id).await;
                    bail!("'{method}' timed out after {}ms", limit.as_millis());
                }
            },
            None => rx.await,
        };

        let Ok(response) = received else {
            bail!("'{}' closed the connection before answering '{method}'", self.name);
        };

        if let Some(error) = response.get("error") {
            let message = error
                .get("message")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown error");
            let code = error.get("code").and_then(serde_json::Value::as_i64);
            return Err(anyhow!("'{method}' failed: {message} (code: {code:?})"));
        }

        Ok(response
            .get("result")
            .cloned()
            .unwrap_or(serde_json::Value::Null))
    }

    async fn forget(&self, id: u64) {
        if let Some(waiters) = self.pending.lock().await.as_mut() {
            waiters.remove(&id);
        }
    }

    pub async fn notify(&self, method: &str, params: Option<serde_json::Value>) -> Result<()> {
        let frame = serde_json::to_value(Notification::new(method, params))
            .context("serializing notification")?;
        self.writer_tx
            .send(WriterCommand::Send(frame))
            .await
            .map_err(|_| anyhow!("connection to '{}' is closed", self.name))
    }
}

async fn run_writer<W: AsyncWrite + Unpin>(
    name: String,
    mut writer: FrameWriter<W>,
    mut commands: mpsc::Receiver<WriterCommand>,
    pending: PendingMap,
    trace: Arc<dyn TraceSink>,
    level: TraceLevel,
) {
    while let Some(command) = commands.recv().await {
        match command {
            WriterCommand::Send(frame) => {
                if let Some(line) = trace::format_message(Direction::Send, &frame, level) {
                    trace.append_line(&line);
                }
                if let Err(e) = writer.write_message(&frame).await {
                    tracing::warn!(server = %name, "LSP write error: {e}");
                    trace.append_line(&format!("Failed to write to server: {e}"));
                    // Nobody will read what was sent; fail every waiter.
                    pending.lock().await.take();
                    break;
                }
            }
            WriterCommand::Shutdown => break,
        }
    }
}

async fn run_reader<R: AsyncRead + Unpin>(mut reader: FrameReader<R>, inbound: Inbound) {
    loop {
        match reader.read_message().await {
            Ok(Some(message)) => inbound.dispatch(&message).await,
            Ok(None) => {
                tracing::info!(server = %inbound.name, "Language server closed stdout");
                inbound.trace.append_line("Connection to server closed.");
                break;
            }
            Err(e) => {
                tracing::warn!(server = %inbound.name, "LSP read error: {e}");
                inbound
                    .trace
                    .append_line(&format!("Connection to server failed: {e}"));
                break;
            }
        }
    }
    // Close: waiting requests fail now, later ones fail on entry.
    inbound.pending.lock().await.take();
}

impl Inbound {
    async fn dispatch(&self, message: &serde_json::Value) {
        if let Some(line) = trace::format_message(Direction::Receive, message, self.level) {
            self.trace.append_line(&line);
        }

        let Some(incoming) = protocol::classify(message) else {
            tracing::trace!(server = %self.name, "Ignoring malformed JSON-RPC message");
            return;
        };

        match incoming {
            Incoming::Response { id, body } => {
                let waiter = self
                    .pending
                    .lock()
                    .await
                    .as_mut()
                    .and_then(|waiters| waiters.remove(&id));
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(body);
                    }
                    None => tracing::debug!(server = %self.name, id, "Response for unknown request"),
                }
            }
            Incoming::ServerRequest { id, method } => {
                tracing::debug!(server = %self.name, %method, "Server request not supported, replying method not found");
                let reply = protocol::method_not_found(id, &method);
                let _ = self.writer_tx.send(WriterCommand::Send(reply)).await;
            }
            Incoming::Notification { method, params } => self.notification(&method, params),
        }
    }

    fn notification(&self, method: &str, params: Option<serde_json::Value>) {
        match method {
            "window/logMessage" | "window/showMessage" => {
                let Some(params) = params else { return };
                match serde_json::from_value::<LogMessageParams>(params) {
                    Ok(log) => self
                        .trace
                        .append_line(&format!("[{} - server] {}", log.label(), log.message)),
                    Err(e) => tracing::debug!(server = %self.name, "Bad {method} params: {e}"),
                }
            }
            "$/logTrace" => {
                if let Some(message) = params
                    .as_ref()
                    .and_then(|p| p.get("message"))
                    .and_then(serde_json::Value::as_str)
                {
                    self.trace.append_line(message);
                }
            }
            _ => tracing::trace!(server = %self.name, %method, "Ignoring notification"),
        }
    }
}
