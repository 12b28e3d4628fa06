//! Stdio language client: owns the server child process and its connection.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::task::JoinHandle;

use crate::client::{ClientFactory, ClientFut, ClientIdentity, LanguageClient};
use crate::connection::Connection;
use crate::protocol::{self, ProtocolConfig};
use crate::trace::TraceSink;
use crate::transport::Executable;

const SHUTDOWN_TIMEOUT_SECS: u64 = 2;

/// Launches the server as a child process and speaks LSP over its stdio.
pub struct StdioClient {
    identity: ClientIdentity,
    executable: Executable,
    protocol: ProtocolConfig,
    running: Option<RunningServer>,
}

struct RunningServer {
    child: Child,
    connection: Connection,
    stderr_handle: JoinHandle<()>,
}

impl StdioClient {
    #[must_use]
    pub fn new(identity: ClientIdentity, executable: Executable, protocol: ProtocolConfig) -> Self {
        Self {
            identity,
            executable,
            protocol,
            running: None,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    async fn launch(&self) -> Result<RunningServer> {
        let command = self.executable.command();
        let trace = self.protocol.trace();

        let mut cmd = Command::new(command.as_path());
        cmd.args(self.executable.args())
            .env_clear()
            .envs(self.executable.env())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = self.executable.working_dir() {
            cmd.current_dir(dir);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                trace.append_line(&format!("Failed to launch server {command}: {e}"));
                return Err(e).with_context(|| format!("spawning {command}"));
            }
        };
        tracing::info!(
            client = self.identity.id(),
            %command,
            pid = child.id(),
            "Language server started"
        );

        let stdout = child.stdout.take().context("no stdout from child")?;
        let stdin = child.stdin.take().context("no stdin from child")?;
        let stderr = child.stderr.take().context("no stderr from child")?;
        let stderr_handle = tokio::spawn(forward_stderr(stderr, Arc::clone(trace)));

        let mut connection = Connection::spawn(self.identity.id(), stdout, stdin, &self.protocol);

        let root_uri = match self.protocol.workspace_root() {
            Some(root) => Some(
                protocol::path_to_file_uri(root).context("converting workspace root to URI")?,
            ),
            None => None,
        };
        let params = protocol::initialize_params(root_uri.as_ref(), self.protocol.trace_level());
        // On failure the child is killed when `child` drops.
        connection.initialize(params).await?;

        Ok(RunningServer {
            child,
            connection,
            stderr_handle,
        })
    }
}

impl RunningServer {
    /// Graceful LSP shutdown, then wait for the process; kill it if it lingers.
    async fn shutdown(mut self, name: &str) -> Result<()> {
        let timeout = Duration::from_secs(SHUTDOWN_TIMEOUT_SECS);
        let outcome = self.connection.shutdown(timeout).await;

        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(Ok(status)) => tracing::debug!(client = name, %status, "Language server exited"),
            Ok(Err(e)) => tracing::debug!(client = name, "Waiting for language server failed: {e}"),
            Err(_) => {
                tracing::debug!(client = name, "Language server didn't exit in time, killing");
                self.child
                    .kill()
                    .await
                    .context("killing language server")?;
            }
        }

        // Stderr closes with the process; flush its last lines into the trace.
        if tokio::time::timeout(timeout, &mut self.stderr_handle)
            .await
            .is_err()
        {
            self.stderr_handle.abort();
        }

        if let Err(e) = outcome {
            // The process is gone either way; a botched goodbye is not a failure.
            tracing::warn!(client = name, "Language server shutdown was not clean: {e:#}");
        }
        Ok(())
    }
}

async fn forward_stderr(stderr: ChildStderr, trace: Arc<dyn TraceSink>) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => trace.append_line(&line),
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("Reading server stderr failed: {e}");
                break;
            }
        }
    }
}

impl LanguageClient for StdioClient {
    fn start(&mut self) -> ClientFut<'_> {
        Box::pin(async move {
            if self.running.is_some() {
                bail!("client '{}' is already running", self.identity.id());
            }
            let running = self.launch().await?;
            self.running = Some(running);
            Ok(())
        })
    }

    fn stop(&mut self) -> ClientFut<'_> {
        Box::pin(async move {
            let Some(running) = self.running.take() else {
                return Ok(());
            };
            running.shutdown(self.identity.id()).await
        })
    }
}

/// Builds a [`StdioClient`] per session.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdioClientFactory;

impl ClientFactory for StdioClientFactory {
    fn create(
        &self,
        identity: &ClientIdentity,
        executable: &Executable,
        protocol: &ProtocolConfig,
    ) -> Box<dyn LanguageClient> {
        Box::new(StdioClient::new(
            identity.clone(),
            executable.clone(),
            protocol.clone(),
        ))
    }
}
