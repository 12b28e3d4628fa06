//! Shared test utilities and fixtures
//!
//! A fake extension host and a spy client factory, so activation can be
//! driven end to end without spawning a server.

#![allow(dead_code)]

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use asp_client_lsp::{
    ClientFactory, ClientFut, ClientIdentity, Executable, ExtensionHost, LanguageClient,
    MemoryTraceSink, ProtocolConfig, TraceSink,
};
use asp_client_types::{HostPlatform, TRACE_CHANNEL_NAME};

pub const INSTALL_ROOT: &str = "/ext/asp-client";

/// Host with a fixed platform, environment and install root.
pub struct FakeHost {
    pub root: PathBuf,
    pub platform: HostPlatform,
    pub env: Vec<(String, String)>,
    pub workspace: Option<PathBuf>,
    pub sink: Arc<MemoryTraceSink>,
    pub channels_created: AtomicUsize,
}

impl FakeHost {
    pub fn new(platform: HostPlatform) -> Self {
        Self {
            root: PathBuf::from(INSTALL_ROOT),
            platform,
            env: vec![
                ("PATH".to_string(), "/usr/bin:/bin".to_string()),
                ("LANG".to_string(), "C.UTF-8".to_string()),
            ],
            workspace: None,
            sink: Arc::new(MemoryTraceSink::new(TRACE_CHANNEL_NAME)),
            channels_created: AtomicUsize::new(0),
        }
    }

    pub fn linux() -> Self {
        Self::new(HostPlatform::Linux)
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_workspace(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace = Some(root.into());
        self
    }
}

impl ExtensionHost for FakeHost {
    fn install_root(&self) -> &Path {
        &self.root
    }

    fn create_output_channel(&self, name: &str) -> Arc<dyn TraceSink> {
        assert_eq!(name, TRACE_CHANNEL_NAME);
        self.channels_created.fetch_add(1, Ordering::SeqCst);
        self.sink.clone()
    }

    fn env_var(&self, key: &str) -> Option<String> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    fn environment(&self) -> Vec<(OsString, OsString)> {
        self.env
            .iter()
            .map(|(k, v)| (OsString::from(k), OsString::from(v)))
            .collect()
    }

    fn platform(&self) -> HostPlatform {
        self.platform.clone()
    }

    fn workspace_root(&self) -> Option<&Path> {
        self.workspace.as_deref()
    }
}

/// How a [`ScriptedClient`] behaves.
#[derive(Debug, Clone, Copy, Default)]
pub enum Script {
    #[default]
    Cooperative,
    FailStart,
    FailStop,
}

#[derive(Debug, Default)]
pub struct Calls {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
}

impl Calls {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

pub struct ScriptedClient {
    script: Script,
    calls: Arc<Calls>,
}

impl LanguageClient for ScriptedClient {
    fn start(&mut self) -> ClientFut<'_> {
        Box::pin(async move {
            self.calls.starts.fetch_add(1, Ordering::SeqCst);
            match self.script {
                Script::FailStart => anyhow::bail!("server exited during initialize"),
                Script::Cooperative | Script::FailStop => Ok(()),
            }
        })
    }

    fn stop(&mut self) -> ClientFut<'_> {
        Box::pin(async move {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            self.calls.stops.fetch_add(1, Ordering::SeqCst);
            match self.script {
                Script::FailStop => anyhow::bail!("shutdown request timed out"),
                Script::Cooperative | Script::FailStart => Ok(()),
            }
        })
    }
}

/// What the factory was asked to build.
#[derive(Debug, Clone)]
pub struct Created {
    pub identity: ClientIdentity,
    pub executable: Executable,
    pub protocol: ProtocolConfig,
}

/// Records every client it builds; never spawns anything.
#[derive(Default)]
pub struct SpyFactory {
    pub script: Script,
    pub calls: Arc<Calls>,
    pub created: Mutex<Vec<Created>>,
}

impl SpyFactory {
    pub fn with_script(script: Script) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    pub fn created(&self) -> Vec<Created> {
        self.created.lock().unwrap().clone()
    }

    pub fn invocations(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

impl ClientFactory for SpyFactory {
    fn create(
        &self,
        identity: &ClientIdentity,
        executable: &Executable,
        protocol: &ProtocolConfig,
    ) -> Box<dyn LanguageClient> {
        self.created.lock().unwrap().push(Created {
            identity: identity.clone(),
            executable: executable.clone(),
            protocol: protocol.clone(),
        });
        Box::new(ScriptedClient {
            script: self.script,
            calls: self.calls.clone(),
        })
    }
}

pub fn bundled_linux_server() -> PathBuf {
    Path::new(INSTALL_ROOT)
        .join("server")
        .join("linux")
        .join("asp-lsp")
}
