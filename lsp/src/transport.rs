//! Transport configuration: what to execute and with which environment.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use asp_client_types::{LaunchMode, SERVER_LOG_ENV, ServerLocation};

/// A fully specified server invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executable {
    command: ServerLocation,
    args: Vec<String>,
    env: BTreeMap<OsString, OsString>,
    working_dir: Option<PathBuf>,
}

impl Executable {
    /// Bare invocation: no arguments, empty environment.
    #[must_use]
    pub fn new(command: ServerLocation) -> Self {
        Self {
            command,
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir: None,
        }
    }

    #[must_use]
    pub fn with_env(mut self, env: BTreeMap<OsString, OsString>) -> Self {
        self.env = env;
        self
    }

    /// Add or override one variable.
    #[must_use]
    pub fn with_env_var(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn command(&self) -> &ServerLocation {
        &self.command
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Complete environment of the child; nothing else is inherited.
    #[must_use]
    pub fn env(&self) -> &BTreeMap<OsString, OsString> {
        &self.env
    }

    #[must_use]
    pub fn env_var(&self, key: &str) -> Option<&OsStr> {
        self.env.get(OsStr::new(key)).map(OsString::as_os_str)
    }

    #[must_use]
    pub fn working_dir(&self) -> Option<&std::path::Path> {
        self.working_dir.as_deref()
    }
}

/// Run and debug invocations of the server.
///
/// Both start out identical; `with_debug` lets the debug variant diverge
/// (e.g. extra diagnostic flags) without touching the run variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    run: Executable,
    debug: Executable,
}

impl TransportConfig {
    /// Launch `command` with `inherited` as its environment plus the
    /// server log verbosity.
    #[must_use]
    pub fn new(
        command: ServerLocation,
        inherited: impl IntoIterator<Item = (OsString, OsString)>,
        log_level: &str,
    ) -> Self {
        let env: BTreeMap<OsString, OsString> = inherited.into_iter().collect();
        let run = Executable::new(command)
            .with_env(env)
            .with_env_var(SERVER_LOG_ENV, log_level);
        Self {
            debug: run.clone(),
            run,
        }
    }

    #[must_use]
    pub fn with_debug(mut self, debug: Executable) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn run(&self) -> &Executable {
        &self.run
    }

    #[must_use]
    pub fn debug(&self) -> &Executable {
        &self.debug
    }

    #[must_use]
    pub fn executable(&self, mode: LaunchMode) -> &Executable {
        match mode {
            LaunchMode::Run => &self.run,
            LaunchMode::Debug => &self.debug,
        }
    }
}
