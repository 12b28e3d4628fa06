//! asp-client: run the ASP language client outside an editor.
//!
//! ```text
//! asp-client [--install-root DIR] [--workspace DIR] [--config FILE] [run|resolve]
//! ```
//!
//! `run` activates a session, keeps the server up until Ctrl-C, then
//! deactivates. `resolve` prints the server command `run` would launch.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use asp_client_config::ClientConfig;
use asp_client_lsp::{Deactivation, ProcessHost, SessionManager, StdioClientFactory};

#[derive(Parser)]
#[command(name = "asp-client")]
#[command(about = "Launch and manage the ASP language server")]
struct Cli {
    /// Install root holding server/<platform>/asp-lsp (default: the binary's directory)
    #[arg(long, global = true)]
    install_root: Option<PathBuf>,
    /// Workspace folder reported to the server
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,
    /// Config file (default: ~/.asp-client/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Start the server and keep it running until Ctrl-C
    Run,
    /// Print the server command that `run` would launch
    Resolve,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: stay silent rather than mixing logs into command output.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.asp-client/logs/asp-client.log
    if let Some(config_path) = ClientConfig::path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("asp-client.log"));
    }

    candidates.push(PathBuf::from(".asp-client").join("logs").join("asp-client.log"));

    candidates
}

fn load_config(explicit: Option<&Path>) -> Result<ClientConfig> {
    let loaded = match explicit {
        Some(path) => ClientConfig::load_from(path)?,
        None => ClientConfig::load()?,
    };
    Ok(loaded.unwrap_or_default())
}

fn default_install_root() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("locating the asp-client binary")?;
    match exe.parent() {
        Some(dir) => Ok(dir.to_path_buf()),
        None => std::env::current_dir().context("reading the current directory"),
    }
}

fn build_host(cli: &Cli, config: &ClientConfig) -> Result<ProcessHost> {
    let install_root = match &cli.install_root {
        Some(root) => root.clone(),
        None => default_install_root()?,
    };
    let mut host = ProcessHost::new(install_root);
    if let Some(workspace) = &cli.workspace {
        let workspace = fs::canonicalize(workspace)
            .with_context(|| format!("resolving workspace {}", workspace.display()))?;
        host = host.with_workspace_root(workspace);
    }
    if let Some(dir) = config.trace_dir() {
        host = host.with_trace_dir(dir);
    }
    Ok(host)
}

async fn run(manager: &mut SessionManager, host: &ProcessHost) -> Result<()> {
    manager
        .activate(host)
        .await
        .context("activating the ASP language client")?;
    println!("asp-lsp running; press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;

    match manager.deactivate().await? {
        Deactivation::Stopped => tracing::info!("Language client stopped"),
        Deactivation::NotStarted => tracing::debug!("Language client was not running"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let host = build_host(&cli, &config)?;
    let mut manager = SessionManager::new(Arc::new(StdioClientFactory), config.settings());

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&mut manager, &host).await,
        Commands::Resolve => {
            let command = manager.server_command(&host)?;
            println!("{command}");
            Ok(())
        }
    }
}
