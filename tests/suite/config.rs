//! Config file to running session.

use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use asp_client_config::ClientConfig;
use asp_client_lsp::SessionManager;
use asp_client_types::{LaunchMode, TraceLevel};

use crate::common::{FakeHost, SpyFactory};

fn load(content: &str) -> ClientConfig {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, content).unwrap();
    ClientConfig::load_from(&path).unwrap().unwrap()
}

#[tokio::test]
async fn configured_server_path_is_launched() {
    let config = load(
        r#"
[server]
path = "/opt/asp/asp-lsp"
log_level = "warn"
mode = "debug"

[trace]
level = "off"
"#,
    );
    let factory = Arc::new(SpyFactory::default());
    let mut manager = SessionManager::new(factory.clone(), config.settings());

    manager.activate(&FakeHost::linux()).await.unwrap();

    let created = factory.created();
    assert_eq!(
        created[0].executable.command().as_path(),
        Path::new("/opt/asp/asp-lsp")
    );
    assert_eq!(
        created[0].executable.env_var("RUST_LOG"),
        Some(OsStr::new("warn"))
    );
    assert_eq!(created[0].protocol.trace_level(), TraceLevel::Off);
    assert_eq!(manager.session().unwrap().mode(), LaunchMode::Debug);
}

#[tokio::test]
async fn server_path_env_beats_config() {
    let config = load("[server]\npath = \"/opt/asp/asp-lsp\"\n");
    let factory = Arc::new(SpyFactory::default());
    let mut manager = SessionManager::new(factory.clone(), config.settings());
    let host = FakeHost::linux().with_env("SERVER_PATH", "/tmp/custom-server");

    manager.activate(&host).await.unwrap();

    assert_eq!(
        factory.created()[0].executable.command().as_path(),
        Path::new("/tmp/custom-server")
    );
}

#[test]
fn empty_config_resolves_bundled_server() {
    let config = load("");
    let manager = SessionManager::new(Arc::new(SpyFactory::default()), config.settings());

    let command = manager.server_command(&FakeHost::linux()).unwrap();
    assert_eq!(command.as_path(), crate::common::bundled_linux_server());
}
