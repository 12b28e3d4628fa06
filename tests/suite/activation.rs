//! Activation lifecycle, driven through a fake host and a spy factory.

use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use asp_client_lsp::{ActivationError, ClientSettings, Deactivation, SessionManager};
use asp_client_types::{
    DocumentFilter, DocumentSelector, HostPlatform, LaunchMode, SessionState, TraceLevel,
};

use crate::common::{FakeHost, Script, SpyFactory, bundled_linux_server};

fn manager_with(factory: &Arc<SpyFactory>) -> SessionManager {
    SessionManager::new(factory.clone(), ClientSettings::default())
}

#[tokio::test]
async fn linux_end_to_end_uses_bundled_server() {
    let factory = Arc::new(SpyFactory::default());
    let mut manager = manager_with(&factory);
    let host = FakeHost::linux();

    manager.activate(&host).await.unwrap();

    assert_eq!(manager.state(), SessionState::Running);
    let session = manager.session().unwrap();
    assert_eq!(
        session.transport().run().command().as_path(),
        bundled_linux_server()
    );
    assert_eq!(
        session.protocol().document_selector(),
        &DocumentSelector::new(vec![DocumentFilter::new("file", "asp")])
    );
    assert_eq!(session.identity().id(), "asp-lsp");
    assert_eq!(session.identity().name(), "ASP language server");

    let created = factory.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].executable.command().as_path(), bundled_linux_server());
    assert!(created[0].executable.args().is_empty());
}

#[tokio::test]
async fn server_environment_is_host_environment_plus_rust_log() {
    let factory = Arc::new(SpyFactory::default());
    let mut manager = manager_with(&factory);
    let host = FakeHost::linux().with_env("RUST_LOG", "error");

    manager.activate(&host).await.unwrap();

    let session = manager.session().unwrap();
    let run = session.transport().run();
    assert_eq!(run.env_var("PATH"), Some(OsStr::new("/usr/bin:/bin")));
    assert_eq!(run.env_var("LANG"), Some(OsStr::new("C.UTF-8")));
    assert_eq!(run.env_var("RUST_LOG"), Some(OsStr::new("debug")));
    assert_eq!(session.transport().run(), session.transport().debug());
}

#[tokio::test]
async fn server_path_override_wins_on_every_platform() {
    for platform in [
        HostPlatform::Windows,
        HostPlatform::MacOs,
        HostPlatform::Linux,
        HostPlatform::from_os("freebsd"),
    ] {
        let factory = Arc::new(SpyFactory::default());
        let mut manager = manager_with(&factory);
        let host = FakeHost::new(platform.clone()).with_env("SERVER_PATH", "/tmp/custom-server");

        manager.activate(&host).await.unwrap();

        let created = factory.created();
        assert_eq!(
            created[0].executable.command().as_path(),
            Path::new("/tmp/custom-server"),
            "{platform}"
        );
        assert_eq!(manager.state(), SessionState::Running);
    }
}

#[tokio::test]
async fn unsupported_platform_never_reaches_the_factory() {
    let factory = Arc::new(SpyFactory::default());
    let mut manager = manager_with(&factory);
    let host = FakeHost::new(HostPlatform::from_os("openbsd"));

    let err = manager.activate(&host).await.unwrap_err();

    match &err {
        ActivationError::UnsupportedPlatform(e) => assert_eq!(e.platform(), "openbsd"),
        other => panic!("expected UnsupportedPlatform, got {other:?}"),
    }
    assert_eq!(factory.invocations(), 0);
    assert_eq!(factory.calls.starts(), 0);
    assert_eq!(manager.state(), SessionState::Uninitialized);
    // The trace channel exists before the failure and records it.
    assert_eq!(host.channels_created.load(Ordering::SeqCst), 1);
    assert!(host.sink.contains("unsupported platform: openbsd"));
}

#[tokio::test]
async fn second_activate_is_rejected_without_new_session() {
    let factory = Arc::new(SpyFactory::default());
    let mut manager = manager_with(&factory);
    let host = FakeHost::linux();

    manager.activate(&host).await.unwrap();
    let err = manager.activate(&host).await.unwrap_err();

    assert!(matches!(
        err,
        ActivationError::AlreadyActive {
            state: SessionState::Running
        }
    ));
    assert_eq!(err.to_string(), "client session is already running");
    assert_eq!(factory.invocations(), 1);
    assert_eq!(factory.calls.starts(), 1);
    assert_eq!(manager.state(), SessionState::Running);
}

#[tokio::test]
async fn deactivate_before_activate_is_a_noop() {
    let factory = Arc::new(SpyFactory::default());
    let mut manager = manager_with(&factory);

    assert_eq!(manager.deactivate().await.unwrap(), Deactivation::NotStarted);
    assert_eq!(manager.state(), SessionState::Uninitialized);
    assert_eq!(factory.calls.stops(), 0);
}

#[tokio::test]
async fn deactivate_awaits_stop_and_reaches_stopped() {
    let factory = Arc::new(SpyFactory::default());
    let mut manager = manager_with(&factory);
    manager.activate(&FakeHost::linux()).await.unwrap();

    let outcome = manager.deactivate().await.unwrap();

    assert_eq!(outcome, Deactivation::Stopped);
    assert_eq!(manager.state(), SessionState::Stopped);
    // The stop future ran to completion before deactivate returned.
    assert_eq!(factory.calls.stops(), 1);
}

#[tokio::test]
async fn full_cycle_can_repeat() {
    let factory = Arc::new(SpyFactory::default());
    let mut manager = manager_with(&factory);
    let host = FakeHost::linux();

    for round in 1..=2 {
        manager.activate(&host).await.unwrap();
        assert_eq!(manager.state(), SessionState::Running);
        manager.deactivate().await.unwrap();
        assert_eq!(manager.state(), SessionState::Stopped);
        assert_eq!(factory.calls.stops(), round);
    }
    assert_eq!(factory.invocations(), 2);
}

#[tokio::test]
async fn start_failure_is_passed_through() {
    let factory = Arc::new(SpyFactory::with_script(Script::FailStart));
    let mut manager = manager_with(&factory);
    let host = FakeHost::linux();

    let err = manager.activate(&host).await.unwrap_err();

    assert!(matches!(err, ActivationError::Launch(_)));
    assert_eq!(err.to_string(), "server exited during initialize");
    assert_eq!(manager.state(), SessionState::Uninitialized);
    assert!(manager.session().is_none());

    // A failed activation can be retried.
    let retry = manager.activate(&host).await.unwrap_err();
    assert!(matches!(retry, ActivationError::Launch(_)));
    assert_eq!(factory.calls.starts(), 2);
}

#[tokio::test]
async fn stop_failure_still_reaches_stopped() {
    let factory = Arc::new(SpyFactory::with_script(Script::FailStop));
    let mut manager = manager_with(&factory);
    manager.activate(&FakeHost::linux()).await.unwrap();

    let err = manager.deactivate().await.unwrap_err();

    assert!(err.to_string().contains("timed out"));
    assert_eq!(manager.state(), SessionState::Stopped);
    assert_eq!(manager.deactivate().await.unwrap(), Deactivation::NotStarted);
}

#[tokio::test]
async fn settings_flow_into_session() {
    let factory = Arc::new(SpyFactory::default());
    let settings = ClientSettings {
        server_path: Some("/opt/asp/asp-lsp".to_string()),
        log_level: "info".to_string(),
        mode: LaunchMode::Debug,
        trace_level: TraceLevel::Verbose,
    };
    let mut manager = SessionManager::new(factory.clone(), settings);
    let host = FakeHost::linux().with_workspace("/work/site");

    manager.activate(&host).await.unwrap();

    let session = manager.session().unwrap();
    assert_eq!(session.mode(), LaunchMode::Debug);
    assert_eq!(session.protocol().trace_level(), TraceLevel::Verbose);
    assert_eq!(session.protocol().workspace_root(), Some(Path::new("/work/site")));
    let created = factory.created();
    assert_eq!(
        created[0].executable.command().as_path(),
        Path::new("/opt/asp/asp-lsp")
    );
    assert_eq!(
        created[0].executable.env_var("RUST_LOG"),
        Some(OsStr::new("info"))
    );
    assert_eq!(created[0].protocol.trace().name(), "asp-lsp trace");
}
