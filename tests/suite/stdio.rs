//! The real stdio client against a missing server binary.

use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

use asp_client_lsp::{
    ActivationError, ClientSettings, ExtensionHost, ProcessHost, SessionManager,
    StdioClientFactory, TraceSink,
};
use asp_client_types::{HostPlatform, SessionState};

#[tokio::test]
async fn missing_bundled_server_fails_activation() {
    let install = tempfile::tempdir().unwrap();
    let traces = tempfile::tempdir().unwrap();
    let host = ProcessHost::new(install.path()).with_trace_dir(traces.path());
    if !host.platform().is_supported() || host.env_var("SERVER_PATH").is_some() {
        return;
    }

    let mut manager = SessionManager::new(Arc::new(StdioClientFactory), ClientSettings::default());
    let err = manager.activate(&host).await.unwrap_err();

    assert!(matches!(err, ActivationError::Launch(_)));
    assert!(format!("{err:#}").contains("asp-lsp"));
    assert_eq!(manager.state(), SessionState::Uninitialized);

    let trace = std::fs::read_to_string(traces.path().join("asp-lsp-trace.log")).unwrap();
    assert!(trace.contains("Failed to launch server"));
    assert!(trace.contains("Starting client failed"));
}

#[tokio::test]
async fn unsupported_platform_rejected_before_spawn() {
    struct Bsd(ProcessHost);

    impl ExtensionHost for Bsd {
        fn install_root(&self) -> &Path {
            self.0.install_root()
        }

        fn create_output_channel(&self, name: &str) -> Arc<dyn TraceSink> {
            self.0.create_output_channel(name)
        }

        fn env_var(&self, _key: &str) -> Option<String> {
            None
        }

        fn environment(&self) -> Vec<(OsString, OsString)> {
            Vec::new()
        }

        fn platform(&self) -> HostPlatform {
            HostPlatform::from_os("netbsd")
        }
    }

    let install = tempfile::tempdir().unwrap();
    let host = Bsd(ProcessHost::new(install.path()));
    let mut manager = SessionManager::new(Arc::new(StdioClientFactory), ClientSettings::default());

    let err = manager.activate(&host).await.unwrap_err();

    assert!(matches!(err, ActivationError::UnsupportedPlatform(_)));
    assert_eq!(manager.state(), SessionState::Uninitialized);
}
