//! Executable resolver: which server binary to launch.
//!
//! Resolution is pure: it joins a fixed per-platform layout onto the install
//! root and never touches the filesystem. A missing binary surfaces when the
//! process is launched.

use std::path::{Path, PathBuf};

use asp_client_types::{
    BUNDLED_SERVER_DIR, HostPlatform, ServerLocation, UnsupportedPlatformError,
};

/// Directory under the install root holding the shipped server binaries.
pub const SERVER_DIR: &str = BUNDLED_SERVER_DIR;

const SERVER_BINARY: &str = "asp-lsp";

/// Platform directory and binary file name of the shipped server.
fn platform_binary(
    platform: &HostPlatform,
) -> Result<(&'static str, String), UnsupportedPlatformError> {
    match platform {
        HostPlatform::Windows => Ok(("windows", format!("{SERVER_BINARY}.exe"))),
        HostPlatform::MacOs => Ok(("macos", SERVER_BINARY.to_string())),
        HostPlatform::Linux => Ok(("linux", SERVER_BINARY.to_string())),
        HostPlatform::Unsupported(os) => Err(UnsupportedPlatformError::new(os.as_str())),
    }
}

/// Relative location of the shipped server for `platform`.
///
/// `server/<platform-dir>/asp-lsp`, with an `.exe` suffix on Windows.
pub fn server_layout(platform: &HostPlatform) -> Result<PathBuf, UnsupportedPlatformError> {
    let (dir, file) = platform_binary(platform)?;
    Ok(Path::new(SERVER_DIR).join(dir).join(file))
}

/// Resolve the server command.
///
/// A present, non-blank `override_command` is returned verbatim and the
/// platform is never consulted. Otherwise the platform layout is joined onto
/// `install_root`.
pub fn resolve(
    platform: &HostPlatform,
    override_command: Option<&str>,
    install_root: &Path,
) -> Result<ServerLocation, UnsupportedPlatformError> {
    if let Some(command) = override_command
        && let Ok(location) = ServerLocation::new(command)
    {
        tracing::debug!(command = %location, "Using server override");
        return Ok(location);
    }

    let (dir, file) = platform_binary(platform)?;
    let location = ServerLocation::bundled(install_root, dir, &file);
    tracing::debug!(%platform, path = %location, "Resolved bundled server");
    Ok(location)
}
