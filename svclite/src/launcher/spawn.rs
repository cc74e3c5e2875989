//! Starter subprocess spawning.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use svclite_shared::{SvcliteError, SvcliteResult};
use tokio::process::Command;

use super::{LaunchCommand, ProcessLauncher};

/// Launcher that runs the platform starter binary as a subprocess.
///
/// The starter forks the actual service process and exits; its exit code
/// is the only thing the broker sees synchronously. The service process
/// reports back on its own through the attach handshake.
pub struct StarterLauncher {
    starter_path: PathBuf,
}

impl StarterLauncher {
    /// Create a launcher for the given starter binary.
    ///
    /// # Errors
    ///
    /// Returns an error if the binary does not exist.
    pub fn new(starter_path: PathBuf) -> SvcliteResult<Self> {
        if !starter_path.exists() {
            return Err(SvcliteError::Spawn(format!(
                "starter binary not found: {}",
                starter_path.display()
            )));
        }

        Ok(Self { starter_path })
    }
}

#[async_trait]
impl ProcessLauncher for StarterLauncher {
    async fn launch(&self, command: &LaunchCommand) -> SvcliteResult<i32> {
        let mut cmd = Command::new(&self.starter_path);
        cmd.args(command.to_args());

        // Pass RUST_LOG to the starter if set
        if let Ok(rust_log) = std::env::var("RUST_LOG") {
            cmd.env("RUST_LOG", rust_log);
        }

        // The starter's output is not ours to surface
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());

        tracing::debug!(
            starter = %self.starter_path.display(),
            component = %command.component,
            "starting service process"
        );

        let status = cmd.status().await.map_err(|e| {
            SvcliteError::Spawn(format!(
                "failed to spawn starter at {}: {}",
                self.starter_path.display(),
                e
            ))
        })?;

        Ok(status.code().unwrap_or(-1))
    }
}
