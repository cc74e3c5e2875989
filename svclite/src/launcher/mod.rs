//! Service process launching.
//!
//! The broker never blocks a request on process creation: it builds a
//! [`LaunchCommand`] while deciding under the table lock, then hands the
//! command to a [`ProcessLauncher`] on a worker task. The launcher is an
//! injected collaborator so the lifecycle state machine is testable
//! without real process creation.

mod spawn;

pub use spawn::StarterLauncher;

use async_trait::async_trait;
use std::path::PathBuf;
use svclite_shared::{AttachToken, ComponentName, SvcliteResult};

/// Everything needed to start one service process.
#[derive(Clone, Debug)]
pub struct LaunchCommand {
    /// One-time credential the spawned process must present on attach.
    pub token: AttachToken,
    pub component: ComponentName,
    /// Install location of the package that owns the service.
    pub source_dir: PathBuf,
    pub process_name_suffix: Option<String>,
    pub requester_uid: u32,
    pub debuggable: bool,
}

impl LaunchCommand {
    /// Render the starter argv (without the starter binary itself).
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "--token".to_string(),
            self.token.to_string(),
            "--package".to_string(),
            self.component.package.clone(),
            "--class".to_string(),
            self.component.class_name.clone(),
            "--apk".to_string(),
            self.source_dir.display().to_string(),
            "--uid".to_string(),
            self.requester_uid.to_string(),
        ];
        if let Some(suffix) = &self.process_name_suffix {
            args.push("--nice-name".to_string());
            args.push(format!("{}:{}", self.component.package, suffix));
        }
        if self.debuggable {
            args.push("--debug".to_string());
        }
        args
    }
}

/// Process-spawn collaborator: run the starter, wait for its exit code.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Launch the starter for `command` and wait for it to exit.
    ///
    /// A zero exit means the service process was forked and will attach on
    /// its own; a non-zero exit or a spawn error means no attach is coming
    /// from this launch.
    async fn launch(&self, command: &LaunchCommand) -> SvcliteResult<i32>;
}
