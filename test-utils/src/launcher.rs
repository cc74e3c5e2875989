//! Launcher that records commands instead of spawning processes.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use svclite::launcher::{LaunchCommand, ProcessLauncher};
use svclite_shared::SvcliteResult;

/// Injected process-spawn collaborator for tests.
///
/// Every launch is recorded; outcomes are scripted per launch (defaulting
/// to exit code 0 once the script is exhausted).
#[derive(Default)]
pub struct ScriptedLauncher {
    outcomes: Mutex<VecDeque<SvcliteResult<i32>>>,
    launches: Mutex<Vec<LaunchCommand>>,
}

impl ScriptedLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome for the next launch.
    pub fn push_outcome(&self, outcome: SvcliteResult<i32>) {
        self.outcomes
            .lock()
            .expect("outcomes lock poisoned")
            .push_back(outcome);
    }

    /// Commands launched so far, in order.
    pub fn launches(&self) -> Vec<LaunchCommand> {
        self.launches
            .lock()
            .expect("launches lock poisoned")
            .clone()
    }

    pub fn launch_count(&self) -> usize {
        self.launches.lock().expect("launches lock poisoned").len()
    }

    /// Wait until at least `n` launches were recorded.
    ///
    /// Spawns run on worker tasks, so tests must synchronize on the
    /// launcher rather than on the request call returning.
    pub async fn wait_for_launches(&self, n: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            if self.launch_count() >= n {
                return;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {} launches (saw {})",
                n,
                self.launch_count()
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl ProcessLauncher for ScriptedLauncher {
    async fn launch(&self, command: &LaunchCommand) -> SvcliteResult<i32> {
        let outcome = self
            .outcomes
            .lock()
            .expect("outcomes lock poisoned")
            .pop_front()
            .unwrap_or(Ok(0));

        self.launches
            .lock()
            .expect("launches lock poisoned")
            .push(command.clone());

        outcome
    }
}
