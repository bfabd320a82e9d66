//! Process launching abstraction for testability

use std::process::Stdio;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::AlertingError;

/// Starts external notification commands
#[cfg_attr(test, mockall::automock)]
pub trait CommandLauncher: Send + Sync {
    /// Start `argv` without waiting for it to finish. The process is killed
    /// if `cancel` fires before it exits.
    fn launch(&self, argv: &[String], cancel: CancellationToken) -> crate::Result<()>;
}

/// Production launcher using tokio processes
#[derive(Debug, Default)]
pub struct TokioCommandLauncher {
    tracker: TaskTracker,
}

impl TokioCommandLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until every launched command has exited or been killed
    pub async fn wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

impl CommandLauncher for TokioCommandLauncher {
    fn launch(&self, argv: &[String], cancel: CancellationToken) -> crate::Result<()> {
        let Some((program, args)) = argv.split_first() else {
            return Err(AlertingError::CommandParse("empty command".to_string()));
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| AlertingError::Spawn {
                command: argv.join(" "),
                source,
            })?;

        let pid = child.id();
        let program = program.clone();
        tracing::debug!("Started '{}' (pid {:?})", program, pid);

        self.tracker.spawn(async move {
            tokio::select! {
                status = child.wait() => match status {
                    Ok(status) => tracing::debug!("'{}' (pid {:?}) exited: {}", program, pid, status),
                    Err(e) => tracing::warn!("Failed waiting for '{}' (pid {:?}): {}", program, pid, e),
                },
                _ = cancel.cancelled() => {
                    tracing::debug!("Cancelled, killing '{}' (pid {:?})", program, pid);
                    if let Err(e) = child.kill().await {
                        tracing::warn!("Failed to kill '{}' (pid {:?}): {}", program, pid, e);
                    }
                }
            }
        });

        Ok(())
    }
}
