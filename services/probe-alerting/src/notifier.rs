//! Alert notification: audit log, in-process channel and external command

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::endpoint::Endpoint;
use crate::error::AlertingError;
use crate::fields::{alert_fields, base_fields, AlertInfo, Fields};
use crate::io::CommandLauncher;
use crate::state::TargetState;
use crate::strtemplate::substitute_labels;

/// Alert threshold: `failures` out of the last `total` attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition {
    pub failures: u32,
    pub total: u32,
}

/// Sends notifications for a single alert rule
pub struct Notifier {
    alert_name: String,
    probe_name: String,
    condition: Condition,
    command: Option<String>,
    notify_tx: Option<mpsc::Sender<AlertInfo>>,
    launcher: Arc<dyn CommandLauncher>,
    cancel: CancellationToken,
    dry_run: bool,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("alert_name", &self.alert_name)
            .field("probe_name", &self.probe_name)
            .field("condition", &self.condition)
            .field("command", &self.command)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl Notifier {
    pub fn new(
        alert_name: impl Into<String>,
        probe_name: impl Into<String>,
        condition: Condition,
        launcher: Arc<dyn CommandLauncher>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            alert_name: alert_name.into(),
            probe_name: probe_name.into(),
            condition,
            command: None,
            notify_tx: None,
            launcher,
            cancel,
            dry_run: false,
        }
    }

    /// Command template to run when the alert fires
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Also publish fired alerts on `tx`
    pub fn with_channel(mut self, tx: mpsc::Sender<AlertInfo>) -> Self {
        self.notify_tx = Some(tx);
        self
    }

    /// Resolve and log commands without starting them
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn alert_name(&self) -> &str {
        &self.alert_name
    }

    pub fn condition(&self) -> Condition {
        self.condition
    }

    /// Fire the alert for `ep`.
    ///
    /// Always logs the alert and marks `state` as alerted, even if publishing
    /// or the notification command fail afterwards.
    pub fn notify(&self, ep: &Endpoint, state: &mut TargetState, total_failures: u32) {
        let failing_since = state.failing_since.unwrap_or_else(Utc::now);
        tracing::warn!(
            "ALERT ({}): target ({}), failures ({}) higher than ({}) since ({})",
            self.alert_name,
            ep.name,
            total_failures,
            self.condition.failures,
            failing_since
        );

        state.alerted = true;
        let alert = AlertInfo {
            name: self.alert_name.clone(),
            probe_name: self.probe_name.clone(),
            condition_id: state.condition_id.clone(),
            target: ep.clone(),
            failures: total_failures,
            total: self.condition.total,
            failing_since,
        };

        if let Some(tx) = &self.notify_tx {
            match tx.try_send(alert.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => tracing::warn!(
                    "Notification channel full, dropping alert ({}) for target ({})",
                    self.alert_name,
                    ep.name
                ),
                Err(mpsc::error::TrySendError::Closed(_)) => tracing::debug!(
                    "Notification channel closed, not publishing alert ({})",
                    self.alert_name
                ),
            }
        }

        let fields = match alert_fields(&alert) {
            Ok(fields) => fields,
            Err(e) => {
                tracing::error!("Error getting alert fields: {}", e);
                base_fields(&alert)
            }
        };

        if let Some(command) = self.command.as_deref().filter(|c| !c.is_empty()) {
            self.notify_command(&self.cancel, command, &fields, self.dry_run);
        }
    }

    /// Substitute `fields` into `command`, split it into arguments and start it.
    ///
    /// Returns the argument vector in dry-run mode, `None` otherwise or when
    /// the command line can't be parsed.
    pub fn notify_command(
        &self,
        cancel: &CancellationToken,
        command: &str,
        fields: &Fields,
        dry_run: bool,
    ) -> Option<Vec<String>> {
        let (resolved, found_all) = substitute_labels(command, fields);
        if !found_all {
            tracing::warn!("couldn't substitute all labels in command: {}", command);
        }

        let argv = match shlex::split(&resolved) {
            Some(argv) if !argv.is_empty() => argv,
            _ => {
                tracing::error!("{}", AlertingError::CommandParse(resolved));
                return None;
            }
        };

        tracing::info!("Starting external command: {}", argv.join(" "));

        if dry_run {
            return Some(argv);
        }

        if let Err(e) = self.launcher.launch(&argv, cancel.clone()) {
            tracing::error!("error while starting the cmd: {:?}. Err: {}", argv, e);
        }

        None
    }
}
