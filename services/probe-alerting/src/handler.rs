//! Failure tracking: decides when a target crosses its alert threshold

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::{AlertConfig, Config};
use crate::endpoint::Endpoint;
use crate::fields::AlertInfo;
use crate::io::CommandLauncher;
use crate::notifier::{Condition, Notifier};
use crate::state::{TargetState, TargetStore};

/// Tracks probe results per target and fires an alert rule
#[derive(Debug)]
pub struct AlertHandler {
    notifier: Notifier,
    targets: TargetStore,
}

impl AlertHandler {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            notifier,
            targets: TargetStore::new(),
        }
    }

    /// Build a handler for one configured alert rule
    pub fn from_config(
        config: &Config,
        alert: &AlertConfig,
        launcher: Arc<dyn CommandLauncher>,
        notify_tx: Option<mpsc::Sender<AlertInfo>>,
        cancel: CancellationToken,
        dry_run: bool,
    ) -> Self {
        let condition = Condition {
            failures: alert.condition.failures,
            total: alert.condition.total(),
        };

        let mut notifier = Notifier::new(
            config.alert_name(alert),
            config.probe_name.clone(),
            condition,
            launcher,
            cancel,
        )
        .with_dry_run(dry_run);

        if let Some(notify) = &alert.notify {
            notifier = notifier.with_command(notify.command.clone());
        }
        if let Some(tx) = notify_tx {
            notifier = notifier.with_channel(tx);
        }

        tracing::debug!(
            "Created alert handler '{}' ({} of {})",
            notifier.alert_name(),
            condition.failures,
            condition.total
        );

        Self::new(notifier)
    }

    pub fn name(&self) -> &str {
        self.notifier.alert_name()
    }

    /// Record a probe result observed now. See [`AlertHandler::record_at`].
    pub async fn record(&self, ep: &Endpoint, success: bool) -> bool {
        self.record_at(ep, success, Utc::now()).await
    }

    /// Record a probe result for `ep`, firing the alert if the target just
    /// crossed the threshold. Returns `true` if an alert fired.
    pub async fn record_at(&self, ep: &Endpoint, success: bool, now: DateTime<Utc>) -> bool {
        let condition = self.notifier.condition();
        self.targets
            .with_state(&ep.key(), |state| {
                let failures = state.record(success, condition.total as usize, now);

                if failures < condition.failures {
                    if state.alerted {
                        tracing::info!(
                            "ALERT ({}): target ({}) resolved, failures ({}) below ({})",
                            self.name(),
                            ep.name,
                            failures,
                            condition.failures
                        );
                        state.reset();
                    }
                    return false;
                }

                if state.alerted {
                    return false;
                }

                state.condition_id = state
                    .failing_since
                    .map(|t| t.timestamp().to_string())
                    .unwrap_or_default();
                self.notifier.notify(ep, state, failures);
                true
            })
            .await
    }

    /// Snapshot of the alert state for `ep`, `None` when it is neither
    /// failing nor alerted
    pub async fn target_state(&self, ep: &Endpoint) -> Option<TargetState> {
        self.targets.get(&ep.key()).await
    }
}
