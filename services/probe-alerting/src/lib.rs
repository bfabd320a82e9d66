//! Probe alerting - alert records and external command notifications
//!
//! Tracks probe results per target, fires alerts when a target crosses its
//! failure threshold, and notifies by running a user-configured command.

pub mod config;
pub mod endpoint;
pub mod error;
pub mod fields;
pub mod handler;
pub mod io;
pub mod notifier;
pub mod state;
pub mod strtemplate;

pub use config::{load_config, Config};
pub use endpoint::Endpoint;
pub use error::{AlertingError, Result};
pub use fields::{alert_fields, AlertInfo, Fields};
pub use handler::AlertHandler;
pub use notifier::Notifier;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::io::{CommandLauncher, TokioCommandLauncher};

/// A single probe outcome, read as one JSON line
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeResult {
    pub target: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub success: bool,
}

impl ProbeResult {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            name: self.target.clone(),
            port: self.port,
            labels: self.labels.clone(),
        }
    }
}

/// Build one handler per configured alert rule
pub fn build_handlers(
    config: &Config,
    launcher: Arc<dyn CommandLauncher>,
    notify_tx: Option<mpsc::Sender<AlertInfo>>,
    cancel: CancellationToken,
    dry_run: bool,
) -> Vec<AlertHandler> {
    config
        .alerts
        .iter()
        .map(|alert| {
            AlertHandler::from_config(
                config,
                alert,
                Arc::clone(&launcher),
                notify_tx.clone(),
                cancel.clone(),
                dry_run,
            )
        })
        .collect()
}

/// Decode one raw input line and feed it to every handler, returning the
/// number of alerts fired. Undecodable or malformed lines are logged and skipped.
async fn record_line(handlers: &[AlertHandler], raw: &[u8]) -> usize {
    let line = match std::str::from_utf8(raw) {
        Ok(line) => line.trim(),
        Err(e) => {
            tracing::warn!(
                "Skipping undecodable probe result ({} bytes): {}",
                raw.len(),
                e
            );
            return 0;
        }
    };
    if line.is_empty() {
        return 0;
    }

    let result: ProbeResult = match serde_json::from_str(line) {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!("Skipping malformed probe result '{}': {}", line, e);
            return 0;
        }
    };

    let ep = result.endpoint();
    let mut fired = 0;
    for handler in handlers {
        if handler.record(&ep, result.success).await {
            fired += 1;
        }
    }
    fired
}

/// Feed raw JSON-line probe results received on `lines` to every handler
/// until the sender is dropped. Returns the number of alerts fired.
pub async fn process_lines(
    handlers: &[AlertHandler],
    mut lines: mpsc::Receiver<Vec<u8>>,
) -> usize {
    let mut fired = 0;
    while let Some(raw) = lines.recv().await {
        fired += record_line(handlers, &raw).await;
    }
    fired
}

/// Read stdin line by line on a dedicated thread.
///
/// A blocking stdin read can't be cancelled, so it must not live on the
/// runtime: on shutdown the thread is simply abandoned.
pub fn spawn_stdin_reader() -> Result<mpsc::Receiver<Vec<u8>>> {
    use std::io::BufRead as _;

    let (tx, rx) = mpsc::channel(64);
    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let mut stdin = std::io::stdin().lock();
            loop {
                let mut buf = Vec::new();
                match stdin.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => {
                        if tx.blocking_send(buf).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Failed reading probe results from stdin: {}", e);
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}

/// Write the `json` field of every alert received on `rx` as one line to `out`
pub async fn publish_alerts<W>(mut rx: mpsc::Receiver<AlertInfo>, mut out: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(alert) = rx.recv().await {
        let fields = alert_fields(&alert)?;
        let json = fields.get("json").map(String::as_str).unwrap_or_default();
        out.write_all(json.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
    }
    Ok(())
}

/// Run the alerting service on probe results read from stdin
pub async fn run(config: Config, dry_run: bool) -> Result<()> {
    let cancel = CancellationToken::new();
    let launcher = Arc::new(TokioCommandLauncher::new());

    let (notify_tx, subscriber) = match config.notify_channel_capacity {
        Some(capacity) => {
            let (tx, rx) = mpsc::channel(capacity);
            let subscriber = tokio::spawn(publish_alerts(rx, tokio::io::stdout()));
            (Some(tx), Some(subscriber))
        }
        None => (None, None),
    };

    let handlers = build_handlers(
        &config,
        Arc::clone(&launcher) as Arc<dyn CommandLauncher>,
        notify_tx,
        cancel.clone(),
        dry_run,
    );

    // Setup shutdown handler
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            cancel_for_signal.cancel();
        }
    });

    tracing::info!("Probe alerting started with {} alert(s)", handlers.len());

    // From here on every path falls through to the shutdown below
    match spawn_stdin_reader() {
        Ok(lines) => tokio::select! {
            fired = process_lines(&handlers, lines) => {
                tracing::info!("End of probe results, {} alert(s) fired", fired);
            }
            _ = cancel.cancelled() => {
                tracing::debug!("Processing cancelled");
            }
        },
        Err(e) => tracing::error!("Failed to start stdin reader: {}", e),
    }

    // Dropping the handlers closes the notification channel
    drop(handlers);
    if let Some(subscriber) = subscriber {
        match subscriber.await {
            Ok(Err(e)) => tracing::error!("Alert subscriber failed: {}", e),
            Err(e) => tracing::error!("Alert subscriber panicked: {}", e),
            Ok(Ok(())) => {}
        }
    }

    tracing::debug!("Waiting for notification commands to exit");
    launcher.wait().await;
    tracing::info!("Probe alerting stopped");

    Ok(())
}
