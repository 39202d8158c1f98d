use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::mpsc;

use crate::protocol::AlertPayload;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_alerts_file")]
    pub alerts_file: String,
}

fn default_enabled() -> bool {
    true
}

fn default_log_dir() -> String {
    "logs/{sensor_id}".into()
}

fn default_alerts_file() -> String {
    "alerts.jsonl".into()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            log_dir: default_log_dir(),
            alerts_file: default_alerts_file(),
        }
    }
}

impl LogConfig {
    pub fn resolve_log_dir(&self, sensor_id: &str) -> PathBuf {
        PathBuf::from(self.log_dir.replace("{sensor_id}", sensor_id))
    }

    pub fn alerts_path(&self, sensor_id: &str) -> PathBuf {
        self.resolve_log_dir(sensor_id).join(&self.alerts_file)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertEntry {
    pub seq: u64,
    pub logged_at: String,
    #[serde(flatten)]
    pub alert: AlertPayload,
}

enum LogMessage {
    Entry(String),
    Shutdown,
}

/// Appends every emitted alert to a JSONL file through a background writer,
/// keeping file I/O out of the publish path.
#[derive(Clone)]
pub struct AlertLogger {
    sender: mpsc::UnboundedSender<LogMessage>,
    seq: std::sync::Arc<AtomicU64>,
}

impl AlertLogger {
    pub fn new(config: &LogConfig, sensor_id: &str) -> Option<Self> {
        if !config.enabled {
            return None;
        }

        let log_dir = config.resolve_log_dir(sensor_id);
        let log_path = config.alerts_path(sensor_id);

        if let Err(e) = fs::create_dir_all(&log_dir) {
            tracing::warn!(path = %log_dir.display(), error = %e, "failed to create log directory");
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(&log_path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(path = %log_path.display(), error = %e, "failed to open alert log");
                return None;
            }
        };

        let (sender, receiver) = mpsc::unbounded_channel();
        let seq = std::sync::Arc::new(AtomicU64::new(0));

        let path_for_task = log_path.clone();
        tokio::spawn(async move {
            writer_task(receiver, file, path_for_task).await;
        });

        tracing::info!(path = %log_path.display(), "alert logger initialized");

        Some(Self { sender, seq })
    }

    pub fn log(&self, alert: &AlertPayload) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;

        let entry = AlertEntry {
            seq,
            logged_at: stamp_now(),
            alert: alert.clone(),
        };

        let line = match serde_json::to_string(&entry) {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize alert entry");
                return;
            }
        };

        if self.sender.send(LogMessage::Entry(line)).is_err() {
            tracing::warn!(seq, "alert log channel closed, entry dropped");
        }
    }

    pub fn current_seq(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }

    pub fn shutdown(&self) {
        let _ = self.sender.send(LogMessage::Shutdown);
    }
}

async fn writer_task(
    mut receiver: mpsc::UnboundedReceiver<LogMessage>,
    file: File,
    path: PathBuf,
) {
    let mut writer = BufWriter::new(file);

    while let Some(msg) = receiver.recv().await {
        match msg {
            LogMessage::Entry(line) => {
                if let Err(e) = writeln!(writer, "{}", line) {
                    tracing::warn!(path = %path.display(), error = %e, "failed to write alert entry");
                }
                if let Err(e) = writer.flush() {
                    tracing::warn!(path = %path.display(), error = %e, "failed to flush alert log");
                }
            }
            LogMessage::Shutdown => {
                let _ = writer.flush();
                tracing::debug!(path = %path.display(), "alert log writer shutting down");
                break;
            }
        }
    }
}

fn stamp_now() -> String {
    use std::time::SystemTime;
    let now = SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:03}Z", now.as_secs(), now.subsec_millis())
}
