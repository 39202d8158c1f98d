use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,
    pub max_size_mb: u64,
    pub max_files: usize,
    pub verbose: bool,
}

impl LoggingConfig {
    /// A size-capped JSONL sink. `Mutex<FileRotate>` already satisfies
    /// `MakeWriter`, so the rotation handle needs no adapter type.
    fn rotating_sink(&self, file_name: &str) -> Mutex<FileRotate<AppendCount>> {
        Mutex::new(FileRotate::new(
            self.log_dir.join(file_name),
            AppendCount::new(self.max_files),
            ContentLimit::Bytes((self.max_size_mb * 1024 * 1024) as usize),
            Compression::None,
            #[cfg(unix)]
            None,
        ))
    }
}

pub fn init_logging(config: LoggingConfig) -> anyhow::Result<()> {
    fs::create_dir_all(&config.log_dir)?;

    let console_directive = if config.verbose {
        "nimbus=debug"
    } else {
        "nimbus=info"
    };

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_filter(EnvFilter::from_default_env().add_directive(console_directive.parse()?));

    let events_layer = fmt::layer()
        .json()
        .with_writer(config.rotating_sink("events.jsonl"))
        .with_filter(EnvFilter::new("nimbus::agent=info,nimbus::network=info"));

    let telemetry_layer = fmt::layer()
        .json()
        .with_writer(config.rotating_sink("telemetry.jsonl"))
        .with_filter(EnvFilter::new("nimbus::brain=debug"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(events_layer)
        .with(telemetry_layer)
        .init();

    tracing::info!(
        log_dir = %config.log_dir.display(),
        max_size_mb = config.max_size_mb,
        max_files = config.max_files,
        "Logging initialized"
    );

    Ok(())
}
