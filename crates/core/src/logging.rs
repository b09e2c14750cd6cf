use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use typescout_api::{DiscoveryError, Result};

/// Where and how discovery logs are written.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// File name prefix, e.g. `scan` gives `scan.2026-01-21`.
    pub component: String,
    pub directory: PathBuf,
    pub to_stderr: bool,
}

impl LoggingConfig {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            directory: Self::default_directory(),
            to_stderr: false,
        }
    }

    pub fn default_directory() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".typescout")
            .join("logs")
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    pub fn with_stderr(mut self, to_stderr: bool) -> Self {
        self.to_stderr = to_stderr;
        self
    }
}

/// Install the global subscriber. Keep the returned guard alive for as long
/// as logs should be flushed to disk.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&config.directory).map_err(|e| {
        DiscoveryError::Internal(format!(
            "cannot create log directory {}: {e}",
            config.directory.display()
        ))
    })?;

    let file_appender = tracing_appender::rolling::daily(&config.directory, &config.component);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    let installed = if config.to_stderr {
        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false);
        registry.with(stderr_layer).try_init()
    } else {
        registry.try_init()
    };
    installed.map_err(|e| DiscoveryError::Internal(format!("logging already initialised: {e}")))?;

    Ok(guard)
}
