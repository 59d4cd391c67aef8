//! Structured run logging and subscriber setup.
//!
//! Provides consistent, structured logging for pipeline runs with
//! tracing spans and contextual information.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

use matchreel_models::RunId;

use crate::error::{PipelineError, PipelineResult};

/// Default filter directive for console output.
pub const DEFAULT_LOG_DIRECTIVE: &str = "matchreel=info";

/// Run logger for structured logging with consistent formatting.
///
/// Every event carries the run ID and the operation being performed.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    operation: String,
}

impl RunLogger {
    pub fn new(run_id: &RunId, operation: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run completed: {}", message
        );
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span wrapping every event of the run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "run",
            run_id = %self.run_id,
            operation = %self.operation
        )
    }
}

/// Path of the per-run debug log inside `dir`.
pub fn log_file_path(dir: &Path) -> PathBuf {
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("highlight_detection_{}.log", ts))
}

/// Install the global subscriber.
///
/// Console output honours `RUST_LOG` on top of [`DEFAULT_LOG_DIRECTIVE`] and
/// switches to JSON when `LOG_FORMAT=json`. When `log_dir` is given, a second
/// debug-level plain-text layer writes to a timestamped file there; its path
/// is returned.
pub fn init_tracing(log_dir: Option<&Path>) -> PipelineResult<Option<PathBuf>> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));

    let console = if use_json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer()
            .with_ansi(true)
            .with_target(true)
            .with_thread_ids(false)
            .boxed()
    };

    let (file_layer, file_path) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let path = log_file_path(dir);
            let file = File::create(&path)?;
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(EnvFilter::new("matchreel=debug"));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console.with_filter(env_filter))
        .with(file_layer)
        .try_init()
        .map_err(|e| PipelineError::config_error(format!("failed to install logger: {}", e)))?;

    Ok(file_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_logger_creation() {
        let run_id = RunId::from_string("run-42");
        let logger = RunLogger::new(&run_id, "highlight_reel");

        assert_eq!(logger.run_id(), "run-42");
        assert_eq!(logger.operation(), "highlight_reel");
    }

    #[test]
    fn test_log_file_path() {
        let path = log_file_path(Path::new("/var/log/matchreel"));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("highlight_detection_"));
        assert!(name.ends_with(".log"));
        assert_eq!(path.parent(), Some(Path::new("/var/log/matchreel")));
    }
}
