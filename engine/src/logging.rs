//! Tracing subscriber setup for hosts embedding the workspace.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use sqlcoach_config::LoggingConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install a file-backed subscriber. Returns the log path on success.
///
/// `RUST_LOG` wins over the configured filter. If no log file can be opened the
/// subscriber is installed without an output layer rather than writing to the
/// terminal the host may be drawing on. Calling this twice is harmless.
pub fn init_tracing(config: &LoggingConfig) -> Option<PathBuf> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.filter()))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        let installed = tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .try_init()
            .is_ok();
        if installed {
            tracing::info!(path = %log_path.display(), "Logging initialized");
            for warning in init_warnings {
                tracing::warn!("{warning}");
            }
        }
        return Some(log_path);
    }

    let _ = tracing_subscriber::registry().with(env_filter).try_init();
    None
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".sqlcoach").join("logs").join("sqlcoach.log"));
    }
    candidates.push(PathBuf::from(".sqlcoach").join("logs").join("sqlcoach.log"));
    candidates
}
