use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Environment variable holding the log filter (e.g. `debug` or `dtodash_core=trace,info`).
pub const ENV_LOG_FILTER: &str = "DTODASH_LOG";

const DEFAULT_FILTER: &str = "info";

/// Default log location under the user cache directory.
pub fn default_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("dtodash")
        .join("dtodash.log")
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(ENV_LOG_FILTER)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn open(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))
}

/// Subscriber writing plain lines to `file`; the terminal belongs to the dashboard.
fn subscriber(filter: EnvFilter, file: File) -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(true),
    )
}

/// Install the global subscriber and return the path it writes to.
///
/// Records from the `log` facade (used by `dtodash-core`) are forwarded
/// through the subscriber's `tracing-log` bridge.
pub fn init(path: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    let path = path.unwrap_or_else(default_path);
    subscriber(env_filter(), open(&path)?)
        .try_init()
        .context("installing log subscriber")?;
    Ok(path)
}
