//! Process-wide log routing: stderr plus an optional per-session file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// `hdr_app_<YYYYmmdd_HHMMSS>.log` for the current local time.
pub fn session_log_name() -> String {
    format!("hdr_app_{}.log", chrono::Local::now().format("%Y%m%d_%H%M%S"))
}

/// Install the global subscriber.
///
/// With `log_dir`, events are also written to a fresh session file in that
/// directory. The returned guard flushes the file writer on drop and must be
/// held until exit.
pub fn init(log_dir: Option<&Path>) -> anyhow::Result<(Option<WorkerGuard>, Option<PathBuf>)> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard, log_path) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let name = session_log_name();
            let appender = tracing_appender::rolling::never(dir, &name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false);
            (Some(layer), Some(guard), Some(dir.join(name)))
        }
        None => (None, None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install log subscriber")?;

    Ok((guard, log_path))
}
