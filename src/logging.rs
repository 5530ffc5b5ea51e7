use std::env;

use anyhow::{Context, Result, anyhow};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

const DEFAULT_FILTER: &str = "info,layout_overlay=debug";
const DEFAULT_FILE_FILTER: &str = "info";
const LOG_FILE_PREFIX: &str = "layout_overlay.log";

/// Console logging filtered by `RUST_LOG`, plus a daily rolling file when
/// `OVERLAY_LOG_DIR` is set. The returned guard must outlive the program's
/// last log line.
pub fn init_tracing() -> Result<Option<WorkerGuard>> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let console_layer = fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let (file_layer, guard) = match env::var("OVERLAY_LOG_DIR") {
        Ok(dir) if !dir.trim().is_empty() => {
            let dir = dir.trim();
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory `{dir}`"))?;
            let file_filter = env::var("OVERLAY_FILE_LOG")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FILE_FILTER.to_owned());
            let file_filter = EnvFilter::try_new(&file_filter)
                .with_context(|| format!("invalid OVERLAY_FILE_LOG `{file_filter}`"))?;

            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(file_filter);
            (Some(layer), Some(guard))
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|error| anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(guard)
}
