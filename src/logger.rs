//! Structured logging setup.
//!
//! stdout carries the UI protocol, so every log layer writes elsewhere:
//! a compact stderr layer and a daily-rotating file under the data dir.

use std::fs;
use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing::Subscriber;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "info,reqwest=warn,hyper=warn,hyper_util=warn,mio=warn";

fn console_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true)
        .compact()
}

/// Initialize logging with a rolling file in `log_dir` plus stderr output.
///
/// Falls back to stderr only when the log directory or file appender cannot
/// be created. Returns an error if a global subscriber is already installed.
pub fn init(log_dir: &Path) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let file_appender = fs::create_dir_all(log_dir).ok().and_then(|_| {
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("assistant-client")
            .filename_suffix("log")
            .max_log_files(5)
            .build(log_dir)
            .ok()
    });

    match file_appender {
        Some(appender) => {
            let file_layer = fmt::layer()
                .with_writer(appender)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(file_layer)
                .with(console_layer())
                .try_init()?;

            tracing::info!(log_dir = %log_dir.display(), "Logger initialized");
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console_layer())
                .try_init()?;

            tracing::warn!(
                log_dir = %log_dir.display(),
                "Log directory unavailable, logging to stderr only"
            );
        }
    }

    Ok(())
}
