use std::env;
use std::ffi::OsStr;
use std::path::Path;
use tracing::debug;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "./logs/cross-dupe.log";

/// Install console and file logging. The returned guard flushes the file
/// writer on drop, so hold it until exit.
///
/// The console gets compact, level-tagged lines without timestamps; the
/// progress bars own the rest of the terminal. The file keeps full records
/// with timestamps, targets and thread names.
pub fn init_logger() -> impl Drop {
    let filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| "info".to_string());

    let log_file = env::var("LOG_FILE_PATH").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    let log_file = Path::new(&log_file);
    let (dir, file_name) = match (log_file.parent(), log_file.file_name()) {
        (Some(dir), Some(name)) if !dir.as_os_str().is_empty() => (dir, name),
        (_, Some(name)) => (Path::new("."), name),
        _ => (Path::new("./logs"), OsStr::new("cross-dupe.log")),
    };
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));

    let console = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_ansi(true);

    let file = fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_thread_names(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .with(EnvFilter::new(filter))
        .init();

    debug!("Logging to console and {}", log_file.display());

    guard
}
