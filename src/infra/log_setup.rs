use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer as _};

const DEFAULT_FILTER: &str = "info,sqlx=warn";
const KEPT_LOG_FILES: usize = 7;

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Log to stdout and to `<log_dir>/bot.YYYY-MM-DD.log`, one file per day, a week kept.
///
/// Keep the returned guard alive until shutdown or buffered file output is lost.
pub fn init(log_dir: &Path) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("bot")
        .filename_suffix("log")
        .max_log_files(KEPT_LOG_FILES)
        .build(log_dir)?;
    let (file_writer, file_guard) = NonBlocking::new(file_appender);

    let stdout_layer = Layer::default().with_filter(filter());

    let file_layer = Layer::default()
        .with_ansi(false)
        .with_writer(file_writer)
        .with_filter(filter());

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .try_init()?;

    let default_panic_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let payload = panic_info.payload();
        let payload = if let Some(s) = payload.downcast_ref::<&str>() {
            Some(&**s)
        } else {
            payload.downcast_ref::<String>().map(String::as_str)
        };
        let location = panic_info.location().map(|l| l.to_string());

        tracing::error!(payload, location, "A panic occurred");
        default_panic_hook(panic_info);
    }));

    Ok(file_guard)
}
