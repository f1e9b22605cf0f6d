use chrono::{Local, Utc};
use std::{
    backtrace::Backtrace,
    fs::OpenOptions,
    io::Write,
    panic::{PanicHookInfo, take_hook},
    path::{Path, PathBuf},
    thread,
};

use crate::logging::LOG_FILE_PREFIX;

/// Routes panics through `tracing` before the previous hook runs.
///
/// With a log directory and `panic = "abort"`, the record is also appended
/// straight to the day's log file, since the non-blocking writer is not
/// flushed on abort.
pub fn install(log_dir: Option<PathBuf>) {
    let previous_hook = take_hook();

    std::panic::set_hook(Box::new(move |panic_info: &PanicHookInfo<'_>| {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let record = format_panic_record(panic_info);
            tracing::error!(target: "vidq::panic", "{record}");

            if cfg!(panic = "abort")
                && let Some(log_dir) = &log_dir
            {
                let _ = append_panic_record(log_dir, &record);
            }
        }));

        previous_hook(panic_info);
    }));
}

/// Same file name `tracing_appender::rolling::daily` uses for today, which
/// rolls on the UTC date.
fn todays_log_file(log_dir: &Path) -> PathBuf {
    log_dir.join(format!(
        "{}.{}",
        LOG_FILE_PREFIX,
        Utc::now().format("%Y-%m-%d")
    ))
}

fn append_panic_record(log_dir: &Path, record: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(todays_log_file(log_dir))?;
    writeln!(file, "{record}")?;
    file.flush()
}

fn format_panic_record(panic_info: &PanicHookInfo<'_>) -> String {
    let location = panic_info
        .location()
        .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()))
        .unwrap_or_else(|| "<unknown>".to_string());
    let thread_name = thread::current()
        .name()
        .unwrap_or("<unnamed>")
        .to_string();
    let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");

    format!(
        "{ts} PANIC thread={thread_name} location={location} payload={}\nBacktrace:\n{}",
        payload_text(panic_info),
        Backtrace::force_capture()
    )
}

fn payload_text(panic_info: &PanicHookInfo<'_>) -> String {
    let payload = panic_info.payload();
    payload
        .downcast_ref::<&'static str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| panic_info.to_string())
}
