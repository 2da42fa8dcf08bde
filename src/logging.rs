use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fmt;
use std::path::Path;
use tracing::level_filters::LevelFilter;
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

use crate::config::DebugConfig;

/// Logger name for this crate's own events; also names its log file.
pub const MAIN_LOGGER: &str = "payslip_downloader";
/// Logger name for the WebDriver client's events.
pub const WEBDRIVER_LOGGER: &str = "webdriver";
const WEBDRIVER_TARGET: &str = "thirtyfour";

/// Keeps the background log writers alive; dropping it flushes them.
pub struct LogGuards {
    _guards: Vec<WorkerGuard>,
}

/// Installs the global subscriber: stderr output filtered by `RUST_LOG`, plus
/// the per-run log files `debug` enables.
pub fn init(debug: &DebugConfig) -> Result<LogGuards> {
    let started = Local::now();
    let mut guards = Vec::new();

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let main_file = if debug.logging_enabled {
        let level = parse_level(&debug.log_level)?;
        let (writer, guard) = file_writer(&debug.log_folder, MAIN_LOGGER, &started)?;
        guards.push(guard);
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .event_format(MainLineFormat)
                .with_filter(Targets::new().with_target(MAIN_LOGGER, level)),
        )
    } else {
        None
    };

    let webdriver_file = if debug.webdriver_logging_enabled {
        let level = parse_level(&debug.webdriver_log_level)?;
        let (writer, guard) = file_writer(&debug.log_folder, WEBDRIVER_LOGGER, &started)?;
        guards.push(guard);
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(Targets::new().with_target(WEBDRIVER_TARGET, level)),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(console)
        .with(main_file)
        .with(webdriver_file)
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(LogGuards { _guards: guards })
}

fn file_writer(folder: &Path, logger: &str, started: &DateTime<Local>) -> Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(folder)
        .with_context(|| format!("Failed to create log folder {}", folder.display()))?;
    let appender = tracing_appender::rolling::never(folder, log_file_name(logger, started));
    Ok(tracing_appender::non_blocking(appender))
}

/// `<logger>_<YYYYMMDD_HHMMSS>.log`
pub fn log_file_name(logger: &str, started: &DateTime<Local>) -> String {
    format!("{}_{}.log", logger, started.format("%Y%m%d_%H%M%S"))
}

/// Accepts both tracing level names and the classic `WARNING`/`CRITICAL`
/// spellings, case-insensitively.
pub fn parse_level(name: &str) -> Result<LevelFilter> {
    match name.trim().to_ascii_uppercase().as_str() {
        "TRACE" | "NOTSET" => Ok(LevelFilter::TRACE),
        "DEBUG" => Ok(LevelFilter::DEBUG),
        "INFO" => Ok(LevelFilter::INFO),
        "WARN" | "WARNING" => Ok(LevelFilter::WARN),
        "ERROR" | "CRITICAL" | "FATAL" => Ok(LevelFilter::ERROR),
        "OFF" => Ok(LevelFilter::OFF),
        other => Err(anyhow::anyhow!("Unknown log level '{}'", other)),
    }
}

/// `timestamp level line:file(pid) - message`
struct MainLineFormat;

impl<S, N> FormatEvent<S, N> for MainLineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(&self, ctx: &FmtContext<'_, S, N>, mut writer: Writer<'_>, event: &Event<'_>) -> fmt::Result {
        let meta = event.metadata();
        write!(
            writer,
            "{} ",
            line_prefix(&Local::now(), meta.level(), meta.line(), meta.file(), std::process::id())
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn line_prefix(now: &DateTime<Local>, level: &Level, line: Option<u32>, file: Option<&str>, pid: u32) -> String {
    let file = file
        .and_then(|f| Path::new(f).file_name())
        .and_then(|f| f.to_str())
        .unwrap_or("?");
    format!(
        "{} {} {}:{}({}) -",
        now.format("%Y-%m-%d %H:%M:%S,%3f"),
        level_name(level),
        line.unwrap_or(0),
        file,
        pid
    )
}

fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARNING",
        Level::INFO => "INFO",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
    }
}
