//! Process-wide tracing setup for binaries and tests.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::cell::Cell;
use std::io::IsTerminal;
use std::panic::PanicHookInfo;
use std::sync::Once;

use callguard_config::{Environment, UnknownEnvironment};
use thiserror::Error;
use tracing::subscriber::{SetGlobalDefaultError, set_global_default};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{self, InitError};
use tracing_log::LogTracer;
use tracing_log::log_tracer::SetLoggerError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

use crate::format::ColoredFormat;

/// Directory receiving rotated log files in production.
const LOG_DIR: &str = "logs";

/// Number of daily log files kept before the oldest is deleted.
const MAX_LOG_FILES: usize = 5;

/// Errors raised while installing the process-wide subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to build rolling file appender: {0}")]
    InitAppender(#[from] InitError),

    #[error("failed to init log tracer: {0}")]
    InitLogTracer(#[from] SetLoggerError),

    #[error("failed to set global default subscriber: {0}")]
    SetGlobalDefault(#[from] SetGlobalDefaultError),

    #[error(transparent)]
    Environment(#[from] UnknownEnvironment),
}

/// Keeps buffered log lines alive until the process exits.
///
/// Production logging writes through a background worker; dropping the
/// [`LogFlusher::Flusher`] variant flushes what is still queued.
#[must_use]
pub enum LogFlusher {
    Flusher(WorkerGuard),
    NullFlusher,
}

static INIT_TEST_TRACING: Once = Once::new();

thread_local! {
    /// Depth of nested [`with_caught_panics`] scopes on this thread.
    static CAUGHT_PANIC_SCOPES: Cell<usize> = const { Cell::new(0) };
}

/// Initializes console tracing once per test binary when `ENABLE_TRACING` is set:
///
/// ```bash
/// ENABLE_TRACING=1 cargo test test_name
/// ```
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        if std::env::var("ENABLE_TRACING").is_ok() {
            // Without an environment we would default to prod and log to files.
            Environment::Dev.set();
            let _log_flusher = init_tracing("test").expect("failed to initialize test tracing");
        }
    });
}

/// Installs the process-wide subscriber.
///
/// Development prints colorized lines to stderr, production writes JSON lines
/// to daily files under `logs/`. `RUST_LOG` overrides the default `info`
/// level. Also forwards `log` records and logs panics through tracing, except
/// panics raised inside [`with_caught_panics`], which are left to the code
/// catching them.
pub fn init_tracing(app_name: &str) -> Result<LogFlusher, TracingError> {
    LogTracer::init()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_flusher = if Environment::load()?.is_prod() {
        configure_prod_tracing(filter, app_name)?
    } else {
        configure_dev_tracing(filter)?
    };

    set_tracing_panic_hook();

    Ok(log_flusher)
}

fn configure_prod_tracing(filter: EnvFilter, app_name: &str) -> Result<LogFlusher, TracingError> {
    let file_appender = rolling::Builder::new()
        .filename_prefix(app_name)
        .filename_suffix("log")
        .rotation(rolling::Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .build(LOG_DIR)?;

    let (file_appender, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = Registry::default().with(filter).with(
        fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(file_appender)
            .json()
            .with_current_span(true)
            .with_span_list(true),
    );

    set_global_default(subscriber)?;

    Ok(LogFlusher::Flusher(guard))
}

fn configure_dev_tracing(filter: EnvFilter) -> Result<LogFlusher, TracingError> {
    let subscriber = Registry::default().with(filter).with(
        fmt::layer()
            .event_format(ColoredFormat::new(std::io::stderr().is_terminal()))
            .with_writer(std::io::stderr),
    );

    set_global_default(subscriber)?;

    Ok(LogFlusher::NullFlusher)
}

/// Chains a hook logging panics through tracing in front of the current one.
fn set_tracing_panic_hook() {
    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if panics_are_caught() {
            return;
        }

        panic_hook(info);
        prev_hook(info);
    }));
}

/// Runs `f` with the tracing panic hook muted on this thread.
///
/// For callers that catch panics raised by `f` with
/// [`std::panic::catch_unwind`] and report them on their own. Neither the
/// tracing hook nor the hook it chains to prints anything for those panics.
pub fn with_caught_panics<T>(f: impl FnOnce() -> T) -> T {
    struct ScopeGuard;

    impl Drop for ScopeGuard {
        fn drop(&mut self) {
            CAUGHT_PANIC_SCOPES.with(|scopes| scopes.set(scopes.get() - 1));
        }
    }

    CAUGHT_PANIC_SCOPES.with(|scopes| scopes.set(scopes.get() + 1));
    let _guard = ScopeGuard;

    f()
}

fn panics_are_caught() -> bool {
    CAUGHT_PANIC_SCOPES.with(|scopes| scopes.get() > 0)
}

fn panic_hook(panic_info: &PanicHookInfo) {
    let backtrace = Backtrace::capture();
    let (backtrace, note) = match backtrace.status() {
        BacktraceStatus::Captured => (Some(backtrace), None),
        BacktraceStatus::Disabled => (
            None,
            Some("run with RUST_BACKTRACE=1 to display backtraces"),
        ),
        BacktraceStatus::Unsupported => {
            (None, Some("backtraces are not supported on this platform"))
        }
        _ => (None, Some("backtrace status is unknown")),
    };

    let payload = panic_message(panic_info.payload());
    let location = panic_info.location().map(|location| location.to_string());

    tracing::error!(
        critical = true,
        panic.payload = payload,
        panic.location = location,
        panic.backtrace = backtrace.map(tracing::field::display),
        panic.note = note,
        "a panic occurred",
    );
}

/// Extracts the message of a panic payload.
///
/// `panic!` produces either a `&'static str` or a `String`; anything else is
/// reported as unknown.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}
