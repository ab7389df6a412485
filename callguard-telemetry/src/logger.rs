use std::fmt;
use std::io::IsTerminal;
use std::sync::Arc;

use callguard_config::shared::{LogLevel, LoggerConfig};
use tracing::Dispatch;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;

use crate::format::ColoredFormat;

/// Named logging handle.
///
/// A logger owns the [`Dispatch`] its events go through, so it does not depend
/// on whatever subscriber happens to be installed globally. Build one at start
/// up and hand out clones; clones share the name and the subscriber.
#[derive(Clone)]
pub struct Logger {
    name: Arc<str>,
    threshold: LogLevel,
    dispatch: Dispatch,
}

impl Logger {
    /// Creates a logger writing to stderr, colorized when stderr is a terminal.
    pub fn console(name: impl Into<Arc<str>>, level: LogLevel) -> Self {
        let ansi = std::io::stderr().is_terminal();
        Self::with_writer(name, level, ansi, std::io::stderr)
    }

    /// Creates a logger from its configuration, writing to stderr.
    pub fn from_config(config: &LoggerConfig) -> Self {
        Self::with_writer(
            config.name.as_str(),
            config.level,
            config.ansi,
            std::io::stderr,
        )
    }

    /// Creates a logger writing formatted lines to `writer`.
    ///
    /// With `ansi` set, every line is wrapped in its severity color no matter
    /// where `writer` points.
    pub fn with_writer<W>(name: impl Into<Arc<str>>, level: LogLevel, ansi: bool, writer: W) -> Self
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let layer = tracing_subscriber::fmt::layer()
            .event_format(ColoredFormat::new(ansi))
            .with_writer(writer)
            .with_filter(level_filter(level));
        let subscriber = tracing_subscriber::registry().with(layer);

        Self {
            name: name.into(),
            threshold: level,
            dispatch: Dispatch::new(subscriber),
        }
    }

    /// Name printed in every line of this logger.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if a line at `level` would be emitted.
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.threshold
    }

    /// Emits one line at `level`.
    pub fn log(&self, level: LogLevel, message: impl fmt::Display) {
        if !self.enabled(level) {
            return;
        }

        let name = &*self.name;
        tracing::dispatcher::with_default(&self.dispatch, || match level {
            LogLevel::Trace => tracing::trace!(logger = name, "{message}"),
            LogLevel::Debug => tracing::debug!(logger = name, "{message}"),
            LogLevel::Info => tracing::info!(logger = name, "{message}"),
            LogLevel::Warn => tracing::warn!(logger = name, "{message}"),
            LogLevel::Error => tracing::error!(logger = name, "{message}"),
            LogLevel::Critical => tracing::error!(logger = name, critical = true, "{message}"),
        });
    }

    pub fn trace(&self, message: impl fmt::Display) {
        self.log(LogLevel::Trace, message);
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.log(LogLevel::Error, message);
    }

    /// Emits an error event flagged as critical, rendered `CRITICAL`.
    pub fn critical(&self, message: impl fmt::Display) {
        self.log(LogLevel::Critical, message);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

/// Maps a configured level onto the subscriber filter.
///
/// Critical lines are error events, the stricter threshold is enforced by
/// [`Logger::enabled`].
pub(crate) fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Trace => LevelFilter::TRACE,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::BufferWriter;

    fn buffered(level: LogLevel) -> (Logger, BufferWriter) {
        let buffer = BufferWriter::default();
        let logger = Logger::with_writer("jobs", level, false, buffer.clone());
        (logger, buffer)
    }

    #[test]
    fn lines_carry_the_logger_name() {
        let (logger, buffer) = buffered(LogLevel::Info);

        logger.info("started");

        assert_eq!(buffer.lines().len(), 1);
        assert!(buffer.contents().contains(" - jobs - INFO - started"));
    }

    #[test]
    fn lines_below_the_threshold_are_dropped() {
        let (logger, buffer) = buffered(LogLevel::Warn);

        logger.trace("noise");
        logger.debug("noise");
        logger.info("noise");
        logger.warn("careful");
        logger.error("broken");

        let lines = buffer.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("WARNING - careful"));
        assert!(lines[1].contains("ERROR - broken"));
    }

    #[test]
    fn critical_threshold_drops_plain_errors() {
        let (logger, buffer) = buffered(LogLevel::Critical);

        logger.error("broken");
        logger.critical("on fire");

        let lines = buffer.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("CRITICAL - on fire"));
    }

    #[test]
    fn clones_share_the_sink() {
        let (logger, buffer) = buffered(LogLevel::Info);
        let clone = logger.clone();

        logger.info("one");
        clone.info("two");

        assert_eq!(buffer.count_containing("INFO"), 2);
        assert_eq!(clone.name(), "jobs");
    }

    #[test]
    fn ansi_logger_colors_lines_written_to_any_sink() {
        let buffer = BufferWriter::default();
        let logger = Logger::with_writer("jobs", LogLevel::Info, true, buffer.clone());

        logger.info("started");
        logger.warn("slow");

        let lines = buffer.lines();
        assert!(lines[0].starts_with("\u{1b}[32m"), "{:?}", lines[0]);
        assert!(lines[0].contains(" - jobs - INFO - started"));
        assert!(lines[1].starts_with("\u{1b}[33m"), "{:?}", lines[1]);
        assert!(lines.iter().all(|line| line.ends_with("\u{1b}[0m")));
    }

    #[test]
    fn loggers_write_to_their_own_sink() {
        let (logger, buffer) = buffered(LogLevel::Info);
        let other = BufferWriter::default();
        let other_logger = Logger::with_writer("other", LogLevel::Info, false, other.clone());

        logger.info("mine");

        assert_eq!(buffer.lines().len(), 1);
        assert!(other.lines().is_empty());
        other_logger.info("theirs");
        assert_eq!(buffer.lines().len(), 1);
    }
}
