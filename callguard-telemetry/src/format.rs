//! Colorized single-line event format.

use std::fmt::{self, Write as _};

use chrono::Local;
use colored::Color;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Field carrying the logger name, printed in place of the event target.
pub const LOGGER_FIELD: &str = "logger";

/// Boolean field promoting an error event to [`Severity::Critical`].
pub const CRITICAL_FIELD: &str = "critical";

/// Local time with millisecond precision, e.g. `2024-05-01 13:37:00,042`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Severity as printed in a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Severity of an event at `level`, `critical` only promoting errors.
    pub fn of(level: &Level, critical: bool) -> Severity {
        match *level {
            Level::TRACE => Severity::Trace,
            Level::DEBUG => Severity::Debug,
            Level::INFO => Severity::Info,
            Level::WARN => Severity::Warning,
            Level::ERROR if critical => Severity::Critical,
            _ => Severity::Error,
        }
    }

    /// Name printed in the level column.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Foreground and optional background color of this severity.
    fn colors(&self) -> (Color, Option<Color>) {
        match self {
            Severity::Trace | Severity::Debug => (Color::Cyan, None),
            Severity::Info => (Color::Green, None),
            Severity::Warning => (Color::Yellow, None),
            Severity::Error => (Color::Red, None),
            Severity::Critical => (Color::Red, Some(Color::White)),
        }
    }

    /// Wraps `line` in the ANSI color of this severity.
    ///
    /// Always emits the escape codes. `colored`'s own terminal detection looks
    /// at stdout, which says nothing about the writer the line ends up in, so
    /// whether to paint is the caller's decision.
    pub fn paint(&self, line: &str) -> String {
        let (foreground, background) = self.colors();
        let codes = match background {
            Some(background) => format!("{};{}", background.to_bg_str(), foreground.to_fg_str()),
            None => foreground.to_fg_str().into_owned(),
        };

        format!("\x1b[{codes}m{line}\x1b[0m")
    }
}

/// Event format producing `timestamp - logger_name - LEVEL - message`.
///
/// The logger name comes from the [`LOGGER_FIELD`] field when present and
/// falls back to the event target. Fields other than the message, the logger
/// name and the critical flag are appended as `key=value` pairs.
#[derive(Debug, Clone, Copy)]
pub struct ColoredFormat {
    ansi: bool,
}

impl ColoredFormat {
    /// Creates the format, painting lines with their severity color when
    /// `ansi` is set.
    pub fn new(ansi: bool) -> Self {
        Self { ansi }
    }
}

impl Default for ColoredFormat {
    fn default() -> Self {
        Self::new(true)
    }
}

impl<S, N> FormatEvent<S, N> for ColoredFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut fields = LineFields::default();
        event.record(&mut fields);

        let metadata = event.metadata();
        let severity = Severity::of(metadata.level(), fields.critical);
        let logger_name = fields.logger.as_deref().unwrap_or(metadata.target());
        let timestamp = Local::now().format(TIMESTAMP_FORMAT);

        let line = format!(
            "{timestamp} - {logger_name} - {} - {}{}",
            severity.label(),
            fields.message,
            fields.extras
        );

        if self.ansi {
            writer.write_str(&severity.paint(&line))?;
        } else {
            writer.write_str(&line)?;
        }

        writeln!(writer)
    }
}

#[derive(Default)]
struct LineFields {
    message: String,
    logger: Option<String>,
    critical: bool,
    extras: String,
}

impl Visit for LineFields {
    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == CRITICAL_FIELD {
            self.critical = value;
        } else {
            let _ = write!(self.extras, " {}={value}", field.name());
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message.push_str(value),
            LOGGER_FIELD => self.logger = Some(value.to_string()),
            name => {
                let _ = write!(self.extras, " {name}={value}");
            }
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => {
                let _ = write!(self.message, "{value:?}");
            }
            LOGGER_FIELD => self.logger = Some(format!("{value:?}")),
            name => {
                let _ = write!(self.extras, " {name}={value:?}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::BufferWriter;
    use tracing_subscriber::layer::SubscriberExt;

    fn capture(ansi: bool, emit: impl FnOnce()) -> String {
        let buffer = BufferWriter::default();
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .event_format(ColoredFormat::new(ansi))
                .with_writer(buffer.clone()),
        );
        tracing::subscriber::with_default(subscriber, emit);
        buffer.contents()
    }

    #[test]
    fn line_has_timestamp_name_level_and_message() {
        let output = capture(false, || {
            tracing::info!(logger = "orders", "order {} accepted", 7);
        });

        let line = output.trim_end();
        let parts: Vec<&str> = line.splitn(4, " - ").collect();
        assert_eq!(parts.len(), 4, "unexpected line: {line}");
        // YYYY-MM-DD HH:MM:SS,mmm
        assert_eq!(parts[0].len(), 23, "bad timestamp: {}", parts[0]);
        assert_eq!(&parts[0][19..20], ",");
        assert_eq!(parts[1], "orders");
        assert_eq!(parts[2], "INFO");
        assert_eq!(parts[3], "order 7 accepted");
    }

    #[test]
    fn target_is_used_without_logger_field() {
        let output = capture(false, || {
            tracing::warn!(target: "billing", "late");
        });

        assert!(output.contains(" - billing - WARNING - late"));
    }

    #[test]
    fn critical_flag_promotes_error_lines() {
        let output = capture(false, || {
            tracing::error!(logger = "core", critical = true, "out of memory");
            tracing::error!(logger = "core", "disk full");
        });

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(" - core - CRITICAL - out of memory"));
        assert!(lines[1].contains(" - core - ERROR - disk full"));
    }

    #[test]
    fn extra_fields_are_appended() {
        let output = capture(false, || {
            tracing::debug!(logger = "core", attempt = 3, cached = false, "retrying");
        });

        assert!(output.contains("DEBUG - retrying attempt=3 cached=false"));
    }

    #[test]
    fn ansi_lines_are_colored_by_severity() {
        let output = capture(true, || {
            tracing::info!(logger = "core", "ok");
            tracing::error!(logger = "core", critical = true, "boom");
        });

        let lines: Vec<&str> = output.lines().collect();
        // green foreground
        assert!(lines[0].starts_with("\u{1b}[32m"), "{:?}", lines[0]);
        // white background, red foreground
        assert!(lines[1].starts_with("\u{1b}[47;31m"), "{:?}", lines[1]);
        assert!(lines.iter().all(|line| line.ends_with("\u{1b}[0m")));
    }

    #[test]
    fn colors_do_not_depend_on_the_global_colored_switch() {
        colored::control::set_override(false);
        let painted = Severity::Warning.paint("careful");
        colored::control::unset_override();

        assert_eq!(painted, "\u{1b}[33mcareful\u{1b}[0m");
    }

    #[test]
    fn plain_lines_carry_no_escape_codes() {
        let output = capture(false, || {
            tracing::error!(logger = "core", critical = true, "boom");
        });

        assert!(!output.contains('\u{1b}'), "{output:?}");
    }

    #[test]
    fn severity_follows_level_table() {
        assert_eq!(Severity::of(&Level::TRACE, false), Severity::Trace);
        assert_eq!(Severity::of(&Level::WARN, true), Severity::Warning);
        assert_eq!(Severity::of(&Level::ERROR, true).label(), "CRITICAL");
    }
}
