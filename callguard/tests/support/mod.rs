#![allow(dead_code)]

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use callguard::{Classify, FailureReporter, FnReclaimer, Instrumentation, MemoryReclaimer};
use callguard_config::shared::LogLevel;
use callguard_telemetry::Logger;
use callguard_telemetry::tracing::init_test_tracing;
use callguard_telemetry::test_utils::BufferWriter;

/// Instrumentation logging plain lines at info level into a buffer.
pub fn buffered<R: FailureReporter>(reporter: R) -> (Instrumentation<R>, BufferWriter) {
    buffered_at(reporter, LogLevel::Info)
}

pub fn buffered_at<R: FailureReporter>(
    reporter: R,
    level: LogLevel,
) -> (Instrumentation<R>, BufferWriter) {
    init_test_tracing();

    let buffer = BufferWriter::default();
    let logger = Logger::with_writer("callguard-test", level, false, buffer.clone());

    (Instrumentation::new(logger, reporter), buffer)
}

/// Reclaimer counting how many times it ran.
pub fn counting_reclaimer() -> (impl MemoryReclaimer + 'static, Arc<AtomicUsize>) {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    let reclaimer = FnReclaimer::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    (reclaimer, runs)
}

/// Application error exposing a status code, like a typed "not found".
#[derive(Debug, PartialEq, Eq)]
pub struct NotFound {
    pub id: u32,
}

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item {} not found", self.id)
    }
}

impl Classify for NotFound {
    fn status_code(&self) -> Option<u16> {
        Some(404)
    }
}

/// Application error without a status code.
#[derive(Debug, PartialEq, Eq)]
pub struct ParseFailure(pub String);

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not parse {:?}", self.0)
    }
}

impl Classify for ParseFailure {}
