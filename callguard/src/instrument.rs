use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::future::{Future, poll_fn};
use std::panic::{self, AssertUnwindSafe};
use std::pin::pin;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use callguard_config::shared::GuardConfig;
use callguard_telemetry::Logger;
use callguard_telemetry::tracing::{panic_message, with_caught_panics};
use futures::FutureExt;

use crate::error::{Classify, Unhandled};
use crate::reclaim::{MemoryReclaimer, NoopReclaimer};
use crate::reporter::FailureReporter;

/// Logger, failure reporter and memory reclaimer shared by instrumented calls.
///
/// Cloning is cheap and clones share everything.
pub struct Instrumentation<R> {
    logger: Logger,
    reporter: Arc<R>,
    reclaimer: Arc<dyn MemoryReclaimer>,
}

impl<R> Clone for Instrumentation<R> {
    fn clone(&self) -> Self {
        Self {
            logger: self.logger.clone(),
            reporter: self.reporter.clone(),
            reclaimer: self.reclaimer.clone(),
        }
    }
}

impl<R> fmt::Debug for Instrumentation<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instrumentation")
            .field("logger", &self.logger)
            .field("reclaim", &!self.reclaimer.is_noop())
            .finish_non_exhaustive()
    }
}

impl<R: FailureReporter> Instrumentation<R> {
    /// Creates an instrumentation logging through `logger` and reporting
    /// failures through `reporter`, without a memory reclaimer.
    pub fn new(logger: Logger, reporter: R) -> Self {
        Self {
            logger,
            reporter: Arc::new(reporter),
            reclaimer: Arc::new(NoopReclaimer),
        }
    }

    /// Builds an instrumentation logging to stderr as configured.
    ///
    /// `reclaimer` is only installed when `reclaim_memory` is enabled.
    pub fn from_config<M>(config: &GuardConfig, reporter: R, reclaimer: M) -> Self
    where
        M: MemoryReclaimer + 'static,
    {
        let instrumentation = Self::new(Logger::from_config(&config.logger), reporter);

        if config.reclaim_memory {
            instrumentation.with_reclaimer(reclaimer)
        } else {
            instrumentation
        }
    }

    /// Runs `reclaimer` after every call.
    pub fn with_reclaimer<M>(mut self, reclaimer: M) -> Self
    where
        M: MemoryReclaimer + 'static,
    {
        self.reclaimer = Arc::new(reclaimer);
        self
    }

    /// Wraps an ordinary function.
    ///
    /// Arguments are passed as one value: a tuple for several, `()` for none.
    pub fn wrap<F, Args, T, E>(
        &self,
        name: impl Into<Arc<str>>,
        function: F,
    ) -> Instrumented<OrdinaryCall<F>, R>
    where
        F: Fn(Args) -> Result<T, E>,
    {
        Instrumented {
            name: name.into(),
            call: OrdinaryCall(function),
            instrumentation: self.clone(),
        }
    }

    /// Wraps a function returning a future.
    pub fn wrap_async<F, Args, Fut, T, E>(
        &self,
        name: impl Into<Arc<str>>,
        function: F,
    ) -> Instrumented<AwaitableCall<F>, R>
    where
        F: Fn(Args) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        Instrumented {
            name: name.into(),
            call: AwaitableCall(function),
            instrumentation: self.clone(),
        }
    }

    /// Moves an already instrumented callable under this instrumentation.
    ///
    /// The name and the inner callable are kept and the previous
    /// instrumentation is dropped, so each call is still logged once.
    pub fn rewrap<C, P>(&self, instrumented: Instrumented<C, P>) -> Instrumented<C, R> {
        Instrumented {
            name: instrumented.name,
            call: instrumented.call,
            instrumentation: self.clone(),
        }
    }

    /// Logs, classifies and cleans up after one invocation.
    fn settle<T, E>(
        &self,
        name: &str,
        start: Instant,
        outcome: thread::Result<Result<T, E>>,
    ) -> R::Output<T, E>
    where
        E: Classify,
    {
        let output = match outcome {
            Ok(Ok(value)) => {
                let elapsed = start.elapsed().as_secs_f64();
                self.logger.info(format_args!(
                    "function {name} completed successfully in {elapsed:.2} seconds"
                ));

                self.reporter.success(value)
            }
            Ok(Err(error)) => {
                self.log_failure(name, &error);

                if error.status_code().is_some() {
                    self.reporter.classified(error)
                } else {
                    self.reporter.unclassified(Unhandled::from_error(&error))
                }
            }
            Err(payload) => {
                let failure = Unhandled::from_panic(panic_message(&*payload));
                self.log_failure(name, &failure);

                self.reporter.unclassified(failure)
            }
        };

        self.reclaim(name);

        output
    }

    fn log_failure(&self, name: &str, error: &dyn fmt::Display) {
        let backtrace = render_backtrace(Backtrace::force_capture());
        self.logger.error(format_args!(
            "an error occurred in function {name}: {error}\n{backtrace}"
        ));
    }

    fn reclaim(&self, name: &str) {
        if self.reclaimer.is_noop() {
            return;
        }

        let reclaimed =
            panic::catch_unwind(AssertUnwindSafe(|| with_caught_panics(|| self.reclaimer.reclaim())));

        match reclaimed {
            Ok(()) => self
                .logger
                .debug(format_args!("memory reclaimed after function {name}")),
            Err(payload) => self.logger.warn(format_args!(
                "memory reclamation after function {name} panicked: {}",
                panic_message(&*payload)
            )),
        }
    }
}

fn render_backtrace(backtrace: Backtrace) -> String {
    match backtrace.status() {
        BacktraceStatus::Captured => backtrace.to_string(),
        _ => "backtrace unavailable on this platform".to_string(),
    }
}

/// Ordinary callable, invoked directly.
#[derive(Debug, Clone)]
pub struct OrdinaryCall<F>(F);

/// Future-returning callable, awaited by the wrapper.
#[derive(Debug, Clone)]
pub struct AwaitableCall<F>(F);

/// A callable wrapped by an [`Instrumentation`].
///
/// `C` is [`OrdinaryCall`] or [`AwaitableCall`], fixed when wrapping; both
/// expose a `call` method with the matching shape.
pub struct Instrumented<C, R> {
    name: Arc<str>,
    call: C,
    instrumentation: Instrumentation<R>,
}

impl<C: Clone, R> Clone for Instrumented<C, R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            call: self.call.clone(),
            instrumentation: self.instrumentation.clone(),
        }
    }
}

impl<C, R> fmt::Debug for Instrumented<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instrumented")
            .field("name", &self.name)
            .field("instrumentation", &self.instrumentation)
            .finish_non_exhaustive()
    }
}

impl<C, R> Instrumented<C, R> {
    /// Name given when the callable was first wrapped.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<F, R> Instrumented<OrdinaryCall<F>, R>
where
    R: FailureReporter,
{
    /// Calls the wrapped function once.
    ///
    /// Panics raised by the function are caught and reported like
    /// unclassified errors, and skip the process panic hook.
    pub fn call<Args, T, E>(&self, args: Args) -> R::Output<T, E>
    where
        F: Fn(Args) -> Result<T, E>,
        E: Classify,
    {
        let start = Instant::now();
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| with_caught_panics(|| (self.call.0)(args))));

        self.instrumentation.settle(&self.name, start, outcome)
    }
}

impl<F, R> Instrumented<AwaitableCall<F>, R>
where
    R: FailureReporter,
{
    /// Calls the wrapped function once and awaits its future.
    ///
    /// Timing starts when the returned future is first polled. The only
    /// suspension point is the inner future.
    pub async fn call<Args, Fut, T, E>(&self, args: Args) -> R::Output<T, E>
    where
        F: Fn(Args) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify,
    {
        let start = Instant::now();
        let built =
            panic::catch_unwind(AssertUnwindSafe(|| with_caught_panics(|| (self.call.0)(args))));
        let outcome = match built {
            Ok(future) => {
                let mut future = pin!(future);
                let polled = poll_fn(|cx| with_caught_panics(|| future.as_mut().poll(cx)));

                AssertUnwindSafe(polled).catch_unwind().await
            }
            Err(payload) => Err(payload),
        };

        self.instrumentation.settle(&self.name, start, outcome)
    }
}
