//! Asynchronous delivery worker
//!
//! [`AsyncHandler`] turns any [`CoreSink`] into a thread-safe [`Handler`]. Each
//! handler owns a bounded mailbox and one dedicated thread that drains it in
//! submission order; that thread is the only code touching the sink.
//!
//! - `output` enqueues and returns. When the mailbox is full the caller blocks
//!   until space frees up; nothing is dropped at submission time.
//! - `flush` and `close` travel through the same mailbox and wait for an
//!   acknowledgement, so everything submitted before them has been applied
//!   when they return.
//! - Every request runs inside a failure boundary. Sink errors and panics are
//!   reported on the diagnostic channel and the worker moves on.
//! - After `failure_budget` consecutive failures the worker switches to
//!   drain-only mode: records are discarded (with a diagnostic) except for one
//!   probe per `probe_interval`; a successful probe restores normal delivery.
//! - When the mailbox stays idle for `idle_flush_interval` the sink is flushed.

use super::diagnostics::Diagnostics;
use super::error::{LoggerError, Result};
use super::formatter::{Formatter, FullFormatter};
use super::handler::{CoreSink, Handler};
use super::level::Level;
use super::metrics::HandlerMetrics;
use super::record::LogRecord;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default mailbox capacity
pub const DEFAULT_CAPACITY: usize = 1000;

/// Flush the sink after the mailbox has been idle this long
pub const DEFAULT_IDLE_FLUSH_INTERVAL: Duration = Duration::from_secs(60);

/// Consecutive failures tolerated before switching to drain-only mode
pub const DEFAULT_FAILURE_BUDGET: u32 = 5;

/// Interval between delivery attempts while in drain-only mode
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(30);

/// Default shutdown timeout for worker cleanup (5 seconds)
///
/// Used when a handler is dropped without being closed first.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

enum Request {
    Output(LogRecord),
    Flush(Sender<()>),
    Close(Sender<()>),
}

#[derive(Debug, Clone)]
struct WorkerSettings {
    idle_flush_interval: Duration,
    failure_budget: u32,
    probe_interval: Duration,
}

pub struct AsyncHandler {
    name: String,
    level: AtomicU8,
    closed: AtomicBool,
    sender: Option<Sender<Request>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    metrics: Arc<HandlerMetrics>,
}

impl AsyncHandler {
    /// Wrap `sink` with default settings.
    pub fn new<S: CoreSink>(sink: S) -> Self {
        Self::builder(sink).build()
    }

    #[must_use]
    pub fn builder<S: CoreSink>(sink: S) -> AsyncHandlerBuilder<S> {
        AsyncHandlerBuilder::new(sink)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &HandlerMetrics {
        &self.metrics
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn submit(&self, request: Request) -> bool {
        let Some(ref sender) = self.sender else {
            return false;
        };

        match sender.try_send(request) {
            Ok(()) => true,
            Err(TrySendError::Full(request)) => {
                self.metrics.record_block();
                sender.send(request).is_ok()
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Send a request carrying an acknowledgement channel and wait for it.
    fn round_trip(&self, make: fn(Sender<()>) -> Request) {
        let (ack_tx, ack_rx) = bounded(1);
        if self.submit(make(ack_tx)) {
            // An error here means the worker is gone; nothing left to wait for.
            let _ = ack_rx.recv();
        }
    }
}

impl Handler for AsyncHandler {
    fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    fn output(&self, record: &LogRecord) {
        if self.is_closed() || !self.level().admits(record.level) {
            return;
        }
        self.submit(Request::Output(record.clone()));
    }

    fn flush(&self) {
        if self.is_closed() {
            return;
        }
        self.round_trip(Request::Flush);
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.round_trip(Request::Close);

        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                eprintln!("[LOGGER ERROR] Worker thread of '{}' panicked", self.name);
            }
        }
    }
}

impl Drop for AsyncHandler {
    fn drop(&mut self) {
        // Disconnecting the mailbox makes the worker close the sink and exit
        drop(self.sender.take());

        if let Some(handle) = self.worker.get_mut().take() {
            let start = Instant::now();
            loop {
                if handle.is_finished() {
                    if let Err(e) = handle.join() {
                        eprintln!(
                            "[LOGGER ERROR] Worker thread of '{}' panicked during shutdown: {:?}",
                            self.name, e
                        );
                    }
                    break;
                }

                if start.elapsed() >= DEFAULT_SHUTDOWN_TIMEOUT {
                    eprintln!(
                        "[LOGGER WARNING] Worker thread of '{}' did not finish within {:?}. \
                         Some logs may be lost.",
                        self.name, DEFAULT_SHUTDOWN_TIMEOUT
                    );
                    break;
                }

                thread::sleep(Duration::from_millis(10));
            }
        }
    }
}

/// Builder for [`AsyncHandler`]
///
/// # Example
/// ```
/// use rust_hierlog::prelude::*;
/// use rust_hierlog::handlers::ConsoleSink;
/// use std::time::Duration;
///
/// let handler = AsyncHandler::builder(ConsoleSink::new())
///     .capacity(4096)
///     .idle_flush_interval(Duration::from_secs(5))
///     .level(Level::Info)
///     .build();
/// handler.close();
/// ```
pub struct AsyncHandlerBuilder<S> {
    sink: S,
    capacity: usize,
    level: Level,
    settings: WorkerSettings,
    diagnostics: Diagnostics,
}

impl<S: CoreSink> AsyncHandlerBuilder<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            capacity: DEFAULT_CAPACITY,
            level: Level::All,
            settings: WorkerSettings {
                idle_flush_interval: DEFAULT_IDLE_FLUSH_INTERVAL,
                failure_budget: DEFAULT_FAILURE_BUDGET,
                probe_interval: DEFAULT_PROBE_INTERVAL,
            },
            diagnostics: Diagnostics::stderr(),
        }
    }

    /// Mailbox capacity. A capacity of zero makes every output a rendezvous
    /// with the worker.
    #[must_use = "builder methods return a new value"]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn idle_flush_interval(mut self, interval: Duration) -> Self {
        self.settings.idle_flush_interval = interval;
        self
    }

    /// Consecutive failures before drain-only mode. Zero disables the mode.
    #[must_use = "builder methods return a new value"]
    pub fn failure_budget(mut self, budget: u32) -> Self {
        self.settings.failure_budget = budget;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn probe_interval(mut self, interval: Duration) -> Self {
        self.settings.probe_interval = interval;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn build(self) -> AsyncHandler {
        let (sender, receiver) = bounded(self.capacity);
        let name = self.sink.name().to_string();
        let metrics = Arc::new(HandlerMetrics::new());

        let worker = Worker {
            sink: self.sink,
            receiver,
            metrics: Arc::clone(&metrics),
            diagnostics: self.diagnostics,
            settings: self.settings,
            consecutive_failures: 0,
            degraded: None,
        };
        let handle = thread::spawn(move || worker.run());

        AsyncHandler {
            name,
            level: AtomicU8::new(self.level as u8),
            closed: AtomicBool::new(false),
            sender: Some(sender),
            worker: Mutex::new(Some(handle)),
            metrics,
        }
    }
}

/// Drain-only bookkeeping
struct Degraded {
    last_probe: Instant,
}

struct Worker<S> {
    sink: S,
    receiver: Receiver<Request>,
    metrics: Arc<HandlerMetrics>,
    diagnostics: Diagnostics,
    settings: WorkerSettings,
    consecutive_failures: u32,
    degraded: Option<Degraded>,
}

impl<S: CoreSink> Worker<S> {
    fn run(mut self) {
        loop {
            let request = match self.receiver.recv_timeout(self.settings.idle_flush_interval) {
                Ok(request) => request,
                Err(RecvTimeoutError::Timeout) => {
                    if self.degraded.is_none() {
                        self.guarded("flush", |sink| sink.flush());
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.guarded("close", |sink| sink.close());
                    return;
                }
            };

            match request {
                Request::Output(record) => self.output(record),
                Request::Flush(ack) => {
                    if self.degraded.is_none() {
                        self.guarded("flush", |sink| sink.flush());
                    }
                    let _ = ack.send(());
                }
                Request::Close(ack) => {
                    self.guarded("close", |sink| sink.close());
                    let _ = ack.send(());
                    return;
                }
            }
        }
    }

    fn output(&mut self, record: LogRecord) {
        if !self.probe_allowed() {
            self.metrics.record_dropped();
            let rendered = FullFormatter::new().format(&record);
            self.diagnostics
                .dropped(false, &String::from_utf8_lossy(&rendered));
            return;
        }

        if self.guarded("output", |sink| sink.output(&record)) {
            self.metrics.record_delivered();
            self.on_success();
        } else {
            self.on_failure();
        }
    }

    /// In drain-only mode, only one record per probe interval goes through.
    fn probe_allowed(&mut self) -> bool {
        let probe_interval = self.settings.probe_interval;
        match self.degraded {
            None => true,
            Some(ref mut degraded) if degraded.last_probe.elapsed() >= probe_interval => {
                degraded.last_probe = Instant::now();
                true
            }
            Some(_) => false,
        }
    }

    /// Run one sink operation inside the failure boundary. Only outputs
    /// count toward the failure budget; the caller decides.
    fn guarded<F>(&mut self, operation: &str, f: F) -> bool
    where
        F: FnOnce(&mut S) -> Result<()>,
    {
        let result = catch_unwind(AssertUnwindSafe(|| f(&mut self.sink)));
        let context = format!("Handler '{}' failed to {}", self.sink.name(), operation);

        match result {
            Ok(Ok(())) => {
                true
            }
            Ok(Err(e)) => {
                self.metrics.record_failed();
                self.diagnostics.error(&context, e);
                false
            }
            Err(panic_info) => {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                self.metrics.record_panic();
                self.metrics.record_failed();
                self.diagnostics.error(
                    &context,
                    LoggerError::worker_panic(self.sink.name(), panic_msg),
                );
                false
            }
        }
    }

    fn on_success(&mut self) {
        self.consecutive_failures = 0;
        if self.degraded.take().is_some() {
            self.diagnostics.warning(&format!(
                "Handler '{}' recovered, resuming delivery",
                self.sink.name()
            ));
        }
    }

    fn on_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let budget = self.settings.failure_budget;
        if budget == 0 || self.consecutive_failures < budget {
            return;
        }
        match self.degraded {
            Some(ref mut degraded) => degraded.last_probe = Instant::now(),
            None => {
                self.degraded = Some(Degraded {
                    last_probe: Instant::now(),
                });
                self.diagnostics.warning(&format!(
                    "Handler '{}' failed {} times in a row; dropping records until it recovers",
                    self.sink.name(),
                    self.consecutive_failures
                ));
            }
        }
    }
}
