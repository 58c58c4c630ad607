//! Progress reporting.
//!
//! Bootstrap reports what it is doing to an [`EventSink`]. Sinks observe;
//! nothing they do can change the outcome of a bootstrap.

use std::io::Write;
use std::sync::Mutex;

/// Severity of a bootstrap event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventLevel {
    /// Progress information.
    Info,
    /// A failed attempt that will be retried, or a soft failure.
    Warning,
    /// An error worth investigating.
    Error,
}

impl EventLevel {
    /// Get the label used in listener output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

/// Receiver for bootstrap events.
pub trait EventSink {
    /// Record an event.
    fn emit(&self, level: EventLevel, message: &str);

    /// Record an informational event.
    fn info(&self, message: &str) {
        self.emit(EventLevel::Info, message);
    }

    /// Record a warning.
    fn warn(&self, message: &str) {
        self.emit(EventLevel::Warning, message);
    }

    /// Record an error.
    fn error(&self, message: &str) {
        self.emit(EventLevel::Error, message);
    }
}

impl<T: EventSink + ?Sized> EventSink for &T {
    fn emit(&self, level: EventLevel, message: &str) {
        (**self).emit(level, message);
    }
}

impl<T: EventSink + ?Sized> EventSink for Box<T> {
    fn emit(&self, level: EventLevel, message: &str) {
        (**self).emit(level, message);
    }
}

/// Report to both sinks.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&self, level: EventLevel, message: &str) {
        self.0.emit(level, message);
        self.1.emit(level, message);
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _level: EventLevel, _message: &str) {}
}

/// Forwards events to `tracing`, tagged with the instance name.
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    instance: String,
}

impl TracingSink {
    /// Create a sink for an instance.
    #[must_use]
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }
}

impl EventSink for TracingSink {
    fn emit(&self, level: EventLevel, message: &str) {
        match level {
            EventLevel::Info => tracing::info!(instance = %self.instance, "{message}"),
            EventLevel::Warning => tracing::warn!(instance = %self.instance, "{message}"),
            EventLevel::Error => tracing::error!(instance = %self.instance, "{message}"),
        }
    }
}

/// Writes events as `LEVEL: message` lines, the way a build listener shows them.
///
/// Write failures are ignored.
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: Mutex<W>,
}

impl<W: Write> WriterSink<W> {
    /// Wrap a writer.
    pub const fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Unwrap the writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl<W: Write> EventSink for WriterSink<W> {
    fn emit(&self, level: EventLevel, message: &str) {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let _ = writeln!(writer, "{}: {message}", level.label());
        let _ = writer.flush();
    }
}
