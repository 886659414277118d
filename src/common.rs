// Licensed under the Apache-2.0 license

//! Crate-wide logging support.
//!
//! Drivers take a [`Logger`] type parameter so that a build without any
//! output channel pays nothing ([`NoOpLogger`]), while a board bring-up
//! build can route messages to a UART through [`WriterLogger`].
//!
//! Loggers are called from interrupt context, so every method takes `&self`.

use core::cell::RefCell;
use core::fmt::{self, Write as _};

use critical_section::Mutex;
use heapless::String;

/// Capacity of the buffer a single log line is formatted into.
pub const LOG_LINE_CAPACITY: usize = 128;

/// Sink for driver diagnostics.
pub trait Logger {
    fn debug(&self, msg: &str);
    fn error(&self, msg: &str);
}

/// Logger that discards everything.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn debug(&self, _msg: &str) {}
    fn error(&self, _msg: &str) {}
}

impl<L: Logger + ?Sized> Logger for &L {
    fn debug(&self, msg: &str) {
        (**self).debug(msg);
    }

    fn error(&self, msg: &str) {
        (**self).error(msg);
    }
}

/// Logger writing one line per message to an [`embedded_io::Write`] sink.
///
/// Lines are terminated with `"\r\n"` so they render on a serial console.
/// Write errors on the sink are dropped; logging must never fail the caller.
pub struct WriterLogger<W> {
    sink: Mutex<RefCell<W>>,
}

impl<W: embedded_io::Write> WriterLogger<W> {
    pub const fn new(sink: W) -> Self {
        Self {
            sink: Mutex::new(RefCell::new(sink)),
        }
    }

    /// Returns the wrapped sink.
    pub fn into_inner(self) -> W {
        self.sink.into_inner().into_inner()
    }

    fn emit(&self, prefix: &str, msg: &str) {
        critical_section::with(|cs| {
            let mut sink = self.sink.borrow_ref_mut(cs);
            let _ = sink.write_all(prefix.as_bytes());
            let _ = sink.write_all(msg.as_bytes());
            let _ = sink.write_all(b"\r\n");
        });
    }
}

impl<W: embedded_io::Write> Logger for WriterLogger<W> {
    fn debug(&self, msg: &str) {
        self.emit("[i2c] ", msg);
    }

    fn error(&self, msg: &str) {
        self.emit("[i2c] error: ", msg);
    }
}

/// Severity used by the formatting helpers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Level {
    Debug,
    Error,
}

/// Formats `args` into a fixed buffer and hands the line to `logger`.
///
/// A formatted piece that would overflow [`LOG_LINE_CAPACITY`] bytes is dropped.
pub fn log_fmt<L: Logger + ?Sized>(logger: &L, level: Level, args: fmt::Arguments<'_>) {
    let mut line: String<LOG_LINE_CAPACITY> = String::new();
    let _ = line.write_fmt(args);
    match level {
        Level::Debug => logger.debug(&line),
        Level::Error => logger.error(&line),
    }
}

/// Formats a debug line onto a [`Logger`].
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $crate::common::log_fmt(&$logger, $crate::common::Level::Debug, format_args!($($arg)*))
    };
}

/// Formats an error line onto a [`Logger`].
#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)*) => {
        $crate::common::log_fmt(&$logger, $crate::common::Level::Error, format_args!($($arg)*))
    };
}
