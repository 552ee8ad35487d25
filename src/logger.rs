//! Diagnostic pub-sub logger for application code.
//!
//! A [`Logger`] formats one line per call and fans it out to any number of
//! file sinks and named subscriber channels. It is a utility offered to
//! handlers and plugins; routing never depends on it. Structured framework
//! logs go through `tracing` instead.
//!
//! # Delivery
//!
//! ```text
//! logger.info("…")
//!     → format "2026/10/18 09:30:00 INFO: …"
//!     → every file sink, in registration order   (write errors returned)
//!     → every subscriber, try_send               (full → line dropped)
//! ```
//!
//! Subscriber channels are bounded and never waited on. A subscriber that
//! stops draining loses lines; it cannot stall the caller, the other
//! subscribers, or the file sinks. Disconnected subscribers are pruned.

use std::collections::HashMap;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Local;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::debug;

use crate::error::Error;

/// Lines buffered per subscriber before new lines are dropped.
const DEFAULT_BUFFER: usize = 256;

/// Severity tag written in front of the message.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info  => "INFO",
            Self::Warn  => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Sink = Box<dyn Write + Send>;

/// Fan-out logger. Cheap to share behind an `Arc`; every method takes `&self`.
///
/// ```rust
/// use plait::Logger;
///
/// let logger = Logger::new();
/// let lines = logger.add_subscriber("ui");
/// logger.info("cache warmed").unwrap();
/// assert!(lines.try_recv().unwrap().ends_with("INFO: cache warmed"));
/// ```
pub struct Logger {
    files: Mutex<Vec<Sink>>,
    subscribers: Mutex<HashMap<String, Sender<String>>>,
    buffer: usize,
    dropped: AtomicU64,
}

impl Logger {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_BUFFER)
    }

    /// Logger whose subscriber channels hold up to `buffer` undelivered lines.
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            files: Mutex::new(Vec::new()),
            subscribers: Mutex::new(HashMap::new()),
            buffer,
            dropped: AtomicU64::new(0),
        }
    }

    /// Subscribes under `key`, replacing (and disconnecting) any previous
    /// subscriber with the same key.
    pub fn add_subscriber(&self, key: impl Into<String>) -> Receiver<String> {
        let (tx, rx) = bounded(self.buffer);
        self.subscribers.lock().insert(key.into(), tx);
        rx
    }

    /// Disconnects the subscriber under `key`. Returns whether one existed.
    pub fn remove_subscriber(&self, key: &str) -> bool {
        self.subscribers.lock().remove(key).is_some()
    }

    pub fn add_file(&self, file: impl Write + Send + 'static) {
        self.files.lock().push(Box::new(file));
    }

    /// Opens `path` for appending, creating it if needed, and adds it as a
    /// file sink.
    pub fn add_file_path(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        self.add_file(file);
        Ok(())
    }

    /// Logs without a level tag.
    pub fn print(&self, msg: impl fmt::Display) -> Result<(), Error> {
        self.emit(None, &msg)
    }

    pub fn debug(&self, msg: impl fmt::Display) -> Result<(), Error> {
        self.emit(Some(Level::Debug), &msg)
    }

    pub fn info(&self, msg: impl fmt::Display) -> Result<(), Error> {
        self.emit(Some(Level::Info), &msg)
    }

    pub fn warn(&self, msg: impl fmt::Display) -> Result<(), Error> {
        self.emit(Some(Level::Warn), &msg)
    }

    pub fn error(&self, msg: impl fmt::Display) -> Result<(), Error> {
        self.emit(Some(Level::Error), &msg)
    }

    /// Lines dropped because a subscriber's channel was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Disconnects every subscriber, then flushes and closes every file.
    /// The logger stays usable; later lines simply have nowhere to go.
    pub fn close(&self) -> Result<(), Error> {
        self.subscribers.lock().clear();
        let files = std::mem::take(&mut *self.files.lock());
        let mut first_err = None;
        for mut file in files {
            if let Err(e) = file.flush() {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), |e| Err(e.into()))
    }

    fn emit(&self, level: Option<Level>, msg: &dyn fmt::Display) -> Result<(), Error> {
        let stamp = Local::now().format("%Y/%m/%d %H:%M:%S");
        let line = match level {
            Some(level) => format!("{stamp} {level}: {msg}"),
            None => format!("{stamp}: {msg}"),
        };

        let mut first_err = None;
        for file in self.files.lock().iter_mut() {
            if let Err(e) = writeln!(file, "{line}") {
                first_err.get_or_insert(e);
            }
        }

        self.subscribers.lock().retain(|key, tx| match tx.try_send(line.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(subscriber = %key, "subscriber full, line dropped");
                true
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!(subscriber = %key, "subscriber gone, removing");
                false
            }
        });

        first_err.map_or(Ok(()), |e| Err(e.into()))
    }
}

impl Default for Logger {
    fn default() -> Self { Self::new() }
}

impl Drop for Logger {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, BufRead, BufReader};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    fn message(line: &str) -> &str {
        line.rsplit(':').next().unwrap_or_default().trim()
    }

    /// Sink shared with the test so writes can be inspected.
    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> { Ok(()) }
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
        fn flush(&mut self) -> io::Result<()> { Ok(()) }
    }

    #[test]
    fn every_level_reaches_files_and_subscribers() {
        let logger = Logger::new();
        let sinks: Vec<Shared> = (0..3).map(|_| Shared::default()).collect();
        for sink in &sinks {
            logger.add_file(sink.clone());
        }
        let subs: Vec<_> = (0..3).map(|i| logger.add_subscriber(i.to_string())).collect();

        logger.print("test").unwrap();
        logger.debug("test").unwrap();
        logger.info("test").unwrap();
        logger.warn("test").unwrap();
        logger.error(format_args!("{}", "test")).unwrap();

        for sink in &sinks {
            let text = String::from_utf8(sink.0.lock().clone()).unwrap();
            let lines: Vec<_> = text.lines().collect();
            assert_eq!(lines.len(), 5);
            assert!(lines.iter().all(|line| message(line) == "test"));
            assert!(lines[2].contains(" INFO: "));
        }
        for rx in &subs {
            assert_eq!(rx.try_iter().count(), 5);
        }
    }

    #[test]
    fn stalled_subscriber_does_not_block_others() {
        let logger = Logger::with_buffer(2);
        let _stalled = logger.add_subscriber("stalled");
        let live = logger.add_subscriber("live");
        let sink = Shared::default();
        logger.add_file(sink.clone());

        for i in 0..10 {
            logger.info(i).unwrap();
            assert_eq!(message(&live.try_recv().unwrap()), i.to_string());
        }

        assert_eq!(String::from_utf8(sink.0.lock().clone()).unwrap().lines().count(), 10);
        assert_eq!(logger.dropped(), 8);
    }

    #[test]
    fn disconnected_subscribers_are_pruned() {
        let logger = Logger::new();
        drop(logger.add_subscriber("gone"));

        logger.print("test").unwrap();
        assert!(!logger.remove_subscriber("gone"));
    }

    #[test]
    fn file_error_is_reported_but_delivery_continues() {
        let logger = Logger::new();
        logger.add_file(Broken);
        let sink = Shared::default();
        logger.add_file(sink.clone());
        let rx = logger.add_subscriber("s");

        assert!(matches!(logger.warn("test"), Err(Error::Io(_))));
        assert_eq!(message(&rx.try_recv().unwrap()), "test");
        assert!(!sink.0.lock().is_empty());
    }

    #[test]
    fn add_file_path_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");

        let logger = Logger::new();
        logger.add_file_path(&path).unwrap();
        logger.print("test").unwrap();
        logger.close().unwrap();

        let file = std::fs::File::open(&path).unwrap();
        let last = BufReader::new(file).lines().map_while(Result::ok).last().unwrap();
        assert_eq!(message(&last), "test");
    }

    #[test]
    fn close_disconnects_subscribers() {
        let logger = Logger::new();
        let rx = logger.add_subscriber("s");
        logger.close().unwrap();
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }
}
