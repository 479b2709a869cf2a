// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal destinations for log entries.

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;

use devstate_core::Level;
use parking_lot::Mutex;
use syslog::{Facility, Formatter3164};
use thiserror::Error;

use super::ring::LogEntry;

/// Logging method selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMethod {
    None,
    Stderr,
    Syslog,
    File,
}

#[derive(Debug, Error)]
#[error("invalid logging method '{0}'")]
pub struct ParseLogMethodError(String);

impl FromStr for LogMethod {
    type Err = ParseLogMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "stderr" => Ok(Self::Stderr),
            "syslog" => Ok(Self::Syslog),
            "file" => Ok(Self::File),
            other => Err(ParseLogMethodError(other.to_string())),
        }
    }
}

impl fmt::Display for LogMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Stderr => "stderr",
            Self::Syslog => "syslog",
            Self::File => "file",
        })
    }
}

/// Errors opening a sink.
#[derive(Debug, Error)]
pub enum LogOpenError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("syslog error: {0}")]
    Syslog(String),
}

type SyslogLogger = syslog::Logger<syslog::LoggerBackend, Formatter3164>;

enum Sink {
    Null,
    Stderr,
    Syslog(Mutex<SyslogLogger>),
    File(Mutex<File>),
    #[cfg(test)]
    Test(TestSink),
}

/// An opened sink plus the message prefix, shared between the main thread
/// and the logger thread.
pub(crate) struct Output {
    prefix: String,
    sink: Sink,
}

impl Output {
    /// The pre-open default: stderr with the daemon prefix.
    pub fn stderr_default(prefix: &str) -> Self {
        Self { prefix: prefix.to_string(), sink: Sink::Stderr }
    }

    pub fn open(method: LogMethod, prefix: &str, file_path: &Path) -> Result<Self, LogOpenError> {
        let sink = match method {
            LogMethod::None => Sink::Null,
            LogMethod::Stderr => Sink::Stderr,
            LogMethod::Syslog => {
                let formatter = Formatter3164 {
                    facility: Facility::LOG_DAEMON,
                    hostname: None,
                    process: prefix.to_string(),
                    pid: std::process::id(),
                };
                let logger =
                    syslog::unix(formatter).map_err(|e| LogOpenError::Syslog(e.to_string()))?;
                Sink::Syslog(Mutex::new(logger))
            }
            LogMethod::File => {
                let file = File::options().create(true).append(true).open(file_path)?;
                Sink::File(Mutex::new(file))
            }
        };
        Ok(Self { prefix: prefix.to_string(), sink })
    }

    #[cfg(test)]
    pub fn test(sink: TestSink) -> Self {
        Self { prefix: "test".to_string(), sink: Sink::Test(sink) }
    }

    /// Write one entry to the sink.
    pub fn emit(&self, entry: &LogEntry) -> io::Result<()> {
        match &self.sink {
            Sink::Null => Ok(()),
            Sink::Stderr => {
                let mut err = io::stderr().lock();
                writeln!(
                    err,
                    "{} {}: {}: {}(): {}",
                    self.prefix,
                    entry.prio(),
                    entry.file(),
                    entry.func(),
                    entry.text()
                )?;
                err.flush()
            }
            Sink::Syslog(logger) => {
                let text = entry.text().to_string();
                let mut logger = logger.lock();
                let result = match entry.prio() {
                    Level::Emerg => logger.emerg(text),
                    Level::Alert => logger.alert(text),
                    Level::Crit => logger.crit(text),
                    Level::Err => logger.err(text),
                    Level::Warning => logger.warning(text),
                    Level::Notice => logger.notice(text),
                    Level::Info => logger.info(text),
                    Level::Debug => logger.debug(text),
                };
                result.map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
            }
            Sink::File(file) => {
                let mut file = file.lock();
                writeln!(file, "{} {}: {}", self.prefix, entry.prio(), entry.text())?;
                file.flush()
            }
            #[cfg(test)]
            Sink::Test(sink) => sink.emit(entry),
        }
    }

    /// Flush whatever the sink buffers. Called once at close.
    pub fn close(&self) {
        match &self.sink {
            Sink::Stderr => {
                let _ = io::stderr().flush();
            }
            Sink::File(file) => {
                let _ = file.lock().flush();
            }
            _ => {}
        }
    }
}

/// Controllable sink for tests: can be stalled via `gate` and made to fail
/// via `fail`; records `(prio, text)` pairs.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct TestSink {
    pub gate: std::sync::Arc<Mutex<()>>,
    pub out: std::sync::Arc<Mutex<Vec<(Level, String)>>>,
    pub fail: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

#[cfg(test)]
impl TestSink {
    fn emit(&self, entry: &LogEntry) -> io::Result<()> {
        let _stall = self.gate.lock();
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "test sink failure"));
        }
        self.out.lock().push((entry.prio(), entry.text().to_string()));
        Ok(())
    }

    pub fn texts(&self) -> Vec<String> {
        self.out.lock().iter().map(|(_, text)| text.clone()).collect()
    }
}
