// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bridge from the [`log`] crate facade to a [`LogWriter`].

use std::borrow::Cow;
use std::sync::Arc;

use crate::Config;
use crate::Error;
use crate::Level;
use crate::LevelFilter;
use crate::LogWriter;
use crate::Record;

/// The `log` target that maps an `Error` record to [`Level::Critical`].
///
/// ```
/// log::error!(target: rotalog::CRITICAL_TARGET, "database unreachable");
/// ```
pub const CRITICAL_TARGET: &str = "critical";

/// A [`log::Log`] implementation that forwards records to a shared [`LogWriter`].
///
/// Levels map as follows: `Trace` and `Debug` to DEBUG, `Info` to INFO, `Warn` to WARNING and
/// `Error` to ERROR, or to CRITICAL when the target is [`CRITICAL_TARGET`].
///
/// Write errors cannot be returned through the facade, so they go to the writer's trap.
#[derive(Debug, Clone)]
pub struct Logger {
    writer: Arc<LogWriter>,
}

impl Logger {
    /// Create a logger forwarding to `writer`.
    pub fn new(writer: Arc<LogWriter>) -> Self {
        Self { writer }
    }

    /// The writer records are forwarded to.
    pub fn writer(&self) -> &Arc<LogWriter> {
        &self.writer
    }
}

fn level_of(level: log::Level, target: &str) -> Level {
    match level {
        log::Level::Error if target == CRITICAL_TARGET => Level::Critical,
        log::Level::Error => Level::Error,
        log::Level::Warn => Level::Warning,
        log::Level::Info => Level::Info,
        log::Level::Debug | log::Level::Trace => Level::Debug,
    }
}

fn max_level_of(filter: LevelFilter) -> log::LevelFilter {
    match filter.min_level() {
        None => log::LevelFilter::Off,
        Some(Level::Debug) => log::LevelFilter::Trace,
        Some(Level::Info) => log::LevelFilter::Info,
        Some(Level::Warning) => log::LevelFilter::Warn,
        Some(Level::Error) | Some(Level::Critical) => log::LevelFilter::Error,
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.writer
            .enabled(level_of(metadata.level(), metadata.target()))
    }

    fn log(&self, record: &log::Record) {
        let level = level_of(record.level(), record.target());
        if !self.writer.enabled(level) {
            return;
        }

        let payload = match record.args().as_str() {
            Some(s) => Cow::Borrowed(s),
            None => Cow::Owned(record.args().to_string()),
        };
        let result = self.writer.append(|now| {
            Record::builder()
                .time(now)
                .level(level)
                .module_path(record.module_path())
                .file(record.file())
                .line(record.line())
                .payload(payload)
                .build()
        });
        if let Err(err) = result {
            self.writer.trap(&err);
        }
    }

    fn flush(&self) {
        if let Err(err) = self.writer.flush() {
            self.writer.trap(&err);
        }
    }
}

/// Install `writer` as the global `log` crate logger.
///
/// The global maximum level is set from the writer's configured level.
///
/// # Errors
///
/// Return an error if the log crate global logger has already been set.
pub fn try_setup(writer: Arc<LogWriter>) -> Result<(), log::SetLoggerError> {
    let max_level = max_level_of(writer.config().level());
    log::set_boxed_logger(Box::new(Logger::new(writer)))?;
    log::set_max_level(max_level);
    Ok(())
}

/// Create a [`LogWriter`] for `config` and install it as the global `log` crate logger.
///
/// The returned handle can be used to flush or shut down the writer.
///
/// # Errors
///
/// Return a configuration error if the writer cannot be created or the log crate global logger
/// has already been set.
///
/// # Examples
///
/// ```
/// use rotalog::Config;
///
/// let dir = tempfile::tempdir().unwrap();
/// let config = Config::builder(dir.path(), "app.log").build().unwrap();
/// let writer = rotalog::setup(&config).unwrap();
///
/// log::info!("server started");
/// writer.shutdown().unwrap();
/// ```
pub fn setup(config: &Config) -> Result<Arc<LogWriter>, Error> {
    let writer = Arc::new(LogWriter::new(config)?);
    try_setup(writer.clone()).map_err(|err| {
        Error::config("the log crate global logger is already set").with_source(err)
    })?;
    Ok(writer)
}
