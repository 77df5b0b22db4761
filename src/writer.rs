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

use std::fmt::Write as _;
use std::fs;
use std::fs::OpenOptions;
use std::io;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use jiff::Timestamp;

use crate::Config;
use crate::Error;
use crate::Level;
use crate::OpeningMode;
use crate::Record;
use crate::Trap;
use crate::file::RollingFileWriter;
use crate::file::RollingFileWriterBuilder;
use crate::file::clock::Clock;
use crate::layout::Layout;
use crate::layout::TextLayout;
use crate::trap::DefaultTrap;

/// A thread-safe writer of leveled log lines into a size-bounded, rotating file.
///
/// Records below the configured level are discarded without touching the file. Accepted records
/// are formatted as one line, encoded and appended under a single lock, so "check the size,
/// rotate if needed, append" never interleaves between threads.
///
/// [`new`](LogWriter::new) makes sure the file can be written. It is then opened with the
/// configured opening mode on the first accepted record, or eagerly with
/// [`start`](LogWriter::start).
///
/// # Examples
///
/// ```
/// use rotalog::Config;
/// use rotalog::LogWriter;
///
/// let dir = tempfile::tempdir().unwrap();
/// let config = Config::builder(dir.path(), "app.log")
///     .size_limit(1024 * 1024)
///     .build()
///     .unwrap();
///
/// let writer = LogWriter::new(&config).unwrap();
/// writer.info("server started").unwrap();
/// writer.debug("not written at the default INFO level").unwrap();
/// writer.shutdown().unwrap();
/// ```
#[derive(Debug)]
pub struct LogWriter {
    config: Config,
    layout: Box<dyn Layout>,
    echo: Option<TextLayout>,
    clock: Clock,
    trap: Arc<dyn Trap>,
    slot: Mutex<FileSlot>,
}

#[derive(Debug, Default)]
struct FileSlot {
    file: Option<RollingFileWriter>,
    // whether the configured opening mode has been applied once
    opened: bool,
}

impl LogWriter {
    /// Create a writer for `config`.
    ///
    /// The log directory is created if missing, and the log file is created if missing, so an
    /// unwritable location is reported here. Existing content is left alone: the configured
    /// opening mode applies on the first accepted record or a call to [`start`](LogWriter::start).
    ///
    /// # Errors
    ///
    /// Return a configuration error if the log directory cannot be created or the log file
    /// cannot be opened for writing.
    pub fn new(config: &Config) -> Result<LogWriter, Error> {
        let directory = config.directory();
        fs::create_dir_all(directory).map_err(|err| {
            Error::config("failed to create log directory")
                .with_context("directory", directory.display())
                .with_source(err)
        })?;
        let path = config.file_path();
        OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|err| {
                Error::config("log file is not writable")
                    .with_context("file", path.display())
                    .with_source(err)
            })?;

        let layout = TextLayout::default()
            .no_color()
            .location(config.location())
            .timezone(config.timezone().clone());
        let echo = config.echo().then(|| {
            TextLayout::default()
                .location(config.location())
                .timezone(config.timezone().clone())
        });

        Ok(LogWriter {
            config: config.clone(),
            layout: Box::new(layout),
            echo,
            clock: Clock::DefaultClock,
            trap: Arc::new(DefaultTrap::default()),
            slot: Mutex::new(FileSlot::default()),
        })
    }

    /// Load `log_settings.yml` from `path` and create a writer for it.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rotalog::LogWriter;
    ///
    /// let writer = LogWriter::from_yaml_file("log_settings.yml").unwrap();
    /// writer.warning("low disk space").unwrap();
    /// ```
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<LogWriter, Error> {
        let config = Config::from_yaml_file(path)?;
        LogWriter::new(&config)
    }

    /// Set the trap that receives errors which cannot be returned, such as failures to prune old
    /// archives or to flush on drop.
    ///
    /// Default to [`DefaultTrap`], which prints to standard error.
    #[must_use]
    pub fn with_trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = Arc::from(trap.into());
        self
    }

    /// Set the layout of lines written to the file.
    ///
    /// Default to a [`TextLayout`] without colors, in the configured time zone, with the call
    /// site when `location` is enabled.
    ///
    /// # Examples
    ///
    /// ```
    /// use rotalog::Config;
    /// use rotalog::LogWriter;
    /// use rotalog::layout::TextLayout;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let config = Config::builder(dir.path(), "app.log").build().unwrap();
    /// let writer = LogWriter::new(&config).unwrap().with_layout(
    ///     TextLayout::default().no_color().timestamp_format(|ts, tz| {
    ///         ts.to_zoned(tz.clone()).strftime("%d/%m/%Y - %H:%M:%S").to_string()
    ///     }),
    /// );
    /// writer.info("server started").unwrap();
    /// ```
    #[must_use]
    pub fn with_layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = layout.into();
        self
    }

    #[cfg(test)]
    pub(crate) fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub(crate) fn trap(&self, err: &Error) {
        self.trap.trap(err);
    }

    /// The configuration this writer was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Path of the active log file.
    pub fn current_path(&self) -> PathBuf {
        self.config.file_path()
    }

    /// Whether a record of `level` would be written.
    pub fn enabled(&self, level: Level) -> bool {
        self.config.level().test(level)
    }

    /// Open the log file now instead of on the first accepted record.
    ///
    /// Calling it on an open writer does nothing.
    pub fn start(&self) -> Result<(), Error> {
        let mut slot = self.lock();
        self.file(&mut slot)?;
        Ok(())
    }

    /// Whether the log file is currently open.
    pub fn is_open(&self) -> bool {
        self.lock().file.is_some()
    }

    /// Append `message` as one line at `level`, if the level passes the filter.
    ///
    /// # Errors
    ///
    /// The record is dropped and an error returned when the line cannot be encoded, or when the
    /// file cannot be opened, rotated or written.
    pub fn log(&self, level: Level, message: &str) -> Result<(), Error> {
        if !self.enabled(level) {
            return Ok(());
        }

        self.append(|now| {
            Record::builder()
                .time(now)
                .level(level)
                .payload(message)
                .build()
        })
    }

    /// Log `message` at [`Level::Debug`].
    pub fn debug(&self, message: &str) -> Result<(), Error> {
        self.log(Level::Debug, message)
    }

    /// Log `message` at [`Level::Info`].
    pub fn info(&self, message: &str) -> Result<(), Error> {
        self.log(Level::Info, message)
    }

    /// Log `message` at [`Level::Warning`].
    pub fn warning(&self, message: &str) -> Result<(), Error> {
        self.log(Level::Warning, message)
    }

    /// Log `message` at [`Level::Error`].
    pub fn error(&self, message: &str) -> Result<(), Error> {
        self.log(Level::Error, message)
    }

    /// Log `message` at [`Level::Critical`].
    pub fn critical(&self, message: &str) -> Result<(), Error> {
        self.log(Level::Critical, message)
    }

    /// Log `message` followed by `err` and each of its sources, separated by `": "`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rotalog::Config;
    /// use rotalog::Level;
    /// use rotalog::LogWriter;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let config = Config::builder(dir.path(), "app.log").build().unwrap();
    /// let writer = LogWriter::new(&config).unwrap();
    ///
    /// let err = "x".parse::<u32>().unwrap_err();
    /// writer.log_error(Level::Error, "bad port", &err).unwrap();
    /// ```
    pub fn log_error(
        &self,
        level: Level,
        message: &str,
        err: &(dyn std::error::Error + 'static),
    ) -> Result<(), Error> {
        if !self.enabled(level) {
            return Ok(());
        }

        let mut text = String::from(message);
        let mut source = Some(err);
        while let Some(err) = source {
            // SAFETY: write to a string always succeeds
            write!(&mut text, ": {err}").unwrap();
            source = err.source();
        }
        self.log(level, &text)
    }

    /// Append a prepared record, if its level passes the filter.
    ///
    /// The record's own timestamp and location are used, and time-based rollover follows that
    /// timestamp.
    pub fn log_record(&self, record: &Record) -> Result<(), Error> {
        if !self.enabled(record.level()) {
            return Ok(());
        }

        self.append(|_| record.clone())
    }

    /// Stamp, format, encode and write one record in a single critical section, so lines in a
    /// file are in time order and each lands in the period it is stamped with.
    pub(crate) fn append<'a>(
        &self,
        make_record: impl FnOnce(Timestamp) -> Record<'a>,
    ) -> Result<(), Error> {
        let record = {
            let mut slot = self.lock();
            let record = make_record(self.now());
            let mut line = self.layout.format(&record)?;
            line.push('\n');
            let bytes = self.config.encoding().encode(&line)?;
            self.file(&mut slot)?.write_record(record.time(), &bytes)?;
            record
        };

        if let Some(echo) = &self.echo {
            self.echo(echo, &record);
        }
        Ok(())
    }

    /// Flush the open log file. Does nothing if the file is closed.
    pub fn flush(&self) -> Result<(), Error> {
        match self.lock().file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }

    /// Flush and close the log file.
    ///
    /// A later record reopens it in append mode, so a truncating opening mode only ever applies
    /// to the first open.
    pub fn shutdown(&self) -> Result<(), Error> {
        let mut slot = self.lock();
        let result = match slot.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        };
        slot.file = None;
        result
    }

    // a panic while holding the lock cannot leave a half-written counter behind
    fn lock(&self) -> MutexGuard<'_, FileSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn file<'a>(&self, slot: &'a mut FileSlot) -> Result<&'a mut RollingFileWriter, Error> {
        let opening_mode = if slot.opened {
            OpeningMode::Append
        } else {
            self.config.opening_mode()
        };

        let file = match &mut slot.file {
            Some(file) => file,
            empty @ None => empty.insert(self.open(opening_mode)?),
        };
        slot.opened = true;
        Ok(file)
    }

    fn open(&self, opening_mode: OpeningMode) -> Result<RollingFileWriter, Error> {
        let config = &self.config;
        RollingFileWriterBuilder::new(config.directory(), config.file_name())
            .opening_mode(opening_mode)
            .rotation(config.rotation())
            .max_file_size(config.size_limit())
            .max_log_files(config.max_files())
            .timezone(config.timezone().clone())
            .clock(self.clock.clone())
            .trap(self.trap.clone())
            .build()
    }

    fn echo(&self, layout: &TextLayout, record: &Record) {
        let result = layout.format(record).and_then(|line| {
            writeln!(io::stdout().lock(), "{line}").map_err(Error::from_io_error)
        });
        if let Err(err) = result {
            self.trap.trap(&err.with_context("action", "echo to stdout"));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;
    use std::str::FromStr;

    use jiff::tz::TimeZone;
    use tempfile::TempDir;

    use super::*;
    use crate::ErrorKind;
    use crate::LevelFilter;
    use crate::Rotation;
    use crate::TextEncoding;
    use crate::file::clock::ManualClock;

    const START: &str = "2024-08-10T00:00:00Z";

    fn writer(config: &Config) -> (LogWriter, ManualClock) {
        let clock = ManualClock::new(Timestamp::from_str(START).unwrap());
        let writer = LogWriter::new(config)
            .unwrap()
            .with_clock(Clock::ManualClock(clock.clone()));
        (writer, clock)
    }

    fn read(path: impl AsRef<Path>) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[derive(Debug, Default, Clone)]
    struct CollectingTrap(Arc<Mutex<Vec<String>>>);

    impl Trap for CollectingTrap {
        fn trap(&self, err: &Error) {
            self.0.lock().unwrap().push(err.to_string());
        }
    }

    #[test]
    fn test_writes_one_line_per_record() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::builder(temp_dir.path(), "app.log")
            .level(Level::Debug.into())
            .timezone(TimeZone::UTC)
            .build()
            .unwrap();
        let (writer, _) = writer(&config);

        writer.debug("connecting").unwrap();
        writer.info("connected").unwrap();
        writer.warning("slow handshake").unwrap();
        writer.error("request failed").unwrap();
        writer.critical("database unreachable").unwrap();
        writer.flush().unwrap();

        insta::assert_snapshot!(read(writer.current_path()).trim_end(), @r"
        2024-08-10T00:00:00.000000+00:00 [DEBUG] connecting
        2024-08-10T00:00:00.000000+00:00 [INFO] connected
        2024-08-10T00:00:00.000000+00:00 [WARNING] slow handshake
        2024-08-10T00:00:00.000000+00:00 [ERROR] request failed
        2024-08-10T00:00:00.000000+00:00 [CRITICAL] database unreachable
        ");
    }

    #[test]
    fn test_records_below_level_write_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::builder(temp_dir.path(), "app.log")
            .level(Level::Warning.into())
            .build()
            .unwrap();
        let (writer, _) = writer(&config);

        assert!(!writer.enabled(Level::Info));
        assert!(writer.enabled(Level::Critical));

        writer.debug("hidden").unwrap();
        writer.info("hidden").unwrap();
        // a filtered record does not even open the file
        assert!(!writer.is_open());
        assert_eq!(fs::metadata(writer.current_path()).unwrap().len(), 0);

        writer.start().unwrap();
        writer.info("hidden").unwrap();
        writer.flush().unwrap();
        assert_eq!(fs::metadata(writer.current_path()).unwrap().len(), 0);
    }

    #[test]
    fn test_level_off_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::builder(temp_dir.path(), "app.log")
            .level(LevelFilter::Off)
            .build()
            .unwrap();
        let (writer, _) = writer(&config);

        writer.critical("hidden").unwrap();
        assert!(!writer.is_open());
        assert_eq!(fs::metadata(writer.current_path()).unwrap().len(), 0);
    }

    #[test]
    fn test_custom_layout_shapes_the_file_lines() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::builder(temp_dir.path(), "app.log")
            .timezone(TimeZone::UTC)
            .build()
            .unwrap();
        let (writer, _) = writer(&config);
        let writer = writer.with_layout(TextLayout::default().no_color().timestamp_format(
            |ts, tz| {
                ts.to_zoned(tz.clone())
                    .strftime("%d/%m/%Y - %H:%M:%S")
                    .to_string()
            },
        ));

        writer.warning("disk almost full").unwrap();
        writer.flush().unwrap();
        assert_eq!(
            read(writer.current_path()),
            "10/08/2024 - 00:00:00 [WARNING] disk almost full\n"
        );
    }

    #[test]
    fn test_unwritable_log_file_is_a_config_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("app.log")).unwrap();
        let config = Config::builder(temp_dir.path(), "app.log").build().unwrap();

        let err = LogWriter::new(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_open_failure_after_startup_is_an_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::builder(temp_dir.path(), "app.log").build().unwrap();
        let (writer, _) = writer(&config);

        fs::remove_file(writer.current_path()).unwrap();
        fs::create_dir(writer.current_path()).unwrap();

        let err = writer.info("lost").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(!writer.is_open());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_write_failure_is_an_io_error() {
        let config = Config::builder("/dev", "full").build().unwrap();
        let writer = LogWriter::new(&config).unwrap();

        let err = writer.info("no space").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        // the writer stays usable and keeps reporting the failure
        let err = writer.info("still no space").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(writer.is_open());
        writer.shutdown().unwrap();
    }

    #[test]
    fn test_rotation_happens_before_the_crossing_write() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::builder(temp_dir.path(), "log")
            .size_limit(350)
            .timezone(TimeZone::UTC)
            .build()
            .unwrap();
        let (writer, _) = writer(&config);

        // 32 bytes of timestamp, " [INFO] ", 59 bytes of message and a newline
        let message = "m".repeat(59);
        for _ in 0..5 {
            writer.info(&message).unwrap();
        }
        writer.flush().unwrap();

        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 2);
        assert_eq!(fs::metadata(temp_dir.path().join("log.1")).unwrap().len(), 300);
        assert_eq!(fs::metadata(temp_dir.path().join("log")).unwrap().len(), 200);
    }

    #[test]
    fn test_encoded_lines_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let encoding = TextEncoding::from_str("iso-8859-1").unwrap();
        let config = Config::builder(temp_dir.path(), "app.log")
            .encoding(encoding)
            .timezone(TimeZone::UTC)
            .build()
            .unwrap();
        let (writer, _) = writer(&config);

        writer.info("café crème à la carte").unwrap();
        writer.flush().unwrap();

        let bytes = fs::read(writer.current_path()).unwrap();
        assert!(bytes.contains(&0xe9));
        assert_eq!(
            encoding.decode(&bytes).unwrap(),
            "2024-08-10T00:00:00.000000+00:00 [INFO] café crème à la carte\n"
        );
    }

    #[test]
    fn test_unencodable_record_is_dropped() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::builder(temp_dir.path(), "app.log")
            .encoding(TextEncoding::from_str("iso-8859-1").unwrap())
            .build()
            .unwrap();
        let (writer, _) = writer(&config);
        writer.start().unwrap();

        let err = writer.info("build ✓").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
        writer.flush().unwrap();
        assert_eq!(fs::metadata(writer.current_path()).unwrap().len(), 0);
    }

    #[test]
    fn test_log_error_appends_the_source_chain() {
        #[derive(Debug)]
        struct UploadError(io::Error);

        impl fmt::Display for UploadError {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("request failed")
            }
        }

        impl std::error::Error for UploadError {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                Some(&self.0)
            }
        }

        let temp_dir = TempDir::new().unwrap();
        let config = Config::builder(temp_dir.path(), "app.log")
            .timezone(TimeZone::UTC)
            .build()
            .unwrap();
        let (writer, _) = writer(&config);

        let err = UploadError(io::Error::other("disk full"));
        writer.log_error(Level::Error, "upload", &err).unwrap();
        writer.log_error(Level::Debug, "hidden", &err).unwrap();
        writer.flush().unwrap();

        assert_eq!(
            read(writer.current_path()),
            "2024-08-10T00:00:00.000000+00:00 [ERROR] upload: request failed: disk full\n"
        );
    }

    #[test]
    fn test_truncates_only_on_first_open() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("app.log"), "stale\n").unwrap();
        let config = Config::builder(temp_dir.path(), "app.log")
            .opening_mode(OpeningMode::Truncate)
            .timezone(TimeZone::UTC)
            .build()
            .unwrap();
        let (writer, _) = writer(&config);

        // nothing happens to the file before it is opened
        assert_eq!(read(writer.current_path()), "stale\n");

        writer.info("one").unwrap();
        writer.shutdown().unwrap();
        assert!(!writer.is_open());

        writer.info("two").unwrap();
        writer.shutdown().unwrap();

        assert_eq!(
            read(writer.current_path()),
            "2024-08-10T00:00:00.000000+00:00 [INFO] one\n\
             2024-08-10T00:00:00.000000+00:00 [INFO] two\n"
        );
    }

    #[test]
    fn test_start_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::builder(temp_dir.path().join("nested"), "app.log")
            .build()
            .unwrap();
        let (writer, _) = writer(&config);
        assert!(temp_dir.path().join("nested").is_dir());

        writer.start().unwrap();
        writer.start().unwrap();
        assert!(writer.is_open());
        assert!(writer.current_path().is_file());
    }

    #[test]
    fn test_daily_rotation_through_the_writer() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::builder(temp_dir.path(), "app.log")
            .rotation(Rotation::Daily)
            .max_files(2)
            .timezone(TimeZone::UTC)
            .build()
            .unwrap();
        let trap = CollectingTrap::default();
        let (writer, clock) = writer(&config);
        let writer = writer.with_trap(trap.clone());

        for day in ["2024-08-10", "2024-08-11", "2024-08-12"] {
            clock.set_now(Timestamp::from_str(&format!("{day}T12:00:00Z")).unwrap());
            writer.info(day).unwrap();
        }
        writer.flush().unwrap();

        let mut names = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect::<Vec<_>>();
        names.sort();
        assert_eq!(names, ["app.log", "app.log.2024-08-11.1"]);
        assert_eq!(
            read(temp_dir.path().join("app.log.2024-08-11.1")),
            "2024-08-11T12:00:00.000000+00:00 [INFO] 2024-08-11\n"
        );
        assert!(trap.0.lock().unwrap().is_empty());
    }
}
