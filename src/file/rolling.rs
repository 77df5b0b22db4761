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

use std::fs;
use std::fs::File;
use std::fs::Metadata;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use jiff::Timestamp;
use jiff::Zoned;
use jiff::civil::DateTime;
use jiff::tz::TimeZone;

use crate::Error;
use crate::Trap;
use crate::config::OpeningMode;
use crate::file::clock::Clock;
use crate::file::rotation::Rotation;
use crate::trap::DefaultTrap;

/// A writer for rolling files.
///
/// Each call to [`write_record`](RollingFileWriter::write_record) is all-or-nothing with respect
/// to rotation: the size check, the optional rotation and the append happen in one call, so a
/// record never straddles two files.
#[derive(Debug)]
pub(crate) struct RollingFileWriter {
    state: State,
    // `None` between closing a full file and opening its successor.
    writer: Option<File>,
}

impl Drop for RollingFileWriter {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            let err = err.with_context("action", "flush on drop");
            self.state.trap.trap(&err);
        }
    }
}

impl RollingFileWriter {
    /// Appends one serialized record stamped at `now`, rotating first if needed.
    ///
    /// On error the record is dropped. Nothing is retried, but a failed rollover is attempted
    /// again on the next record.
    pub(crate) fn write_record(&mut self, now: Timestamp, buf: &[u8]) -> Result<(), Error> {
        let now = now.to_zoned(self.state.timezone.clone());

        if self.state.should_rollover_on_date(&now) {
            let next_date_timestamp = self.state.rotation.next_date_timestamp(&now);
            if self.state.current_filesize > 0 {
                let current = self.state.this_date_timestamp.clone();
                self.rotate(&current)?;
            }
            self.state.next_date_timestamp = next_date_timestamp;
        }

        if self.state.should_rollover_on_size(buf.len()) {
            self.rotate(&now)?;
        }

        self.state.this_date_timestamp = now;

        let writer = match &mut self.writer {
            Some(writer) => writer,
            slot @ None => slot.insert(self.state.open_current()?),
        };

        match writer.write_all(buf) {
            Ok(()) => {
                self.state.current_filesize += buf.len();
                Ok(())
            }
            Err(err) => {
                // a partial write may have landed; trust the file over the counter
                if let Ok(metadata) = writer.metadata() {
                    self.state.current_filesize = metadata.len() as usize;
                }
                Err(Error::from_io_error(err)
                    .with_context("file", self.state.current_filename().display()))
            }
        }
    }

    pub(crate) fn flush(&mut self) -> Result<(), Error> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush().map_err(Error::from_io_error),
            None => Ok(()),
        }
    }

    /// Bytes written to the active file, including what it held when opened.
    #[cfg(test)]
    fn current_filesize(&self) -> usize {
        self.state.current_filesize
    }

    fn rotate(&mut self, date: &Zoned) -> Result<(), Error> {
        // close the full file before it is renamed
        if let Some(mut writer) = self.writer.take() {
            if let Err(err) = writer.flush() {
                let err = Error::from_io_error(err).with_context("action", "flush before rotation");
                self.state.trap.trap(&err);
            }
        }

        self.state.archive_current(date)?;
        self.state.current_filesize = 0;
        self.writer = Some(self.state.open_current()?);
        Ok(())
    }
}

/// A builder for configuring [`RollingFileWriter`].
#[derive(Debug)]
pub(crate) struct RollingFileWriterBuilder {
    // required
    basedir: PathBuf,
    filename: String,

    // has default
    opening_mode: OpeningMode,
    rotation: Rotation,
    max_size: Option<NonZeroUsize>,
    max_files: Option<NonZeroUsize>,
    timezone: TimeZone,
    clock: Clock,
    trap: Arc<dyn Trap>,
}

impl RollingFileWriterBuilder {
    /// Creates a new [`RollingFileWriterBuilder`].
    #[must_use]
    pub(crate) fn new(basedir: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            basedir: basedir.into(),
            filename: filename.into(),
            opening_mode: OpeningMode::Append,
            rotation: Rotation::Never,
            max_size: None,
            max_files: None,
            timezone: TimeZone::system(),
            clock: Clock::DefaultClock,
            trap: Arc::new(DefaultTrap::default()),
        }
    }

    /// Set the trap for the rolling file writer.
    #[must_use]
    pub(crate) fn trap(mut self, trap: Arc<dyn Trap>) -> Self {
        self.trap = trap;
        self
    }

    /// Set how an existing active file is treated when first opened.
    #[must_use]
    pub(crate) fn opening_mode(mut self, mode: OpeningMode) -> Self {
        self.opening_mode = mode;
        self
    }

    /// Set the rotation policy.
    #[must_use]
    pub(crate) fn rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set the maximum number of log files to keep.
    #[must_use]
    pub(crate) fn max_log_files(mut self, n: Option<NonZeroUsize>) -> Self {
        self.max_files = n;
        self
    }

    /// Set the maximum size of a log file in bytes.
    #[must_use]
    pub(crate) fn max_file_size(mut self, n: Option<NonZeroUsize>) -> Self {
        self.max_size = n;
        self
    }

    /// Set the timezone that decides period boundaries and archive dates.
    #[must_use]
    pub(crate) fn timezone(mut self, tz: TimeZone) -> Self {
        self.timezone = tz;
        self
    }

    #[must_use]
    pub(crate) fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Builds the [`RollingFileWriter`], opening the active file.
    pub(crate) fn build(self) -> Result<RollingFileWriter, Error> {
        let Self {
            basedir,
            filename,
            opening_mode,
            rotation,
            max_size,
            max_files,
            timezone,
            clock,
            trap,
        } = self;

        if filename.is_empty() {
            return Err(Error::config("filename must not be empty"));
        }

        let (state, writer) = State::new(
            rotation,
            basedir,
            filename,
            opening_mode,
            max_size,
            max_files,
            timezone,
            clock,
            trap,
        )?;

        Ok(RollingFileWriter {
            state,
            writer: Some(writer),
        })
    }
}

#[derive(Debug)]
struct LogFile {
    filepath: PathBuf,
    datetime: DateTime,
    count: usize,
}

// oldest is the least
fn compare_logfile(a: &LogFile, b: &LogFile) -> std::cmp::Ordering {
    match a.datetime.cmp(&b.datetime) {
        std::cmp::Ordering::Equal => {
            let a_rev = usize::MAX - a.count;
            let b_rev = usize::MAX - b.count;
            a_rev.cmp(&b_rev)
        }
        ord => ord,
    }
}

#[derive(Debug)]
struct State {
    log_dir: PathBuf,
    log_filename: String,
    date_format: &'static str,
    rotation: Rotation,
    current_filesize: usize,
    this_date_timestamp: Zoned,
    next_date_timestamp: Option<i64>,
    max_size: Option<NonZeroUsize>,
    max_files: Option<NonZeroUsize>,
    timezone: TimeZone,
    clock: Clock,
    trap: Arc<dyn Trap>,
}

impl State {
    #[allow(clippy::too_many_arguments)]
    fn new(
        rotation: Rotation,
        dir: impl AsRef<Path>,
        log_filename: String,
        opening_mode: OpeningMode,
        max_size: Option<NonZeroUsize>,
        max_files: Option<NonZeroUsize>,
        timezone: TimeZone,
        clock: Clock,
        trap: Arc<dyn Trap>,
    ) -> Result<(Self, File), Error> {
        let now = clock.now().to_zoned(timezone.clone());
        let log_dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&log_dir).map_err(|err| {
            Error::from_io_error(err)
                .with_context("action", "create log directory")
                .with_context("directory", log_dir.display())
        })?;

        let mut state = State {
            log_dir,
            log_filename,
            date_format: rotation.date_format(),
            current_filesize: 0,
            next_date_timestamp: rotation.next_date_timestamp(&now),
            this_date_timestamp: now,
            rotation,
            max_size,
            max_files,
            timezone,
            clock,
            trap,
        };

        let filename = state.current_filename();
        let file = match opening_mode {
            OpeningMode::Truncate => OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&filename),
            OpeningMode::Append => OpenOptions::new()
                .append(true)
                .create(true)
                .open(&filename),
        }
        .map_err(|err| {
            Error::from_io_error(err)
                .with_context("action", "open log file")
                .with_context("file", filename.display())
        })?;

        let metadata = file.metadata().map_err(|err| {
            Error::from_io_error(err)
                .with_context("action", "stat log file")
                .with_context("file", filename.display())
        })?;
        state.resume_from(&metadata);

        Ok((state, file))
    }

    // continue counting an existing active file and keep its period
    fn resume_from(&mut self, metadata: &Metadata) {
        self.current_filesize = metadata.len() as usize;
        if self.current_filesize == 0 {
            return;
        }

        if let Ok(mtime) = metadata.modified() {
            if let Ok(ts) = jiff::Timestamp::try_from(mtime) {
                let mtime = ts.to_zoned(self.timezone.clone());
                self.next_date_timestamp = self.rotation.next_date_timestamp(&mtime);
                self.this_date_timestamp = mtime;
            }
        }
    }

    fn current_filename(&self) -> PathBuf {
        self.log_dir.join(&self.log_filename)
    }

    fn open_current(&self) -> Result<File, Error> {
        let filename = self.current_filename();
        OpenOptions::new()
            .append(true)
            .create(true)
            .open(&filename)
            .map_err(|err| {
                Error::from_io_error(err)
                    .with_context("action", "open log file")
                    .with_context("file", filename.display())
            })
    }

    fn join_date(&self, date: &Zoned, cnt: usize) -> PathBuf {
        let filename = &self.log_filename;
        let filename = match self.rotation {
            Rotation::Never => format!("{filename}.{cnt}"),
            _ => {
                let date = date.strftime(self.date_format);
                format!("{filename}.{date}.{cnt}")
            }
        };
        self.log_dir.join(filename)
    }

    fn list_logfiles(&self) -> Result<Vec<LogFile>, Error> {
        let read_dir = fs::read_dir(&self.log_dir).map_err(|err| {
            Error::from_io_error(err).with_context("log dir", self.log_dir.display())
        })?;

        let files = read_dir
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let filepath = entry.path();

                let metadata = entry.metadata().ok()?;
                // the writer only creates files, not directories or symlinks
                if !metadata.is_file() {
                    return None;
                }

                let filename = entry.file_name();
                // if the filename is not a UTF-8 string, skip it.
                let filename = filename.to_str()?;
                let mut filename = filename.strip_prefix(self.log_filename.as_str())?;

                if filename.is_empty() {
                    // the current log file is the largest
                    return Some(LogFile {
                        filepath,
                        datetime: DateTime::MAX,
                        count: 0,
                    });
                }

                filename = filename.strip_prefix('.')?;

                let datetime = if self.rotation != Rotation::Never {
                    // mandatory datetime part
                    let pos = filename.find('.')?;
                    let datetime = DateTime::strptime(self.date_format, &filename[..pos]).ok()?;
                    filename = &filename[pos + 1..];
                    datetime
                } else {
                    DateTime::MAX
                };

                let count = usize::from_str(filename).ok()?;

                Some(LogFile {
                    filepath,
                    datetime,
                    count,
                })
            })
            .collect::<Vec<_>>();

        Ok(files)
    }

    fn delete_oldest_logs(&self, max_files: usize) -> Result<(), Error> {
        let mut files = self.list_logfiles()?;
        if files.len() < max_files {
            return Ok(());
        }

        // delete files, so that (n-1) files remain, because we will create another log file
        files.sort_by(compare_logfile);
        for file in files.iter().take(files.len() - (max_files - 1)) {
            let filepath = &file.filepath;
            fs::remove_file(filepath).map_err(|err| {
                Error::from_io_error(err).with_context("remove old log", filepath.display())
            })?;
        }

        Ok(())
    }

    /// Renames the active file to the newest archive slot for `date`, shifting older archives.
    fn archive_current(&self, date: &Zoned) -> Result<(), Error> {
        let mut renames = vec![];
        for i in 1..self.max_files.map_or(usize::MAX, |n| n.get()) {
            let filepath = self.join_date(date, i);
            if fs::exists(&filepath).is_ok_and(|ok| ok) {
                let next = self.join_date(date, i + 1);
                renames.push((filepath, next));
            } else {
                break;
            }
        }

        for (old, new) in renames.iter().rev() {
            fs::rename(old, new).map_err(|err| {
                Error::from_io_error(err).with_context("rotate log", old.display())
            })?
        }

        let archive_filepath = self.join_date(date, 1);
        let current_filepath = self.current_filename();
        match fs::rename(&current_filepath, &archive_filepath) {
            Ok(()) => {}
            // a previous rotation archived it but could not open the successor
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(Error::from_io_error(err)
                    .with_context("archive log", current_filepath.display()));
            }
        }

        if let Some(max_files) = self.max_files {
            if let Err(err) = self.delete_oldest_logs(max_files.get()) {
                self.trap.trap(&err);
            }
        }

        Ok(())
    }

    fn should_rollover_on_date(&self, date: &Zoned) -> bool {
        self.next_date_timestamp
            .is_some_and(|ts| date.timestamp().as_millisecond() >= ts)
    }

    // never rotate an empty file, even for a record larger than the limit
    fn should_rollover_on_size(&self, incoming: usize) -> bool {
        self.max_size.is_some_and(|n| {
            self.current_filesize > 0 && self.current_filesize.saturating_add(incoming) > n.get()
        })
    }
}
