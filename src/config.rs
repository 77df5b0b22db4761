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

//! Logger configuration, loaded from `log_settings.yml`.
//!
//! # Example
//!
//! ```
//! use rotalog::config::LogSettings;
//!
//! let settings = LogSettings::from_yaml_str(
//!     r#"
//! log_level: WARNING
//! directory: logs
//! file_name: app.log
//! size_limit: 1048576
//! opening_method: a+
//! encoding_method: utf-8
//! "#,
//! )
//! .unwrap();
//!
//! let config = settings.into_config().unwrap();
//! assert_eq!(config.size_limit().map(|n| n.get()), Some(1048576));
//! ```

use std::fmt;
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use jiff::tz::TimeZone;
use serde::Deserialize;

use crate::Error;
use crate::Level;
use crate::LevelFilter;
use crate::Rotation;
use crate::TextEncoding;

/// How the active log file is opened at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpeningMode {
    /// Append to an existing file, or create it. Written as `a` or `a+`.
    #[default]
    Append,
    /// Discard the content of an existing file. Written as `w` or `w+`.
    ///
    /// Cannot be combined with any rotation.
    Truncate,
}

impl fmt::Display for OpeningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpeningMode::Append => f.write_str("a+"),
            OpeningMode::Truncate => f.write_str("w+"),
        }
    }
}

impl FromStr for OpeningMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "a" | "a+" | "append" => Ok(OpeningMode::Append),
            "w" | "w+" | "truncate" => Ok(OpeningMode::Truncate),
            other => Err(Error::config(format!(
                "unsupported opening method: {other:?}; expected one of a, a+, w, w+"
            ))),
        }
    }
}

fn default_log_level() -> String {
    Level::Info.to_string()
}

fn default_opening_method() -> String {
    OpeningMode::Append.to_string()
}

fn default_encoding_method() -> String {
    TextEncoding::UTF_8.name().to_string()
}

/// The raw content of a `log_settings.yml` file.
///
/// Values are kept as written; [`into_config`](LogSettings::into_config) validates them.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSettings {
    /// Minimum severity emitted: DEBUG, INFO, WARNING, ERROR, CRITICAL or OFF.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory the log files are created in.
    pub directory: PathBuf,

    /// Base name of the active log file.
    pub file_name: String,

    /// Rotate before a write would push the active file over this many bytes.
    #[serde(default)]
    pub size_limit: Option<usize>,

    /// File-open mode: `a+` appends, `w+` truncates.
    #[serde(default = "default_opening_method")]
    pub opening_method: String,

    /// Text encoding label, e.g. `utf-8` or `iso-8859-1`.
    #[serde(default = "default_encoding_method")]
    pub encoding_method: String,

    /// Time-based rollover: never, minutely, hourly or daily.
    #[serde(default)]
    pub rotation: Option<String>,

    /// Number of files to keep, the active one included.
    #[serde(default)]
    pub max_files: Option<usize>,

    /// IANA time zone for timestamps, e.g. `UTC` or `Europe/Berlin`.
    #[serde(default)]
    pub timezone: Option<String>,

    /// Also print accepted lines to stdout.
    #[serde(default)]
    pub echo: bool,

    /// Include the call site in each line, when known.
    #[serde(default)]
    pub location: bool,
}

impl LogSettings {
    /// Parse settings from YAML text.
    pub fn from_yaml_str(contents: &str) -> Result<Self, Error> {
        serde_yaml::from_str(contents)
            .map_err(|err| Error::config("failed to parse log settings").with_source(err))
    }

    /// Load settings from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|err| {
            Error::config("failed to read log settings")
                .with_context("path", path.display())
                .with_source(err)
        })?;
        Self::from_yaml_str(&contents).map_err(|err| err.with_context("path", path.display()))
    }

    /// Validate the settings into a [`Config`].
    pub fn into_config(self) -> Result<Config, Error> {
        let mut builder = Config::builder(self.directory, self.file_name)
            .level(self.log_level.parse()?)
            .opening_mode(self.opening_method.parse()?)
            .encoding(self.encoding_method.parse()?)
            .echo(self.echo)
            .location(self.location);

        if let Some(n) = self.size_limit {
            builder = builder.size_limit(n);
        }
        if let Some(rotation) = self.rotation {
            builder = builder.rotation(rotation.parse()?);
        }
        if let Some(n) = self.max_files {
            builder = builder.max_files(n);
        }
        if let Some(name) = self.timezone {
            builder = builder.timezone(parse_timezone(&name)?);
        }

        builder.build()
    }
}

fn parse_timezone(name: &str) -> Result<TimeZone, Error> {
    let name = name.trim();
    if name.eq_ignore_ascii_case("utc") {
        return Ok(TimeZone::UTC);
    }
    if name.eq_ignore_ascii_case("local") || name.eq_ignore_ascii_case("system") {
        return Ok(TimeZone::system());
    }
    TimeZone::get(name).map_err(|err| {
        Error::config(format!("unknown time zone: {name:?}")).with_source(err)
    })
}

/// A validated, immutable logger configuration.
///
/// Build one with [`Config::builder`], or from YAML with [`Config::from_yaml_file`].
#[derive(Debug, Clone)]
pub struct Config {
    level: LevelFilter,
    directory: PathBuf,
    file_name: String,
    size_limit: Option<NonZeroUsize>,
    opening_mode: OpeningMode,
    encoding: TextEncoding,
    rotation: Rotation,
    max_files: Option<NonZeroUsize>,
    timezone: TimeZone,
    echo: bool,
    location: bool,
}

impl Config {
    /// Create a builder for logs written to `directory/file_name`.
    pub fn builder(directory: impl Into<PathBuf>, file_name: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(directory, file_name)
    }

    /// Load and validate a `log_settings.yml` file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Config, Error> {
        LogSettings::from_yaml_file(path)?.into_config()
    }

    /// Parse and validate YAML settings.
    pub fn from_yaml_str(contents: &str) -> Result<Config, Error> {
        LogSettings::from_yaml_str(contents)?.into_config()
    }

    /// Minimum severity emitted.
    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// Directory the log files live in.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Base name of the active log file.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Path of the active log file.
    pub fn file_path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }

    /// Size-based rotation threshold in bytes, if enabled.
    pub fn size_limit(&self) -> Option<NonZeroUsize> {
        self.size_limit
    }

    /// How the active file is opened at startup.
    pub fn opening_mode(&self) -> OpeningMode {
        self.opening_mode
    }

    /// Encoding of written lines.
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Time-based rotation period.
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Number of files kept, the active one included.
    pub fn max_files(&self) -> Option<NonZeroUsize> {
        self.max_files
    }

    /// Time zone of timestamps and rotation periods.
    pub fn timezone(&self) -> &TimeZone {
        &self.timezone
    }

    /// Whether accepted lines are also printed to stdout.
    pub fn echo(&self) -> bool {
        self.echo
    }

    /// Whether lines include the call site.
    pub fn location(&self) -> bool {
        self.location
    }

    /// Whether any rotation, by size or by time, is enabled.
    pub fn rotates(&self) -> bool {
        self.size_limit.is_some() || self.rotation != Rotation::Never
    }
}

/// A builder for [`Config`].
///
/// # Examples
///
/// ```
/// use rotalog::Config;
/// use rotalog::Level;
///
/// let config = Config::builder("logs", "app.log")
///     .level(Level::Debug.into())
///     .size_limit(10 * 1024 * 1024)
///     .max_files(5)
///     .build()
///     .unwrap();
/// ```
#[must_use = "call `build` to validate the configuration"]
#[derive(Debug)]
pub struct ConfigBuilder {
    // required
    directory: PathBuf,
    file_name: String,

    // has default
    level: LevelFilter,
    size_limit: Option<usize>,
    opening_mode: OpeningMode,
    encoding: TextEncoding,
    rotation: Rotation,
    max_files: Option<usize>,
    timezone: TimeZone,
    echo: bool,
    location: bool,
}

impl ConfigBuilder {
    fn new(directory: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            file_name: file_name.into(),
            level: LevelFilter::AtLeast(Level::Info),
            size_limit: None,
            opening_mode: OpeningMode::Append,
            encoding: TextEncoding::UTF_8,
            rotation: Rotation::Never,
            max_files: None,
            timezone: TimeZone::system(),
            echo: false,
            location: false,
        }
    }

    /// Set the minimum severity. Default to INFO.
    pub fn level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Rotate before a write would push the active file over `n` bytes. Must be positive.
    pub fn size_limit(mut self, n: usize) -> Self {
        self.size_limit = Some(n);
        self
    }

    /// Set the opening mode. Default to [`OpeningMode::Append`].
    pub fn opening_mode(mut self, mode: OpeningMode) -> Self {
        self.opening_mode = mode;
        self
    }

    /// Set the text encoding. Default to UTF-8.
    pub fn encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set the time-based rotation. Default to [`Rotation::Never`].
    pub fn rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Keep at most `n` files, the active one included. Must be positive.
    pub fn max_files(mut self, n: usize) -> Self {
        self.max_files = Some(n);
        self
    }

    /// Set the time zone. Default to the system time zone.
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.timezone = tz;
        self
    }

    /// Also print accepted lines to stdout.
    pub fn echo(mut self, yes: bool) -> Self {
        self.echo = yes;
        self
    }

    /// Include the call site in each line, when known.
    pub fn location(mut self, yes: bool) -> Self {
        self.location = yes;
        self
    }

    /// Validate and build the [`Config`].
    ///
    /// Validation never touches the filesystem.
    ///
    /// # Errors
    ///
    /// Return a configuration error if either:
    ///
    /// * `file_name` is empty, `.` or `..`, or contains a path separator.
    /// * `size_limit` or `max_files` is zero.
    /// * A truncating opening mode is combined with size or time rotation.
    pub fn build(self) -> Result<Config, Error> {
        let ConfigBuilder {
            directory,
            file_name,
            level,
            size_limit,
            opening_mode,
            encoding,
            rotation,
            max_files,
            timezone,
            echo,
            location,
        } = self;

        if file_name.is_empty() || file_name == "." || file_name == ".." {
            return Err(Error::config("file_name must name a file"));
        }
        if file_name.contains(['/', '\\']) {
            return Err(Error::config("file_name must not contain a path separator")
                .with_context("file_name", &file_name));
        }

        let size_limit = match size_limit {
            None => None,
            Some(n) => Some(
                NonZeroUsize::new(n)
                    .ok_or_else(|| Error::config("size_limit must be greater than 0"))?,
            ),
        };
        let max_files = match max_files {
            None => None,
            Some(n) => Some(
                NonZeroUsize::new(n)
                    .ok_or_else(|| Error::config("max_files must be greater than 0"))?,
            ),
        };

        let config = Config {
            level,
            directory,
            file_name,
            size_limit,
            opening_mode,
            encoding,
            rotation,
            max_files,
            timezone,
            echo,
            location,
        };

        if config.opening_mode == OpeningMode::Truncate && config.rotates() {
            return Err(
                Error::config("a truncating opening method cannot be combined with rotation")
                    .with_context("opening_method", config.opening_mode)
                    .with_context("rotation", config.rotation)
                    .with_context(
                        "size_limit",
                        config.size_limit.map_or(0, NonZeroUsize::get),
                    ),
            );
        }

        Ok(config)
    }
}
