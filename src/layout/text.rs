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

use std::fmt::Write;

#[cfg(feature = "colored")]
use colored::Color;
#[cfg(feature = "colored")]
use colored::Colorize;
use jiff::Timestamp;
use jiff::tz::TimeZone;

use crate::Error;
use crate::layout::Layout;
use crate::record::Level;
use crate::record::Record;

/// A layout that formats log record as text.
///
/// Output format:
///
/// ```text
/// 2024-08-11T22:44:57.172105+08:00 [CRITICAL] database unreachable
/// 2024-08-11T22:44:57.172219+08:00 [ERROR] request failed
/// 2024-08-11T22:44:57.172276+08:00 [WARNING] retrying
/// 2024-08-11T22:44:57.172329+08:00 [INFO] server started
/// 2024-08-11T22:44:57.172382+08:00 [DEBUG] accepted connection
/// ```
///
/// With [`location`](TextLayout::location) enabled, the module path and `file:line` of the call
/// site are inserted before the message when the record carries them:
///
/// ```text
/// 2024-08-11T22:44:57.172105+08:00 [INFO] app::server server.rs:51 server started
/// ```
///
/// Level names are colored when the `colored` feature is enabled, unless
/// [`no_color`](TextLayout::no_color) is set. Layouts used for files never color.
///
/// # Examples
///
/// ```
/// use rotalog::layout::TextLayout;
///
/// let layout = TextLayout::default().no_color();
/// ```
#[derive(Debug, Clone)]
pub struct TextLayout {
    no_color: bool,
    location: bool,
    timezone: TimeZone,
    timestamp_format: Option<fn(Timestamp, &TimeZone) -> String>,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self {
            no_color: false,
            location: false,
            timezone: TimeZone::system(),
            timestamp_format: None,
        }
    }
}

impl TextLayout {
    /// Disable colored output.
    pub fn no_color(mut self) -> Self {
        self.no_color = true;
        self
    }

    /// Include the module path and `file:line` of the call site, when known.
    pub fn location(mut self, yes: bool) -> Self {
        self.location = yes;
        self
    }

    /// Set the timezone for timestamps.
    ///
    /// Defaults to the system timezone if not set.
    ///
    /// # Examples
    ///
    /// ```
    /// use jiff::tz::TimeZone;
    /// use rotalog::layout::TextLayout;
    ///
    /// let layout = TextLayout::default().timezone(TimeZone::UTC);
    /// ```
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.timezone = tz;
        self
    }

    /// Set a user-defined timestamp format function.
    ///
    /// Default to formatting the timestamp with offset as ISO 8601 with microseconds.
    ///
    /// # Examples
    ///
    /// ```
    /// use jiff::Timestamp;
    /// use jiff::tz::TimeZone;
    /// use rotalog::layout::TextLayout;
    ///
    /// let layout =
    ///     TextLayout::default().timestamp_format(|ts, tz| ts.to_zoned(tz.clone()).strftime("%d/%m/%Y - %H:%M:%S").to_string());
    /// ```
    pub fn timestamp_format(mut self, format: fn(Timestamp, &TimeZone) -> String) -> Self {
        self.timestamp_format = Some(format);
        self
    }

    #[cfg(feature = "colored")]
    fn write_level(&self, text: &mut String, level: Level) {
        if self.no_color {
            // SAFETY: write to a string always succeeds
            write!(text, "[{level}]").unwrap();
            return;
        }

        let color = match level {
            Level::Critical => Color::BrightRed,
            Level::Error => Color::Red,
            Level::Warning => Color::Yellow,
            Level::Info => Color::Green,
            Level::Debug => Color::Blue,
        };
        // SAFETY: write to a string always succeeds
        write!(text, "[{}]", level.as_str().color(color)).unwrap();
    }

    #[cfg(not(feature = "colored"))]
    fn write_level(&self, text: &mut String, level: Level) {
        let _ = self.no_color;
        // SAFETY: write to a string always succeeds
        write!(text, "[{level}]").unwrap();
    }
}

fn default_timestamp_format(ts: Timestamp, tz: &TimeZone) -> String {
    let offset = tz.to_offset(ts);
    format!("{:.6}", ts.display_with_offset(offset))
}

impl Layout for TextLayout {
    fn format(&self, record: &Record) -> Result<String, Error> {
        let ts = record.time();
        let mut text = if let Some(format) = self.timestamp_format {
            format(ts, &self.timezone)
        } else {
            default_timestamp_format(ts, &self.timezone)
        };

        text.push(' ');
        self.write_level(&mut text, record.level());

        if self.location {
            if let Some(module) = record.module_path() {
                // SAFETY: write to a string always succeeds
                write!(&mut text, " {module}").unwrap();
            }
            if record.file().is_some() {
                let file = record.filename();
                let line = record.line().unwrap_or_default();
                // SAFETY: write to a string always succeeds
                write!(&mut text, " {file}:{line}").unwrap();
            }
        }

        text.push(' ');
        text.push_str(record.payload());
        Ok(text)
    }
}
