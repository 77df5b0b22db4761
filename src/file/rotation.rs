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

use std::fmt;
use std::str::FromStr;

use jiff::RoundMode;
use jiff::Span;
use jiff::Unit;
use jiff::Zoned;
use jiff::ZonedRound;

use crate::Error;

/// Defines a fixed period for rolling of a log file.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Default)]
pub enum Rotation {
    /// Minutely Rotation
    Minutely,
    /// Hourly Rotation
    Hourly,
    /// Daily Rotation
    Daily,
    /// No Time Rotation
    #[default]
    Never,
}

impl Rotation {
    /// The boundary, in milliseconds since the Unix epoch, of the period after the one holding
    /// `current_date`. `None` for [`Rotation::Never`].
    pub(crate) fn next_date_timestamp(&self, current_date: &Zoned) -> Option<i64> {
        let (span, unit) = match *self {
            Rotation::Minutely => (Span::new().minutes(1), Unit::Minute),
            Rotation::Hourly => (Span::new().hours(1), Unit::Hour),
            Rotation::Daily => (Span::new().days(1), Unit::Day),
            Rotation::Never => return None,
        };

        let next_date = current_date.checked_add(span).ok()?;
        let rounded = next_date
            .round(ZonedRound::new().smallest(unit).mode(RoundMode::Trunc))
            .ok()?;
        Some(rounded.timestamp().as_millisecond())
    }

    pub(crate) fn date_format(&self) -> &'static str {
        match *self {
            Rotation::Minutely => "%Y-%m-%d-%H-%M",
            Rotation::Hourly => "%Y-%m-%d-%H",
            Rotation::Daily => "%Y-%m-%d",
            Rotation::Never => "%Y-%m-%d",
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rotation::Minutely => f.write_str("minutely"),
            Rotation::Hourly => f.write_str("hourly"),
            Rotation::Daily => f.write_str("daily"),
            Rotation::Never => f.write_str("never"),
        }
    }
}

impl FromStr for Rotation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        for (name, rotation) in [
            ("minutely", Rotation::Minutely),
            ("hourly", Rotation::Hourly),
            ("daily", Rotation::Daily),
            ("never", Rotation::Never),
            ("none", Rotation::Never),
        ] {
            if s.eq_ignore_ascii_case(name) {
                return Ok(rotation);
            }
        }

        Err(Error::config(format!("malformed rotation: {s:?}")))
    }
}
