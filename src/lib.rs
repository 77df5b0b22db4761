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

//! Rotalog writes leveled log lines to a size-bounded, rotating file, configured from a
//! `log_settings.yml` file.
//!
//! # Overview
//!
//! A [`LogWriter`] appends one line per accepted record:
//!
//! ```text
//! 2024-08-10T17:12:52.123456+00:00 [WARNING] disk almost full
//! ```
//!
//! Records below the configured level are discarded. When the next line would push the active
//! file over `size_limit` bytes, the file is archived as `<file_name>.1` (older archives shift to
//! `.2`, `.3` and so on) and a fresh file is started. Time-based rollover and a bound on the
//! number of kept files are available too.
//!
//! # Examples
//!
//! Direct use:
//!
//! ```
//! use rotalog::Config;
//! use rotalog::LogWriter;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let config = Config::from_yaml_str(&format!(
//!     r#"
//! log_level: INFO
//! directory: {}
//! file_name: app.log
//! size_limit: 10485760
//! opening_method: a+
//! encoding_method: utf-8
//! "#,
//!     dir.path().display()
//! ))
//! .unwrap();
//!
//! let writer = LogWriter::new(&config).unwrap();
//! writer.info("server started").unwrap();
//! writer.shutdown().unwrap();
//! ```
//!
//! Behind the `log` crate facade:
//!
//! ```
//! use rotalog::Config;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let config = Config::builder(dir.path(), "app.log").build().unwrap();
//! let writer = rotalog::setup(&config).unwrap();
//!
//! log::warn!("low disk space");
//! log::error!(target: rotalog::CRITICAL_TARGET, "database unreachable");
//! writer.shutdown().unwrap();
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod config;
pub mod layout;
pub mod trap;

mod encoding;
mod error;
mod file;
mod logger;
mod record;
mod writer;

pub use self::config::Config;
pub use self::config::ConfigBuilder;
pub use self::config::LogSettings;
pub use self::config::OpeningMode;
pub use self::encoding::TextEncoding;
pub use self::error::Error;
pub use self::error::ErrorKind;
pub use self::file::Rotation;
pub use self::layout::Layout;
pub use self::logger::CRITICAL_TARGET;
pub use self::logger::Logger;
pub use self::logger::setup;
pub use self::logger::try_setup;
pub use self::record::Level;
pub use self::record::LevelFilter;
pub use self::record::Record;
pub use self::record::RecordBuilder;
pub use self::trap::Trap;
pub use self::writer::LogWriter;
