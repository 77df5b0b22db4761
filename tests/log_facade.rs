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

use jiff::tz::TimeZone;
use rotalog::Config;
use rotalog::Level;
use tempfile::TempDir;

// the global logger can only be installed once per process
#[test]
fn test_log_macros_reach_the_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder(temp_dir.path(), "app.log")
        .level(Level::Info.into())
        .location(true)
        .timezone(TimeZone::UTC)
        .build()
        .unwrap();

    let writer = rotalog::setup(&config).unwrap();
    assert_eq!(log::max_level(), log::LevelFilter::Info);

    log::debug!("hidden");
    let line = line!();
    log::info!("listening on port {}", 8080);
    log::error!(target: rotalog::CRITICAL_TARGET, "out of memory");
    log::logger().flush();

    let content = fs::read_to_string(writer.current_path()).unwrap();
    let lines = content.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 2, "{content}");
    assert!(
        lines[0].ends_with(&format!(
            "[INFO] log_facade log_facade.rs:{} listening on port 8080",
            line + 1
        )),
        "{}",
        lines[0]
    );
    assert!(
        lines[1].ends_with(&format!(
            "[CRITICAL] log_facade log_facade.rs:{} out of memory",
            line + 2
        )),
        "{}",
        lines[1]
    );

    let err = rotalog::setup(&config).unwrap_err();
    assert_eq!(err.kind(), rotalog::ErrorKind::Config);
    writer.shutdown().unwrap();
}
