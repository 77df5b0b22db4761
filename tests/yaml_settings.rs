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
use std::path::Path;

use rotalog::ErrorKind;
use rotalog::LogWriter;
use tempfile::TempDir;

// "<32-byte timestamp> [LEVEL] <message>\n"
fn line_len(level: &str, message: &str) -> usize {
    32 + 1 + level.len() + 2 + 1 + message.len() + 1
}

fn write_settings(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("log_settings.yml");
    let logs = dir.join("logs");
    fs::write(
        &path,
        format!("directory: {}\ntimezone: UTC\n{body}", logs.display()),
    )
    .unwrap();
    path
}

fn list_dir(dir: &Path) -> Vec<String> {
    let mut names = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect::<Vec<_>>();
    names.sort();
    names
}

#[test]
fn test_rotation_from_yaml_settings() {
    let temp_dir = TempDir::new().unwrap();
    let message = "payment accepted";
    let len = line_len("INFO", message);
    let settings = write_settings(
        temp_dir.path(),
        &format!(
            "log_level: INFO\nfile_name: service.log\nsize_limit: {}\nopening_method: a+\nencoding_method: utf-8\n",
            len * 3 + len / 2
        ),
    );

    let writer = LogWriter::from_yaml_file(&settings).unwrap();
    for _ in 0..5 {
        writer.info(message).unwrap();
        writer.debug("filtered out").unwrap();
    }
    writer.shutdown().unwrap();

    let logs = temp_dir.path().join("logs");
    assert_eq!(list_dir(&logs), ["service.log", "service.log.1"]);
    assert_eq!(
        fs::metadata(logs.join("service.log.1")).unwrap().len() as usize,
        len * 3
    );
    assert_eq!(
        fs::metadata(logs.join("service.log")).unwrap().len() as usize,
        len * 2
    );

    let content = fs::read_to_string(logs.join("service.log")).unwrap();
    for line in content.lines() {
        assert!(line.ends_with(" [INFO] payment accepted"), "{line}");
        assert!(!line.contains("filtered out"));
    }
}

#[test]
fn test_append_mode_continues_existing_file() {
    let temp_dir = TempDir::new().unwrap();
    let settings = write_settings(temp_dir.path(), "file_name: app.log\n");

    let writer = LogWriter::from_yaml_file(&settings).unwrap();
    writer.info("first run").unwrap();
    drop(writer);

    let writer = LogWriter::from_yaml_file(&settings).unwrap();
    writer.info("second run").unwrap();
    writer.shutdown().unwrap();

    let content = fs::read_to_string(writer.current_path()).unwrap();
    assert_eq!(content.lines().count(), 2);
    assert!(content.contains("first run"));
    assert!(content.contains("second run"));
}

#[test]
fn test_max_files_bounds_the_directory() {
    let temp_dir = TempDir::new().unwrap();
    let settings = write_settings(
        temp_dir.path(),
        "log_level: DEBUG\nfile_name: app.log\nsize_limit: 200\nmax_files: 4\n",
    );

    let writer = LogWriter::from_yaml_file(&settings).unwrap();
    for i in 0..100 {
        writer.debug(&format!("event number {i:04}")).unwrap();
    }
    writer.shutdown().unwrap();

    let logs = temp_dir.path().join("logs");
    assert_eq!(
        list_dir(&logs),
        ["app.log", "app.log.1", "app.log.2", "app.log.3"]
    );
    for name in list_dir(&logs) {
        assert!(fs::metadata(logs.join(&name)).unwrap().len() <= 200, "{name}");
    }

    // the newest record is in the active file
    let content = fs::read_to_string(logs.join("app.log")).unwrap();
    assert!(content.ends_with("event number 0099\n"), "{content}");
}

#[test]
fn test_truncate_with_rotation_touches_no_files() {
    let temp_dir = TempDir::new().unwrap();
    let settings = write_settings(
        temp_dir.path(),
        "file_name: app.log\nsize_limit: 1024\nopening_method: w+\n",
    );

    let err = LogWriter::from_yaml_file(&settings).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert!(!temp_dir.path().join("logs").exists());
}

#[test]
fn test_invalid_settings_are_config_errors() {
    let temp_dir = TempDir::new().unwrap();
    for body in [
        "file_name: app.log\nlog_level: LOUD\n",
        "file_name: app.log\nbackup_count: 3\n",
        "file_name: app.log\nencoding_method: utf-16\n",
        "file_name: app.log\nopening_method: r\n",
    ] {
        let settings = write_settings(temp_dir.path(), body);
        let err = LogWriter::from_yaml_file(&settings).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config, "{body:?}: {err}");
    }

    let err = LogWriter::from_yaml_file(temp_dir.path().join("missing.yml")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn test_unwritable_directory_fails_at_startup() {
    let temp_dir = TempDir::new().unwrap();
    // a regular file where the log directory should be
    let blocker = temp_dir.path().join("logs");
    fs::write(&blocker, "").unwrap();
    let settings = write_settings(temp_dir.path(), "file_name: app.log\n");

    let err = LogWriter::from_yaml_file(&settings).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}
