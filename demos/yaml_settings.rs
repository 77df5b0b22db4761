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
use rotalog::Level;
use rotalog::LogWriter;

fn main() -> Result<(), rotalog::Error> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| concat!(env!("CARGO_MANIFEST_DIR"), "/demos/log_settings.yml").into());
    let writer = LogWriter::from_yaml_file(path)?;
    writer.start()?;

    writer.debug("Hello debug!")?;
    writer.info("Hello info!")?;
    writer.warning("Hello warning!")?;
    writer.error("Hello error!")?;
    writer.critical("Hello critical!")?;

    if let Err(err) = "not a number".parse::<u16>() {
        writer.log_error(Level::Error, "failed to parse port", &err)?;
    }

    for i in 0..200 {
        writer.info(&format!("filling the log, line {i}"))?;
    }

    println!("active log file: {}", writer.current_path().display());
    writer.shutdown()
}
