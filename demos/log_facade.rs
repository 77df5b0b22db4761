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
use rotalog::Config;
use rotalog::Level;

fn main() -> Result<(), rotalog::Error> {
    let config = Config::builder("logs", "facade.log")
        .level(Level::Debug.into())
        .size_limit(1024 * 1024)
        .location(true)
        .echo(true)
        .build()?;
    let writer = rotalog::setup(&config)?;

    log::trace!("Hello trace!");
    log::debug!("Hello debug!");
    log::info!("Hello info!");
    log::warn!("Hello warn!");
    log::error!("Hello error!");
    log::error!(target: rotalog::CRITICAL_TARGET, "Hello critical!");

    writer.shutdown()
}
