// Copyright 2016 Matthew Collins
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

use log::{LevelFilter, Log, Metadata, Record};

const FILTERED_CRATES: &[&str] = &["hyper", "mime", "mio", "reqwest", "rustls", "want"];

/// Prints log records to stdout as `[file:line][LEVEL] message`.
pub struct ConsoleLogger {
    level: LevelFilter,
}

impl ConsoleLogger {
    pub fn new(level: LevelFilter) -> ConsoleLogger {
        ConsoleLogger { level }
    }

    /// Installs the logger for the whole process.
    pub fn init(level: LevelFilter) -> Result<(), log::SetLoggerError> {
        log::set_boxed_logger(Box::new(ConsoleLogger::new(level)))?;
        log::set_max_level(level);
        Ok(())
    }

    fn format(record: &Record) -> Option<String> {
        let target = record.module_path().unwrap_or_else(|| record.target());
        for filtered in FILTERED_CRATES {
            if target.starts_with(filtered) {
                return None;
            }
        }

        let file = record.file().unwrap_or("?").replace('\\', "/");
        let file = match file.rfind("src/") {
            Some(pos) => &file[pos + 4..],
            None => &file[..],
        };
        Some(format!(
            "[{}:{}][{}] {}",
            file,
            record.line().unwrap_or(0),
            record.level(),
            record.args()
        ))
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(line) = Self::format(record) {
            println!("{}", line);
        }
    }

    fn flush(&self) {}
}
