use std::sync::OnceLock;
use std::thread;

use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::config::PROGRAM_LOG_LEVEL;

/// Parsed value of `FLEETLOAD_LOG_LEVEL`.
///
/// Accepts a bare level (`debug`) and/or comma separated `target=level`
/// directives, e.g. `warn,fleetload_engine::pipelined=trace`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSpec {
    default: Level,
    directives: Vec<(String, Level)>,
}

impl Default for LogSpec {
    fn default() -> Self {
        Self {
            default: Level::Warn,
            directives: Vec::new(),
        }
    }
}

fn parse_level(s: &str) -> Option<Level> {
    s.trim()
        .parse::<LevelFilter>()
        .ok()
        .and_then(|filter| filter.to_level())
}

impl LogSpec {
    pub fn parse(raw: &str) -> Self {
        let mut spec = Self::default();

        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.split_once('=') {
                Some((target, level)) => {
                    if let Some(level) = parse_level(level) {
                        spec.directives.push((target.trim().to_string(), level));
                    }
                }
                None => {
                    if let Some(level) = parse_level(part) {
                        spec.default = level;
                    }
                }
            }
        }

        // Longest target first so the most specific directive wins.
        spec.directives
            .sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));
        spec
    }

    pub fn level_for(&self, target: &str) -> Level {
        self.directives
            .iter()
            .find(|(prefix, _)| target.starts_with(prefix.as_str()))
            .map(|(_, level)| *level)
            .unwrap_or(self.default)
    }

    /// Most verbose level any directive can enable.
    pub fn max_level(&self) -> Level {
        self.directives
            .iter()
            .map(|(_, level)| *level)
            .fold(self.default, Ord::max)
    }
}

enum LogTarget {
    Stderr,
}

pub struct Logger {
    spec: LogSpec,
    target: LogTarget,
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.spec.level_for(metadata.target())
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            let current = thread::current();
            let msg = format!(
                "{} {} [{}] ({}) {}",
                timestamp,
                record.level(),
                record.target(),
                current.name().unwrap_or("-"),
                record.args()
            );

            match &self.target {
                LogTarget::Stderr => {
                    eprintln!("{msg}")
                }
            }
        }
    }

    fn flush(&self) {}
}

fn get_spec_from_env() -> LogSpec {
    std::env::var(PROGRAM_LOG_LEVEL)
        .map(|s| LogSpec::parse(&s))
        .unwrap_or_default()
}

pub fn init() -> Result<(), SetLoggerError> {
    _init(get_spec_from_env())
}

pub fn _init(spec: LogSpec) -> Result<(), SetLoggerError> {
    static LOGGER: OnceLock<Logger> = OnceLock::new();

    // Only the first caller installs the logger; later specs are ignored
    // so that max_level never disagrees with the installed spec.
    let init_call = LOGGER.get().is_none();

    let logger = LOGGER.get_or_init(|| Logger {
        spec,
        target: LogTarget::Stderr,
    });

    if init_call {
        log::set_logger(logger)?;
        log::set_max_level(logger.spec.max_level().to_level_filter());
    }

    Ok(())
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
