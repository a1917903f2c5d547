//! log4rs setup.
//!
//! Everything goes to `logs/trend-board.log`. CLI commands additionally log to
//! stderr; the dashboard must not, because the terminal is in raw mode.

use std::fs;

use log::LevelFilter;
use log4rs::{
    append::{console::ConsoleAppender, console::Target, file::FileAppender},
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};

use crate::error::AppError;

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "logs/trend-board.log";
const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} | {l:5.5} | {M} - {m}{n}";

/// Where log records are written besides the log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// File and stderr.
    Console,
    /// File only (terminal UI owns the screen).
    FileOnly,
}

pub fn setup_logging(target: LogTarget) -> Result<(), AppError> {
    fs::create_dir_all(LOG_DIR)
        .map_err(|e| AppError::runtime(format!("Failed to create log directory '{LOG_DIR}': {e}")))?;

    let file = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build(LOG_FILE)
        .map_err(|e| AppError::runtime(format!("Failed to open log file '{LOG_FILE}': {e}")))?;

    let mut config = Config::builder().appender(Appender::builder().build("file", Box::new(file)));
    let mut root = Root::builder().appender("file");

    if target == LogTarget::Console {
        let stderr = ConsoleAppender::builder()
            .target(Target::Stderr)
            .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
            .build();
        config = config.appender(Appender::builder().build("stderr", Box::new(stderr)));
        root = root.appender("stderr");
    }

    let config = config
        .build(root.build(level_from_env()))
        .map_err(|e| AppError::runtime(format!("Invalid logging configuration: {e}")))?;

    log4rs::init_config(config)
        .map_err(|e| AppError::runtime(format!("Failed to initialize logging: {e}")))?;

    Ok(())
}

/// Log level from `TB_LOG` (`error`, `warn`, `info`, `debug`, `trace`, `off`).
fn level_from_env() -> LevelFilter {
    parse_level(std::env::var("TB_LOG").ok().as_deref())
}

fn parse_level(raw: Option<&str>) -> LevelFilter {
    raw.and_then(|s| s.trim().parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_defaults_to_info() {
        assert_eq!(parse_level(None), LevelFilter::Info);
        assert_eq!(parse_level(Some("nonsense")), LevelFilter::Info);
    }

    #[test]
    fn level_is_case_insensitive() {
        assert_eq!(parse_level(Some("DEBUG")), LevelFilter::Debug);
        assert_eq!(parse_level(Some(" warn ")), LevelFilter::Warn);
    }
}
