//! Logger installation for the command line binaries
//!
//! Library code only uses the `log` facade, binaries call [`setup_logger`]
//! once at startup with the options parsed from the command line.

use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{fs, io};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Logger was already initialized")]
    LoggerAlreadySet,
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

pub fn default_logs_datetime_format() -> String {
    String::from("[%Y-%m-%d] (%H:%M:%S%.3f)")
}

// Options of the logger, usually built from the LogConfig of a binary
pub struct LoggerOptions<'a> {
    pub level: LogLevel,
    pub file_level: LogLevel,
    pub logs_path: &'a str,
    pub filename_log: &'a str,
    pub disable_file_logging: bool,
    pub disable_file_log_date_based: bool,
    pub disable_log_color: bool,
    pub datetime_format: &'a str,
}

// Install the global logger: colored terminal output on stderr and an optional log file
pub fn setup_logger(options: LoggerOptions<'_>) -> Result<(), PromptError> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Cyan)
        .trace(Color::Magenta);

    let datetime_format = options.datetime_format.to_owned();
    let disable_log_color = options.disable_log_color;
    let stderr = fern::Dispatch::new()
        .level(options.level.into())
        .format(move |out, message, record| {
            let datetime = chrono::Local::now().format(&datetime_format);
            if disable_log_color {
                out.finish(format_args!(
                    "{} {} {} > {}",
                    datetime,
                    record.level(),
                    record.target(),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "{} {} {} > {}",
                    datetime,
                    colors.color(record.level()),
                    record.target(),
                    message
                ))
            }
        })
        .chain(io::stderr());

    // The global level is the most verbose of both outputs, each one filters its own
    let max_level = LevelFilter::from(options.level).max(options.file_level.into());
    let mut dispatch = fern::Dispatch::new().level(max_level).chain(stderr);

    if !options.disable_file_logging {
        fs::create_dir_all(options.logs_path)?;

        let datetime_format = options.datetime_format.to_owned();
        let file = fern::Dispatch::new()
            .level(options.file_level.into())
            .format(move |out, message, record| {
                out.finish(format_args!(
                    "{} {} {} > {}",
                    chrono::Local::now().format(&datetime_format),
                    record.level(),
                    record.target(),
                    message
                ))
            });

        let file = if options.disable_file_log_date_based {
            let path = format!("{}{}", options.logs_path, options.filename_log);
            file.chain(fern::log_file(path)?)
        } else {
            // Rotated every day: YYYY-MM-DD.<filename>
            file.chain(fern::DateBased::new(
                options.logs_path.to_owned(),
                format!("%Y-%m-%d.{}", options.filename_log),
            ))
        };

        dispatch = dispatch.chain(file);
    }

    dispatch
        .apply()
        .map_err(|_| PromptError::LoggerAlreadySet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(LevelFilter::from(LogLevel::Off), LevelFilter::Off);
        assert_eq!(LevelFilter::from(LogLevel::default()), LevelFilter::Info);
        assert_eq!(LogLevel::Debug.to_string(), "debug");
    }
}
