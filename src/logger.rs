use crate::config::LogConfig;
use crate::utils::{ErrorStr, ResultV};

use std::fmt::Display;
use std::fs::OpenOptions;
use std::str::FromStr;

use simplelog::{ColorChoice, LevelFilter, TerminalMode, TermLogger, WriteLogger};


pub const LOGGER_ERROR: &str = "logger error";

const LOG_CONSOLE: &str = "console";
const LOG_FILE: &str = "file";


pub fn init_logger(cfg: &LogConfig) -> ResultV {
    let level = LevelFilter::from_str(&cfg.level).map_err(|e| {
        eprintln!("Invalid log level `{}`: {}", cfg.level, e);
        LOGGER_ERROR
    })?;

    match cfg.kind.as_str() {
        LOG_CONSOLE => init_term_logger(level),
        LOG_FILE    => init_file_logger(level, &cfg.file),
        _           => {
            eprintln!(
                "Unsupported log type: {}, only `file` and `console` are supported. Use `console` by default",
                cfg.kind
            );
            init_term_logger(level)
        }
    }
}

/// Returns a `map_err` adapter that logs the underlying error and replaces it with `code`.
pub fn get_reporter<E: Display>(module: &'static str, what: &'static str, code: ErrorStr) -> impl Fn(E) -> ErrorStr {
    move |e: E| {
        error!("[{}] {} error: {}", module, what, e);
        code
    }
}


fn prepare_logger_config() -> simplelog::Config {
    let mut builder = simplelog::ConfigBuilder::new();
    builder.set_time_format_custom(
        simplelog::format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
        )
    );
    match builder.set_time_offset_to_local() {
        Ok(b) | Err(b) => b.build(),
    }
}

fn init_term_logger(level: LevelFilter) -> ResultV {
    TermLogger::init(
        level,
        prepare_logger_config(),
        TerminalMode::Stderr, ColorChoice::Auto
    ).map_err(|e| {
        eprintln!("Could not init console logger: {}", e);
        LOGGER_ERROR
    })
}

fn init_file_logger(level: LevelFilter, filename: &str) -> ResultV {
    let file = OpenOptions::new().create(true).append(true).open(filename).map_err(|e| {
        eprintln!("Could not open log file {}: {}", filename, e);
        LOGGER_ERROR
    })?;
    WriteLogger::init(level, prepare_logger_config(), file).map_err(|e| {
        eprintln!("Could not init file logger: {}", e);
        LOGGER_ERROR
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reporter_replaces_error_with_code() {
        let reporter = get_reporter("TEST", "Parse", "parse error");
        let res: Result<u32, ErrorStr> = "x".parse::<u32>().map_err(reporter);
        assert_eq!(res, Err("parse error"));
    }

    #[test]
    fn bad_level_is_rejected_before_any_logger_is_installed() {
        let cfg = LogConfig { kind: LOG_CONSOLE.to_string(), level: "loud".to_string(), file: String::new() };
        assert_eq!(init_logger(&cfg), Err(LOGGER_ERROR));
    }
}
