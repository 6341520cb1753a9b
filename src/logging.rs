use std::io::stderr;

use anyhow::Result;
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use log::{LevelFilter, Record};

/// Maps the number of `-v` flags to a level.
pub fn level_from_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

/// Logs this crate at `log_level` to stderr. Dependencies are silenced.
pub fn setup_logger(log_level: LevelFilter) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Magenta)
        .trace(Color::BrightBlue);

    let origin = |record: &Record| match (record.file(), record.line()) {
        (Some(path), Some(line)) => format!("{path}:{line}"),
        _ => record.target().to_string(),
    };

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                colors.color(record.level()),
                origin(record),
                message,
            ))
        })
        .level(LevelFilter::Off)
        .level_for(env!("CARGO_PKG_NAME"), log_level)
        .chain(stderr())
        .apply()?;

    Ok(())
}
