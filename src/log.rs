//! Logging initialisation.
//!
//! Library code logs through the `log` facade only; this module wires the
//! facade to `fern` for binaries and integration tests. The level is taken
//! from the `FLEET_DECARB_LOG_LEVEL` environment variable, falling back to
//! `info`.
use anyhow::{Context, Result};
use fern::Dispatch;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

/// Environment variable that selects the log level.
const LOG_LEVEL_ENV_VAR: &str = "FLEET_DECARB_LOG_LEVEL";
/// Level used when the environment does not specify one.
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;

static LOGGER_INITIALISED: OnceLock<()> = OnceLock::new();

fn configured_level() -> Result<LevelFilter> {
    match env::var(LOG_LEVEL_ENV_VAR) {
        Ok(value) => LevelFilter::from_str(&value)
            .with_context(|| format!("Invalid log level '{value}' in {LOG_LEVEL_ENV_VAR}")),
        Err(_) => Ok(DEFAULT_LOG_LEVEL),
    }
}

/// Initialise the logger, optionally teeing output to a file.
///
/// Calling this more than once is a no-op, so tests can initialise freely.
pub fn init(log_file: Option<&Path>) -> Result<()> {
    if LOGGER_INITIALISED.get().is_some() {
        return Ok(());
    }

    let colors = ColoredLevelConfig::new()
        .info(Color::Green)
        .warn(Color::Yellow)
        .error(Color::Red)
        .debug(Color::Blue);

    let mut dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {message}",
                chrono::Local::now().format("%H:%M:%S"),
                colors.color(record.level()),
                record.target(),
            ));
        })
        .level(configured_level()?)
        .chain(std::io::stderr());

    if let Some(file_path) = log_file {
        dispatch = dispatch.chain(
            fern::log_file(file_path)
                .with_context(|| format!("Could not open log file {}", file_path.display()))?,
        );
    }

    dispatch.apply().context("Logger already initialised")?;
    let _ = LOGGER_INITIALISED.set(());
    Ok(())
}
