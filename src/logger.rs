//! log4rs initialisation. The library itself only talks to the `log` facade; these helpers
//! are for binaries and tests that want the output somewhere.

use crate::errors::DbError;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::Path;

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const ROLL_SIZE: u64 = 10 * 1024 * 1024;
pub const DEV6_TARGET: &str = "nexusdoc::dev6";

/// Initializes the logging system from the default file `log4rs.yaml` in the working directory.
///
/// # Errors
/// Returns `DbError::Config` if the file is missing or invalid, or a logger is already set.
pub fn init() -> Result<(), DbError> {
    init_path(Path::new("log4rs.yaml"))
}

/// # Errors
/// Returns `DbError::Config` if the file is missing or invalid, or a logger is already set.
pub fn init_path(path: &Path) -> Result<(), DbError> {
    log4rs::init_file(path, log4rs::config::Deserializers::default())
        .map_err(|e| DbError::Config(format!("log config {}: {e}", path.display())))
}

/// Logs to stderr at `level`.
///
/// # Errors
/// Returns `DbError::Config` when a logger is already set.
pub fn init_console(level: LevelFilter) -> Result<(), DbError> {
    let stderr = ConsoleAppender::builder()
        .target(log4rs::append::console::Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))
        .map_err(|e| DbError::Config(e.to_string()))?;
    log4rs::init_config(config).map_err(|e| DbError::Config(e.to_string()))?;
    Ok(())
}

fn rolling(dir: &Path, stem: &str, keep: u32) -> Result<RollingFileAppender, DbError> {
    let pattern = dir.join(format!("{stem}.{{}}.log"));
    let roller = FixedWindowRoller::builder()
        .build(&pattern.display().to_string(), keep)
        .map_err(|e| DbError::Config(e.to_string()))?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(dir.join(format!("{stem}.log")), Box::new(policy))
        .map_err(DbError::from)
}

/// Writes `{dir}/nexusdoc.log`, rolled at 10 MiB keeping `retention` old files. With `dev6`
/// the benchmark lines from `dev6!` also go to `{dir}/dev6.log`.
///
/// # Errors
/// Returns an error if the directory cannot be created or a logger is already set.
pub fn init_rolling(
    dir: &Path,
    level: LevelFilter,
    retention: u32,
    dev6: bool,
) -> Result<(), DbError> {
    std::fs::create_dir_all(dir)?;
    let mut builder =
        Config::builder().appender(Appender::builder().build("app", Box::new(rolling(dir, "nexusdoc", retention)?)));
    builder = if dev6 {
        builder
            .appender(Appender::builder().build("dev6", Box::new(rolling(dir, "dev6", retention)?)))
            .logger(Logger::builder().appender("dev6").additive(false).build(DEV6_TARGET, LevelFilter::Trace))
    } else {
        builder.logger(Logger::builder().additive(false).build(DEV6_TARGET, LevelFilter::Off))
    };
    let config = builder
        .build(Root::builder().appender("app").build(level))
        .map_err(|e| DbError::Config(e.to_string()))?;
    log4rs::init_config(config).map_err(|e| DbError::Config(e.to_string()))?;
    Ok(())
}

/// Unknown names fall back to `Info`.
#[must_use]
pub fn parse_level(name: &str) -> LevelFilter {
    match name.to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Configure logging from environment variables if present:
/// - `NEXUSDOC_LOG_DIR` (without it, logs go to stderr)
/// - `NEXUSDOC_LOG_LEVEL`
/// - `NEXUSDOC_LOG_RETENTION`
/// - `NEXUSDOC_DEV6`
///
/// # Errors
/// Same as [`init_rolling`] and [`init_console`].
pub fn configure_from_env() -> Result<(), DbError> {
    let level = std::env::var("NEXUSDOC_LOG_LEVEL").map_or(LevelFilter::Info, |s| parse_level(&s));
    let Ok(dir) = std::env::var("NEXUSDOC_LOG_DIR") else {
        return init_console(level);
    };
    let retention = std::env::var("NEXUSDOC_LOG_RETENTION")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(7);
    let dev6 = std::env::var("NEXUSDOC_DEV6")
        .is_ok_and(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes"));
    init_rolling(Path::new(&dir), level, retention, dev6)
}
