use std::str::FromStr;

use log::LevelFilter;
use log4rs::Config;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;

use crate::MrpError;

// ISO 8601 timestamp and color coded level tag
const LOG_PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%SZ)} {h({l})} {t} - {m}{n}";

pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Warn;

/// Parses a `log_level` value from the run document. Unknown names fall back
/// to [`DEFAULT_LOG_LEVEL`].
pub fn parse_level(name: &str) -> LevelFilter {
    LevelFilter::from_str(name.trim()).unwrap_or(DEFAULT_LOG_LEVEL)
}

/// Installs the global logger. Messages go to stderr because stdout carries
/// model output when no output directory is configured.
pub fn init_logging(level: LevelFilter) -> Result<(), MrpError> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))
        .map_err(|e| MrpError::Logging(e.to_string()))?;
    log4rs::init_config(config).map_err(|e| MrpError::Logging(e.to_string()))?;
    Ok(())
}
