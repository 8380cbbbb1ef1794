use log::{error, info, warn, LevelFilter};
use std::path::Path;

// For file-based logging with rotation
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

/// Environment variable overriding the file log level
pub const LOG_ENV: &str = "PHASH_LOG";

/// Initialize a rotating file logger in `log_dir`
///
/// `level` is the default; `PHASH_LOG` overrides it when it parses.
pub fn init_logger(
    log_dir: &Path,
    level: LevelFilter,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(log_dir)?;

    let log_file_path = log_dir.join("phash.log");
    let archived_logs_pattern = format!("{}/phash.{{}}.log", log_dir.display());

    // Rotate at 10MB, keep 5 archives
    let file_trigger = SizeTrigger::new(10 * 1024 * 1024);
    let file_roller = FixedWindowRoller::builder()
        .build(&archived_logs_pattern, 5)
        .map_err(|e| format!("Failed to create log roller: {}", e))?;
    let compound_policy = CompoundPolicy::new(Box::new(file_trigger), Box::new(file_roller));

    let rolling_file = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] [{M}:{L}] - {m}{n}",
        )))
        .build(&log_file_path, Box::new(compound_policy))
        .map_err(|e| format!("Failed to create log appender: {}", e))?;

    let config = Config::builder()
        .appender(Appender::builder().build("file", Box::new(rolling_file)))
        .build(Root::builder().appender("file").build(LevelFilter::Trace))
        .map_err(|e| format!("Failed to build log config: {}", e))?;

    log4rs::init_config(config).map_err(|e| format!("Failed to initialize log4rs: {}", e))?;

    let effective = std::env::var(LOG_ENV)
        .ok()
        .and_then(|filter| filter.parse::<LevelFilter>().ok())
        .unwrap_or(level);
    log::set_max_level(effective);

    info!("Logging to file: {}", log_file_path.display());
    Ok(())
}

/// Log a file check that failed
pub fn log_file_error(path: &Path, operation: &str, error: &dyn std::error::Error) {
    error!(
        "File check failed - Operation: {}, Path: {}, Error: {}",
        operation,
        path.display(),
        error
    );
}

/// Log a failure status reported by a hash engine
pub fn log_engine_failure(engine: &str, operation: &str, status: i32, detail: &str) {
    warn!(
        "Engine call failed - Engine: {}, Operation: {}, Status: {}, Detail: {}",
        engine, operation, status, detail
    );
}
