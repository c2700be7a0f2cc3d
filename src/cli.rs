use crate::snapshot;
use serde::Serialize;
use serde_json::Value;
use simplelog::LevelFilter;
use std::path::Path;

fn select_log_level_filter(verbosity: i32) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

pub fn init_logging(verbosity: i32) -> Result<(), log::SetLoggerError> {
    simplelog::TermLogger::init(
        select_log_level_filter(verbosity),
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )
}

/// Writes the result of a job to `path`.
///
/// On failure a failure envelope carrying `empty` as its data replaces the
/// snapshot, and the job's error is returned.
pub fn publish<T: Serialize, P: AsRef<Path>>(
    path: P,
    result: crate::Result<T>,
    empty: Value,
) -> crate::Result<()> {
    match result {
        Ok(value) => {
            snapshot::write(path, &value)?;
            Ok(())
        }
        Err(error) => {
            log::error!("{}", error);

            if let Err(write_error) = snapshot::write_failure(path.as_ref(), &error, empty) {
                log::error!(
                    "Unable to write failure snapshot to {}: {}",
                    path.as_ref().display(),
                    write_error
                );
            }

            Err(error)
        }
    }
}
