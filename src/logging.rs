//! Tracing subscriber setup: console output plus an optional timestamped
//! log file.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{PilotError, Result};

const DEFAULT_FILTER: &str = "toolpilot=debug";

/// `<dir>/toolpilot_<YYYYmmdd_HHMMSS>.log`
pub fn log_file_path(dir: &Path, now: DateTime<Local>) -> PathBuf {
    dir.join(format!("toolpilot_{}.log", now.format("%Y%m%d_%H%M%S")))
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the default filter. When `log_dir` is given the
/// directory is created and a second, uncoloured layer writes to a new file
/// in it; the file's path is returned.
pub fn init(log_dir: Option<&Path>) -> Result<Option<PathBuf>> {
    let file = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let path = log_file_path(dir, Local::now());
            let file = File::create(&path)?;
            Some((path, file))
        }
        None => None,
    };

    let (path, file_layer) = match file {
        Some((path, file)) => (
            Some(path),
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| PilotError::Configuration(format!("logging already initialized: {e}")))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn log_file_name_carries_timestamp() {
        let now = Local.with_ymd_and_hms(2025, 3, 14, 9, 5, 7).unwrap();
        let path = log_file_path(Path::new("logs"), now);
        assert_eq!(path, PathBuf::from("logs/toolpilot_20250314_090507.log"));
    }
}
