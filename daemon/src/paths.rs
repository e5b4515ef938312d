/// Canonical file paths for Minimizer data files.
///
/// By default both files live under %APPDATA%\Minimizer\:
///   - config.toml     Targets and settings, read at startup.
///   - minimizer.log   Appended to on every run.
///
/// A config file given on the command line keeps its log file next to it.
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "Minimizer";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const LOG_FILE_NAME: &str = "minimizer.log";

/// Returns the Minimizer application data directory: %APPDATA%\Minimizer\
///
/// Falls back to the working directory when %APPDATA% is not set.
pub fn app_data_dir() -> PathBuf {
    std::env::var_os("APPDATA")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Returns the config file path: the first command-line argument if given,
/// otherwise %APPDATA%\Minimizer\config.toml.
pub fn config_file_path(arg: Option<String>) -> PathBuf {
    match arg {
        Some(path) => PathBuf::from(path),
        None => app_data_dir().join(CONFIG_FILE_NAME),
    }
}

/// Returns the log file path that belongs to `config_path`.
pub fn log_file_path(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(dir) => dir.join(LOG_FILE_NAME),
        None => PathBuf::from(LOG_FILE_NAME),
    }
}
