/// Canonical file paths for livewatch data files.
///
/// Everything lives under one data directory (`$LIVEWATCH_HOME`, or the
/// platform data dir joined with `livewatch`):
///   - config.toml               Read by the daemon; created with defaults.
///   - status.toml               Written by the daemon after every round.
///   - logs/livewatch.log        Log file mirror of console output.
///   - stream_logs/              Per-channel event history files.
use std::path::PathBuf;

const APP_DIR_NAME: &str = "livewatch";
pub const HOME_ENV: &str = "LIVEWATCH_HOME";
pub const CONFIG_ENV: &str = "LIVEWATCH_CONFIG";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const STATUS_FILE_NAME: &str = "status.toml";
pub const LOG_DIR_NAME: &str = "logs";
pub const LOG_FILE_NAME: &str = "livewatch.log";
pub const JOURNAL_DIR_NAME: &str = "stream_logs";

/// Returns the livewatch data directory.
/// Falls back to the working directory when the platform has no data dir.
pub fn app_data_dir() -> PathBuf {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(home);
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Returns the config file path, honouring `$LIVEWATCH_CONFIG`.
pub fn config_file_path() -> PathBuf {
    match std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        Some(p) => PathBuf::from(p),
        None => app_data_dir().join(CONFIG_FILE_NAME),
    }
}

pub fn status_file_path() -> PathBuf {
    app_data_dir().join(STATUS_FILE_NAME)
}

pub fn log_file_path() -> PathBuf {
    app_data_dir().join(LOG_DIR_NAME).join(LOG_FILE_NAME)
}

pub fn journal_dir() -> PathBuf {
    app_data_dir().join(JOURNAL_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_file_path_has_correct_name() {
        let path = status_file_path();
        assert_eq!(path.file_name().unwrap(), STATUS_FILE_NAME);
    }

    #[test]
    fn log_file_lives_in_log_dir() {
        let path = log_file_path();
        assert_eq!(path.file_name().unwrap(), LOG_FILE_NAME);
        assert_eq!(path.parent().unwrap().file_name().unwrap(), LOG_DIR_NAME);
    }

    #[test]
    fn status_log_and_journal_share_data_dir() {
        let status = status_file_path();
        let journal = journal_dir();
        let log = log_file_path();
        assert_eq!(status.parent(), journal.parent());
        assert_eq!(status.parent(), log.parent().unwrap().parent());
    }
}
