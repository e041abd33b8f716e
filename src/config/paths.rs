//! XDG base directories for notegen.

use std::path::PathBuf;

use directories::BaseDirs;

const APP_DIR: &str = "notegen";

fn env_dir(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// `$XDG_CONFIG_HOME/notegen`, falling back to the platform config directory.
pub fn config_home() -> Option<PathBuf> {
    env_dir("XDG_CONFIG_HOME")
        .or_else(|| BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf()))
        .map(|base| base.join(APP_DIR))
}

/// `$XDG_DATA_HOME/notegen`, falling back to the platform data directory.
pub fn data_home() -> Option<PathBuf> {
    env_dir("XDG_DATA_HOME")
        .or_else(|| BaseDirs::new().map(|dirs| dirs.data_dir().to_path_buf()))
        .map(|base| base.join(APP_DIR))
}

/// Default location of the sled database holding the active task.
pub fn default_state_path() -> PathBuf {
    data_home()
        .unwrap_or_else(|| PathBuf::from(".notegen"))
        .join("state")
}

/// Default log file.
pub fn default_log_path() -> PathBuf {
    data_home()
        .unwrap_or_else(|| PathBuf::from(".notegen"))
        .join("notegen.log")
}
