use std::path::{Path, PathBuf};

/// Environment variable that redirects the config directory (used by tests)
pub const CONFIG_DIR_ENV: &str = "TRACKGPX_CONFIG_DIR";

/// Get the home directory, with fallback to "/"
pub fn get_home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"))
}

/// Get the config directory path (~/.config/trackgpx unless overridden)
pub fn get_config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    get_home_dir().join(".config").join("trackgpx")
}

/// Get the config file path
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.toml")
}

/// Get the session file path (token and cached user, stored next to the config)
pub fn get_session_path() -> PathBuf {
    get_config_dir().join("session.json")
}

/// Get the directory the log file is written to
pub fn get_log_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(get_home_dir)
        .join("trackgpx")
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    get_log_dir().join("trackgpx.log")
}

/// Expand a path string, handling ~ and relative paths
///
/// Relative paths are resolved against the current directory, not home.
pub fn expand_path(path_str: &str) -> PathBuf {
    let home_dir = get_home_dir();

    if let Some(rest) = path_str.strip_prefix("~/") {
        home_dir.join(rest)
    } else if path_str == "~" {
        home_dir
    } else {
        PathBuf::from(path_str)
    }
}

/// Format a path for display (show ~ for home)
pub fn format_path_for_display(path: &Path) -> String {
    let home_dir = get_home_dir();

    if let Ok(relative) = path.strip_prefix(&home_dir) {
        if relative.as_os_str().is_empty() {
            "~".to_string()
        } else {
            format!("~/{}", relative.to_string_lossy())
        }
    } else {
        path.to_string_lossy().to_string()
    }
}
