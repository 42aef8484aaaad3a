use std::env;
use std::path::PathBuf;

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "WARDEN_CONFIG_DIR";

/// Environment variable naming the active project.
pub const PROJECT_ENV: &str = "WARDEN_PROJECT";

/// Return the user's home directory path.
///
/// Uses HOME on Unix-like systems and USERPROFILE on Windows.
pub fn get_home_dir() -> Result<String, String> {
    if let Ok(home) = env::var("HOME") {
        if !home.is_empty() {
            return Ok(home);
        }
    }

    if let Ok(profile) = env::var("USERPROFILE") {
        if !profile.is_empty() {
            return Ok(profile);
        }
    }

    Err("Home directory not set".to_string())
}

/// `$HOME/.config/warden`.
pub fn default_config_dir() -> Result<PathBuf, String> {
    get_home_dir().map(|home| PathBuf::from(home).join(".config").join("warden"))
}

/// Pick the config dir: explicit value, then `WARDEN_CONFIG_DIR`, then the default.
pub fn resolve_config_dir(explicit: Option<PathBuf>) -> Result<PathBuf, String> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    match env::var(CONFIG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => default_config_dir(),
    }
}

/// Pick the active project: explicit value, then `WARDEN_PROJECT`.
///
/// Blank names count as "no project".
pub fn resolve_project(explicit: Option<String>) -> Option<String> {
    explicit
        .or_else(|| env::var(PROJECT_ENV).ok())
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
}
