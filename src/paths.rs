use std::path::PathBuf;

const APP_DIR: &str = "overgoals";

/// Base directory for the fixture database and model artifacts.
/// `OVERGOALS_DB_PATH` / `OVERGOALS_MODELS_DIR` override the individual paths.
pub fn app_cache_dir() -> Option<PathBuf> {
    // Prefer XDG cache.
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(APP_DIR));
        }
    }
    // Fallback to ~/.cache on linux-like systems.
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(APP_DIR))
}

pub fn default_db_path() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var("OVERGOALS_DB_PATH") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    app_cache_dir().map(|dir| dir.join("fixtures.sqlite"))
}

pub fn default_models_dir() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var("OVERGOALS_MODELS_DIR") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    app_cache_dir().map(|dir| dir.join("models"))
}
