//! Export settings persistence for mdpress
//!
//! This module handles loading and saving the export settings file in the
//! platform-specific configuration directory, with graceful fallback to
//! defaults when the file is missing or corrupted.

use crate::config::ExportSettings;
use crate::error::{Error, Result, ResultExt};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Application name used for the config directory
const APP_NAME: &str = "mdpress";

/// Configuration file name
const CONFIG_FILE_NAME: &str = "export.json";

/// Backup configuration file name (used during atomic writes)
const CONFIG_BACKUP_NAME: &str = "export.json.bak";

// ─────────────────────────────────────────────────────────────────────────────
// Platform-Specific Directory Resolution
// ─────────────────────────────────────────────────────────────────────────────

/// Get the platform-specific configuration directory for the library.
///
/// - **Windows**: `%APPDATA%\mdpress\`
/// - **macOS**: `~/Library/Application Support/mdpress/`
/// - **Linux**: `~/.config/mdpress/`
///
/// # Errors
///
/// Returns `Error::ConfigDirNotFound` if the config directory cannot be determined
/// (e.g., if the HOME environment variable is not set).
pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|base| base.join(APP_NAME))
        .ok_or(Error::ConfigDirNotFound)
}

/// Get the full path to the configuration file.
pub fn get_config_file_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE_NAME))
}

// ─────────────────────────────────────────────────────────────────────────────
// Load Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Load export settings from the default config file location.
///
/// Missing, empty or corrupted files fall back to defaults; a corrupted file
/// is reported with a warning.
pub fn load_config() -> ExportSettings {
    get_config_dir()
        .and_then(|dir| load_config_from(&dir))
        .unwrap_or_warn_default(ExportSettings::default(), "Failed to load export settings")
}

/// Load and sanitize export settings from `config_dir`.
///
/// # Errors
///
/// - `Error::ConfigLoad`: The file exists but could not be read
/// - `Error::ConfigParse`: The file is not valid settings JSON
pub fn load_config_from(config_dir: &Path) -> Result<ExportSettings> {
    let config_path = config_dir.join(CONFIG_FILE_NAME);

    if !config_path.exists() {
        debug!(
            "Config file not found at {}, using defaults",
            config_path.display()
        );
        return Ok(ExportSettings::default());
    }

    debug!("Loading config from: {}", config_path.display());

    let contents = fs::read_to_string(&config_path).map_err(|e| Error::ConfigLoad {
        path: config_path.clone(),
        source: Box::new(e),
    })?;

    if contents.trim().is_empty() {
        debug!("Config file is empty, using defaults");
        return Ok(ExportSettings::default());
    }

    let settings = ExportSettings::from_json_sanitized(&contents).map_err(|e| {
        warn!(
            "Config file at {} contains invalid JSON: {}",
            config_path.display(),
            e
        );
        Error::ConfigParse(e)
    })?;

    info!(
        "Export settings loaded successfully from {}",
        config_path.display()
    );
    Ok(settings)
}

// ─────────────────────────────────────────────────────────────────────────────
// Save Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Save export settings to the default config file location.
pub fn save_config(settings: &ExportSettings) -> Result<()> {
    save_config_to(&get_config_dir()?, settings)
}

/// Save export settings into `config_dir`, creating it if necessary.
///
/// Writes a backup file first and renames it over the real file so a crash
/// mid-write never leaves a truncated config behind.
///
/// # Errors
///
/// Returns `Error::ConfigSave` if the directory or file cannot be written.
pub fn save_config_to(config_dir: &Path, settings: &ExportSettings) -> Result<()> {
    if !config_dir.exists() {
        debug!("Creating config directory: {}", config_dir.display());
        fs::create_dir_all(config_dir).map_err(|e| Error::ConfigSave {
            path: config_dir.to_path_buf(),
            source: Box::new(e),
        })?;
    }

    let config_path = config_dir.join(CONFIG_FILE_NAME);
    let backup_path = config_dir.join(CONFIG_BACKUP_NAME);

    debug!("Saving config to: {}", config_path.display());

    let json = serde_json::to_string_pretty(settings).map_err(|e| Error::ConfigSave {
        path: config_path.clone(),
        source: Box::new(e),
    })?;

    fs::write(&backup_path, &json).map_err(|e| Error::ConfigSave {
        path: backup_path.clone(),
        source: Box::new(e),
    })?;

    fs::rename(&backup_path, &config_path).map_err(|e| Error::ConfigSave {
        path: config_path.clone(),
        source: Box::new(e),
    })?;

    info!(
        "Export settings saved successfully to {}",
        config_path.display()
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
