//! Browser discovery for PDF export
//!
//! Locates a Chromium-family browser binary without starting it. The probe
//! only touches the filesystem, so the UI can call it on every frame.
//!
//! Lookup order:
//! 1. `MDPRESS_BROWSER`, then the configured `browser_path`
//! 2. Platform install locations
//! 3. Executable names on `PATH`

use crate::config::PdfSettings;
use log::debug;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment variable that overrides browser discovery.
pub const BROWSER_ENV_VAR: &str = "MDPRESS_BROWSER";

/// Executable names tried on `PATH`.
#[cfg(windows)]
const EXECUTABLE_NAMES: &[&str] = &["chrome.exe", "msedge.exe", "chromium.exe"];
#[cfg(not(windows))]
const EXECUTABLE_NAMES: &[&str] = &[
    "google-chrome-stable",
    "google-chrome",
    "chromium",
    "chromium-browser",
    "microsoft-edge",
    "microsoft-edge-stable",
    "chrome",
];

/// Conventional install locations for the current platform.
#[cfg(target_os = "macos")]
fn platform_candidates() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = [
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
    ]
    .iter()
    .map(PathBuf::from)
    .collect();

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join("Applications/Google Chrome.app/Contents/MacOS/Google Chrome"));
    }
    paths
}

#[cfg(windows)]
fn platform_candidates() -> Vec<PathBuf> {
    const SUFFIXES: &[&str] = &[
        r"Google\Chrome\Application\chrome.exe",
        r"Microsoft\Edge\Application\msedge.exe",
        r"Chromium\Application\chrome.exe",
    ];

    let roots: Vec<PathBuf> = ["ProgramFiles", "ProgramFiles(x86)", "LOCALAPPDATA"]
        .iter()
        .filter_map(|var| env::var_os(var).map(PathBuf::from))
        .collect();

    roots
        .iter()
        .flat_map(|root| SUFFIXES.iter().map(move |suffix| root.join(suffix)))
        .collect()
}

#[cfg(all(unix, not(target_os = "macos")))]
fn platform_candidates() -> Vec<PathBuf> {
    [
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/opt/google/chrome/chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/usr/bin/microsoft-edge",
        "/opt/microsoft/msedge/msedge",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Probe
// ─────────────────────────────────────────────────────────────────────────────

/// Searches for a compatible browser binary.
///
/// Absence is a normal outcome: [`BrowserProbe::locate`] returns `None`
/// rather than an error.
#[derive(Debug, Clone, Default)]
pub struct BrowserProbe {
    explicit: Vec<PathBuf>,
    candidates: Vec<PathBuf>,
    search_path: Option<OsString>,
}

impl BrowserProbe {
    /// Probe using the environment override, settings and host conventions.
    pub fn from_settings(settings: &PdfSettings) -> Self {
        let mut explicit = Vec::new();
        if let Some(path) = env::var_os(BROWSER_ENV_VAR).filter(|p| !p.is_empty()) {
            explicit.push(PathBuf::from(path));
        }
        if let Some(path) = &settings.browser_path {
            explicit.push(path.clone());
        }

        Self {
            explicit,
            candidates: platform_candidates(),
            search_path: env::var_os("PATH"),
        }
    }

    /// A probe that searches nowhere.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add an explicit override, checked before anything else.
    pub fn with_explicit(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit.push(path.into());
        self
    }

    /// Replace the platform install locations.
    pub fn with_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Replace the `PATH`-style search list.
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Path of the first usable browser binary, if any.
    pub fn locate(&self) -> Option<PathBuf> {
        if let Some(path) = self.explicit.iter().find(|p| is_executable(p)) {
            return Some(path.clone());
        }
        if !self.explicit.is_empty() {
            debug!("Browser override {:?} is not an executable file", self.explicit);
        }

        if let Some(path) = self.candidates.iter().find(|p| is_executable(p)) {
            return Some(path.clone());
        }

        let search_path = self.search_path.as_ref()?;
        env::split_paths(search_path)
            .flat_map(|dir| EXECUTABLE_NAMES.iter().map(move |name| dir.join(name)))
            .find(|p| is_executable(p))
    }

    /// Whether PDF export can be offered.
    pub fn is_available(&self) -> bool {
        self.locate().is_some()
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
