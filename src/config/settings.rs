//! Export settings and preferences for mdpress
//!
//! This module defines the `ExportSettings` struct that holds all
//! user-configurable export options, with serde support for JSON persistence.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Theme Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Color theme applied to exported documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

// ─────────────────────────────────────────────────────────────────────────────
// Markdown Options
// ─────────────────────────────────────────────────────────────────────────────

/// Markdown grammar extensions used when converting to HTML.
///
/// Raw HTML in the source is always passed through; it is not optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownOptions {
    /// Enable GitHub Flavored Markdown tables
    pub tables: bool,
    /// Enable strikethrough syntax (~~text~~)
    pub strikethrough: bool,
    /// Enable autolink URLs and emails
    pub autolink: bool,
    /// Enable task lists (- [ ] and - [x])
    pub tasklist: bool,
    /// Enable footnotes
    pub footnotes: bool,
    /// Prefix for generated heading anchors; `None` leaves headings bare
    pub header_ids: Option<String>,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            tables: true,
            strikethrough: true,
            autolink: true,
            tasklist: true,
            footnotes: true,
            header_ids: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Diagram Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Default diagram runtime loaded by exported documents.
pub const DEFAULT_DIAGRAM_RUNTIME_URL: &str =
    "https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.min.js";

/// Which fenced blocks count as diagrams and where their runtime comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramSettings {
    /// Fence language identifiers treated as diagrams (case-insensitive)
    pub languages: Vec<String>,
    /// Script URL referenced by exported documents
    pub runtime_url: String,
    /// Local runtime script; when set its contents are inlined instead of `runtime_url`
    pub runtime_path: Option<PathBuf>,
}

impl Default for DiagramSettings {
    fn default() -> Self {
        Self {
            languages: vec!["mermaid".to_string()],
            runtime_url: DEFAULT_DIAGRAM_RUNTIME_URL.to_string(),
            runtime_path: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PDF Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Headless browser and print options for PDF export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfSettings {
    /// Explicit browser binary; takes priority over discovery
    pub browser_path: Option<PathBuf>,
    /// Run the browser with its sandbox enabled (disable when running as root)
    pub sandbox: bool,
    /// Maximum time for browser startup and page navigation
    pub launch_timeout_secs: u64,
    /// Maximum time to wait for diagrams to finish rendering
    pub render_timeout_ms: u64,
    /// Interval between diagram completion checks
    pub poll_interval_ms: u64,
    /// Print CSS backgrounds (needed for the dark theme)
    pub print_background: bool,
    /// Landscape page orientation
    pub landscape: bool,
}

impl Default for PdfSettings {
    fn default() -> Self {
        Self {
            browser_path: None,
            sandbox: true,
            launch_timeout_secs: 30,
            render_timeout_ms: 10_000,
            poll_interval_ms: 100,
            print_background: true,
            landscape: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Export Settings
// ─────────────────────────────────────────────────────────────────────────────

/// All export preferences, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExportSettings {
    /// Theme for HTML and PDF output
    pub theme: Theme,
    /// Markdown grammar extensions
    pub markdown: MarkdownOptions,
    /// Diagram detection and runtime
    pub diagrams: DiagramSettings,
    /// Browser and print options
    pub pdf: PdfSettings,
}

impl ExportSettings {
    /// Minimum browser launch/navigation timeout.
    pub const MIN_LAUNCH_TIMEOUT_SECS: u64 = 5;
    /// Maximum browser launch/navigation timeout.
    pub const MAX_LAUNCH_TIMEOUT_SECS: u64 = 300;
    /// Minimum diagram render timeout.
    pub const MIN_RENDER_TIMEOUT_MS: u64 = 500;
    /// Maximum diagram render timeout.
    pub const MAX_RENDER_TIMEOUT_MS: u64 = 120_000;
    /// Minimum poll interval.
    pub const MIN_POLL_INTERVAL_MS: u64 = 10;
    /// Maximum poll interval.
    pub const MAX_POLL_INTERVAL_MS: u64 = 2_000;

    /// Sanitize settings by clamping values to valid ranges.
    ///
    /// This is useful after loading settings from a file that might have
    /// been manually edited with invalid values.
    pub fn sanitize(&mut self) {
        self.pdf.launch_timeout_secs = self
            .pdf
            .launch_timeout_secs
            .clamp(Self::MIN_LAUNCH_TIMEOUT_SECS, Self::MAX_LAUNCH_TIMEOUT_SECS);
        self.pdf.render_timeout_ms = self
            .pdf
            .render_timeout_ms
            .clamp(Self::MIN_RENDER_TIMEOUT_MS, Self::MAX_RENDER_TIMEOUT_MS);
        self.pdf.poll_interval_ms = self
            .pdf
            .poll_interval_ms
            .clamp(Self::MIN_POLL_INTERVAL_MS, Self::MAX_POLL_INTERVAL_MS);

        // Poll at least once before the timeout expires
        if self.pdf.poll_interval_ms > self.pdf.render_timeout_ms {
            self.pdf.poll_interval_ms = self.pdf.render_timeout_ms;
        }

        // Normalize diagram languages
        let mut languages: Vec<String> = self
            .diagrams
            .languages
            .iter()
            .map(|l| l.trim().to_ascii_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        languages.sort();
        languages.dedup();
        if languages.is_empty() {
            languages = DiagramSettings::default().languages;
        }
        self.diagrams.languages = languages;

        if self.diagrams.runtime_url.trim().is_empty() {
            self.diagrams.runtime_url = DEFAULT_DIAGRAM_RUNTIME_URL.to_string();
        }

        // An empty override path means "no override"
        if self
            .pdf
            .browser_path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            self.pdf.browser_path = None;
        }
    }

    /// Load settings and sanitize them to ensure validity.
    ///
    /// This is a convenience method that deserializes and then sanitizes.
    pub fn from_json_sanitized(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
