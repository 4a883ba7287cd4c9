//! Centralized error handling for mdpress
//!
//! This module provides a unified error type that covers every failure the
//! export pipeline can surface: internal placeholder defects, browser
//! availability and rendering stages, file output, storage lookups and
//! configuration.

use crate::export::RenderStage;
use log::warn;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Custom Result Type Alias
// ─────────────────────────────────────────────────────────────────────────────

/// A specialized `Result` type for the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The centralized error type for the crate.
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // Conversion Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Diagram placeholders in the HTML fragment do not match the extracted blocks
    #[error("Diagram placeholder mismatch: expected {expected} diagram(s), found {found}")]
    ExtractionDefect { expected: usize, found: usize },

    // ─────────────────────────────────────────────────────────────────────────
    // Browser / PDF Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// No compatible browser binary could be found on this host
    #[error("PDF export requires Chrome, Chromium or Edge, but none was found")]
    BrowserUnavailable,

    /// The headless browser process could not be started
    #[error("Failed to launch browser ({stage}): {message}")]
    BrowserLaunchFailed { stage: RenderStage, message: String },

    /// The browser could not load the assembled document
    #[error("Failed to load document in browser ({stage}): {message}")]
    NavigationFailed { stage: RenderStage, message: String },

    /// Diagram rendering or printing did not complete
    #[error("Failed to print PDF ({stage}): {message}")]
    PrintFailed { stage: RenderStage, message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // File I/O Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Generic I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failed to write the export destination
    #[error("Failed to write '{}': {source}", path.display())]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Storage Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// The requested document does not exist
    #[error("Document {0} not found")]
    DocumentNotFound(i64),

    /// The storage collaborator reported a failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// An export format name could not be parsed
    #[error("Unsupported format: {0}. Supported: md, html, pdf")]
    UnsupportedFormat(String),

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to load configuration file
    #[error("Failed to load configuration from '{}': {source}", path.display())]
    ConfigLoad {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to save configuration file
    #[error("Failed to save configuration to '{}': {source}", path.display())]
    ConfigSave {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to parse configuration (invalid JSON/format)
    #[error("Invalid configuration format: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Configuration directory not found or inaccessible
    #[error("Configuration directory not found")]
    ConfigDirNotFound,
}

impl Error {
    /// The PDF render stage that failed, if this is a render error.
    pub fn render_stage(&self) -> Option<RenderStage> {
        match self {
            Error::BrowserLaunchFailed { stage, .. }
            | Error::NavigationFailed { stage, .. }
            | Error::PrintFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Graceful Degradation Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Extension trait for Result to support graceful degradation.
pub trait ResultExt<T> {
    /// If the result is an error, log it at warning level and return the provided default.
    fn unwrap_or_warn_default(self, default: T, context: &str) -> T;
}

impl<T> ResultExt<T> for Result<T> {
    fn unwrap_or_warn_default(self, default: T, context: &str) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                warn!("{}: {}. Using default.", context, err);
                default
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
