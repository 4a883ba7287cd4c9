//! Export Formats and Jobs
//!
//! This module defines the export format enumeration and the short-lived
//! value objects describing one export request and its outcome.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ─────────────────────────────────────────────────────────────────────────────
// Export Format
// ─────────────────────────────────────────────────────────────────────────────

/// Supported export formats for documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// The Markdown source, verbatim
    Markdown,
    /// A standalone HTML file with embedded styles
    #[default]
    Html,
    /// A browser-printed PDF
    Pdf,
}

impl ExportFormat {
    /// Get the display label for this format.
    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "Markdown",
            ExportFormat::Html => "HTML",
            ExportFormat::Pdf => "PDF",
        }
    }

    /// Get the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Html => "html",
            ExportFormat::Pdf => "pdf",
        }
    }

    /// Filter name and extensions for a native save dialog.
    pub fn dialog_filter(&self) -> (&'static str, &'static [&'static str]) {
        match self {
            ExportFormat::Markdown => ("Markdown Files", &["md", "markdown"]),
            ExportFormat::Html => ("HTML Files", &["html", "htm"]),
            ExportFormat::Pdf => ("PDF Files", &["pdf"]),
        }
    }

    /// Whether this format needs a headless browser.
    pub fn requires_browser(&self) -> bool {
        matches!(self, ExportFormat::Pdf)
    }

    /// Message shown to the user when an export in this format fails.
    pub fn failure_message(&self) -> String {
        format!("Failed to export as {}", self.label())
    }

    /// Get all available export formats.
    pub fn all() -> &'static [ExportFormat] {
        &[ExportFormat::Markdown, ExportFormat::Html, ExportFormat::Pdf]
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md" | "markdown" => Ok(ExportFormat::Markdown),
            "html" | "htm" => Ok(ExportFormat::Html),
            "pdf" => Ok(ExportFormat::Pdf),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Export Job
// ─────────────────────────────────────────────────────────────────────────────

/// Where the content of an export comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportSource {
    /// A stored document, fetched from the document store
    Document(i64),
    /// Content supplied directly by the caller
    Content { title: Option<String>, markdown: String },
}

/// One export request. Lives only for the call that runs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJob {
    pub source: ExportSource,
    pub format: ExportFormat,
    /// Destination chosen by the user; empty means the picker was dismissed
    pub destination: PathBuf,
}

impl ExportJob {
    /// Export a stored document.
    pub fn document(id: i64, format: ExportFormat, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: ExportSource::Document(id),
            format,
            destination: destination.into(),
        }
    }

    /// Export caller-supplied markdown.
    pub fn content(
        markdown: impl Into<String>,
        format: ExportFormat,
        destination: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source: ExportSource::Content {
                title: None,
                markdown: markdown.into(),
            },
            format,
            destination: destination.into(),
        }
    }

    /// Set the document title used for caller-supplied content.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        if let ExportSource::Content { title: t, .. } = &mut self.source {
            *t = Some(title.into());
        }
        self
    }

    /// True when there is no destination to write to.
    pub fn is_cancelled(&self) -> bool {
        self.destination.as_os_str().is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Export Outcome
// ─────────────────────────────────────────────────────────────────────────────

/// Result of a successful export call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The destination file was written
    Written { path: PathBuf, bytes: usize },
    /// No destination was chosen; nothing was done
    Cancelled,
}

impl ExportOutcome {
    /// Path of the written file, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ExportOutcome::Written { path, .. } => Some(path),
            ExportOutcome::Cancelled => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_format_default() {
        assert_eq!(ExportFormat::default(), ExportFormat::Html);
    }

    #[test]
    fn test_export_format_extension() {
        assert_eq!(ExportFormat::Markdown.extension(), "md");
        assert_eq!(ExportFormat::Html.extension(), "html");
        assert_eq!(ExportFormat::Pdf.extension(), "pdf");
    }

    #[test]
    fn test_export_format_from_str() {
        assert_eq!("PDF".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert_eq!("html".parse::<ExportFormat>().unwrap(), ExportFormat::Html);
        assert_eq!(" markdown ".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert!(matches!(
            "docx".parse::<ExportFormat>(),
            Err(Error::UnsupportedFormat(f)) if f == "docx"
        ));
    }

    #[test]
    fn test_export_format_failure_message() {
        assert_eq!(ExportFormat::Pdf.failure_message(), "Failed to export as PDF");
        assert_eq!(ExportFormat::Html.failure_message(), "Failed to export as HTML");
    }

    #[test]
    fn test_dialog_filter_contains_extension() {
        for format in ExportFormat::all() {
            let (_, extensions) = format.dialog_filter();
            assert!(extensions.contains(&format.extension()));
        }
    }

    #[test]
    fn test_requires_browser() {
        assert!(ExportFormat::Pdf.requires_browser());
        assert!(!ExportFormat::Html.requires_browser());
        assert!(!ExportFormat::Markdown.requires_browser());
    }

    #[test]
    fn test_export_format_serialization() {
        assert_eq!(serde_json::to_string(&ExportFormat::Pdf).unwrap(), "\"pdf\"");
        let format: ExportFormat = serde_json::from_str("\"markdown\"").unwrap();
        assert_eq!(format, ExportFormat::Markdown);
    }

    #[test]
    fn test_job_cancelled_when_destination_empty() {
        assert!(ExportJob::content("x", ExportFormat::Html, "").is_cancelled());
        assert!(!ExportJob::document(1, ExportFormat::Pdf, "out.pdf").is_cancelled());
    }

    #[test]
    fn test_job_with_title() {
        let job = ExportJob::content("x", ExportFormat::Html, "a.html").with_title("Notes");
        assert!(matches!(
            job.source,
            ExportSource::Content { title: Some(ref t), .. } if t == "Notes"
        ));
    }
}
