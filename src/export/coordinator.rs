//! Export entry point
//!
//! [`Exporter`] is the only part of the pipeline the UI talks to. It resolves
//! the job's source, runs the stages the format needs and writes exactly one
//! output file.

use crate::config::ExportSettings;
use crate::error::{Error, Result};
use crate::export::browser::BrowserProbe;
use crate::export::diagram::extract_diagrams;
use crate::export::html::{assemble_html_document, DiagramRuntime};
use crate::export::markdown::markdown_to_html_fragment;
use crate::export::options::{ExportFormat, ExportJob, ExportOutcome, ExportSource};
use crate::export::pdf::PdfRenderer;
use crate::export::writer::write_atomic;
use crate::storage::DocumentStore;
use crate::theme::ThemeColors;
use log::{debug, info, warn};
use std::borrow::Cow;
use std::fs;
use std::path::Path;

/// Runs export jobs against a document store.
///
/// Holds no per-job state; one `Exporter` can serve concurrent exports from
/// several threads.
#[derive(Debug)]
pub struct Exporter<S> {
    store: S,
    settings: ExportSettings,
    probe: BrowserProbe,
}

impl<S: DocumentStore> Exporter<S> {
    /// Create an exporter. Settings are sanitized on the way in.
    pub fn new(store: S, mut settings: ExportSettings) -> Self {
        settings.sanitize();
        let probe = BrowserProbe::from_settings(&settings.pdf);
        Self {
            store,
            settings,
            probe,
        }
    }

    /// Replace the browser probe.
    pub fn with_probe(mut self, probe: BrowserProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Whether the PDF format can be offered. Cheap enough to call per frame.
    pub fn pdf_available(&self) -> bool {
        self.probe.is_available()
    }

    /// Run one export job.
    ///
    /// An empty destination means the user dismissed the save dialog; this
    /// returns `ExportOutcome::Cancelled` without touching anything.
    ///
    /// # Errors
    ///
    /// `BrowserUnavailable` for PDF when no browser is found (checked before
    /// any other work), `DocumentNotFound` for unknown ids, any stage error
    /// from conversion or rendering, and `FileWriteFailed` when the output
    /// cannot be written. No partial file is left behind on failure.
    pub fn export(&self, job: &ExportJob) -> Result<ExportOutcome> {
        if job.is_cancelled() {
            info!("{} export cancelled: no destination chosen", job.format);
            return Ok(ExportOutcome::Cancelled);
        }

        info!(
            "Exporting as {} to {}",
            job.format,
            job.destination.display()
        );

        let result = self.run(job);
        match &result {
            Ok(ExportOutcome::Written { path, bytes }) => {
                info!("Exported {} bytes to {}", bytes, path.display());
            }
            Ok(ExportOutcome::Cancelled) => {}
            Err(e) => warn!("{}: {}", job.format.failure_message(), e),
        }
        result
    }

    fn run(&self, job: &ExportJob) -> Result<ExportOutcome> {
        let browser = if job.format.requires_browser() {
            Some(self.probe.locate().ok_or(Error::BrowserUnavailable)?)
        } else {
            None
        };

        let (title, markdown) = self.resolve(&job.source)?;

        let output = match (job.format, browser) {
            (ExportFormat::Markdown, _) => markdown.into_owned().into_bytes(),
            (ExportFormat::Html, _) => self.render_html(&markdown, title.as_deref())?.into_bytes(),
            (ExportFormat::Pdf, Some(browser)) => {
                let html = self.render_html(&markdown, title.as_deref())?;
                PdfRenderer::new(browser, self.settings.pdf.clone()).render(&html)?
            }
            (ExportFormat::Pdf, None) => return Err(Error::BrowserUnavailable),
        };

        write_atomic(&job.destination, &output)?;
        Ok(ExportOutcome::Written {
            path: job.destination.clone(),
            bytes: output.len(),
        })
    }

    /// Title and markdown for a job source.
    fn resolve<'a>(&self, source: &'a ExportSource) -> Result<(Option<String>, Cow<'a, str>)> {
        match source {
            ExportSource::Document(id) => {
                let document = self
                    .store
                    .get_document(*id)?
                    .ok_or(Error::DocumentNotFound(*id))?;
                debug!("Loaded document {} ({})", document.id, document.name);
                Ok((Some(document.name), Cow::Owned(document.content)))
            }
            ExportSource::Content { title, markdown } => {
                Ok((title.clone(), Cow::Borrowed(markdown.as_str())))
            }
        }
    }

    /// Convert markdown into a standalone HTML document.
    pub fn render_html(&self, markdown: &str, title: Option<&str>) -> Result<String> {
        let (rewritten, diagrams) = extract_diagrams(markdown, &self.settings.diagrams.languages);
        debug!("Extracted {} diagram block(s)", diagrams.len());

        let fragment = markdown_to_html_fragment(&rewritten, &self.settings.markdown);
        let colors = ThemeColors::from_theme(self.settings.theme);

        let runtime = if diagrams.is_empty() {
            DiagramRuntime::Url(self.settings.diagrams.runtime_url.clone())
        } else {
            self.diagram_runtime()
        };

        assemble_html_document(&fragment, &diagrams, &colors, title, &runtime)
    }

    /// Convert markdown into PDF bytes.
    ///
    /// # Errors
    ///
    /// `BrowserUnavailable` when no browser is found.
    pub fn render_pdf(&self, markdown: &str, title: Option<&str>) -> Result<Vec<u8>> {
        let browser = self.probe.locate().ok_or(Error::BrowserUnavailable)?;
        let html = self.render_html(markdown, title)?;
        PdfRenderer::new(browser, self.settings.pdf.clone()).render(&html)
    }

    /// Inline the local runtime when configured, otherwise reference the URL.
    fn diagram_runtime(&self) -> DiagramRuntime {
        let url = || DiagramRuntime::Url(self.settings.diagrams.runtime_url.clone());

        match self.settings.diagrams.runtime_path.as_deref() {
            Some(path) => match read_runtime(path) {
                Ok(source) => DiagramRuntime::Inline(source),
                Err(e) => {
                    warn!(
                        "Failed to read diagram runtime {}: {}. Using {}",
                        path.display(),
                        e,
                        self.settings.diagrams.runtime_url
                    );
                    url()
                }
            },
            None => url(),
        }
    }
}

fn read_runtime(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path)?)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
