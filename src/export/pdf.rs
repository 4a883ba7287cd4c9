//! PDF rendering through a headless browser
//!
//! Each call launches its own browser process, loads the assembled HTML
//! document from memory, waits until every diagram element reports that it
//! has finished rendering, prints the page and tears the process down.
//!
//! ```text
//! Idle → Launching → PageLoaded → AwaitingDiagramRender → Printing → Done
//!            └───────────┴──────────────┴───────────────────┴──→ Failed
//! ```

use crate::config::PdfSettings;
use crate::error::{Error, Result};
use headless_chrome::protocol::cdp::Page;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions, Tab};
use log::{debug, info, warn};
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// Page every render starts from before its document is written in.
const BLANK_PAGE: &str = "about:blank";

/// Diagram elements the bootstrap script has not settled yet, or -1 while
/// the document itself is still loading.
const PENDING_DIAGRAMS_JS: &str = "document.readyState !== 'complete' ? -1 : \
     document.querySelectorAll('pre.diagram-source:not([data-rendered])').length";

// ─────────────────────────────────────────────────────────────────────────────
// Render Stage
// ─────────────────────────────────────────────────────────────────────────────

/// Progress of a single PDF render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderStage {
    #[default]
    Idle,
    /// Starting the browser process and opening a tab
    Launching,
    /// Navigating to the document and waiting for its load event
    PageLoaded,
    /// Waiting for every diagram element to settle
    AwaitingDiagramRender,
    /// Printing the page to PDF
    Printing,
    Done,
    Failed,
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderStage::Idle => "idle",
            RenderStage::Launching => "browser launch",
            RenderStage::PageLoaded => "page load",
            RenderStage::AwaitingDiagramRender => "diagram rendering",
            RenderStage::Printing => "printing",
            RenderStage::Done => "done",
            RenderStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Stage and browser process of an in-flight render.
#[derive(Debug, Default)]
struct RenderTrace {
    stage: RenderStage,
    pid: Option<u32>,
    /// Browser process and its children, captured once a tab is open
    #[cfg(test)]
    process_tree: Vec<u32>,
}

impl RenderTrace {
    fn advance(&mut self, next: RenderStage) {
        debug!("PDF render: {} -> {}", self.stage, next);
        self.stage = next;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Browser Session
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the browser process for exactly one render.
///
/// The session holds the only handle to the browser. Dropping it, on success,
/// on error or while unwinding, drops that handle, and headless_chrome then
/// asks the browser to close before killing and reaping the process.
struct BrowserSession {
    browser: Browser,
    pid: Option<u32>,
}

impl BrowserSession {
    fn launch(browser_path: &Path, settings: &PdfSettings) -> Result<Self> {
        let launch_failed = |message: String| Error::BrowserLaunchFailed {
            stage: RenderStage::Launching,
            message,
        };

        // The browser must outlive the slowest page load plus diagram wait
        let idle_timeout = Duration::from_secs(settings.launch_timeout_secs)
            + Duration::from_millis(settings.render_timeout_ms);

        let options = LaunchOptions::default_builder()
            .path(Some(browser_path.to_path_buf()))
            // New headless mode is selected through the flag below
            .headless(false)
            .sandbox(settings.sandbox)
            .idle_browser_timeout(idle_timeout)
            .args(vec![
                OsStr::new("--headless=new"),
                OsStr::new("--hide-scrollbars"),
                OsStr::new("--mute-audio"),
                OsStr::new("--no-first-run"),
            ])
            .build()
            .map_err(|e| launch_failed(e.to_string()))?;

        let browser = Browser::new(options).map_err(|e| launch_failed(e.to_string()))?;
        let pid = browser.get_process_id();
        info!("Launched browser {} (pid {:?})", browser_path.display(), pid);

        Ok(Self { browser, pid })
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        debug!("Releasing browser (pid {:?})", self.pid);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PDF Renderer
// ─────────────────────────────────────────────────────────────────────────────

/// Prints assembled HTML documents to PDF.
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    browser_path: PathBuf,
    settings: PdfSettings,
}

impl PdfRenderer {
    /// Create a renderer for the browser binary at `browser_path`.
    pub fn new(browser_path: impl Into<PathBuf>, settings: PdfSettings) -> Self {
        Self {
            browser_path: browser_path.into(),
            settings,
        }
    }

    /// Render `html` to PDF bytes.
    ///
    /// # Errors
    ///
    /// `BrowserLaunchFailed`, `NavigationFailed` or `PrintFailed`, tagged
    /// with the stage that failed. The browser process is gone by the time
    /// the error is returned.
    pub fn render(&self, html: &str) -> Result<Vec<u8>> {
        let mut trace = RenderTrace::default();
        let result = self.render_inner(html, &mut trace);

        match &result {
            Ok(bytes) => {
                trace.advance(RenderStage::Done);
                debug!("PDF render produced {} bytes", bytes.len());
            }
            Err(e) => {
                let failed_at = trace.stage;
                trace.advance(RenderStage::Failed);
                warn!("PDF render failed during {}: {}", failed_at, e);
            }
        }
        result
    }

    fn render_inner(&self, html: &str, trace: &mut RenderTrace) -> Result<Vec<u8>> {
        self.render_at(BLANK_PAGE, html, trace)
    }

    /// Open `page_url`, replace its document with `html`, then print.
    fn render_at(&self, page_url: &str, html: &str, trace: &mut RenderTrace) -> Result<Vec<u8>> {
        trace.advance(RenderStage::Launching);
        let session = BrowserSession::launch(&self.browser_path, &self.settings)?;
        trace.pid = session.pid;

        let tab = session
            .browser
            .new_tab()
            .map_err(|e| Error::BrowserLaunchFailed {
                stage: RenderStage::Launching,
                message: e.to_string(),
            })?;
        tab.set_default_timeout(Duration::from_secs(self.settings.launch_timeout_secs));
        #[cfg(test)]
        trace.record_process_tree();

        trace.advance(RenderStage::PageLoaded);
        load_document(&tab, page_url, html).map_err(|message| Error::NavigationFailed {
            stage: RenderStage::PageLoaded,
            message,
        })?;

        trace.advance(RenderStage::AwaitingDiagramRender);
        self.wait_for_diagrams(&tab)?;

        trace.advance(RenderStage::Printing);
        let print_failed = |message: String| Error::PrintFailed {
            stage: RenderStage::Printing,
            message,
        };
        let options = PrintToPdfOptions {
            landscape: Some(self.settings.landscape),
            print_background: Some(self.settings.print_background),
            prefer_css_page_size: Some(true),
            ..Default::default()
        };
        let bytes = tab
            .print_to_pdf(Some(options))
            .map_err(|e| print_failed(e.to_string()))?;

        if !bytes.starts_with(b"%PDF") {
            return Err(print_failed("browser returned data that is not a PDF".to_string()));
        }

        Ok(bytes)
    }

    /// Poll until no diagram element is pending, or the render timeout passes.
    fn wait_for_diagrams(&self, tab: &Tab) -> Result<()> {
        let timeout = Duration::from_millis(self.settings.render_timeout_ms);
        let interval = Duration::from_millis(self.settings.poll_interval_ms);
        let started = Instant::now();
        let print_failed = |message: String| Error::PrintFailed {
            stage: RenderStage::AwaitingDiagramRender,
            message,
        };

        loop {
            let pending = tab
                .evaluate(PENDING_DIAGRAMS_JS, false)
                .map_err(|e| print_failed(e.to_string()))?
                .value
                .and_then(|v| v.as_i64())
                .ok_or_else(|| print_failed("could not query diagram state".to_string()))?;

            if pending == 0 {
                debug!("Diagrams settled after {:?}", started.elapsed());
                return Ok(());
            }
            if started.elapsed() >= timeout {
                let message = if pending < 0 {
                    format!("document still loading after {} ms", self.settings.render_timeout_ms)
                } else {
                    format!(
                        "{} diagram(s) still rendering after {} ms",
                        pending, self.settings.render_timeout_ms
                    )
                };
                return Err(print_failed(message));
            }
            thread::sleep(interval);
        }
    }
}

/// Navigate to `page_url` and write `html` into its main frame.
///
/// The document is handed to the browser over the DevTools connection, so
/// its size is not bounded by URL length limits.
fn load_document(tab: &Tab, page_url: &str, html: &str) -> std::result::Result<(), String> {
    tab.navigate_to(page_url)
        .and_then(|tab| tab.wait_until_navigated())
        .map_err(|e| e.to_string())?;

    let frame_id = tab
        .call_method(Page::GetFrameTree(None))
        .map_err(|e| e.to_string())?
        .frame_tree
        .frame
        .id;
    tab.call_method(Page::SetDocumentContent {
        frame_id,
        html: html.to_string(),
    })
    .map_err(|e| e.to_string())?;

    debug!("Loaded {} byte document into {}", html.len(), page_url);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
