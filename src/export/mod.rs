//! Document Export Module for mdpress
//!
//! This module turns markdown documents into portable output files: the
//! markdown itself, a standalone themed HTML document, or a PDF printed by a
//! headless browser so that diagrams are rendered.
//!
//! # Pipeline
//!
//! ```text
//! markdown → diagram extraction → markdown conversion → HTML assembly → (HTML | PDF)
//! ```
//!
//! # Architecture
//!
//! - `options.rs` - Export formats, jobs and outcomes
//! - `diagram.rs` - Diagram fence extraction and placeholder markers
//! - `markdown.rs` - Markdown to HTML fragment conversion (comrak)
//! - `html.rs` - HTML document generation with theme styling
//! - `browser.rs` - Browser discovery for PDF export
//! - `pdf.rs` - Headless browser PDF rendering
//! - `writer.rs` - Atomic output file writes
//! - `coordinator.rs` - The `Exporter` entry point

pub mod browser;
pub mod coordinator;
pub mod diagram;
pub mod html;
pub mod markdown;
pub mod options;
pub mod pdf;
pub mod writer;

pub use browser::{BrowserProbe, BROWSER_ENV_VAR};
pub use coordinator::Exporter;
pub use diagram::{extract_diagrams, DiagramBlocks, DiagramPlaceholder};
pub use html::{assemble_html_document, DiagramRuntime};
pub use markdown::markdown_to_html_fragment;
pub use options::{ExportFormat, ExportJob, ExportOutcome, ExportSource};
pub use pdf::{PdfRenderer, RenderStage};
pub use writer::write_atomic;
