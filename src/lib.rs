//! mdpress - Markdown export pipeline
//!
//! Converts stored markdown documents into standalone themed HTML and
//! browser-printed PDF, keeping diagram blocks renderable in both.
//!
//! ```no_run
//! use mdpress::{ExportFormat, ExportJob, Exporter, MemoryStore};
//!
//! let exporter = Exporter::new(MemoryStore::new(), mdpress::load_config());
//! let job = ExportJob::content("# Notes", ExportFormat::Html, "notes.html");
//! exporter.export(&job)?;
//! # Ok::<(), mdpress::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod storage;
pub mod theme;

pub use config::{load_config, save_config, ExportSettings, Theme};
pub use error::{Error, Result};
pub use export::{ExportFormat, ExportJob, ExportOutcome, Exporter, RenderStage};
pub use storage::{Document, DocumentStore, MemoryStore};
