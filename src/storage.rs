//! Document storage boundary
//!
//! The export pipeline never owns documents. It asks a [`DocumentStore`] for
//! an immutable snapshot and reads only the fields it needs.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Snapshot of a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub name: String,
    pub content: String,
}

impl Document {
    pub fn new(id: i64, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Read access to the document storage service.
pub trait DocumentStore: Send + Sync {
    /// Fetch a document snapshot, or `None` if no document has this id.
    fn get_document(&self, id: i64) -> Result<Option<Document>>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for &S {
    fn get_document(&self, id: i64) -> Result<Option<Document>> {
        (**self).get_document(id)
    }
}

/// In-memory store, used when the editor hands documents over directly.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<i64, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document.
    pub fn insert(&self, document: Document) {
        let mut documents = self
            .documents
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        documents.insert(document.id, document);
    }
}

impl DocumentStore for MemoryStore {
    fn get_document(&self, id: i64) -> Result<Option<Document>> {
        let documents = self
            .documents
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(documents.get(&id).cloned())
    }
}
