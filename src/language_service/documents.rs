//! Open documents and their per-version symbol indexes

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::language::{index_document, SymbolIndex};
use crate::utils::uri_to_path;

/// Snapshot of an open editor document
#[derive(Debug, Clone)]
pub struct Document {
    pub uri: String,
    pub version: i32,
    pub text: Arc<str>,
    /// On-disk location for `file://` URIs
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct DocumentStore {
    docs: HashMap<String, Document>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, uri: &str, version: i32, text: &str) -> Document {
        let doc = Document {
            uri: uri.to_string(),
            version,
            text: Arc::from(text),
            path: uri_to_path(uri),
        };
        self.docs.insert(uri.to_string(), doc.clone());
        doc
    }

    /// Replace the text of an open document. Changes for unknown documents
    /// or carrying an older version are ignored.
    pub fn change(&mut self, uri: &str, version: i32, text: &str) -> Option<Document> {
        let doc = self.docs.get_mut(uri)?;
        if version < doc.version {
            debug!(
                "[Documents] ignoring v{} of {} (already at v{})",
                version, uri, doc.version
            );
            return None;
        }
        doc.version = version;
        doc.text = Arc::from(text);
        Some(doc.clone())
    }

    pub fn close(&mut self, uri: &str) -> Option<Document> {
        self.docs.remove(uri)
    }

    pub fn get(&self, uri: &str) -> Option<&Document> {
        self.docs.get(uri)
    }

    pub fn open_documents(&self) -> impl Iterator<Item = &Document> {
        self.docs.values()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

/// Symbol index per open document, valid for exactly one version
#[derive(Debug, Default)]
pub struct DocumentCache {
    entries: HashMap<String, (i32, Arc<SymbolIndex>)>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index for `doc` at its current version, built on first access
    pub fn get(&mut self, doc: &Document) -> Arc<SymbolIndex> {
        if let Some((version, index)) = self.entries.get(&doc.uri) {
            if *version == doc.version {
                return Arc::clone(index);
            }
        }
        let index = Arc::new(index_document(&doc.text));
        self.entries
            .insert(doc.uri.clone(), (doc.version, Arc::clone(&index)));
        index
    }

    pub fn invalidate(&mut self, uri: &str) {
        self.entries.remove(uri);
    }

    pub fn remove(&mut self, uri: &str) {
        self.entries.remove(uri);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
