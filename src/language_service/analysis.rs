//! Per-request view over open documents, their cached indexes and the
//! workspace. Query handlers load every file they look at through here so
//! that open editor buffers always win over disk contents.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::documents::{Document, DocumentCache, DocumentStore};
use crate::config::Settings;
use crate::language::{Symbol, SymbolIndex};
use crate::protocol::{Location, Position, Range};
use crate::utils::{path_to_uri, uri_to_path};
use crate::workspace::imports::canonical;
use crate::workspace::{OpenFile, WorkspaceService};

/// Upper bound on files reached by following imports
pub const MAX_IMPORTED_FILES: usize = 64;

/// Identity of a file independent of how its URI was spelled
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileKey {
    Path(PathBuf),
    Uri(String),
}

/// A document's text with its index
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub uri: String,
    /// Canonical on-disk path, if any
    pub path: Option<PathBuf>,
    pub text: Arc<str>,
    pub index: Arc<SymbolIndex>,
}

impl SourceFile {
    pub fn key(&self) -> FileKey {
        match &self.path {
            Some(path) => FileKey::Path(path.clone()),
            None => FileKey::Uri(self.uri.clone()),
        }
    }

    pub fn offset_at(&self, pos: Position) -> usize {
        self.index.line_index.offset(&self.text, pos)
    }

    pub fn range(&self, start: usize, end: usize) -> Range {
        self.index.line_index.range(&self.text, start, end)
    }

    pub fn location(&self, symbol: &Symbol) -> Location {
        Location {
            uri: self.uri.clone(),
            range: symbol.range,
        }
    }
}

pub struct Analysis<'a> {
    documents: &'a RwLock<DocumentStore>,
    cache: &'a Mutex<DocumentCache>,
    workspace: &'a WorkspaceService,
    pub settings: Settings,
}

impl<'a> Analysis<'a> {
    pub fn new(
        documents: &'a RwLock<DocumentStore>,
        cache: &'a Mutex<DocumentCache>,
        workspace: &'a WorkspaceService,
        settings: Settings,
    ) -> Self {
        Self {
            documents,
            cache,
            workspace,
            settings,
        }
    }

    pub fn workspace(&self) -> &WorkspaceService {
        self.workspace
    }

    fn open_snapshot(&self) -> Vec<Document> {
        self.documents.read().open_documents().cloned().collect()
    }

    async fn from_document(&self, doc: Document) -> SourceFile {
        let index = self.cache.lock().get(&doc);
        let path = match &doc.path {
            Some(path) => Some(canonical(path).await),
            None => None,
        };
        SourceFile {
            uri: doc.uri,
            path,
            text: doc.text,
            index,
        }
    }

    pub async fn open_file(&self, uri: &str) -> Option<SourceFile> {
        let doc = self.documents.read().get(uri).cloned()?;
        Some(self.from_document(doc).await)
    }

    pub async fn open_files(&self) -> Vec<SourceFile> {
        let mut files = Vec::new();
        for doc in self.open_snapshot() {
            files.push(self.from_document(doc).await);
        }
        files.sort_by(|a, b| a.uri.cmp(&b.uri));
        files
    }

    /// Open documents in the shape the workspace layer expects
    pub async fn open_file_handles(&self) -> Vec<OpenFile> {
        self.open_files()
            .await
            .into_iter()
            .map(|f| OpenFile {
                uri: f.uri,
                path: f.path,
                index: f.index,
            })
            .collect()
    }

    /// The file at `path`, preferring an open editor buffer over disk
    pub async fn file_for_path(&self, path: &Path) -> Option<SourceFile> {
        let target = canonical(path).await;
        for doc in self.open_snapshot() {
            let Some(doc_path) = &doc.path else { continue };
            if canonical(doc_path).await == target {
                return Some(self.from_document(doc).await);
            }
        }

        let cached = self.workspace.load_external(&target).await?;
        Some(SourceFile {
            uri: path_to_uri(&target),
            path: Some(target),
            text: cached.text,
            index: cached.index,
        })
    }

    pub async fn file_for_uri(&self, uri: &str) -> Option<SourceFile> {
        if let Some(file) = self.open_file(uri).await {
            return Some(file);
        }
        let path = uri_to_path(uri)?;
        self.file_for_path(&path).await
    }

    /// Files reachable from `file` through imports, breadth first, without
    /// `file` itself and bounded by `MAX_IMPORTED_FILES`
    pub async fn imported_files(&self, file: &SourceFile) -> Vec<SourceFile> {
        let mut out = Vec::new();
        let mut visited: HashSet<FileKey> = HashSet::from([file.key()]);
        let mut queue: VecDeque<SourceFile> = VecDeque::from([file.clone()]);

        while let Some(current) = queue.pop_front() {
            let Some(importer) = current.path.clone() else {
                continue;
            };
            for import in current.index.imports.iter() {
                if out.len() >= MAX_IMPORTED_FILES {
                    return out;
                }
                let Some(resolved) = self.workspace.resolve_import(&import.path, &importer).await
                else {
                    continue;
                };
                if !visited.insert(FileKey::Path(resolved.clone())) {
                    continue;
                }
                let Some(source) = self.file_for_path(&resolved).await else {
                    continue;
                };
                out.push(source.clone());
                queue.push_back(source);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::shared;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_buffer_shadows_disk_and_imports_are_transitive() {
        let temp = TempDir::new().unwrap();
        let root = fs::canonicalize(temp.path()).unwrap();
        fs::write(root.join("main.mdr"), "import \"./a\"\nfn main() {}").unwrap();
        fs::write(root.join("a.mdr"), "import \"./b\"\nimport \"./main\"\nfn a() {}").unwrap();
        fs::write(root.join("b.mdr"), "fn on_disk() {}").unwrap();

        let settings = Settings {
            workspace_root: Some(root.clone()),
            ..Settings::default()
        };
        let workspace = WorkspaceService::new(shared(settings.clone()));
        let documents = RwLock::new(DocumentStore::new());
        let cache = Mutex::new(DocumentCache::new());
        documents
            .write()
            .open(&path_to_uri(&root.join("b.mdr")), 1, "fn in_editor() {}");

        let analysis = Analysis::new(&documents, &cache, &workspace, settings);
        let main = analysis.file_for_path(&root.join("main.mdr")).await.unwrap();
        let imported = analysis.imported_files(&main).await;

        let names: Vec<_> = imported
            .iter()
            .map(|f| f.index.functions[0].name.as_str())
            .collect();
        // main is not revisited through the cycle
        assert_eq!(names, vec!["a", "in_editor"]);
    }
}
