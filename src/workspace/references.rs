//! Reference-candidate discovery
//!
//! Narrows a find-references request to the documents that could mention
//! the target at all: the owning document for function-local symbols,
//! otherwise every open document plus the workspace files that import the
//! target's file directly or through one intermediate file.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::imports::canonical;
use super::service::WorkspaceService;
use crate::language::SymbolIndex;

/// An open editor document as seen by the workspace layer
#[derive(Debug, Clone)]
pub struct OpenFile {
    pub uri: String,
    pub path: Option<PathBuf>,
    pub index: Arc<SymbolIndex>,
}

/// What a find-references request is looking for
#[derive(Debug, Clone, Copy)]
pub struct ReferenceTarget<'a> {
    pub uri: &'a str,
    pub path: Option<&'a Path>,
    pub function_local: bool,
}

/// A document worth scanning for references
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Candidate {
    Open(String),
    Disk(PathBuf),
}

/// Files that import `target` directly, plus files importing one of those
pub fn importers_within_one_hop(
    graph: &HashMap<PathBuf, Vec<PathBuf>>,
    target: &Path,
) -> HashSet<PathBuf> {
    let direct: HashSet<PathBuf> = graph
        .iter()
        .filter(|(file, imports)| file.as_path() != target && imports.iter().any(|i| i == target))
        .map(|(file, _)| file.clone())
        .collect();

    let mut all = direct.clone();
    for (file, imports) in graph {
        if file.as_path() != target && imports.iter().any(|i| direct.contains(i)) {
            all.insert(file.clone());
        }
    }
    all
}

impl WorkspaceService {
    async fn resolved_imports(&self, file: &Path, index: &SymbolIndex) -> Vec<PathBuf> {
        let mut out = Vec::new();
        for import in &index.imports {
            if let Some(resolved) = self.resolve_import(&import.path, file).await {
                out.push(resolved);
            }
        }
        out
    }

    /// Documents that may contain references to `target`
    pub async fn reference_candidates(
        &self,
        target: ReferenceTarget<'_>,
        open: &[OpenFile],
    ) -> Vec<Candidate> {
        if target.function_local {
            return vec![Candidate::Open(target.uri.to_string())];
        }

        let mut candidates: Vec<Candidate> = open
            .iter()
            .map(|doc| Candidate::Open(doc.uri.clone()))
            .collect();
        if !candidates.iter().any(|c| *c == Candidate::Open(target.uri.to_string())) {
            candidates.push(Candidate::Open(target.uri.to_string()));
        }
        let Some(target_path) = target.path else {
            return candidates;
        };
        let target_path = canonical(target_path).await;

        // import graph over open documents and workspace files, keyed canonically
        let mut graph: HashMap<PathBuf, Vec<PathBuf>> = HashMap::new();
        let mut open_paths = HashSet::new();
        for doc in open {
            let Some(path) = &doc.path else { continue };
            let key = canonical(path).await;
            let imports = self.resolved_imports(path, &doc.index).await;
            open_paths.insert(key.clone());
            graph.insert(key, imports);
        }

        let files = self.discover_files().await;
        for file in files.iter() {
            let key = canonical(file).await;
            if open_paths.contains(&key) || graph.contains_key(&key) {
                continue;
            }
            let Some(cached) = self.load_external(&key).await else {
                continue;
            };
            let imports = self.resolved_imports(&key, &cached.index).await;
            graph.insert(key, imports);
        }

        let mut importers: Vec<PathBuf> = importers_within_one_hop(&graph, &target_path)
            .into_iter()
            .filter(|p| !open_paths.contains(p))
            .collect();
        importers.sort();
        debug!(
            "[References] {} importer(s) of {}",
            importers.len(),
            target_path.display()
        );
        candidates.extend(importers.into_iter().map(Candidate::Disk));
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{shared, Settings};
    use crate::language::index_document;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_importers_within_one_hop() {
        let p = |s: &str| PathBuf::from(s);
        let graph = HashMap::from([
            (p("/a.mdr"), vec![]),
            (p("/b.mdr"), vec![p("/a.mdr")]),
            (p("/c.mdr"), vec![p("/b.mdr")]),
            (p("/d.mdr"), vec![p("/c.mdr")]),
            (p("/e.mdr"), vec![]),
        ]);
        let found = importers_within_one_hop(&graph, Path::new("/a.mdr"));
        assert_eq!(found, HashSet::from([p("/b.mdr"), p("/c.mdr")]));
    }

    #[tokio::test]
    async fn test_local_symbols_only_search_owner() {
        let ws = WorkspaceService::new(shared(Settings::default()));
        let target = ReferenceTarget {
            uri: "file:///ws/a.mdr",
            path: Some(Path::new("/ws/a.mdr")),
            function_local: true,
        };
        assert_eq!(
            ws.reference_candidates(target, &[]).await,
            vec![Candidate::Open("file:///ws/a.mdr".to_string())]
        );
    }

    #[tokio::test]
    async fn test_top_level_candidates_include_importers() {
        let temp = TempDir::new().unwrap();
        let root = fs::canonicalize(temp.path()).unwrap();
        fs::write(root.join("lib.mdr"), "fn helper() -> Int { 1 }").unwrap();
        fs::write(root.join("user.mdr"), "import \"./lib\"\nfn a() -> Int { helper() }").unwrap();
        fs::write(root.join("other.mdr"), "fn unrelated() {}").unwrap();

        let ws = WorkspaceService::new(shared(Settings {
            workspace_root: Some(root.clone()),
            ..Settings::default()
        }));
        let lib = root.join("lib.mdr");
        let open = vec![OpenFile {
            uri: "file:///lib".to_string(),
            path: Some(lib.clone()),
            index: Arc::new(index_document("fn helper() -> Int { 1 }")),
        }];
        let target = ReferenceTarget {
            uri: "file:///lib",
            path: Some(&lib),
            function_local: false,
        };

        let candidates = ws.reference_candidates(target, &open).await;
        assert_eq!(
            candidates,
            vec![
                Candidate::Open("file:///lib".to_string()),
                Candidate::Disk(root.join("user.mdr")),
            ]
        );
    }
}
