//! Workspace service
//!
//! Owns the file-list and external-index caches and exposes the file-system
//! facing operations used by the query handlers. Every I/O failure is mapped
//! to "no result".

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use super::cache::{CacheStats, CachedFile, ExternalIndexCache};
use super::discovery::{discover_files, FileListCache};
use super::imports::{resolve_import, ImportPolicy};
use crate::config::SharedSettings;
use crate::language::index_document;

pub struct WorkspaceService {
    settings: SharedSettings,
    file_list: Mutex<FileListCache>,
    external: Mutex<ExternalIndexCache>,
    /// The last walk stopped at `max_workspace_files`
    file_cap_reached: AtomicBool,
}

impl WorkspaceService {
    pub fn new(settings: SharedSettings) -> Self {
        let capacity = settings.read().max_external_index_entries;
        Self::with_caches(
            settings,
            FileListCache::default(),
            ExternalIndexCache::new(capacity),
        )
    }

    pub fn with_caches(
        settings: SharedSettings,
        file_list: FileListCache,
        external: ExternalIndexCache,
    ) -> Self {
        Self {
            settings,
            file_list: Mutex::new(file_list),
            external: Mutex::new(external),
            file_cap_reached: AtomicBool::new(false),
        }
    }

    pub fn root(&self) -> Option<PathBuf> {
        self.settings.read().workspace_root.clone()
    }

    /// Switch to a new root, dropping everything cached for the old one
    pub fn set_root(&self, root: Option<PathBuf>) {
        info!("[Workspace] root set to {:?}", root);
        self.settings.write().workspace_root = root;
        self.invalidate_file_list();
        self.external.lock().clear();
        self.file_cap_reached.store(false, Ordering::Relaxed);
    }

    pub fn invalidate_file_list(&self) {
        self.file_list.lock().invalidate();
    }

    /// Source files under the workspace root, capped and briefly cached
    pub async fn discover_files(&self) -> Arc<Vec<PathBuf>> {
        let (root, max_files) = {
            let settings = self.settings.read();
            (settings.workspace_root.clone(), settings.max_workspace_files)
        };
        let Some(root) = root else {
            return Arc::new(Vec::new());
        };

        if let Some(files) = self.file_list.lock().get(&root, max_files) {
            return files;
        }
        let discovery = discover_files(&root, max_files).await;
        self.file_cap_reached.store(discovery.truncated, Ordering::Relaxed);
        self.file_list
            .lock()
            .store(&root, max_files, discovery.files)
    }

    /// User-facing notice when the last walk hit the file cap
    pub fn file_cap_notice(&self) -> Option<String> {
        if !self.file_cap_reached.load(Ordering::Relaxed) {
            return None;
        }
        let max_files = self.settings.read().max_workspace_files;
        Some(format!(
            "Only the first {} Midori files of this workspace are indexed; \
             raise midori.maxWorkspaceFiles to include the rest.",
            max_files
        ))
    }

    pub async fn resolve_import(&self, import_path: &str, importer: &Path) -> Option<PathBuf> {
        let (root, allow_external) = {
            let settings = self.settings.read();
            (
                settings.workspace_root.clone(),
                settings.allow_external_imports,
            )
        };
        let policy = ImportPolicy {
            workspace_root: root.as_deref(),
            allow_external,
        };
        resolve_import(import_path, importer, policy).await
    }

    /// Text and index of a file that is not open, reusing the cached index
    /// while the file's modification time is unchanged
    pub async fn load_external(&self, path: &Path) -> Option<CachedFile> {
        let meta = match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return None,
            Err(e) => {
                debug!("[Workspace] cannot stat {}: {}", path.display(), e);
                return None;
            }
        };
        let modified = meta.modified().ok()?;
        let capacity = self.settings.read().max_external_index_entries;

        {
            let mut cache = self.external.lock();
            if cache.capacity() != capacity {
                cache.set_capacity(capacity);
            }
            if let Some(hit) = cache.get(path, modified) {
                return Some(hit);
            }
        }

        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) => {
                debug!("[Workspace] cannot read {}: {}", path.display(), e);
                return None;
            }
        };
        let file = CachedFile {
            modified,
            index: Arc::new(index_document(&text)),
            text: Arc::from(text),
        };
        self.external.lock().insert(path.to_path_buf(), file.clone());
        Some(file)
    }

    /// Drop the cached index of `path`, e.g. once it is opened in the editor
    pub fn forget(&self, path: &Path) {
        self.external.lock().remove(path);
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.external.lock().stats()
    }

    pub fn cached_file_count(&self) -> usize {
        self.external.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{shared, Settings};
    use std::fs;
    use tempfile::TempDir;

    fn service(root: &Path) -> WorkspaceService {
        WorkspaceService::new(shared(Settings {
            workspace_root: Some(root.to_path_buf()),
            ..Settings::default()
        }))
    }

    #[tokio::test]
    async fn test_load_external_uses_cache_until_modified() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.mdr");
        fs::write(&path, "fn first() {}").unwrap();
        let ws = service(temp.path());

        let one = ws.load_external(&path).await.unwrap();
        let two = ws.load_external(&path).await.unwrap();
        assert!(Arc::ptr_eq(&one.index, &two.index));
        assert_eq!(ws.cache_stats().hits, 1);

        // force a different mtime regardless of timestamp granularity
        fs::write(&path, "fn second() {}").unwrap();
        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(one.modified + std::time::Duration::from_secs(5))
            .unwrap();
        drop(file);

        let three = ws.load_external(&path).await.unwrap();
        assert_eq!(three.index.functions[0].name, "second");
    }

    #[tokio::test]
    async fn test_load_external_missing_file() {
        let temp = TempDir::new().unwrap();
        let ws = service(temp.path());
        assert!(ws.load_external(&temp.path().join("none.mdr")).await.is_none());
        assert!(ws.load_external(temp.path()).await.is_none());
    }

    #[tokio::test]
    async fn test_discover_files_without_root() {
        let ws = WorkspaceService::new(shared(Settings::default()));
        assert!(ws.discover_files().await.is_empty());
    }

    #[tokio::test]
    async fn test_file_list_is_cached_until_invalidated() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.mdr"), "").unwrap();
        let ws = service(temp.path());
        assert_eq!(ws.discover_files().await.len(), 1);

        fs::write(temp.path().join("b.mdr"), "").unwrap();
        assert_eq!(ws.discover_files().await.len(), 1);
        ws.invalidate_file_list();
        assert_eq!(ws.discover_files().await.len(), 2);
    }

    #[tokio::test]
    async fn test_file_cap_is_reported() {
        let temp = TempDir::new().unwrap();
        for name in ["a.mdr", "b.mdr", "c.mdr"] {
            fs::write(temp.path().join(name), "").unwrap();
        }
        let ws = WorkspaceService::new(shared(Settings {
            workspace_root: Some(temp.path().to_path_buf()),
            max_workspace_files: 2,
            ..Settings::default()
        }));
        assert!(ws.file_cap_notice().is_none());

        assert_eq!(ws.discover_files().await.len(), 2);
        let notice = ws.file_cap_notice().expect("cap reached");
        assert!(notice.contains("first 2 Midori files"));

        fs::remove_file(temp.path().join("c.mdr")).unwrap();
        ws.invalidate_file_list();
        assert_eq!(ws.discover_files().await.len(), 2);
        assert!(ws.file_cap_notice().is_none());
    }

    #[tokio::test]
    async fn test_set_root_drops_old_caches() {
        let old = TempDir::new().unwrap();
        let new = TempDir::new().unwrap();
        let path = old.path().join("a.mdr");
        fs::write(&path, "fn a() {}").unwrap();
        fs::write(new.path().join("b.mdr"), "").unwrap();
        fs::write(new.path().join("c.mdr"), "").unwrap();
        let ws = service(old.path());

        assert_eq!(ws.discover_files().await.len(), 1);
        ws.load_external(&path).await.unwrap();
        assert_eq!(ws.cached_file_count(), 1);

        ws.set_root(Some(new.path().to_path_buf()));
        assert_eq!(ws.root().as_deref(), Some(new.path()));
        assert_eq!(ws.cached_file_count(), 0);
        // not served from the old root's listing
        assert_eq!(ws.discover_files().await.len(), 2);
    }

    #[tokio::test]
    async fn test_forget_drops_cached_index() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.mdr");
        fs::write(&path, "fn a() {}").unwrap();
        let ws = service(temp.path());

        ws.load_external(&path).await.unwrap();
        assert_eq!(ws.cached_file_count(), 1);
        ws.forget(&path);
        assert_eq!(ws.cached_file_count(), 0);
    }
}
