//! Workspace file discovery
//!
//! Breadth-first walk from the workspace root collecting Midori sources,
//! bounded by a file cap, with a short-lived cache of the result.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::ignore::IgnoreFilter;
use crate::diagnostics::SCRATCH_PREFIX;
use crate::language::SOURCE_EXTENSION;

/// How long a discovered file list is reused
pub const FILE_LIST_TTL: Duration = Duration::from_secs(3);

/// Result of one workspace walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    pub files: Vec<PathBuf>,
    /// The file cap was reached before the walk finished
    pub truncated: bool,
}

/// Midori sources, excluding scratch copies made for a running check
pub fn is_source_file(path: &Path) -> bool {
    let scratch = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(SCRATCH_PREFIX));
    !scratch
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == SOURCE_EXTENSION)
}

/// Walk `root` breadth first, collecting at most `max_files` sources.
/// Unreadable directories are skipped.
pub async fn discover_files(root: &Path, max_files: usize) -> Discovery {
    let filter = IgnoreFilter::new(root);
    let mut discovery = Discovery::default();
    let mut queue = VecDeque::from([root.to_path_buf()]);

    while let Some(dir) = queue.pop_front() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!("[Discovery] skipping {}: {}", dir.display(), e);
                continue;
            }
        };

        let mut children = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let Ok(file_type) = entry.file_type().await else {
                        continue;
                    };
                    children.push((entry.path(), file_type.is_dir(), file_type.is_file()));
                }
                Ok(None) => break,
                Err(e) => {
                    debug!("[Discovery] error reading {}: {}", dir.display(), e);
                    break;
                }
            }
        }
        // stable order regardless of the platform's directory listing
        children.sort_by(|a, b| a.0.cmp(&b.0));

        for (path, is_dir, is_file) in children {
            if filter.should_skip(&path, is_dir) {
                continue;
            }
            if is_dir {
                queue.push_back(path);
            } else if is_file && is_source_file(&path) {
                if discovery.files.len() >= max_files {
                    warn!(
                        "[Discovery] workspace file cap of {} reached under {}",
                        max_files,
                        root.display()
                    );
                    discovery.truncated = true;
                    return discovery;
                }
                discovery.files.push(path);
            }
        }
    }

    debug!(
        "[Discovery] found {} source files under {}",
        discovery.files.len(),
        root.display()
    );
    discovery
}

struct CachedList {
    root: PathBuf,
    max_files: usize,
    at: Instant,
    files: Arc<Vec<PathBuf>>,
}

/// Time-boxed memo of the last discovery result
pub struct FileListCache {
    ttl: Duration,
    entry: Option<CachedList>,
}

impl Default for FileListCache {
    fn default() -> Self {
        Self::new(FILE_LIST_TTL)
    }
}

impl FileListCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    /// Cached list for `root`, if still fresh and computed with the same cap
    pub fn get(&self, root: &Path, max_files: usize) -> Option<Arc<Vec<PathBuf>>> {
        let entry = self.entry.as_ref()?;
        if entry.root != root || entry.max_files != max_files || entry.at.elapsed() > self.ttl {
            return None;
        }
        Some(Arc::clone(&entry.files))
    }

    pub fn store(&mut self, root: &Path, max_files: usize, files: Vec<PathBuf>) -> Arc<Vec<PathBuf>> {
        let files = Arc::new(files);
        self.entry = Some(CachedList {
            root: root.to_path_buf(),
            max_files,
            at: Instant::now(),
            files: Arc::clone(&files),
        });
        files
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "fn main() {}").unwrap();
    }

    #[tokio::test]
    async fn test_discovery_is_breadth_first_and_filtered() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(root, "main.mdr");
        touch(root, "lib/util.mdr");
        touch(root, "lib/deep/more.mdr");
        touch(root, "node_modules/pkg/x.mdr");
        touch(root, "notes.txt");
        touch(root, "gen/out.mdr");
        touch(root, "lib/.midori-check-a1b2.mdr");
        fs::write(root.join(".gitignore"), "gen/\n").unwrap();

        let found = discover_files(root, 100).await;
        let rel: Vec<_> = found
            .files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(rel, vec!["main.mdr", "lib/util.mdr", "lib/deep/more.mdr"]);
        assert!(!found.truncated);
    }

    #[tokio::test]
    async fn test_discovery_respects_cap() {
        let temp = TempDir::new().unwrap();
        for i in 0..5 {
            touch(temp.path(), &format!("f{}.mdr", i));
        }
        let found = discover_files(temp.path(), 3).await;
        assert_eq!(found.files.len(), 3);
        assert!(found.truncated);
    }

    #[tokio::test]
    async fn test_missing_root_yields_nothing() {
        let temp = TempDir::new().unwrap();
        let found = discover_files(&temp.path().join("absent"), 10).await;
        assert!(found.files.is_empty());
    }

    #[test]
    fn test_file_list_cache_ttl_and_key() {
        let root = Path::new("/ws");
        let mut cache = FileListCache::new(Duration::from_secs(60));
        assert!(cache.get(root, 10).is_none());

        cache.store(root, 10, vec![root.join("a.mdr")]);
        assert_eq!(cache.get(root, 10).map(|f| f.len()), Some(1));
        assert!(cache.get(root, 20).is_none());
        assert!(cache.get(Path::new("/other"), 10).is_none());

        cache.invalidate();
        assert!(cache.get(root, 10).is_none());

        let mut expired = FileListCache::new(Duration::ZERO);
        expired.store(root, 10, Vec::new());
        std::thread::sleep(Duration::from_millis(5));
        assert!(expired.get(root, 10).is_none());
    }
}
