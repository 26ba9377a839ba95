//! Symbol index cache for files that are not open in the editor
//!
//! Entries are keyed by absolute path and validated against the file's
//! modification time; capacity is enforced by least-recently-used eviction.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::debug;

use crate::language::SymbolIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// One indexed file snapshot
#[derive(Debug, Clone)]
pub struct CachedFile {
    pub modified: SystemTime,
    pub text: Arc<str>,
    pub index: Arc<SymbolIndex>,
}

pub struct ExternalIndexCache {
    capacity: usize,
    map: HashMap<PathBuf, CachedFile>,
    order: VecDeque<PathBuf>,
    stats: CacheStats,
}

impl ExternalIndexCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            map: HashMap::new(),
            order: VecDeque::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the capacity, evicting the least recently used entries to fit
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.map.len() > self.capacity {
            self.evict_oldest();
        }
    }

    /// Entry for `path` if it was cached with exactly `modified`. A stale
    /// entry is dropped and counts as a miss.
    pub fn get(&mut self, path: &Path, modified: SystemTime) -> Option<CachedFile> {
        match self.map.get(path) {
            Some(entry) if entry.modified == modified => {
                let entry = entry.clone();
                self.stats.hits = self.stats.hits.saturating_add(1);
                self.touch(path);
                Some(entry)
            }
            Some(_) => {
                self.remove(path);
                self.stats.misses = self.stats.misses.saturating_add(1);
                None
            }
            None => {
                self.stats.misses = self.stats.misses.saturating_add(1);
                None
            }
        }
    }

    pub fn insert(&mut self, path: PathBuf, file: CachedFile) {
        if self.map.contains_key(&path) {
            self.map.insert(path.clone(), file);
            self.touch(&path);
            return;
        }
        while self.map.len() >= self.capacity {
            self.evict_oldest();
        }
        self.order.push_back(path.clone());
        self.map.insert(path, file);
    }

    pub fn remove(&mut self, path: &Path) -> Option<CachedFile> {
        let removed = self.map.remove(path);
        if removed.is_some() {
            self.order.retain(|p| p != path);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.map.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    fn touch(&mut self, path: &Path) {
        if let Some(pos) = self.order.iter().position(|p| p == path) {
            if let Some(key) = self.order.remove(pos) {
                self.order.push_back(key);
            }
        }
    }

    fn evict_oldest(&mut self) {
        while let Some(oldest) = self.order.pop_front() {
            if self.map.remove(&oldest).is_some() {
                self.stats.evictions = self.stats.evictions.saturating_add(1);
                debug!("[ExternalCache] evicted {}", oldest.display());
                return;
            }
        }
    }
}
